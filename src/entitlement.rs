//! PRO / free gating for AI calls and export

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{UserProfile, WorkoutSession};

/// Free AI swaps per workout
pub const FREE_SWAPS_PER_SESSION: u32 = 1;
/// Free AI coaching tips per workout
pub const FREE_TIPS_PER_SESSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Feature {
    AiSwap,
    AiTip,
    PdfExport,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Feature::AiSwap => "AI exercise swap",
            Feature::AiTip => "AI coaching tip",
            Feature::PdfExport => "PDF export",
        };
        f.write_str(name)
    }
}

/// Decision for a gated action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    /// Free limit used up; PRO or an ad reward unlocks it
    Upsell(Feature),
}

/// Counts are per workout; an ad reward is a shared credit for swap or tip
pub fn check(profile: &UserProfile, session: Option<&WorkoutSession>, feature: Feature) -> Access {
    if profile.is_pro {
        return Access::Granted;
    }

    let Some(session) = session else {
        return match feature {
            Feature::PdfExport => Access::Upsell(feature),
            _ => Access::Granted,
        };
    };

    // every AI use beyond the free allowance consumed one ad credit
    let credits_spent = session.swaps_used.saturating_sub(FREE_SWAPS_PER_SESSION)
        + session.tips_used.saturating_sub(FREE_TIPS_PER_SESSION);
    let credits_left = session.ad_credits.saturating_sub(credits_spent);

    let allowed = match feature {
        Feature::AiSwap => session.swaps_used < FREE_SWAPS_PER_SESSION || credits_left > 0,
        Feature::AiTip => session.tips_used < FREE_TIPS_PER_SESSION || credits_left > 0,
        Feature::PdfExport => false,
    };

    if allowed {
        Access::Granted
    } else {
        Access::Upsell(feature)
    }
}

/// Whether banner / full-screen ads are shown
pub fn shows_ads(profile: &UserProfile) -> bool {
    !profile.is_pro
}
