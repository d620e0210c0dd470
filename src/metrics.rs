//! Derived numbers over the workout history

use std::collections::BTreeSet;

use chrono::{Duration, Local, NaiveDate};

use crate::model::{Progress, WorkoutSession};

pub const XP_PER_SESSION: u32 = 150;
pub const XP_PER_LEVEL: u32 = 1000;
/// Body weight assumed for the power score when the profile has none
const DEFAULT_BODY_WEIGHT: f64 = 80.0;

/// Level for a given XP total (level 1 starts at 0 XP)
pub fn level_for(xp: u32) -> u32 {
    xp / XP_PER_LEVEL + 1
}

/// Progress after one more finished workout
pub fn award_session(progress: &Progress) -> Progress {
    let xp = progress.xp + XP_PER_SESSION;
    Progress { xp, level: level_for(xp) }
}

/// Training analytics
pub struct Analytics<'a> {
    sessions: &'a [WorkoutSession],
}

impl<'a> Analytics<'a> {
    /// `sessions` in creation order, as kept in history
    pub fn new(sessions: &'a [WorkoutSession]) -> Self {
        Self { sessions }
    }

    fn local_date(session: &WorkoutSession) -> NaiveDate {
        session.date.with_timezone(&Local).date_naive()
    }

    /// Total lifted volume (kg) across the whole history
    pub fn total_volume(&self) -> f64 {
        self.sessions.iter().map(WorkoutSession::volume).sum()
    }

    /// Volume for exercises whose name contains `exercise` (case-insensitive)
    pub fn exercise_volume(&self, exercise: &str) -> f64 {
        let needle = exercise.to_lowercase();
        self.sessions
            .iter()
            .flat_map(|s| s.exercises.iter())
            .filter(|e| e.name.to_lowercase().contains(&needle))
            .map(|e| e.volume())
            .sum()
    }

    /// Mean set difficulty for matching exercises, `None` if never done
    pub fn average_difficulty(&self, exercise: &str) -> Option<f64> {
        let needle = exercise.to_lowercase();
        let ratings: Vec<f64> = self
            .sessions
            .iter()
            .flat_map(|s| s.exercises.iter())
            .filter(|e| e.name.to_lowercase().contains(&needle))
            .flat_map(|e| e.sets.iter().map(|s| s.difficulty as f64))
            .collect();

        if ratings.is_empty() {
            return None;
        }
        Some(ratings.iter().sum::<f64>() / ratings.len() as f64)
    }

    /// Score per session for the last 7 workouts:
    /// volume / body weight + 10 per exercise
    pub fn power_scores(&self, body_weight: Option<f64>) -> Vec<(NaiveDate, i64)> {
        let weight = body_weight.filter(|w| *w > 0.0).unwrap_or(DEFAULT_BODY_WEIGHT);
        let start = self.sessions.len().saturating_sub(7);

        self.sessions[start..]
            .iter()
            .map(|s| {
                let bonus = s.exercises.len() as f64 * 10.0;
                let score = (s.volume() / weight + bonus).round() as i64;
                (Self::local_date(s), score)
            })
            .collect()
    }

    /// Seven days ending `today`, each flagged if a workout happened
    pub fn activity_strip(&self, today: NaiveDate) -> Vec<(NaiveDate, bool)> {
        let days = self.training_days();
        (0..7)
            .rev()
            .map(|i| {
                let day = today - Duration::days(i);
                (day, days.contains(&day))
            })
            .collect()
    }

    /// Consecutive training days ending today (or yesterday, if today is still open)
    pub fn current_streak(&self, today: NaiveDate) -> u32 {
        let days = self.training_days();
        let mut day = if days.contains(&today) {
            today
        } else {
            today - Duration::days(1)
        };

        let mut streak = 0;
        while days.contains(&day) {
            streak += 1;
            day -= Duration::days(1);
        }
        streak
    }

    fn training_days(&self) -> BTreeSet<NaiveDate> {
        self.sessions.iter().map(Self::local_date).collect()
    }

    /// Get training frequency (sessions per week)
    pub fn weekly_frequency(&self) -> f64 {
        if self.sessions.len() < 2 {
            return 0.0;
        }

        let days = self.training_days();
        let (Some(first), Some(last)) = (days.first(), days.last()) else {
            return 0.0;
        };
        let span = (*last - *first).num_days() as f64;

        if span == 0.0 {
            return self.sessions.len() as f64;
        }

        (self.sessions.len() as f64 / span) * 7.0
    }

    /// Total time spent training, in seconds
    pub fn total_duration(&self) -> u64 {
        self.sessions.iter().map(|s| s.duration_seconds).sum()
    }
}
