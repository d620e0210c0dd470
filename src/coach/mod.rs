//! AI coach boundary - plan generation, exercise swap, coaching tips
//!
//! The app's own logic here is limited to prompt templating and checking the
//! shape of what comes back. Nothing is applied unless the whole response
//! validates.

pub mod gemini;
pub mod prompt;

pub use gemini::GeminiCoach;

use serde::Deserialize;

use crate::error::CoachError;
use crate::model::{ExerciseLog, PlanType, SetLog, UserProfile, WarmupItem, WorkoutSession};

type Result<T> = std::result::Result<T, CoachError>;

/// Upper bound on sets the app accepts for a single exercise
pub const MAX_SETS: u32 = 10;

/// Generative coach. Implementations talk to an external model.
#[allow(async_fn_in_trait)]
pub trait Coach {
    async fn generate_plan(
        &self,
        profile: &UserProfile,
        history: &[WorkoutSession],
        plan: PlanType,
    ) -> Result<GeneratedPlan>;

    async fn swap_exercise(&self, profile: &UserProfile, current: &ExerciseLog) -> Result<PlannedExercise>;

    async fn coaching_tip(&self, profile: &UserProfile, exercise: &str) -> Result<String>;
}

/// Exercise as the model describes it; numbers may arrive as floats
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawExercise {
    #[serde(default)]
    name: String,
    #[serde(default)]
    muscle_group: String,
    #[serde(default)]
    is_bodyweight: bool,
    #[serde(default)]
    is_timed: bool,
    sets_count: Option<f64>,
    reps_target: Option<f64>,
    suggested_weight: Option<f64>,
    duration_minutes: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWarmup {
    #[serde(default)]
    name: String,
    #[serde(default)]
    instruction: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlan {
    #[serde(default)]
    workout_title: String,
    #[serde(default)]
    warmup: Vec<RawWarmup>,
    #[serde(default)]
    exercises: Vec<RawExercise>,
}

/// Validated exercise proposal
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedExercise {
    pub name: String,
    pub muscle_group: String,
    pub is_bodyweight: bool,
    pub is_timed: bool,
    pub sets: u32,
    pub reps: Option<u32>,
    pub weight: Option<f64>,
    pub duration_minutes: Option<u32>,
}

impl PlannedExercise {
    /// Materialize into a session exercise with `sets` open sets
    pub fn into_log(self, id: String) -> ExerciseLog {
        let set = SetLog::planned(
            if self.is_timed { None } else { self.reps },
            if self.is_bodyweight || self.is_timed { None } else { self.weight },
            self.duration_minutes,
        );
        ExerciseLog {
            id,
            name: self.name,
            muscle_group: self.muscle_group,
            is_bodyweight: self.is_bodyweight,
            is_timed: self.is_timed,
            sets: vec![set; self.sets as usize],
        }
    }
}

/// Validated plan
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPlan {
    pub title: String,
    pub warmup: Vec<WarmupItem>,
    pub exercises: Vec<PlannedExercise>,
}

fn whole(value: f64, field: &str, name: &str) -> Result<u32> {
    if !value.is_finite() || value < 0.0 || value > u32::MAX as f64 {
        return Err(CoachError::Malformed(format!("{name}: {field} = {value}")));
    }
    Ok(value.round() as u32)
}

fn validate_exercise(raw: RawExercise) -> Result<PlannedExercise> {
    let name = raw.name.trim().to_string();
    if name.is_empty() {
        return Err(CoachError::Malformed("exercise without a name".into()));
    }

    let sets = match raw.sets_count {
        Some(n) => whole(n, "setsCount", &name)?,
        None => return Err(CoachError::Malformed(format!("{name}: missing setsCount"))),
    };
    if !(1..=MAX_SETS).contains(&sets) {
        return Err(CoachError::Malformed(format!("{name}: setsCount {sets} outside 1..={MAX_SETS}")));
    }

    let reps = raw.reps_target.map(|r| whole(r, "repsTarget", &name)).transpose()?;
    let duration_minutes = raw
        .duration_minutes
        .map(|d| whole(d, "durationMinutes", &name))
        .transpose()?
        // cardio entries sometimes carry minutes in repsTarget
        .or(if raw.is_timed { reps } else { None });

    let weight = match raw.suggested_weight {
        Some(w) if !w.is_finite() || w < 0.0 => {
            return Err(CoachError::Malformed(format!("{name}: suggestedWeight = {w}")));
        }
        other => other,
    };

    if raw.is_timed {
        if duration_minutes.is_none() {
            return Err(CoachError::Malformed(format!("{name}: timed exercise without duration")));
        }
    } else if reps.is_none() {
        return Err(CoachError::Malformed(format!("{name}: missing repsTarget")));
    }

    Ok(PlannedExercise {
        name,
        muscle_group: raw.muscle_group.trim().to_string(),
        is_bodyweight: raw.is_bodyweight,
        is_timed: raw.is_timed,
        sets,
        reps,
        weight: if raw.is_bodyweight { None } else { Some(weight.unwrap_or(0.0)) },
        duration_minutes,
    })
}

/// Models sometimes wrap JSON in a markdown fence
fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Parse and validate a plan response
pub fn parse_plan(text: &str) -> Result<GeneratedPlan> {
    let body = strip_fence(text);
    if body.is_empty() {
        return Err(CoachError::Malformed("empty response".into()));
    }
    let raw: RawPlan = serde_json::from_str(body)?;

    if raw.exercises.is_empty() {
        return Err(CoachError::Malformed("plan has no exercises".into()));
    }

    let exercises = raw
        .exercises
        .into_iter()
        .map(validate_exercise)
        .collect::<Result<Vec<_>>>()?;

    let warmup = raw
        .warmup
        .into_iter()
        .filter(|w| !w.name.trim().is_empty())
        .map(|w| WarmupItem {
            name: w.name.trim().to_string(),
            instruction: w.instruction.trim().to_string(),
        })
        .collect();

    let title = raw.workout_title.trim();
    Ok(GeneratedPlan {
        title: if title.is_empty() { "Trening".to_string() } else { title.to_string() },
        warmup,
        exercises,
    })
}

/// Parse and validate a single-exercise swap response
pub fn parse_exercise(text: &str) -> Result<PlannedExercise> {
    let body = strip_fence(text);
    if body.is_empty() {
        return Err(CoachError::Malformed("empty response".into()));
    }
    validate_exercise(serde_json::from_str(body)?)
}

/// Coaching tips are plain text; only emptiness is rejected
pub fn parse_tip(text: &str) -> Result<String> {
    let tip = text.trim();
    if tip.is_empty() {
        return Err(CoachError::Malformed("empty tip".into()));
    }
    Ok(tip.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r#"{
        "workoutTitle": "Siła i moc",
        "warmup": [{"name": "Pajacyki", "instruction": "2 min"}, {"name": " "}],
        "exercises": [
            {"name": "Przysiad", "muscleGroup": "nogi", "isBodyweight": false, "isTimed": false,
             "setsCount": 4, "repsTarget": 8, "suggestedWeight": 60.0},
            {"name": "Pompki", "muscleGroup": "klatka", "isBodyweight": true, "isTimed": false,
             "setsCount": 3.0, "repsTarget": 15, "suggestedWeight": 0},
            {"name": "Rower", "muscleGroup": "cardio", "isBodyweight": true, "isTimed": true,
             "setsCount": 1, "repsTarget": 20, "suggestedWeight": 0}
        ]
    }"#;

    #[test]
    fn test_parse_valid_plan() {
        let plan = parse_plan(PLAN).unwrap();
        assert_eq!(plan.title, "Siła i moc");
        assert_eq!(plan.warmup.len(), 1);
        assert_eq!(plan.exercises.len(), 3);

        let squat = &plan.exercises[0];
        assert_eq!((squat.sets, squat.reps, squat.weight), (4, Some(8), Some(60.0)));

        let pushups = &plan.exercises[1];
        assert_eq!(pushups.sets, 3);
        assert_eq!(pushups.weight, None);

        // minutes carried in repsTarget for cardio
        assert_eq!(plan.exercises[2].duration_minutes, Some(20));
    }

    #[test]
    fn test_parse_fenced_plan() {
        let fenced = format!("```json\n{PLAN}\n```");
        assert!(parse_plan(&fenced).is_ok());
    }

    #[test]
    fn test_into_log_builds_open_sets() {
        let plan = parse_plan(PLAN).unwrap();
        let log = plan.exercises[0].clone().into_log("ex-0".into());
        assert_eq!(log.sets.len(), 4);
        assert!(log.sets.iter().all(|s| !s.completed && s.difficulty == 3));
        assert_eq!(log.sets[0].weight, Some(60.0));

        let cardio = plan.exercises[2].clone().into_log("ex-2".into());
        assert_eq!(cardio.sets[0].reps, None);
        assert_eq!(cardio.sets[0].duration_minutes, Some(20));
    }

    #[test]
    fn test_malformed_responses() {
        let cases = [
            "",
            "   ",
            "not json",
            r#"{"workoutTitle": "x"}"#,
            r#"{"exercises": []}"#,
            r#"{"exercises": [{"name": "", "setsCount": 3, "repsTarget": 5}]}"#,
            r#"{"exercises": [{"name": "A", "repsTarget": 5}]}"#,
            r#"{"exercises": [{"name": "A", "setsCount": 0, "repsTarget": 5}]}"#,
            r#"{"exercises": [{"name": "A", "setsCount": 50, "repsTarget": 5}]}"#,
            r#"{"exercises": [{"name": "A", "setsCount": 3, "repsTarget": -5}]}"#,
            r#"{"exercises": [{"name": "A", "setsCount": 3, "repsTarget": 5, "suggestedWeight": -1}]}"#,
            r#"{"exercises": [{"name": "A", "setsCount": 3}]}"#,
            r#"{"exercises": [{"name": "A", "isTimed": true, "setsCount": 1}]}"#,
            r#"["array"]"#,
        ];
        for case in cases {
            assert!(
                matches!(parse_plan(case), Err(CoachError::Malformed(_))),
                "accepted: {case}"
            );
        }
    }

    #[test]
    fn test_parse_swap() {
        let ex = parse_exercise(
            r#"{"name": "Wiosłowanie", "muscleGroup": "plecy", "setsCount": 3, "repsTarget": 10, "suggestedWeight": 40}"#,
        )
        .unwrap();
        assert_eq!(ex.name, "Wiosłowanie");
        assert_eq!(ex.weight, Some(40.0));
        assert!(parse_exercise("{}").is_err());
    }

    #[test]
    fn test_parse_tip() {
        assert_eq!(parse_tip("  Trzymaj łokcie blisko.\n").unwrap(), "Trzymaj łokcie blisko.");
        assert!(parse_tip("\n").is_err());
    }
}
