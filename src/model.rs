//! Domain records - profile, workouts, sets

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Rest presets offered in the session header
pub const REST_PRESETS: [u32; 3] = [45, 60, 90];
pub const DEFAULT_REST_SECS: u32 = 60;
pub const DEFAULT_DIFFICULTY: u8 = 3;

/// Main training goal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ValueEnum)]
pub enum GoalType {
    Gym,
    Football,
    Tennis,
    Padel,
    Basketball,
    Running,
    Cycling,
    Strength,
    Hypertrophy,
}

impl GoalType {
    pub fn label(&self) -> &'static str {
        match self {
            GoalType::Gym => "Siłownia (ogólny)",
            GoalType::Football => "Piłka nożna",
            GoalType::Tennis => "Tenis",
            GoalType::Padel => "Padel",
            GoalType::Basketball => "Koszykówka",
            GoalType::Running => "Bieganie",
            GoalType::Cycling => "Rower",
            GoalType::Strength => "Siła maksymalna",
            GoalType::Hypertrophy => "Masa mięśniowa",
        }
    }
}

/// Training style requested from the coach
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ValueEnum)]
pub enum PlanType {
    AiAdvisor,
    Fbw,
    Ppl,
    Split,
    HomeBodyweight,
    Cardio,
}

impl PlanType {
    pub fn label(&self) -> &'static str {
        match self {
            PlanType::AiAdvisor => "Doradca AI",
            PlanType::Fbw => "Full Body Workout",
            PlanType::Ppl => "Push Pull Legs",
            PlanType::Split => "Split",
            PlanType::HomeBodyweight => "Trening Domowy",
            PlanType::Cardio => "Cardio / Kondycja",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ValueEnum)]
pub enum Level {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl Level {
    pub fn label(&self) -> &'static str {
        match self {
            Level::Beginner => "początkujący",
            Level::Intermediate => "średniozaawansowany",
            Level::Advanced => "zaawansowany",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ValueEnum)]
pub enum Gender {
    #[default]
    Male,
    Female,
    Unspecified,
}

/// Injury areas offered during onboarding
pub const COMMON_INJURIES: &[&str] = &[
    "Brak ograniczeń",
    "Kręgosłup lędźwiowy",
    "Kręgosłup szyjny",
    "Kolana",
    "Barki / Stożek rotatorów",
    "Nadgarstki",
    "Stawy skokowe",
    "Łokieć (tenisisty/golfisty)",
    "Inne / Wiele obszarów",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightEntry {
    pub date: DateTime<Utc>,
    pub weight: f64,
}

/// XP bookkeeping, bumped on every finished workout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Progress {
    pub xp: u32,
    pub level: u32,
}

impl Default for Progress {
    fn default() -> Self {
        Self { xp: 0, level: 1 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub name: String,
    pub gender: Gender,
    pub age: u32,
    pub weight: f64,
    pub height: u32,
    pub goal: GoalType,
    #[serde(default)]
    pub goal_description: String,
    pub injuries: String,
    pub level: Level,
    #[serde(default)]
    pub is_pro: bool,
    #[serde(default = "default_true")]
    pub haptics_enabled: bool,
    #[serde(default = "default_rest")]
    pub preferred_rest_secs: u32,
    #[serde(default)]
    pub default_plan: Option<PlanType>,
    #[serde(default)]
    pub weight_history: Vec<WeightEntry>,
    #[serde(default)]
    pub progress: Progress,
}

fn default_true() -> bool {
    true
}

fn default_rest() -> u32 {
    DEFAULT_REST_SECS
}

impl UserProfile {
    /// Fresh profile as produced by onboarding
    pub fn new(name: &str, age: u32, weight: f64, height: u32, goal: GoalType) -> Self {
        Self {
            name: name.to_string(),
            gender: Gender::default(),
            age,
            weight,
            height,
            goal,
            goal_description: String::new(),
            injuries: COMMON_INJURIES[0].to_string(),
            level: Level::default(),
            is_pro: false,
            haptics_enabled: true,
            preferred_rest_secs: DEFAULT_REST_SECS,
            default_plan: None,
            weight_history: vec![WeightEntry { date: Utc::now(), weight }],
            progress: Progress::default(),
        }
    }

    pub fn has_injuries(&self) -> bool {
        let text = self.injuries.trim();
        !text.is_empty() && text != COMMON_INJURIES[0]
    }
}

/// One unit of work within an exercise
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetLog {
    pub reps: Option<u32>,
    pub weight: Option<f64>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    pub completed: bool,
    pub difficulty: u8,
}

impl SetLog {
    pub fn planned(reps: Option<u32>, weight: Option<f64>, duration_minutes: Option<u32>) -> Self {
        Self {
            reps,
            weight,
            duration_minutes,
            completed: false,
            difficulty: DEFAULT_DIFFICULTY,
        }
    }

    /// Lifted volume in kg (weight x reps); zero when either is unset
    pub fn volume(&self) -> f64 {
        match (self.weight, self.reps) {
            (Some(w), Some(r)) => w * r as f64,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExerciseLog {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub muscle_group: String,
    #[serde(default)]
    pub is_bodyweight: bool,
    #[serde(default)]
    pub is_timed: bool,
    pub sets: Vec<SetLog>,
}

impl ExerciseLog {
    pub fn is_done(&self) -> bool {
        self.sets.iter().all(|s| s.completed)
    }

    pub fn average_difficulty(&self) -> f64 {
        if self.sets.is_empty() {
            return 0.0;
        }
        self.sets.iter().map(|s| s.difficulty as f64).sum::<f64>() / self.sets.len() as f64
    }

    pub fn volume(&self) -> f64 {
        if self.is_bodyweight || self.is_timed {
            return 0.0;
        }
        self.sets.iter().map(SetLog::volume).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WarmupItem {
    pub name: String,
    #[serde(default)]
    pub instruction: String,
}

/// One complete workout attempt, active or historical
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutSession {
    pub id: String,
    pub date: DateTime<Utc>,
    pub goal: GoalType,
    pub plan_type: PlanType,
    pub workout_title: String,
    #[serde(default)]
    pub warmup: Vec<WarmupItem>,
    pub exercises: Vec<ExerciseLog>,
    #[serde(default)]
    pub duration_seconds: u64,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub warmup_completed: bool,
    #[serde(default)]
    pub swaps_used: u32,
    #[serde(default)]
    pub tips_used: u32,
    #[serde(default)]
    pub ad_credits: u32,
}

impl WorkoutSession {
    pub fn exercise(&self, id: &str) -> Option<&ExerciseLog> {
        self.exercises.iter().find(|e| e.id == id)
    }

    /// Total lifted volume (kg) across all sets
    pub fn volume(&self) -> f64 {
        self.exercises.iter().map(ExerciseLog::volume).sum()
    }

    pub fn completed_sets(&self) -> usize {
        self.exercises
            .iter()
            .flat_map(|e| e.sets.iter())
            .filter(|s| s.completed)
            .count()
    }

    pub fn total_sets(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }
}

/// The single persisted application blob
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppState {
    pub profile: Option<UserProfile>,
    #[serde(default)]
    pub history: Vec<WorkoutSession>,
    #[serde(default)]
    pub active: Option<WorkoutSession>,
}

/// `m:ss` clock used by the session header and the PDF report
pub fn format_clock(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
