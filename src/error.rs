//! Error types shared by the library modules

use thiserror::Error;

use crate::entitlement::Feature;

/// Rejected mutations of an active workout
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("session is already finalized")]
    AlreadyFinalized,

    #[error("warm-up must be completed before working sets")]
    WarmupPending,

    #[error("no exercise with id {0}")]
    UnknownExercise(String),

    #[error("exercise {exercise_id} has no set #{index}")]
    UnknownSet { exercise_id: String, index: usize },

    #[error("set #{index} of {exercise_id} is missing {missing}")]
    IncompleteSet {
        exercise_id: String,
        index: usize,
        missing: &'static str,
    },

    #[error("invalid set parameter: {0}")]
    InvalidParameter(String),

    #[error("elapsed time cannot go backwards ({given}s < {tracked}s)")]
    ElapsedWentBackwards { given: u64, tracked: u64 },

    #[error("an exercise needs at least one set")]
    EmptyExercise,
}

/// Failures at the generative-AI boundary
#[derive(Error, Debug)]
pub enum CoachError {
    #[error("AI request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("AI service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("AI response is malformed: {0}")]
    Malformed(String),

    #[error("AI coach is not configured (missing API key)")]
    NotConfigured,
}

impl From<serde_json::Error> for CoachError {
    fn from(e: serde_json::Error) -> Self {
        CoachError::Malformed(e.to_string())
    }
}

/// Persistence port failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("stored state is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Umbrella error for operations on the application state
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Coach(#[from] CoachError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no profile yet, run onboarding first")]
    NotOnboarded,

    #[error("no active workout")]
    NoActiveSession,

    #[error("a workout is already in progress")]
    SessionInProgress,

    #[error("{0} requires PRO")]
    Upsell(Feature),

    #[error("invalid profile: {0}")]
    InvalidProfile(String),

    #[error("export failed: {0}")]
    Export(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
