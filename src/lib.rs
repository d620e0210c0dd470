//! wykuci - AI-planned strength training tracker
//!
//! Guided workout sessions with a rest timer, an AI coach for plans,
//! swaps and tips, progress analytics and a PDF training log.

pub mod app;
pub mod coach;
pub mod db;
pub mod entitlement;
pub mod error;
pub mod export;
pub mod metrics;
pub mod model;
pub mod session;
pub mod timer;
pub mod tui;

pub use app::App;
pub use db::Database;
pub use error::{AppError, AppResult};
