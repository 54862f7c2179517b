//! Shared domain types and configuration for the restaurant review service.

pub mod app_config;
pub mod auth;
pub mod config;
pub mod restaurant;
pub mod review;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use auth::{sign_in_error_message, sign_up_error_message, validate_display_name, Session};
pub use config::{load_app_config, load_app_config_from_env};
pub use restaurant::{RestaurantRecord, RestaurantSource};
pub use review::{
    average_rating, sort_newest_first, Rating, ReviewDraft, ReviewFilter, ReviewRecord,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(i64),

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
}
