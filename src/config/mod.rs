//! Configuration module for the plan tracker.
//!
//! This module handles all settings-related functionality:
//! - Deserializing `plantrack.yaml`
//! - Loading `.env` files and `PLANTRACK_*` environment overrides
//! - Validation of settings values

mod parser;
mod settings;
mod validator;

pub use parser::{
    find_config_file, ConfigParser, API_KEY_VAR, DEFAULT_CONFIG_FILES, ENDPOINT_VAR,
    MAX_RETRIES_VAR, POLL_FREQUENCY_VAR,
};
pub use settings::{ApiSettings, Settings, TrackSettings};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
