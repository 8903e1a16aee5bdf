//! Environment detection module.
//!
//! Determines whether the program is running on a Compute Engine VM and, if so,
//! which one.
mod checks;
mod detect;
mod error;
mod probe;

pub use checks::{PROJECT_ENV_VARS, project_id_from_env};
pub use detect::{Identity, RuntimeEnvironment, detect_identity};
pub use error::{Error, Result};
pub use probe::{EnvironmentProbe, SystemProbe};
