use std::io;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced to the caller. Violations of internal cache invariants are
/// not represented here; they indicate a coding bug and abort the process.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration knob was set to a value outside its domain.
    #[error("invalid {knob}: `{value}`")]
    Config { knob: &'static str, value: String },

    /// Underlying I/O failed (trace input, summary output or emulation files).
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Extracting a configuration from file/environment providers failed.
    #[cfg(feature = "figment_config")]
    #[error(transparent)]
    Figment(#[from] figment::Error),
}
