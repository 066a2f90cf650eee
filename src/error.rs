//! Process-level error type.
//!
//! Exit-code conventions used across the crate:
//!
//! - 2: invalid input or configuration (mismatched/short series, bad flags)
//! - 3: insufficient data after guardrails
//! - 4: numerical or solver failure
//!
//! The named constructors below are the preferred way to build errors; they
//! keep the exit-code taxonomy in one place instead of scattering magic
//! numbers through the fitters.

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// Malformed input or configuration (exit code 2).
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(2, message)
    }

    /// A series too short for the requested operation (exit code 3).
    pub fn insufficient_data(message: impl Into<String>) -> Self {
        Self::new(3, message)
    }

    /// A numerical or solver failure (exit code 4).
    pub fn numerical(message: impl Into<String>) -> Self {
        Self::new(4, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
