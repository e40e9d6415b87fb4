use thiserror::Error;

/// Why a single reminder failed to compile. Compilation errors never
/// abort the rest of a user's reminders; the compiler skips the one
/// reminder and logs.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid time string {0:?} (expected HH:MM)")]
    InvalidTime(String),
    #[error("local time {0:?} does not exist in zone {1}")]
    UnrepresentableLocalTime(String, String),
}
