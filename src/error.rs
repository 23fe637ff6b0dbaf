/// Error surfaced by every fallible step of an analysis run.
///
/// Exit codes:
/// - `2` input files, CSV schema, invalid uncertainties, output I/O
/// - `3` empty or insufficient data
/// - `4` numerical failure (singular fit, undefined derived constant)
/// - `5` plot rendering
#[derive(Clone, PartialEq, Eq)]
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

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
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

impl From<crate::plot::PlotError> for AppError {
    fn from(err: crate::plot::PlotError) -> Self {
        AppError::new(5, format!("Plot rendering failed: {err}"))
    }
}
