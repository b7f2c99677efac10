/// Result alias that carries the custom [`RecipeError`] type.
pub type Result<T> = std::result::Result<T, RecipeError>;

/// Common error type for the core crate.
///
/// Every variant is fatal to the current invocation. Nothing is retried and
/// nothing is recovered locally; errors travel up to the binary unchanged.
#[derive(Debug, thiserror::Error)]
pub enum RecipeError {
    /// Undeclared component references, unknown options, invalid option
    /// combinations and missing recipe data.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Source retrieval or integrity failure.
    #[error("fetch error: {0}")]
    Fetch(String),
    /// The delegated build engine exited unsuccessfully.
    #[error("build error: `{step}` failed ({status})")]
    Build { step: String, status: String },
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl RecipeError {
    /// Creates a configuration error that wraps the provided message.
    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a fetch error that wraps the provided message.
    pub fn fetch<T: Into<String>>(msg: T) -> Self {
        Self::Fetch(msg.into())
    }

    pub fn build<S: Into<String>, T: Into<String>>(step: S, status: T) -> Self {
        Self::Build {
            step: step.into(),
            status: status.into(),
        }
    }

    /// Returns `true` for [`RecipeError::Configuration`].
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl From<&str> for RecipeError {
    fn from(value: &str) -> Self {
        Self::config(value)
    }
}

impl From<String> for RecipeError {
    fn from(value: String) -> Self {
        Self::Configuration(value)
    }
}
