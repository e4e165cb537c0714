use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("transform `{name}` failed: {message}")]
    Failed { name: String, message: String },
}

impl TransformError {
    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("no component registered under `{key}` (available: {})", .available.join(", "))]
    MissingComponent { key: String, available: Vec<String> },

    #[error("chart block is ready but no chart renderer is configured")]
    MissingChartRenderer,
}

pub type Result<T> = std::result::Result<T, RenderError>;
