use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Non-success status, timeout or connection failure from an upstream API.
    #[error("upstream unavailable: {0}")]
    Upstream(String),

    #[error("malformed payload: {0}")]
    Parse(String),

    #[error("storage error: {0}")]
    Storage(String),

    /// Fatal for a whole run: nothing is sent when the channel cannot authenticate.
    #[error("missing credentials: {0}")]
    MissingCredentials(&'static str),

    #[error("template error: {0}")]
    Render(String),

    #[error("dispatch failed: {0}")]
    Dispatch(String),
}

impl From<reqwest::Error> for PipelineError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            PipelineError::Parse(e.to_string())
        } else {
            PipelineError::Upstream(e.to_string())
        }
    }
}

impl From<mongodb::error::Error> for PipelineError {
    fn from(e: mongodb::error::Error) -> Self {
        PipelineError::Storage(e.to_string())
    }
}

impl From<handlebars::RenderError> for PipelineError {
    fn from(e: handlebars::RenderError) -> Self {
        PipelineError::Render(e.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        PipelineError::Parse(e.to_string())
    }
}
