use thiserror::Error;

/// Failures callers may want to tell apart. Everything else travels as plain `anyhow` context.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("{0} environment variable not set")]
    MissingApiKey(&'static str),

    #[error("rate limit persisted after {retries} retries: {body}")]
    RateLimitExhausted { retries: u32, body: String },

    #[error("http {status} for {url}: {body}")]
    HttpStatus { status: u16, url: String, body: String },

    #[error("unexpected response shape for {context}: {payload}")]
    UnexpectedShape { context: String, payload: String },
}

impl EtlError {
    pub fn unexpected_shape(context: impl Into<String>, payload: &serde_json::Value) -> Self {
        Self::UnexpectedShape {
            context: context.into(),
            payload: payload.to_string(),
        }
    }
}
