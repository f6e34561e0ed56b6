use thiserror::Error;

/// Failures talking to classification and knowledge-base services.
///
/// Enrichers turn these into sentinel labels; they never end a run.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response status: {status} at {url}")]
    Status { status: u16, url: String },

    #[error("Still rate limited after {attempts} attempts at {url}")]
    RateLimited { attempts: u32, url: String },

    /// Response body was not in the expected shape
    #[error("Unexpected response data: {0}")]
    Data(String),
}
