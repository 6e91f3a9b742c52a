#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("page info must be a JSON object")]
    NotAnObject,

    #[error("malformed page info: {0}")]
    Structural(#[from] serde_json::Error),

    /// Scoped to one model entry: the filter drops that entry and logs this
    /// error, so it never fails a whole page.
    #[error("invalid appliesTo pattern `{pattern}` for model {wid}: {source}")]
    InvalidPattern {
        wid: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
