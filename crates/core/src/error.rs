/// Result alias that carries the custom [`AvatarError`] type.
pub type Result<T> = std::result::Result<T, AvatarError>;

/// Common error type for the core crate.
///
/// Nothing on the per-frame path returns this; animation anomalies degrade to
/// an idle face instead. It covers configuration, track parsing and the
/// command line driver.
#[derive(Debug, thiserror::Error)]
pub enum AvatarError {
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration or viseme track JSON could not be decoded.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    /// A configuration value is outside the range the generators accept.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// A blend shape name that is not part of the closed shape set.
    #[error("unknown blend shape `{0}`")]
    UnknownBlendShape(String),
}
