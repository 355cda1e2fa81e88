use std::sync::Arc;

/// Represents a result type for operations in the campaign engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the campaign engine.
///
/// Evaluation itself never fails: malformed predicate data and unresolvable schedules make the
/// affected campaign not match. Only the collaborators at the edges (the campaign repository and
/// campaign decoding) produce errors.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// The campaign repository failed to run the pre-filter query.
    #[error("campaign repository failed: {0}")]
    // Repository errors are arbitrary and not clonable, so we're wrapping them in an Arc.
    Repository(Arc<dyn std::error::Error + Send + Sync>),

    /// The campaign set document could not be parsed at all.
    #[error("error parsing campaign set")]
    CampaignParse(#[source] Arc<serde_json::Error>),
}

impl Error {
    /// Wrap an arbitrary repository failure.
    pub fn repository(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Repository(Arc::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::CampaignParse(Arc::new(value))
    }
}
