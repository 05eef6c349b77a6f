//! Errors surfaced by the scenario resolution flow.
//!
//! Lookup APIs never fail; they degrade to `None` or empty collections so a
//! consumer can render a loading/empty state. Only the asynchronous load path
//! returns errors, and only after every tolerant fallback is exhausted.
use thiserror::Error;

/// Boxed transport error carried as the cause of a failed resolution.
pub type ClientError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum LoadError {
    /// The range listing itself failed, so no probe could even start.
    #[error("could not list ranges while resolving scenario {scenario_name:?}")]
    RangeListing {
        scenario_name: String,
        #[source]
        source: ClientError,
    },
    /// Every range was probed (failures skipped) and none held a deployment
    /// with the requested name.
    #[error("no deployed scenario named {scenario_name:?} was found in any range")]
    ScenarioNotFound { scenario_name: String },
    /// A deployment matched but carries no usable runtime identifier.
    #[error("deployed scenario {scenario_name:?} in range {range_id} has no usable identifier")]
    MissingDeployedId {
        scenario_name: String,
        range_id: String,
    },
}
