//! Rangelab Aggregation Core
//!
//! Platform-agnostic scenario resource aggregation for the Rangelab learning
//! content player. Ingests independently-arriving update streams (VMs,
//! containers, consoles, autograders, scenario metadata) for concurrently
//! loaded scenarios, merges them into consistent per-scenario views, derives
//! progress and completion signals, and fans out change notifications. No UI
//! or transport dependencies: transports feed records in through
//! [`ScenarioEngine::set_update`]/[`ScenarioEngine::set_updates`], and the
//! engine reaches the outside world only through the collaborator traits
//! defined here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod counters;
pub mod engine;
pub mod error;
pub mod notify;
pub mod progress;
pub mod record;
mod registry;
pub mod scenario;
pub mod topic;

// Re-export commonly used types
pub use counters::UpdateCounters;
pub use engine::ScenarioEngine;
pub use error::{ClientError, LoadError};
pub use notify::{ListenerRegistry, UpdateListener};
pub use progress::{
    ActivityKind, ActivityScore, GraderOutcome, NO_GRADERS_PERCENT, ScenarioScore, ScoreContent,
    UNINITIALIZED_PERCENT, autograders_percent_complete, build_activity_score,
};
pub use record::{GraderResult, ResourceRecord, SpecEntry};
pub use scenario::ScenarioResource;
pub use topic::Topic;

/// One range in the deployment inventory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeSummary {
    /// Range identifier; entries with an empty id are skipped during probing.
    #[serde(default)]
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Trait for abstracting the range/deployment inventory lookup.
///
/// Used only while resolving a named scenario to a running deployment. The
/// core probes ranges sequentially and tolerates individual lookup failures,
/// so implementations should surface errors rather than retry internally.
#[async_trait(?Send)]
pub trait RangeInventory {
    type Error: std::error::Error + Send + Sync + 'static;

    /// List every range the current session can see.
    ///
    /// # Errors
    ///
    /// Returns an error when the inventory cannot be reached at all; this
    /// aborts the resolution attempt.
    async fn list_ranges(&self) -> Result<Vec<RangeSummary>, Self::Error>;

    /// List deployed scenarios in one range matching a scenario name.
    ///
    /// # Errors
    ///
    /// Returns an error when this range's lookup fails; the core skips the
    /// range and keeps probing.
    async fn list_scenarios_by_range(
        &self,
        range_id: &str,
        scenario_name: &str,
    ) -> Result<Vec<ResourceRecord>, Self::Error>;
}

/// Trait for the score submission collaborator.
///
/// Fire-and-forget from the core's perspective: the engine hands over the
/// payload synchronously and consumes no result. Deduplication is the
/// implementation's concern; a redelivered autograder record triggers another
/// submission.
pub trait ScoreSink {
    fn submit(&self, score: ActivityScore);
}
