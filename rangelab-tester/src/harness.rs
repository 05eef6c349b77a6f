//! Mock collaborators and assertion bookkeeping for scripted runs.
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::rc::Rc;

use rangelab_core::{ActivityScore, RangeInventory, RangeSummary, ResourceRecord, ScoreSink};

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct HarnessError(pub String);

/// Inventory backed by in-memory tables, with optional per-range failures so
/// scripted runs can exercise the tolerant probe loop.
#[derive(Default)]
pub struct StaticInventory {
    ranges: Vec<RangeSummary>,
    deployments: HashMap<String, Vec<ResourceRecord>>,
    failing_ranges: HashSet<String>,
    probes: Rc<RefCell<Vec<String>>>,
}

impl StaticInventory {
    /// Inventory with one range holding one deployment.
    pub fn single(range_id: &str, deployed_scenario_id: &str) -> Self {
        let mut inventory = Self::default();
        inventory.add_range(range_id, vec![ResourceRecord::new(deployed_scenario_id)]);
        inventory
    }

    pub fn add_range(&mut self, range_id: &str, deployments: Vec<ResourceRecord>) {
        self.ranges.push(RangeSummary {
            uuid: range_id.to_string(),
            name: None,
        });
        self.deployments.insert(range_id.to_string(), deployments);
    }

    pub fn add_failing_range(&mut self, range_id: &str) {
        self.ranges.push(RangeSummary {
            uuid: range_id.to_string(),
            name: None,
        });
        self.failing_ranges.insert(range_id.to_string());
    }

    /// Handle to the ranges probed so far, in order.
    pub fn probe_log(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.probes)
    }
}

#[async_trait::async_trait(?Send)]
impl RangeInventory for StaticInventory {
    type Error = HarnessError;

    async fn list_ranges(&self) -> Result<Vec<RangeSummary>, Self::Error> {
        Ok(self.ranges.clone())
    }

    async fn list_scenarios_by_range(
        &self,
        range_id: &str,
        _scenario_name: &str,
    ) -> Result<Vec<ResourceRecord>, Self::Error> {
        self.probes.borrow_mut().push(range_id.to_string());
        if self.failing_ranges.contains(range_id) {
            return Err(HarnessError(format!("range {range_id} unreachable")));
        }
        Ok(self.deployments.get(range_id).cloned().unwrap_or_default())
    }
}

/// Score sink that records every submission for later assertions.
#[derive(Clone, Default)]
pub struct RecordingScoreSink {
    submissions: Rc<RefCell<Vec<ActivityScore>>>,
}

impl RecordingScoreSink {
    pub fn submissions(&self) -> Rc<RefCell<Vec<ActivityScore>>> {
        Rc::clone(&self.submissions)
    }
}

impl ScoreSink for RecordingScoreSink {
    fn submit(&self, score: ActivityScore) {
        self.submissions.borrow_mut().push(score);
    }
}

/// Collects human-readable failures instead of panicking, so one scripted
/// run can report everything that went wrong.
#[derive(Default)]
pub struct Check {
    failures: Vec<String>,
}

impl Check {
    pub fn expect(&mut self, condition: bool, detail: impl Into<String>) {
        if !condition {
            self.failures.push(detail.into());
        }
    }

    pub fn expect_eq<T: PartialEq + Debug>(&mut self, actual: T, expected: T, what: &str) {
        if actual != expected {
            self.failures
                .push(format!("{what}: expected {expected:?}, got {actual:?}"));
        }
    }

    pub fn into_failures(self) -> Vec<String> {
        self.failures
    }
}
