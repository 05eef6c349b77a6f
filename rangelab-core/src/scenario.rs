//! Per-scenario resource state: topic stores, initialization flags, and the
//! console owner index.
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};

use crate::record::ResourceRecord;
use crate::topic::Topic;

/// All known state for one resolved scenario.
///
/// Identity fields are fixed at creation; everything else accumulates as
/// query loads and push events arrive. Topic initialization is one-way: once
/// a topic's first query completes the flag never reverts.
#[derive(Debug, Clone, Default)]
pub struct ScenarioResource {
    /// Static course-defined scenario identifier.
    pub scenario_id: String,
    /// Human-readable scenario name, used for cross-system resolution.
    pub scenario_name: String,
    /// Runtime identifier of the deployed instance.
    pub deployed_scenario_id: String,
    /// Range the deployment was found in.
    pub range_id: String,
    /// Identifier of the learning activity that requested the scenario.
    pub activity_id: String,
    initialized: BTreeSet<Topic>,
    updates: HashMap<String, ResourceRecord>,
    updates_by_topic: HashMap<Topic, HashMap<String, ResourceRecord>>,
    owned_consoles: HashMap<String, Vec<ResourceRecord>>,
    last_added: HashMap<Topic, DateTime<Utc>>,
}

impl ScenarioResource {
    #[must_use]
    pub fn new(
        scenario_id: impl Into<String>,
        scenario_name: impl Into<String>,
        deployed_scenario_id: impl Into<String>,
        range_id: impl Into<String>,
        activity_id: impl Into<String>,
    ) -> Self {
        Self {
            scenario_id: scenario_id.into(),
            scenario_name: scenario_name.into(),
            deployed_scenario_id: deployed_scenario_id.into(),
            range_id: range_id.into(),
            activity_id: activity_id.into(),
            ..Self::default()
        }
    }

    /// Store one record under its topic, maintaining the owner index and the
    /// last-added instant. Package records get their specification lists
    /// sorted before storage so display order is arrival-independent.
    pub fn apply_update(&mut self, mut record: ResourceRecord, topic: Topic) {
        if topic == Topic::ResourcePackage {
            record.sort_specifications();
        }
        if topic == Topic::ResourceConsole {
            self.index_console(&record);
        }

        let by_topic = self.updates_by_topic.entry(topic).or_default();
        if !by_topic.contains_key(&record.uuid) {
            self.last_added.insert(topic, Utc::now());
        }
        by_topic.insert(record.uuid.clone(), record.clone());
        self.updates.insert(record.uuid.clone(), record);
    }

    /// Mark a topic's first query as completed. Idempotent; there is no way
    /// to clear the flag again.
    pub fn mark_initialized(&mut self, topic: Topic) {
        self.initialized.insert(topic);
    }

    #[must_use]
    pub fn is_initialized(&self, topic: Topic) -> bool {
        self.initialized.contains(&topic)
    }

    /// Whether every resource topic has completed its first query.
    #[must_use]
    pub fn all_resources_initialized(&self) -> bool {
        Topic::RESOURCE_TOPICS
            .iter()
            .all(|topic| self.initialized.contains(topic))
    }

    /// Records currently known for a topic, empty when nothing has arrived.
    #[must_use]
    pub fn records_for(&self, topic: Topic) -> HashMap<String, ResourceRecord> {
        self.updates_by_topic
            .get(&topic)
            .cloned()
            .unwrap_or_default()
    }

    /// Borrowing variant of [`Self::records_for`] for internal aggregation.
    #[must_use]
    pub(crate) fn topic_records(&self, topic: Topic) -> Option<&HashMap<String, ResourceRecord>> {
        self.updates_by_topic.get(&topic)
    }

    /// Latest record with the given uuid, regardless of topic.
    #[must_use]
    pub fn record(&self, uuid: &str) -> Option<&ResourceRecord> {
        self.updates.get(uuid)
    }

    /// Consoles owned by the given VM or container, in first-seen order.
    #[must_use]
    pub fn consoles_by_owner(&self, owner_uuid: &str) -> &[ResourceRecord] {
        self.owned_consoles
            .get(owner_uuid)
            .map_or(&[], Vec::as_slice)
    }

    /// Instant a record uuid was last first seen under the topic, if any
    /// record has arrived at all.
    #[must_use]
    pub fn last_added(&self, topic: Topic) -> Option<DateTime<Utc>> {
        self.last_added.get(&topic).copied()
    }

    /// Maintain the owner -> consoles index. Re-delivery of a known console
    /// uuid merges fields in place rather than appending, so each owner lists
    /// a console at most once.
    fn index_console(&mut self, console: &ResourceRecord) {
        let Some(owner_key) = console.owner_key() else {
            return;
        };
        let owned = self.owned_consoles.entry(owner_key.to_string()).or_default();
        match owned.iter_mut().find(|entry| entry.uuid == console.uuid) {
            Some(existing) => existing.merge_from(console),
            None => owned.push(console.clone()),
        }
    }
}
