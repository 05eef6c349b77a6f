//! The aggregation engine: ingestion pipeline, lookups, and resolution flow.
use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::counters::UpdateCounters;
use crate::error::LoadError;
use crate::notify::UpdateListener;
use crate::progress::{self, ActivityScore, NO_GRADERS_PERCENT};
use crate::record::ResourceRecord;
use crate::registry::{RegistryState, ResolveKey};
use crate::scenario::ScenarioResource;
use crate::topic::Topic;
use crate::{RangeInventory, ScoreSink};

/// Side effects gathered while the state borrow is held and run after it is
/// released, so score sinks and listeners may re-enter the engine.
#[derive(Default)]
struct PendingEffects {
    score: Option<ActivityScore>,
    broadcast: Option<(Topic, Vec<ResourceRecord>, Vec<Rc<UpdateListener>>)>,
}

/// Central facade over all loaded scenarios.
///
/// Ingests heterogeneous update streams (query loads via [`Self::set_updates`],
/// push events via [`Self::set_update`]), merges them into per-scenario views,
/// and fans change notifications out to registered listeners. All mutation
/// entry points run synchronously to completion; only [`Self::load_scenario`]
/// suspends, and only while talking to the inventory collaborator.
pub struct ScenarioEngine<I, S>
where
    I: RangeInventory,
    S: ScoreSink,
{
    inventory: I,
    scores: S,
    state: RefCell<RegistryState>,
}

impl<I, S> ScenarioEngine<I, S>
where
    I: RangeInventory,
    S: ScoreSink,
{
    /// Create an engine with the provided inventory and score collaborators.
    pub fn new(inventory: I, scores: S) -> Self {
        Self {
            inventory,
            scores,
            state: RefCell::new(RegistryState::default()),
        }
    }

    // ---- Lookups (never fail; absent state reads as empty) ----

    /// Scenario by static id, with a name fallback when the id finds nothing.
    #[must_use]
    pub fn get_scenario(
        &self,
        scenario_id: &str,
        scenario_name: Option<&str>,
    ) -> Option<ScenarioResource> {
        self.state
            .borrow()
            .find_scenario(scenario_id, scenario_name)
            .cloned()
    }

    /// Scenario by deployed-instance id, exact match only.
    #[must_use]
    pub fn get_scenario_by_deployed_id(
        &self,
        deployed_scenario_id: &str,
    ) -> Option<ScenarioResource> {
        self.state
            .borrow()
            .find_by_deployed_id(deployed_scenario_id)
            .cloned()
    }

    /// Records known for a scenario's topic.
    ///
    /// Without a topic this returns an empty map unconditionally - a quirk
    /// kept from the observed production behavior; callers read per topic
    /// and reach single records through [`Self::get_update`].
    #[must_use]
    pub fn get_updates(
        &self,
        deployed_scenario_id: &str,
        topic: Option<Topic>,
    ) -> HashMap<String, ResourceRecord> {
        let Some(topic) = topic else {
            return HashMap::new();
        };
        let state = self.state.borrow();
        let Some(scenario) = state.find_by_deployed_id(deployed_scenario_id) else {
            log::warn!("no scenario loaded for deployed id {deployed_scenario_id}");
            return HashMap::new();
        };
        scenario.records_for(topic)
    }

    /// Latest record with the given uuid across all of a scenario's topics.
    #[must_use]
    pub fn get_update(&self, deployed_scenario_id: &str, uuid: &str) -> Option<ResourceRecord> {
        self.state
            .borrow()
            .find_by_deployed_id(deployed_scenario_id)
            .and_then(|scenario| scenario.record(uuid).cloned())
    }

    /// Consoles owned by the given VM or container; empty when the scenario
    /// or the owner key is unknown.
    #[must_use]
    pub fn get_consoles_by_owner(
        &self,
        deployed_scenario_id: &str,
        owner_uuid: &str,
    ) -> Vec<ResourceRecord> {
        self.state
            .borrow()
            .find_by_deployed_id(deployed_scenario_id)
            .map(|scenario| scenario.consoles_by_owner(owner_uuid).to_vec())
            .unwrap_or_default()
    }

    /// Whether a scenario's topic has completed its first query.
    #[must_use]
    pub fn get_initialized(&self, deployed_scenario_id: &str, topic: Topic) -> bool {
        self.state
            .borrow()
            .find_by_deployed_id(deployed_scenario_id)
            .is_some_and(|scenario| scenario.is_initialized(topic))
    }

    /// Whether any autograder records are known for the scenario.
    #[must_use]
    pub fn has_autograders(&self, deployed_scenario_id: &str) -> bool {
        !self
            .get_updates(deployed_scenario_id, Some(Topic::ResourceAutoGrader))
            .is_empty()
    }

    /// Percent of the scenario's autograders with a passing result, or
    /// [`NO_GRADERS_PERCENT`] when it has none (or is unknown).
    #[must_use]
    pub fn autograders_percent_complete(&self, deployed_scenario_id: &str) -> f64 {
        self.state
            .borrow()
            .find_by_deployed_id(deployed_scenario_id)
            .map_or(NO_GRADERS_PERCENT, progress::autograders_percent_complete)
    }

    /// Instant a record was last first seen under the topic.
    #[must_use]
    pub fn last_added(
        &self,
        deployed_scenario_id: &str,
        topic: Topic,
    ) -> Option<DateTime<Utc>> {
        self.state
            .borrow()
            .find_by_deployed_id(deployed_scenario_id)
            .and_then(|scenario| scenario.last_added(topic))
    }

    /// Snapshot of the per-topic change counters.
    #[must_use]
    pub fn counters(&self) -> UpdateCounters {
        self.state.borrow().counters
    }

    /// True once any loaded scenario has all resource topics initialized.
    #[must_use]
    pub fn is_context_initialized(&self) -> bool {
        self.state.borrow().context_initialized
    }

    // ---- Listeners ----

    /// Register a named listener; re-registering a key replaces its callback.
    pub fn add_listener(
        &self,
        key: &str,
        listener: impl Fn(Topic, &[ResourceRecord]) + 'static,
    ) {
        self.state
            .borrow_mut()
            .listeners
            .add(key, Rc::new(listener));
    }

    pub fn remove_listener(&self, key: &str) {
        self.state.borrow_mut().listeners.remove(key);
    }

    // ---- Ingestion ----

    /// Apply one pushed record to a scenario's topic.
    ///
    /// Unknown deployed ids log and no-op: push callbacks have nowhere
    /// useful to propagate an error to. With `skip_counter` false the topic
    /// counter is bumped and listeners hear about the single record. An
    /// autograder record arriving after that topic already initialized
    /// re-submits scores immediately.
    pub fn set_update(
        &self,
        deployed_scenario_id: &str,
        record: ResourceRecord,
        topic: Topic,
        skip_counter: bool,
    ) {
        let effects = self.apply_record(deployed_scenario_id, record, topic, skip_counter);
        self.run_effects(effects);
    }

    /// Apply one completed query load for a scenario's topic.
    ///
    /// Every record goes through the single-record path, then the topic is
    /// marked initialized even when the batch was empty. A first autograder
    /// load with zero records still reports trivially-complete scores. Once
    /// all resource topics of a scenario are initialized the global context
    /// flag latches on.
    pub fn set_updates(
        &self,
        deployed_scenario_id: &str,
        records: Vec<ResourceRecord>,
        topic: Topic,
        skip_counter: bool,
    ) {
        let batch_was_empty = records.is_empty();
        for record in records {
            self.set_update(deployed_scenario_id, record, topic, skip_counter);
        }

        let mut score = None;
        {
            let mut state = self.state.borrow_mut();
            let mut all_resources_ready = false;
            if let Some(scenario) = state.find_by_deployed_id_mut(deployed_scenario_id) {
                if topic == Topic::ResourceAutoGrader
                    && !scenario.is_initialized(topic)
                    && batch_was_empty
                {
                    score = Some(progress::build_activity_score(scenario));
                }
                scenario.mark_initialized(topic);
                all_resources_ready = scenario.all_resources_initialized();
            } else {
                log::warn!(
                    "dropping {topic} load for unknown deployed id {deployed_scenario_id}"
                );
            }
            if all_resources_ready {
                state.context_initialized = true;
            }
            if !skip_counter {
                state.counters.bump(topic);
            }
        }
        if let Some(score) = score {
            self.scores.submit(score);
        }
    }

    fn apply_record(
        &self,
        deployed_scenario_id: &str,
        record: ResourceRecord,
        topic: Topic,
        skip_counter: bool,
    ) -> PendingEffects {
        let mut effects = PendingEffects::default();
        let mut state = self.state.borrow_mut();
        let Some(scenario) = state.find_by_deployed_id_mut(deployed_scenario_id) else {
            log::warn!("dropping {topic} update for unknown deployed id {deployed_scenario_id}");
            return effects;
        };

        let graders_were_initialized = scenario.is_initialized(Topic::ResourceAutoGrader);
        scenario.apply_update(record.clone(), topic);

        if topic == Topic::ResourceAutoGrader && graders_were_initialized {
            effects.score = Some(progress::build_activity_score(scenario));
        }
        if !skip_counter {
            state.counters.bump(topic);
            if !state.listeners.is_empty() {
                effects.broadcast = Some((topic, vec![record], state.listeners.snapshot()));
            }
        }
        effects
    }

    fn run_effects(&self, effects: PendingEffects) {
        if let Some(score) = effects.score {
            self.scores.submit(score);
        }
        if let Some((topic, records, listeners)) = effects.broadcast {
            for listener in listeners {
                listener(topic, &records);
            }
        }
    }

    // ---- Resolution ----

    /// Resolve a named scenario against the deployment inventory and create
    /// its resource entry.
    ///
    /// No-op when the scenario is already loaded or a resolution for the
    /// same `(scenario_id, scenario_name)` pair is in flight. Ranges are
    /// probed sequentially and individual probe failures are skipped, so one
    /// failing range cannot abort the whole search. On success the deployment
    /// record is published under [`Topic::Scenario`] through the batch path,
    /// which also marks that topic initialized.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when the range listing itself fails, when no
    /// range holds a matching deployment, or when the match carries no
    /// usable identifier. A later call with the same arguments retries from
    /// scratch; no failure state is cached.
    pub async fn load_scenario(
        &self,
        scenario_id: &str,
        scenario_name: &str,
        activity_id: &str,
    ) -> Result<(), LoadError> {
        if self.get_scenario(scenario_id, Some(scenario_name)).is_some() {
            return Ok(());
        }

        let key: ResolveKey = (scenario_id.to_string(), scenario_name.to_string());
        if !self.state.borrow_mut().resolving.insert(key.clone()) {
            log::debug!("resolution already in flight for scenario {scenario_name:?}");
            return Ok(());
        }
        let _guard = ResolveGuard {
            state: &self.state,
            key,
        };

        self.resolve_and_store(scenario_id, scenario_name, activity_id)
            .await
    }

    async fn resolve_and_store(
        &self,
        scenario_id: &str,
        scenario_name: &str,
        activity_id: &str,
    ) -> Result<(), LoadError> {
        let ranges =
            self.inventory
                .list_ranges()
                .await
                .map_err(|source| LoadError::RangeListing {
                    scenario_name: scenario_name.to_string(),
                    source: Box::new(source),
                })?;

        let mut matched = None;
        for range in &ranges {
            if range.uuid.is_empty() {
                continue;
            }
            match self
                .inventory
                .list_scenarios_by_range(&range.uuid, scenario_name)
                .await
            {
                Ok(deployments) if !deployments.is_empty() => {
                    matched = Some((range.uuid.clone(), deployments));
                    break;
                }
                Ok(_) => {}
                Err(err) => {
                    // One bad range must not abort the search.
                    log::debug!("skipping range {}: scenario lookup failed: {err}", range.uuid);
                }
            }
        }

        let Some((range_id, deployments)) = matched else {
            log::warn!("no deployed scenario named {scenario_name:?} in any range");
            return Err(LoadError::ScenarioNotFound {
                scenario_name: scenario_name.to_string(),
            });
        };
        let Some(deployment) = deployments.into_iter().next() else {
            return Err(LoadError::ScenarioNotFound {
                scenario_name: scenario_name.to_string(),
            });
        };
        if deployment.uuid.is_empty() {
            return Err(LoadError::MissingDeployedId {
                scenario_name: scenario_name.to_string(),
                range_id,
            });
        }

        let deployed_scenario_id = deployment.uuid.clone();
        {
            let mut state = self.state.borrow_mut();
            // Re-checked under the borrow in case a push beat us here.
            if state.find_by_deployed_id(&deployed_scenario_id).is_none() {
                state.scenarios.push(ScenarioResource::new(
                    scenario_id,
                    scenario_name,
                    &deployed_scenario_id,
                    &range_id,
                    activity_id,
                ));
            }
        }
        log::info!(
            "scenario {scenario_name:?} resolved to deployment {deployed_scenario_id} in range {range_id}"
        );
        self.set_updates(
            &deployed_scenario_id,
            vec![deployment],
            Topic::Scenario,
            false,
        );
        Ok(())
    }
}

/// Clears the in-flight marker even when the resolution future is dropped.
struct ResolveGuard<'a> {
    state: &'a RefCell<RegistryState>,
    key: ResolveKey,
}

impl Drop for ResolveGuard<'_> {
    fn drop(&mut self) {
        self.state.borrow_mut().resolving.remove(&self.key);
    }
}
