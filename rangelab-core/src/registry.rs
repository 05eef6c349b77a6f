//! Registry of all currently-loaded scenarios plus cross-scenario state.
use std::collections::BTreeSet;

use crate::counters::UpdateCounters;
use crate::notify::ListenerRegistry;
use crate::scenario::ScenarioResource;

/// Key identifying one in-flight resolution attempt.
pub(crate) type ResolveKey = (String, String);

/// Mutable core state shared by every engine entry point.
///
/// Scenarios accumulate for the lifetime of the session; the player never
/// unloads one, and the concurrently-active set stays small (bounded by team
/// size), so a flat vector with linear lookup is enough.
#[derive(Default)]
pub(crate) struct RegistryState {
    pub scenarios: Vec<ScenarioResource>,
    /// `(scenario_id, scenario_name)` pairs with a resolution in flight,
    /// guarding against double creation from near-simultaneous loads.
    pub resolving: BTreeSet<ResolveKey>,
    pub counters: UpdateCounters,
    /// Set once any loaded scenario has all resource topics initialized;
    /// never cleared (single-team usage pattern).
    pub context_initialized: bool,
    pub listeners: ListenerRegistry,
}

impl RegistryState {
    /// Lookup by static scenario id, falling back to a name match when the
    /// id finds nothing. The fallback covers content played back on a
    /// different backing system than it was authored on.
    pub fn find_scenario(
        &self,
        scenario_id: &str,
        scenario_name: Option<&str>,
    ) -> Option<&ScenarioResource> {
        let by_id = self
            .scenarios
            .iter()
            .find(|s| s.scenario_id == scenario_id);
        if by_id.is_some() {
            return by_id;
        }
        scenario_name.and_then(|name| {
            self.scenarios.iter().find(|s| s.scenario_name == name)
        })
    }

    pub fn find_by_deployed_id(&self, deployed_scenario_id: &str) -> Option<&ScenarioResource> {
        self.scenarios
            .iter()
            .find(|s| s.deployed_scenario_id == deployed_scenario_id)
    }

    pub fn find_by_deployed_id_mut(
        &mut self,
        deployed_scenario_id: &str,
    ) -> Option<&mut ScenarioResource> {
        self.scenarios
            .iter_mut()
            .find(|s| s.deployed_scenario_id == deployed_scenario_id)
    }
}
