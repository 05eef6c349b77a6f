//! Per-topic change counters consumed as render-invalidation tokens.
use crate::topic::Topic;

/// Independent monotonic counters, one per topic family.
///
/// Consumers only diff these against the value they saw last; the absolute
/// numbers carry no meaning. Package updates have no counter of their own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateCounters {
    pub auto_grader: u64,
    pub console: u64,
    pub container: u64,
    pub scenario: u64,
    pub vm: u64,
}

impl UpdateCounters {
    /// Increment the counter matching the topic, if the topic has one.
    pub(crate) const fn bump(&mut self, topic: Topic) {
        match topic {
            Topic::Scenario => self.scenario += 1,
            Topic::ResourceVm => self.vm += 1,
            Topic::ResourceContainer => self.container += 1,
            Topic::ResourceConsole => self.console += 1,
            Topic::ResourceAutoGrader => self.auto_grader += 1,
            Topic::ResourcePackage => {}
        }
    }

    /// Counter value for a topic, `None` for topics without one.
    #[must_use]
    pub const fn for_topic(self, topic: Topic) -> Option<u64> {
        match topic {
            Topic::Scenario => Some(self.scenario),
            Topic::ResourceVm => Some(self.vm),
            Topic::ResourceContainer => Some(self.container),
            Topic::ResourceConsole => Some(self.console),
            Topic::ResourceAutoGrader => Some(self.auto_grader),
            Topic::ResourcePackage => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_independent() {
        let mut counters = UpdateCounters::default();
        counters.bump(Topic::ResourceVm);
        counters.bump(Topic::ResourceVm);
        counters.bump(Topic::ResourceConsole);
        assert_eq!(counters.vm, 2);
        assert_eq!(counters.console, 1);
        assert_eq!(counters.container, 0);
        assert_eq!(counters.for_topic(Topic::ResourceVm), Some(2));
    }

    #[test]
    fn package_topic_has_no_counter() {
        let mut counters = UpdateCounters::default();
        counters.bump(Topic::ResourcePackage);
        assert_eq!(counters, UpdateCounters::default());
        assert_eq!(counters.for_topic(Topic::ResourcePackage), None);
    }
}
