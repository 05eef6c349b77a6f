//! Update stream categories published by the deployment backend.
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named category of resource update stream.
///
/// Each loaded scenario receives independent streams per topic: a bulk query
/// result when the stream is first read, then individual push events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Topic {
    /// The deployed scenario record itself, published once on resolution.
    Scenario,
    /// Virtual machines deployed for the scenario.
    #[serde(rename = "resourceVM")]
    ResourceVm,
    /// Containers deployed for the scenario.
    ResourceContainer,
    /// Consoles attached to a VM or container.
    ResourceConsole,
    /// Automated task-completion checkers feeding scoring.
    ResourceAutoGrader,
    /// Deployment package descriptors (VM and container specifications).
    ResourcePackage,
}

impl Topic {
    /// The four topics whose first completed query gates scenario readiness.
    /// Autograder results can keep arriving afterwards, but the topic itself
    /// still has to report in once.
    pub const RESOURCE_TOPICS: [Self; 4] = [
        Self::ResourceVm,
        Self::ResourceContainer,
        Self::ResourceConsole,
        Self::ResourceAutoGrader,
    ];

    /// Stable lowercase label used in logs and reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Scenario => "scenario",
            Self::ResourceVm => "vm",
            Self::ResourceContainer => "container",
            Self::ResourceConsole => "console",
            Self::ResourceAutoGrader => "autograder",
            Self::ResourcePackage => "package",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
