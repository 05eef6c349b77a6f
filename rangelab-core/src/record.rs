//! Resource records delivered by query loads and push subscriptions.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result reported by an autograder run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraderResult {
    /// Whether the graded task passed. Anything other than an explicit
    /// `true` on the wire counts as not passed.
    #[serde(default)]
    pub success: bool,
    /// Grader-specific detail fields (messages, timestamps, raw output).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One VM or container specification inside a deployment package.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecEntry {
    pub uuid: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single record from any topic stream.
///
/// The backend delivers heterogeneous objects; the fields the core reads are
/// typed here and everything else rides along in `extra` so consumers can
/// still render transport fields the core does not interpret.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    /// Record identity, unique within its topic.
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Owning VM for console records.
    #[serde(default, rename = "rangeVM", skip_serializing_if = "Option::is_none")]
    pub range_vm: Option<String>,
    /// Owning container for console records. Takes precedence over the VM.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_container: Option<String>,
    /// Latest autograder result, if this record is a grader.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<GraderResult>,
    /// VM specifications of a deployment package record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_specifications: Option<Vec<SpecEntry>>,
    /// Container specifications of a deployment package record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_specifications: Option<Vec<SpecEntry>>,
    /// Uninterpreted transport fields, preserved across merges.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResourceRecord {
    /// Create a bare record with only its identity set.
    #[must_use]
    pub fn new(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            ..Self::default()
        }
    }

    /// Owner key for console grouping: the container when set, otherwise the
    /// VM. Records with neither are not indexed by owner.
    #[must_use]
    pub fn owner_key(&self) -> Option<&str> {
        self.range_container
            .as_deref()
            .or(self.range_vm.as_deref())
    }

    /// Whether this record carries a passing grader result.
    #[must_use]
    pub fn grader_passed(&self) -> bool {
        self.result.as_ref().is_some_and(|r| r.success)
    }

    /// Shallow field merge: every field the newer record carries replaces the
    /// stored one, fields it omits keep their previous value. Unknown fields
    /// merge key-wise the same way.
    pub fn merge_from(&mut self, newer: &Self) {
        if newer.name.is_some() {
            self.name = newer.name.clone();
        }
        if newer.range_vm.is_some() {
            self.range_vm = newer.range_vm.clone();
        }
        if newer.range_container.is_some() {
            self.range_container = newer.range_container.clone();
        }
        if newer.result.is_some() {
            self.result = newer.result.clone();
        }
        if newer.vm_specifications.is_some() {
            self.vm_specifications = newer.vm_specifications.clone();
        }
        if newer.container_specifications.is_some() {
            self.container_specifications = newer.container_specifications.clone();
        }
        for (key, value) in &newer.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }

    /// Stable-sort package specification lists by uuid so display order does
    /// not depend on arrival order. Single-entry lists are left untouched.
    pub fn sort_specifications(&mut self) {
        if let Some(specs) = self.vm_specifications.as_mut()
            && specs.len() > 1
        {
            specs.sort_by(|a, b| a.uuid.cmp(&b.uuid));
        }
        if let Some(specs) = self.container_specifications.as_mut()
            && specs.len() > 1
        {
            specs.sort_by(|a, b| a.uuid.cmp(&b.uuid));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn console(uuid: &str, vm: Option<&str>, container: Option<&str>) -> ResourceRecord {
        ResourceRecord {
            range_vm: vm.map(str::to_string),
            range_container: container.map(str::to_string),
            ..ResourceRecord::new(uuid)
        }
    }

    #[test]
    fn owner_key_prefers_container_over_vm() {
        let both = console("c-1", Some("vm-1"), Some("ct-1"));
        assert_eq!(both.owner_key(), Some("ct-1"));

        let vm_only = console("c-2", Some("vm-1"), None);
        assert_eq!(vm_only.owner_key(), Some("vm-1"));

        assert_eq!(console("c-3", None, None).owner_key(), None);
    }

    #[test]
    fn merge_keeps_omitted_fields_and_overwrites_present_ones() {
        let mut stored = console("c-1", Some("vm-1"), None);
        stored.name = Some("serial".into());
        stored.extra.insert("state".into(), json!("starting"));

        let mut delta = ResourceRecord::new("c-1");
        delta.extra.insert("state".into(), json!("running"));
        delta.extra.insert("port".into(), json!(5901));

        stored.merge_from(&delta);
        assert_eq!(stored.name.as_deref(), Some("serial"));
        assert_eq!(stored.range_vm.as_deref(), Some("vm-1"));
        assert_eq!(stored.extra["state"], json!("running"));
        assert_eq!(stored.extra["port"], json!(5901));
    }

    #[test]
    fn specification_lists_sort_by_uuid() {
        let mut package = ResourceRecord::new("pkg-1");
        package.vm_specifications = Some(vec![
            SpecEntry {
                uuid: "b".into(),
                ..SpecEntry::default()
            },
            SpecEntry {
                uuid: "a".into(),
                ..SpecEntry::default()
            },
        ]);
        package.sort_specifications();
        let specs = package.vm_specifications.unwrap();
        assert_eq!(specs[0].uuid, "a");
        assert_eq!(specs[1].uuid, "b");
    }

    #[test]
    fn grader_success_requires_explicit_true() {
        let mut grader = ResourceRecord::new("g-1");
        assert!(!grader.grader_passed());
        grader.result = Some(GraderResult::default());
        assert!(!grader.grader_passed());
        grader.result = Some(GraderResult {
            success: true,
            extra: Map::new(),
        });
        assert!(grader.grader_passed());
    }

    #[test]
    fn unknown_wire_fields_round_trip_through_extra() {
        let raw = json!({
            "uuid": "vm-7",
            "rangeVM": "owner-1",
            "powerState": "on"
        });
        let record: ResourceRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(record.range_vm.as_deref(), Some("owner-1"));
        assert_eq!(record.extra["powerState"], json!("on"));
    }
}
