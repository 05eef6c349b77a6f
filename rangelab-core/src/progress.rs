//! Derived autograder progress and score submission payloads.
use serde::{Deserialize, Serialize};

use crate::scenario::ScenarioResource;
use crate::topic::Topic;

/// Sentinel returned when a scenario has no autograder records at all.
pub const NO_GRADERS_PERCENT: f64 = -1.0;

/// Sentinel consumers use for "autograder query not yet completed". Never
/// produced here: the consumer checks topic initialization first and
/// substitutes this value itself.
pub const UNINITIALIZED_PERCENT: f64 = -2.0;

/// Kind of learning activity a score belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Consoles,
}

/// Outcome of a single autograder, included in score submissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraderOutcome {
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub success: bool,
}

/// Aggregate task-completion counts for one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioScore {
    pub completed_tasks: u32,
    pub total_tasks: u32,
    /// True when every known task passed; trivially true with zero tasks.
    pub all_completed: bool,
    pub auto_grader_results: Vec<GraderOutcome>,
}

/// Identifies which piece of content a score belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreContent {
    pub uuid: String,
    pub name: String,
}

/// Complete payload handed to the score submission collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityScore {
    #[serde(rename = "activityType")]
    pub activity_kind: ActivityKind,
    #[serde(rename = "activityContent")]
    pub content: ScoreContent,
    #[serde(rename = "scoreData")]
    pub score: ScenarioScore,
}

/// Percent of autograders with a passing result, in `[0, 100]`, or
/// [`NO_GRADERS_PERCENT`] when the scenario has none.
#[must_use]
pub fn autograders_percent_complete(scenario: &ScenarioResource) -> f64 {
    let Some(graders) = scenario.topic_records(Topic::ResourceAutoGrader) else {
        return NO_GRADERS_PERCENT;
    };
    if graders.is_empty() {
        return NO_GRADERS_PERCENT;
    }
    let total = u32::try_from(graders.len()).unwrap_or(u32::MAX);
    let passed = u32::try_from(
        graders
            .values()
            .filter(|record| record.grader_passed())
            .count(),
    )
    .unwrap_or(u32::MAX);
    f64::from(passed) * 100.0 / f64::from(total)
}

/// Build the score submission for a scenario's current autograder state.
///
/// The content identifier falls back to the requesting activity id when the
/// scenario carries no static id of its own, so scores stay attributable on
/// systems the content was not authored on.
#[must_use]
pub fn build_activity_score(scenario: &ScenarioResource) -> ActivityScore {
    let mut outcomes: Vec<GraderOutcome> = scenario
        .topic_records(Topic::ResourceAutoGrader)
        .map(|graders| {
            graders
                .values()
                .map(|record| GraderOutcome {
                    uuid: record.uuid.clone(),
                    name: record.name.clone(),
                    success: record.grader_passed(),
                })
                .collect()
        })
        .unwrap_or_default();
    outcomes.sort_by(|a, b| a.uuid.cmp(&b.uuid));

    let total_tasks = u32::try_from(outcomes.len()).unwrap_or(u32::MAX);
    let completed_tasks =
        u32::try_from(outcomes.iter().filter(|o| o.success).count()).unwrap_or(u32::MAX);

    let content_uuid = if scenario.scenario_id.is_empty() {
        scenario.activity_id.clone()
    } else {
        scenario.scenario_id.clone()
    };

    ActivityScore {
        activity_kind: ActivityKind::Consoles,
        content: ScoreContent {
            uuid: content_uuid,
            name: scenario.scenario_name.clone(),
        },
        score: ScenarioScore {
            completed_tasks,
            total_tasks,
            all_completed: completed_tasks >= total_tasks,
            auto_grader_results: outcomes,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{GraderResult, ResourceRecord};

    fn grader(uuid: &str, success: bool) -> ResourceRecord {
        ResourceRecord {
            result: Some(GraderResult {
                success,
                ..GraderResult::default()
            }),
            ..ResourceRecord::new(uuid)
        }
    }

    fn scenario_with_graders(graders: Vec<ResourceRecord>) -> ScenarioResource {
        let mut scenario = ScenarioResource::new("sc-1", "Intro Lab", "d-42", "r-9", "act-1");
        for record in graders {
            scenario.apply_update(record, Topic::ResourceAutoGrader);
        }
        scenario
    }

    #[test]
    fn percent_complete_uses_no_graders_sentinel() {
        let scenario = scenario_with_graders(Vec::new());
        assert!((autograders_percent_complete(&scenario) - NO_GRADERS_PERCENT).abs() < f64::EPSILON);
    }

    #[test]
    fn percent_complete_counts_passing_graders() {
        let scenario = scenario_with_graders(vec![
            grader("g-1", true),
            grader("g-2", false),
            grader("g-3", true),
            grader("g-4", true),
        ]);
        let percent = autograders_percent_complete(&scenario);
        assert!((percent - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_task_score_reports_trivial_completion() {
        let scenario = scenario_with_graders(Vec::new());
        let score = build_activity_score(&scenario);
        assert_eq!(score.score.completed_tasks, 0);
        assert_eq!(score.score.total_tasks, 0);
        assert!(score.score.all_completed);
        assert_eq!(score.content.uuid, "sc-1");
    }

    #[test]
    fn content_uuid_falls_back_to_activity_id() {
        let mut scenario = ScenarioResource::new("", "Intro Lab", "d-42", "r-9", "act-1");
        scenario.apply_update(grader("g-1", true), Topic::ResourceAutoGrader);
        let score = build_activity_score(&scenario);
        assert_eq!(score.content.uuid, "act-1");
        assert_eq!(score.score.auto_grader_results.len(), 1);
    }

    #[test]
    fn outcomes_are_ordered_by_uuid() {
        let scenario = scenario_with_graders(vec![grader("g-2", false), grader("g-1", true)]);
        let score = build_activity_score(&scenario);
        let uuids: Vec<&str> = score
            .score
            .auto_grader_results
            .iter()
            .map(|o| o.uuid.as_str())
            .collect();
        assert_eq!(uuids, vec!["g-1", "g-2"]);
        assert_eq!(score.score.completed_tasks, 1);
        assert!(!score.score.all_completed);
    }
}
