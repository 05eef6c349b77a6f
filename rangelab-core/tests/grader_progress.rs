//! Autograder aggregation: percent complete, score submission triggers, and
//! the duplicate-delivery resubmission hazard.
use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use rangelab_core::{
    ActivityScore, GraderResult, NO_GRADERS_PERCENT, RangeInventory, RangeSummary, ResourceRecord,
    ScenarioEngine, ScoreSink, Topic,
};

struct OneRangeInventory;

#[async_trait::async_trait(?Send)]
impl RangeInventory for OneRangeInventory {
    type Error = Infallible;

    async fn list_ranges(&self) -> Result<Vec<RangeSummary>, Self::Error> {
        Ok(vec![RangeSummary {
            uuid: "r-9".into(),
            name: None,
        }])
    }

    async fn list_scenarios_by_range(
        &self,
        _range_id: &str,
        _scenario_name: &str,
    ) -> Result<Vec<ResourceRecord>, Self::Error> {
        Ok(vec![ResourceRecord::new("d-42")])
    }
}

#[derive(Clone, Default)]
struct RecordingSink {
    scores: Rc<RefCell<Vec<ActivityScore>>>,
}

impl ScoreSink for RecordingSink {
    fn submit(&self, score: ActivityScore) {
        self.scores.borrow_mut().push(score);
    }
}

async fn engine_with_scenario() -> (
    ScenarioEngine<OneRangeInventory, RecordingSink>,
    Rc<RefCell<Vec<ActivityScore>>>,
) {
    let sink = RecordingSink::default();
    let scores = Rc::clone(&sink.scores);
    let engine = ScenarioEngine::new(OneRangeInventory, sink);
    engine
        .load_scenario("sc-1", "Intro Lab", "act-1")
        .await
        .unwrap();
    (engine, scores)
}

fn grader(uuid: &str, success: bool) -> ResourceRecord {
    ResourceRecord {
        result: Some(GraderResult {
            success,
            ..GraderResult::default()
        }),
        ..ResourceRecord::new(uuid)
    }
}

#[tokio::test]
async fn percent_complete_tracks_passing_share() {
    let (engine, _scores) = engine_with_scenario().await;
    assert!((engine.autograders_percent_complete("d-42") - NO_GRADERS_PERCENT).abs() < f64::EPSILON);
    assert!(!engine.has_autograders("d-42"));

    engine.set_updates(
        "d-42",
        vec![grader("g-1", true), grader("g-2", false)],
        Topic::ResourceAutoGrader,
        true,
    );
    assert!(engine.has_autograders("d-42"));
    let percent = engine.autograders_percent_complete("d-42");
    assert!((percent - 50.0).abs() < f64::EPSILON);

    // A grader flipping to success moves the percentage.
    engine.set_update("d-42", grader("g-2", true), Topic::ResourceAutoGrader, true);
    let percent = engine.autograders_percent_complete("d-42");
    assert!((percent - 100.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn empty_first_load_submits_trivial_completion_once() {
    let (engine, scores) = engine_with_scenario().await;
    engine.set_updates("d-42", Vec::new(), Topic::ResourceAutoGrader, true);

    let submitted = scores.borrow();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].score.total_tasks, 0);
    assert!(submitted[0].score.all_completed);
}

#[tokio::test]
async fn repeated_empty_loads_do_not_resubmit() {
    let (engine, scores) = engine_with_scenario().await;
    engine.set_updates("d-42", Vec::new(), Topic::ResourceAutoGrader, true);
    // Later empty reloads find the topic initialized and stay silent.
    engine.set_updates("d-42", Vec::new(), Topic::ResourceAutoGrader, true);
    assert_eq!(scores.borrow().len(), 1);
}

#[tokio::test]
async fn post_initialization_updates_resubmit_each_time() {
    let (engine, scores) = engine_with_scenario().await;
    engine.set_updates(
        "d-42",
        vec![grader("g-1", false), grader("g-2", false)],
        Topic::ResourceAutoGrader,
        true,
    );
    // The non-empty first load initializes without submitting.
    assert!(scores.borrow().is_empty());

    engine.set_update("d-42", grader("g-1", true), Topic::ResourceAutoGrader, true);
    {
        let submitted = scores.borrow();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].score.completed_tasks, 1);
        assert_eq!(submitted[0].score.total_tasks, 2);
        assert!(!submitted[0].score.all_completed);
    }

    engine.set_update("d-42", grader("g-2", true), Topic::ResourceAutoGrader, true);
    {
        let submitted = scores.borrow();
        assert_eq!(submitted.len(), 2);
        assert!(submitted[1].score.all_completed);
    }

    // Duplicate delivery of an unchanged record still resubmits; sinks that
    // need exactly-once must dedupe downstream.
    engine.set_update("d-42", grader("g-2", true), Topic::ResourceAutoGrader, true);
    assert_eq!(scores.borrow().len(), 3);
}

#[tokio::test]
async fn batch_reload_after_initialization_submits_per_record() {
    let (engine, scores) = engine_with_scenario().await;
    engine.set_updates(
        "d-42",
        vec![grader("g-1", false)],
        Topic::ResourceAutoGrader,
        true,
    );
    assert!(scores.borrow().is_empty());

    // A post-initialization reload goes through the single-record path and
    // therefore submits once per record.
    engine.set_updates(
        "d-42",
        vec![grader("g-1", true), grader("g-2", true)],
        Topic::ResourceAutoGrader,
        true,
    );
    assert_eq!(scores.borrow().len(), 2);
}
