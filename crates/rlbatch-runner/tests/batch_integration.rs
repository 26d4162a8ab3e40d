//! Integration tests for batches of real trainer processes.

use rlbatch_core::{AgentKind, JobDescriptor, JobStatus, JsonlLogReader};
use rlbatch_runner::{BatchOrchestrator, JobRunner, MemorySink, TrainerCommand};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Trainer stub: `--config <dir>` names the run's log directory. Configs
/// containing "broken" exit 1 immediately; others write Reward 10, 20, 30.
const STUB_TRAINER: &str = r#"
case "$4" in
  *broken*) echo "config rejected"; exit 1 ;;
esac
mkdir -p "$4"
for i in 0 1 2; do
  printf '{"wall_time":%s,"step":%s,"tag":"Reward","value":%s}\n' "170000000$i" "$i" "$(( (i + 1) * 10 ))" >> "$4/events.jsonl"
  echo "episode $i"
done
"#;

fn stub_trainer() -> TrainerCommand {
    TrainerCommand::new(
        "sh",
        vec![
            "-c".to_string(),
            STUB_TRAINER.to_string(),
            "trainer".to_string(),
        ],
    )
}

fn job(root: &Path, name: &str, dir: &str) -> JobDescriptor {
    let log_dir = root.join(dir);
    JobDescriptor::new(AgentKind::Dqn, &log_dir, name).with_log_dir(&log_dir)
}

/// Test: a successful and a failing job, followed by the comparison report
#[tokio::test]
async fn test_batch_then_report_end_to_end() {
    let root = tempfile::tempdir().expect("tempdir");
    let sink = MemorySink::new();
    let runner = JobRunner::new(stub_trainer(), Arc::new(sink.clone()));
    let orchestrator = BatchOrchestrator::new(runner, Arc::new(sink.clone()));

    let descriptors = vec![
        job(root.path(), "DQN - ok", "ok"),
        job(root.path(), "DQN - broken", "broken"),
    ];

    let result = orchestrator.run_batch(&descriptors, Duration::ZERO).await;

    assert_eq!(result.outcomes.len(), 2);
    assert_eq!(result.outcomes[0].exit_status, JobStatus::Success);
    assert_eq!(result.outcomes[1].exit_status, JobStatus::Failed { code: 1 });
    assert_eq!(
        result.outcomes[0].console_log,
        vec!["episode 0", "episode 1", "episode 2"]
    );
    assert_eq!(result.outcomes[1].console_log, vec!["config rejected"]);

    let output = root.path().join("analysis");
    let report = orchestrator
        .report(&JsonlLogReader, &result, &output, BTreeMap::new())
        .expect("report");

    assert_eq!(report.row_count(), 1);
    let dqn = &report.families[0];
    assert_eq!(dqn.rows[0].summary.max_value, 30.0);
    assert_eq!(dqn.rows[0].summary.trailing_average, 20.0);
    assert_eq!(dqn.rows[0].summary.sample_count, 3);

    let markdown = std::fs::read_to_string(&report.report_path).expect("read report");
    assert!(markdown.contains("| DQN - ok | 30.00 | 20.00 | 3 |"));
    assert!(!markdown.contains("| DQN - broken |"));
    assert!(markdown.contains("- DQN - broken: `Reward` unavailable (run has no log store)"));
    assert!(output.join("dqn_comparison.svg").exists());

    let lines = sink.lines();
    assert!(lines.contains(&"Job 2/2".to_string()));
    assert!(lines.contains(&"Job failed (exit code: 1)".to_string()));
    assert!(lines.contains(&"Succeeded: 1  Failed: 1".to_string()));
}

/// Test: a failing job in the middle does not stop later jobs
#[tokio::test]
async fn test_failure_isolation() {
    let root = tempfile::tempdir().expect("tempdir");
    let runner = JobRunner::new(stub_trainer(), Arc::new(MemorySink::new()));
    let orchestrator = BatchOrchestrator::new(runner, Arc::new(MemorySink::new()));

    let descriptors = vec![
        job(root.path(), "first", "first"),
        job(root.path(), "second", "broken-second"),
        job(root.path(), "third", "third"),
    ];

    let result = orchestrator.run_batch(&descriptors, Duration::ZERO).await;

    assert_eq!(result.outcomes.len(), descriptors.len());
    for (outcome, descriptor) in result.outcomes.iter().zip(&descriptors) {
        assert_eq!(&outcome.descriptor, descriptor);
    }
    assert!(result.outcomes[0].succeeded());
    assert!(!result.outcomes[1].succeeded());
    assert!(result.outcomes[2].succeeded());
    assert!(root.path().join("third/events.jsonl").exists());
}

/// Test: a trainer that cannot be spawned fails every job but the batch completes
#[tokio::test]
async fn test_missing_trainer_executable() {
    let root = tempfile::tempdir().expect("tempdir");
    let trainer = TrainerCommand::new("/nonexistent/trainer-binary", vec![]);
    let runner = JobRunner::new(trainer, Arc::new(MemorySink::new()));
    let orchestrator = BatchOrchestrator::new(runner, Arc::new(MemorySink::new()));

    let descriptors = vec![job(root.path(), "a", "a"), job(root.path(), "b", "b")];
    let result = orchestrator.run_batch(&descriptors, Duration::ZERO).await;

    assert_eq!(result.failed_count(), 2);
    assert!(result
        .outcomes
        .iter()
        .all(|o| o.exit_status == JobStatus::Failed { code: -1 }));
}

/// Test: reports over unchanged log stores are identical
#[tokio::test]
async fn test_report_is_deterministic() {
    let root = tempfile::tempdir().expect("tempdir");
    let runner = JobRunner::new(stub_trainer(), Arc::new(MemorySink::new()));
    let orchestrator = BatchOrchestrator::new(runner, Arc::new(MemorySink::new()));

    let descriptors = vec![job(root.path(), "a", "a"), job(root.path(), "b", "b")];
    let result = orchestrator.run_batch(&descriptors, Duration::ZERO).await;

    let first = orchestrator
        .report(&JsonlLogReader, &result, root.path().join("r1"), BTreeMap::new())
        .expect("first report");
    let second = orchestrator
        .report(&JsonlLogReader, &result, root.path().join("r1"), BTreeMap::new())
        .expect("second report");

    assert_eq!(first.markdown, second.markdown);
    assert_eq!(
        std::fs::read(&first.plot_paths[0]).expect("plot"),
        std::fs::read(&second.plot_paths[0]).expect("plot")
    );
}
