//! Cross-run comparison reports.
//!
//! [`build_report`] summarizes the primary metric of every run, groups runs by
//! agent family and writes three kinds of artifacts into the output
//! directory:
//!
//! - `<family>_comparison.svg`: one curve per run with data
//! - `experiment_report.md`: results tables plus fixed narrative sections
//! - `experiment_results.json`: the same numbers in machine-readable form
//!
//! Runs without data for their family's primary tag never get a table row or
//! a curve; they are listed as unavailable instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::aggregate::{summarize_series, RunSummary, TRAILING_WINDOW};
use crate::domain::{AgentKind, MetricTags, Result, RlbatchError};
use crate::logstore::LogReader;
use crate::metrics::{MetricsSnapshot, METRICS};
use crate::obs;
use crate::plot::{render_comparison_svg, PlotCurve};

pub const REPORT_FILE_NAME: &str = "experiment_report.md";
pub const RESULTS_FILE_NAME: &str = "experiment_results.json";
pub const RESULTS_SCHEMA_VERSION: &str = "1.0";

/// A run to include in a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRef {
    pub label: String,
    pub agent_kind: AgentKind,

    /// Log store of the run; `None` when the run produced no usable store.
    pub log_location: Option<PathBuf>,
}

/// Everything needed to build one report.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub runs: Vec<RunRef>,

    /// Tag overrides per family; families without an entry use their defaults.
    pub metric_tags: BTreeMap<AgentKind, MetricTags>,
    pub output_dir: PathBuf,

    /// Digest of the batch definition the runs came from, if known.
    pub batch_digest: Option<String>,
}

impl ReportRequest {
    pub fn new(runs: Vec<RunRef>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            runs,
            metric_tags: BTreeMap::new(),
            output_dir: output_dir.into(),
            batch_digest: None,
        }
    }

    fn tags_for(&self, kind: AgentKind) -> MetricTags {
        self.metric_tags
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| kind.default_tags())
    }
}

/// Final value of a secondary metric for one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecondaryValue {
    pub tag: String,
    pub final_value: Option<f64>,
    pub first_value: Option<f64>,
}

impl SecondaryValue {
    /// Whether the metric ended lower than it started.
    pub fn decreased(&self) -> Option<bool> {
        Some(self.final_value? < self.first_value?)
    }
}

/// One table row: a run with primary-metric data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunResult {
    pub summary: RunSummary,
    pub secondary: Vec<SecondaryValue>,

    #[serde(skip)]
    pub curve: Vec<(i64, f64)>,
}

/// Why a run has no row in its family's table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    /// The run has no log store to read.
    NoLogStore,

    /// The log store holds no points for the primary tag.
    NoData,
}

impl UnavailableReason {
    fn describe(&self) -> &'static str {
        match self {
            UnavailableReason::NoLogStore => "run has no log store",
            UnavailableReason::NoData => "no recorded data",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnavailableRun {
    pub label: String,
    pub reason: UnavailableReason,
}

/// Results for one agent family.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FamilyResults {
    pub agent_kind: AgentKind,
    pub tags: MetricTags,
    pub rows: Vec<RunResult>,
    pub unavailable: Vec<UnavailableRun>,
}

/// JSON artifact written next to the markdown report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultsArtifact {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub batch_digest: Option<String>,
    pub trailing_window: usize,
    pub families: Vec<FamilyResults>,
}

/// Artifacts produced by one [`build_report`] call.
#[derive(Debug, Clone)]
pub struct ComparisonReport {
    pub report_path: PathBuf,
    pub results_path: PathBuf,
    pub plot_paths: Vec<PathBuf>,
    pub families: Vec<FamilyResults>,
    pub markdown: String,

    /// Counter values flushed at the end of this pass.
    pub counters: MetricsSnapshot,
}

impl ComparisonReport {
    /// Number of runs with a table row across all families.
    pub fn row_count(&self) -> usize {
        self.families.iter().map(|f| f.rows.len()).sum()
    }
}

/// Summarize every run of `request` and group the results by family.
///
/// Families appear in [`AgentKind::ALL`] order and only when at least one run
/// belongs to them; runs keep their request order within a family.
pub fn collect_results(reader: &dyn LogReader, request: &ReportRequest) -> Vec<FamilyResults> {
    let mut families = Vec::new();

    for kind in AgentKind::ALL {
        let runs: Vec<&RunRef> = request.runs.iter().filter(|r| r.agent_kind == kind).collect();
        if runs.is_empty() {
            continue;
        }

        let tags = request.tags_for(kind);
        let mut rows = Vec::new();
        let mut unavailable = Vec::new();

        for run in runs {
            let Some(location) = run.log_location.as_deref() else {
                unavailable.push(UnavailableRun {
                    label: run.label.clone(),
                    reason: UnavailableReason::NoLogStore,
                });
                continue;
            };

            let series = reader.read_series(location, &tags.primary);
            let Some(summary) = summarize_series(&run.label, &series) else {
                unavailable.push(UnavailableRun {
                    label: run.label.clone(),
                    reason: UnavailableReason::NoData,
                });
                continue;
            };

            let secondary = tags
                .secondary
                .iter()
                .map(|tag| {
                    let s = reader.read_series(location, tag);
                    SecondaryValue {
                        tag: tag.clone(),
                        final_value: s.last_value(),
                        first_value: s.first_value(),
                    }
                })
                .collect();

            rows.push(RunResult {
                summary,
                secondary,
                curve: series.points.iter().map(|p| (p.step, p.value)).collect(),
            });
        }

        families.push(FamilyResults {
            agent_kind: kind,
            tags,
            rows,
            unavailable,
        });
    }

    families
}

/// Build and write all report artifacts for `request`.
///
/// Missing metric data never fails the call; only I/O on the output
/// directory does.
pub fn build_report(reader: &dyn LogReader, request: &ReportRequest) -> Result<ComparisonReport> {
    let output_dir = &request.output_dir;
    std::fs::create_dir_all(output_dir)
        .map_err(|e| RlbatchError::report_write(output_dir.clone(), e))?;

    let families = collect_results(reader, request);

    let mut plot_paths = Vec::new();
    for family in &families {
        if family.rows.is_empty() {
            continue;
        }
        let path = output_dir.join(plot_file_name(family.agent_kind));
        let curves: Vec<PlotCurve> = family
            .rows
            .iter()
            .map(|row| PlotCurve {
                label: row.summary.run_label.clone(),
                points: row.curve.clone(),
            })
            .collect();
        let svg = render_comparison_svg(
            &format!("Reward comparison - {} experiments", family.agent_kind),
            "Episode",
            &family.tags.primary,
            &curves,
        );
        write_artifact(&path, svg.as_bytes())?;
        plot_paths.push(path);
    }

    let markdown = render_report_md(&families, output_dir);
    let report_path = output_dir.join(REPORT_FILE_NAME);
    write_artifact(&report_path, markdown.as_bytes())?;

    let artifact = ResultsArtifact {
        schema_version: RESULTS_SCHEMA_VERSION.to_string(),
        generated_at: Utc::now(),
        batch_digest: request.batch_digest.clone(),
        trailing_window: TRAILING_WINDOW,
        families: families.clone(),
    };
    let results_path = output_dir.join(RESULTS_FILE_NAME);
    write_results_json(&results_path, &artifact)?;

    let rows: usize = families.iter().map(|f| f.rows.len()).sum();
    obs::emit_report_written(&report_path, families.len(), rows);
    let counters = METRICS.flush("report");

    Ok(ComparisonReport {
        report_path,
        results_path,
        plot_paths,
        families,
        markdown,
        counters,
    })
}

/// File name of a family's comparison plot.
pub fn plot_file_name(kind: AgentKind) -> String {
    format!("{}_comparison.svg", kind.selector())
}

/// Write the results artifact as pretty JSON.
pub fn write_results_json(path: &Path, artifact: &ResultsArtifact) -> Result<()> {
    let content = serde_json::to_string_pretty(artifact)?;
    write_artifact(path, content.as_bytes())
}

fn write_artifact(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).map_err(|e| RlbatchError::report_write(path, e))
}

/// Render the markdown results table for one family.
///
/// Rewards use two decimals, secondary (loss) values six.
pub fn render_family_table(family: &FamilyResults) -> String {
    let mut out = String::new();
    if family.rows.is_empty() {
        let _ = writeln!(out, "No run produced data for `{}`.", family.tags.primary);
        return out;
    }

    out.push_str("| Run | Max Reward | Final Avg Reward | Episodes |\n");
    out.push_str("|-----|------------|------------------|----------|\n");
    for row in &family.rows {
        let s = &row.summary;
        let _ = writeln!(
            out,
            "| {} | {:.2} | {:.2} | {} |",
            table_cell(&s.run_label),
            s.max_value,
            s.trailing_average,
            s.sample_count
        );
    }

    if !family.tags.secondary.is_empty() {
        out.push('\n');
        out.push_str("Final secondary metrics:\n\n");
        let _ = writeln!(out, "| Run | {} |", family.tags.secondary.join(" | "));
        let _ = writeln!(out, "|-----|{}", "------|".repeat(family.tags.secondary.len()));
        for row in &family.rows {
            let cells: Vec<String> = row
                .secondary
                .iter()
                .map(|v| match v.final_value {
                    Some(value) => format!("{value:.6}"),
                    None => "n/a".to_string(),
                })
                .collect();
            let _ = writeln!(
                out,
                "| {} | {} |",
                table_cell(&row.summary.run_label),
                cells.join(" | ")
            );
        }
    }

    out
}

/// Escape `|` so a label cannot split a table row.
fn table_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

fn render_unavailable(family: &FamilyResults) -> String {
    let mut out = String::new();
    if family.unavailable.is_empty() {
        return out;
    }
    out.push_str("Unavailable:\n\n");
    for run in &family.unavailable {
        let _ = writeln!(
            out,
            "- {}: `{}` unavailable ({})",
            run.label,
            family.tags.primary,
            run.reason.describe()
        );
    }
    out
}

fn family_notes(kind: AgentKind) -> &'static [&'static str] {
    match kind {
        AgentKind::Dqn => &[
            "Learning-rate variations have a visible impact on convergence",
            "The discount factor (gamma) shapes how far ahead the agent plans",
            "Network architecture bounds the quality of the value approximation",
        ],
        AgentKind::A3c => &[
            "The entropy coefficient is crucial for exploration",
            "A very low learning rate leads to slow convergence",
            "Policy loss and value loss need to stay balanced",
        ],
    }
}

fn metric_definitions(kind: AgentKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        AgentKind::Dqn => &[
            ("Network Loss", "indicates convergence of the algorithm"),
            ("Episode Duration", "survival or resolution time"),
            ("Epsilon", "decay of exploration"),
        ],
        AgentKind::A3c => &[
            ("Policy Loss", "actor loss"),
            ("Value Loss", "critic loss"),
            ("Entropy Loss", "measure of exploration"),
            ("Advantage", "indicates good actions"),
            ("Explained Variance", "quality of the critic's predictions"),
        ],
    }
}

/// Render the full markdown report.
pub fn render_report_md(families: &[FamilyResults], plots_dir: &Path) -> String {
    let mut out = String::new();
    out.push_str("# Experiment Report - Reinforcement Learning\n\n");
    out.push_str("## Summary\n\n");
    out.push_str("This report compares the training runs of one experiment batch. ");
    out.push_str("Each table row is computed from the scalar events recorded by the run; ");
    out.push_str(&format!(
        "final averages cover the last {TRAILING_WINDOW} points, or every point when fewer were recorded.\n\n"
    ));

    for family in families {
        let kind = family.agent_kind;
        let _ = writeln!(out, "## {kind} Experiments\n");
        out.push_str(&render_family_table(family));
        out.push('\n');
        let unavailable = render_unavailable(family);
        if !unavailable.is_empty() {
            out.push_str(&unavailable);
            out.push('\n');
        }
        let _ = writeln!(out, "### {kind} Analysis\n");
        let _ = writeln!(out, "**Observations on the {kind} experiments:**");
        for note in family_notes(kind) {
            let _ = writeln!(out, "- {note}");
        }
        out.push('\n');
    }

    out.push_str("## Metric Definitions\n\n");
    for kind in AgentKind::ALL {
        let _ = writeln!(out, "### {kind}:");
        for (name, meaning) in metric_definitions(kind) {
            let _ = writeln!(out, "- **{name}**: {meaning}");
        }
        out.push('\n');
    }

    out.push_str("## Conclusions\n\n");
    out.push_str("1. **Learning rate**: critical hyperparameter; values that are too high cause instability\n");
    out.push_str("2. **Discount factor**: significantly changes the agent's strategy\n");
    out.push_str("3. **Network architecture**: larger networks are not necessarily better\n");
    out.push_str("4. **Exploration**: essential to avoid local minima\n\n");

    out.push_str("## Visualizations\n\n");
    let _ = writeln!(
        out,
        "- Comparison plots written to `{}`",
        plots_dir.display()
    );
    out.push_str("- Raw scalar events remain in each run's log directory\n");
    out
}

/// Render the per-run console summary printed after an analysis pass.
pub fn render_console_summary(families: &[FamilyResults]) -> String {
    let mut out = String::new();
    for family in families {
        let _ = writeln!(out, "\n{} experiments:", family.agent_kind);
        let _ = writeln!(out, "{}", "-".repeat(40));
        for row in &family.rows {
            let s = &row.summary;
            let _ = writeln!(out, "\n{}:", s.run_label);
            let _ = writeln!(out, "  - max reward: {:.2}", s.max_value);
            let _ = writeln!(out, "  - final average reward: {:.2}", s.trailing_average);
            let _ = writeln!(out, "  - episodes trained: {}", s.sample_count);
            for (idx, value) in row.secondary.iter().enumerate() {
                if let Some(final_value) = value.final_value {
                    let _ = writeln!(out, "  - final {}: {:.6}", value.tag, final_value);
                    if idx == 0 {
                        if let Some(decreased) = value.decreased() {
                            let _ = writeln!(
                                out,
                                "  - {} decreased: {}",
                                value.tag,
                                if decreased { "yes" } else { "no" }
                            );
                        }
                    }
                }
            }
        }
        for run in &family.unavailable {
            let _ = writeln!(out, "\n{}:", run.label);
            let _ = writeln!(out, "  - no data available ({})", run.reason.describe());
        }
    }
    out
}
