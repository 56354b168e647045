//! Scenario outcomes, aggregates and console output

use colored::Colorize;
use serde::Serialize;
use std::fmt;

use super::expect::AssertionFailure;

/// Lifecycle of a scenario within a run
///
/// `Pending -> Running -> {Passed, Failed, Skipped, Errored}`; terminal
/// states are never left and there are no retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioState {
    Pending,
    Running,
    Passed,
    Failed,
    Skipped,
    Errored,
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScenarioState::Pending => "pending",
            ScenarioState::Running => "running",
            ScenarioState::Passed => "passed",
            ScenarioState::Failed => "failed",
            ScenarioState::Skipped => "skipped",
            ScenarioState::Errored => "errored",
        };
        f.write_str(s)
    }
}

/// Terminal result of a scenario
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    /// The response diverged from the expectation
    Failed { failures: Vec<AssertionFailure> },
    /// Required fixture values were absent; no request was issued
    Skipped { missing: Vec<String> },
    /// The exchange could not be completed
    Errored { error: String },
}

impl Outcome {
    pub fn state(&self) -> ScenarioState {
        match self {
            Outcome::Passed => ScenarioState::Passed,
            Outcome::Failed { .. } => ScenarioState::Failed,
            Outcome::Skipped { .. } => ScenarioState::Skipped,
            Outcome::Errored { .. } => ScenarioState::Errored,
        }
    }
}

/// Result of one scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub name: String,
    /// Request line, e.g. `POST /users`; absent when skipped
    pub request: Option<String>,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub duration_ms: u64,
}

/// Outcome counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errored: usize,
}

impl Summary {
    pub fn record(&mut self, state: ScenarioState) {
        self.total += 1;
        match state {
            ScenarioState::Passed => self.passed += 1,
            ScenarioState::Failed => self.failed += 1,
            ScenarioState::Skipped => self.skipped += 1,
            ScenarioState::Errored => self.errored += 1,
            ScenarioState::Pending | ScenarioState::Running => {}
        }
    }

    pub fn absorb(&mut self, other: &Summary) {
        self.total += other.total;
        self.passed += other.passed;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.errored += other.errored;
    }

    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }
}

/// Results for one group
#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    pub suite: String,
    pub name: String,
    pub scenarios: Vec<ScenarioResult>,
    pub summary: Summary,
}

impl GroupReport {
    pub fn new(suite: &str, name: &str) -> Self {
        Self {
            suite: suite.to_string(),
            name: name.to_string(),
            scenarios: Vec::new(),
            summary: Summary::default(),
        }
    }

    pub fn push(&mut self, result: ScenarioResult) {
        self.summary.record(result.outcome.state());
        self.scenarios.push(result);
    }
}

/// Results for a whole run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub groups: Vec<GroupReport>,
    pub summary: Summary,
    /// At least one scenario errored at the transport level
    pub infrastructure_impacted: bool,
    /// The run stopped early after a transport error
    pub aborted: bool,
}

impl RunReport {
    pub fn push(&mut self, group: GroupReport) {
        self.summary.absorb(&group.summary);
        self.infrastructure_impacted |= group.summary.errored > 0;
        self.groups.push(group);
    }

    /// Every executed scenario passed and the run was not cut short
    pub fn success(&self) -> bool {
        self.summary.all_passed() && !self.aborted
    }

    /// Process exit code for this report
    pub fn exit_code(&self) -> i32 {
        if self.success() {
            0
        } else {
            1
        }
    }

    pub fn find(&self, group: &str, scenario: &str) -> Option<&ScenarioResult> {
        self.groups
            .iter()
            .filter(|g| g.name == group)
            .flat_map(|g| g.scenarios.iter())
            .find(|s| s.name == scenario)
    }
}

/// Console output as the run progresses
pub struct Printer {
    enabled: bool,
    verbose: bool,
}

impl Printer {
    pub fn new(enabled: bool, verbose: bool) -> Self {
        Self { enabled, verbose }
    }

    /// Printer that writes nothing
    pub fn silent() -> Self {
        Self::new(false, false)
    }

    pub fn suite_started(&self, name: &str, description: Option<&str>) {
        if !self.enabled {
            return;
        }
        println!("\n{} {}", "Running Suite:".blue().bold(), name.white().bold());
        if let Some(desc) = description {
            println!("  {}", desc.dimmed());
        }
    }

    pub fn group_started(&self, name: &str) {
        if self.enabled {
            println!("\n{}", name.cyan());
        }
    }

    pub fn scenario_finished(&self, result: &ScenarioResult) {
        if !self.enabled {
            return;
        }
        let request = match (&result.request, self.verbose) {
            (Some(req), true) => format!(" ({}, {} ms)", req, result.duration_ms),
            _ => String::new(),
        };

        match &result.outcome {
            Outcome::Passed => {
                println!("  {} {}{}", "✓".green(), result.name, request.dimmed());
            }
            Outcome::Failed { failures } => {
                println!("  {} {}{}", "✗".red(), result.name, request.dimmed());
                for failure in failures {
                    println!(
                        "      {}: expected {}, got {}",
                        failure.path,
                        failure.expected.green(),
                        failure.actual.red()
                    );
                }
            }
            Outcome::Skipped { missing } => {
                println!(
                    "  {} {} {}",
                    "-".yellow(),
                    result.name,
                    format!("(skipped: missing fixture {})", missing.join(", ")).yellow()
                );
            }
            Outcome::Errored { error } => {
                println!("  {} {}{}", "!".magenta(), result.name, request.dimmed());
                println!("      {}", error.magenta());
            }
        }
    }

    pub fn group_finished(&self, group: &GroupReport) {
        if self.enabled && self.verbose {
            println!("  {}", format_summary(&group.summary).dimmed());
        }
    }

    pub fn run_finished(&self, report: &RunReport) {
        if !self.enabled {
            return;
        }
        println!();
        if report.aborted {
            println!(
                "{}",
                "Run aborted after a transport error".magenta().bold()
            );
        } else if report.infrastructure_impacted {
            println!(
                "{}",
                "Some scenarios could not reach the API; results are infrastructure-impacted"
                    .magenta()
            );
        }

        let line = format_summary(&report.summary);
        if report.success() {
            println!("{} {}\n", "✓".green().bold(), line.green().bold());
        } else {
            println!("{} {}\n", "✗".red().bold(), line.red().bold());
        }
    }
}

/// `12 scenarios: 10 passed, 1 failed, 1 skipped, 0 errored`
pub fn format_summary(summary: &Summary) -> String {
    format!(
        "{} scenarios: {} passed, {} failed, {} skipped, {} errored",
        summary.total, summary.passed, summary.failed, summary.skipped, summary.errored
    )
}
