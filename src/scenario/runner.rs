//! Scenario runner implementation
//!
//! Executes suites strictly in order against a [`Transport`], threading a
//! single [`FixtureContext`] through every scenario of the run.

use std::time::{Duration, Instant};

use crate::common::config::Settings;
use crate::common::Result;
use crate::http::{HttpRequest, HttpResponse, Transport, TransportError};

use super::config::{RequestSpec, Scenario, Suite};
use super::expect::{evaluate, lookup};
use super::fixture::FixtureContext;
use super::report::{GroupReport, Outcome, Printer, RunReport, ScenarioResult, ScenarioState};

/// Knobs for a single run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Default per-scenario timeout covering setup and the main request
    pub timeout: Duration,
    /// Stop after the first scenario that errors
    pub abort_on_transport_error: bool,
    /// Only run scenarios whose "group / scenario" name contains this
    pub filter: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            abort_on_transport_error: false,
            filter: None,
        }
    }
}

impl RunOptions {
    pub fn from_settings(settings: &Settings, filter: Option<String>) -> Self {
        Self {
            timeout: settings.timeout,
            abort_on_transport_error: settings.abort_on_transport_error,
            filter,
        }
    }

    fn selects(&self, group: &str, scenario: &str) -> bool {
        match &self.filter {
            Some(filter) => format!("{} / {}", group, scenario).contains(filter.as_str()),
            None => true,
        }
    }
}

/// Executes suites and owns the run's fixture context
pub struct Runner<'t> {
    transport: &'t dyn Transport,
    options: RunOptions,
    fixtures: FixtureContext,
    printer: Printer,
}

impl<'t> Runner<'t> {
    pub fn new(transport: &'t dyn Transport, options: RunOptions) -> Self {
        Self {
            transport,
            options,
            fixtures: FixtureContext::new(),
            printer: Printer::silent(),
        }
    }

    /// Print progress as scenarios complete
    pub fn with_printer(mut self, printer: Printer) -> Self {
        self.printer = printer;
        self
    }

    /// Fixture values produced so far
    pub fn fixtures(&self) -> &FixtureContext {
        &self.fixtures
    }

    /// Run every suite in order
    ///
    /// Every suite is validated before the first request is sent, and an
    /// invalid one is returned as an error. Per-scenario problems are
    /// recorded in the report.
    pub async fn run(&mut self, suites: &[Suite]) -> Result<RunReport> {
        for suite in suites {
            suite.validate()?;
        }

        let mut report = RunReport::default();

        'suites: for suite in suites {
            self.printer
                .suite_started(&suite.name, suite.description.as_deref());

            for group in &suite.groups {
                let selected: Vec<&Scenario> = group
                    .scenarios
                    .iter()
                    .filter(|s| self.options.selects(&group.name, &s.name))
                    .collect();
                if selected.is_empty() {
                    continue;
                }

                self.printer.group_started(&group.name);
                let mut group_report = GroupReport::new(&suite.name, &group.name);
                let mut abort = false;

                for scenario in selected {
                    let result = self.run_scenario(scenario).await?;
                    self.printer.scenario_finished(&result);

                    abort = self.options.abort_on_transport_error
                        && result.outcome.state() == ScenarioState::Errored;
                    group_report.push(result);
                    if abort {
                        break;
                    }
                }

                self.printer.group_finished(&group_report);
                report.push(group_report);

                if abort {
                    tracing::warn!("aborting run after transport error");
                    report.aborted = true;
                    break 'suites;
                }
            }
        }

        tracing::info!(
            total = report.summary.total,
            passed = report.summary.passed,
            failed = report.summary.failed,
            skipped = report.summary.skipped,
            errored = report.summary.errored,
            "run finished"
        );
        self.printer.run_finished(&report);
        Ok(report)
    }

    /// Execute one scenario against the shared fixture context
    pub async fn run_scenario(&mut self, scenario: &Scenario) -> Result<ScenarioResult> {
        let started = Instant::now();
        let (request, outcome) = execute(
            self.transport,
            scenario,
            &mut self.fixtures,
            self.options.timeout,
        )
        .await?;

        match &outcome {
            Outcome::Passed => tracing::info!(scenario = %scenario.name, "passed"),
            Outcome::Failed { failures } => {
                tracing::warn!(scenario = %scenario.name, failures = failures.len(), "failed")
            }
            Outcome::Skipped { missing } => {
                tracing::warn!(scenario = %scenario.name, missing = ?missing, "skipped")
            }
            Outcome::Errored { error } => {
                tracing::error!(scenario = %scenario.name, %error, "errored")
            }
        }

        Ok(ScenarioResult {
            name: scenario.name.clone(),
            request,
            outcome,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// Run a scenario's precondition check, exchange, expectation and captures
///
/// Returns the rendered request line (when one was built) and the outcome.
/// A scenario with malformed fixture keys is an error, not an outcome.
pub async fn execute(
    transport: &dyn Transport,
    scenario: &Scenario,
    fixtures: &mut FixtureContext,
    default_timeout: Duration,
) -> Result<(Option<String>, Outcome)> {
    tracing::debug!(scenario = %scenario.name, state = %ScenarioState::Pending);

    let required = scenario.preconditions()?;
    let missing = fixtures.missing(&required);
    if !missing.is_empty() {
        return Ok((None, Outcome::Skipped { missing }));
    }

    let setup = match scenario
        .setup
        .iter()
        .map(|spec| build_request(spec, None, fixtures))
        .collect::<std::result::Result<Vec<_>, _>>()
    {
        Ok(requests) => requests,
        Err(missing) => return Ok((None, Outcome::Skipped { missing })),
    };
    let request = match build_request(&scenario.request, scenario.auth.as_deref(), fixtures) {
        Ok(request) => request,
        Err(missing) => return Ok((None, Outcome::Skipped { missing })),
    };
    let request_line = Some(request.describe());

    tracing::debug!(
        scenario = %scenario.name,
        state = %ScenarioState::Running,
        request = %request.describe()
    );

    let timeout = scenario
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or(default_timeout);

    let response = match tokio::time::timeout(timeout, exchange(transport, &setup, &request)).await
    {
        Err(_) => Err(TransportError::Timeout(timeout)),
        Ok(result) => result,
    };

    let response = match response {
        Ok(response) => response,
        Err(e) => {
            return Ok((
                request_line,
                Outcome::Errored {
                    error: e.to_string(),
                },
            ))
        }
    };

    let failures = evaluate(&scenario.expect, &response, fixtures);
    if !failures.is_empty() {
        return Ok((request_line, Outcome::Failed { failures }));
    }

    for (key, path) in &scenario.capture {
        if !fixtures.merge(key, lookup(&response.body, path)) {
            tracing::warn!(key = %key, path = %path, "capture produced no value; keeping previous");
        }
    }

    Ok((request_line, Outcome::Passed))
}

async fn exchange(
    transport: &dyn Transport,
    setup: &[HttpRequest],
    request: &HttpRequest,
) -> std::result::Result<HttpResponse, TransportError> {
    for step in setup {
        let response = transport.send(step).await?;
        tracing::debug!(request = %step.describe(), status = response.status, "setup request");
    }
    transport.send(request).await
}

/// Render a request spec against the fixture context
///
/// Returns the missing fixture keys when a placeholder cannot be filled.
pub fn build_request(
    spec: &RequestSpec,
    auth: Option<&str>,
    fixtures: &FixtureContext,
) -> std::result::Result<HttpRequest, Vec<String>> {
    let mut missing = Vec::new();
    let path = match fixtures.render_path(&spec.path) {
        Ok(path) => path,
        Err(keys) => {
            missing.extend(keys);
            String::new()
        }
    };

    let mut render = |s: &str| match fixtures.render_str(s) {
        Ok(rendered) => rendered,
        Err(keys) => {
            missing.extend(keys);
            String::new()
        }
    };

    let query = spec
        .query
        .iter()
        .map(|(k, v)| (k.clone(), render(v.as_str())))
        .collect();
    let headers = spec
        .headers
        .iter()
        .map(|(k, v)| (k.clone(), render(v.as_str())))
        .collect();

    let body = match &spec.body {
        Some(body) => match fixtures.render_value(body) {
            Ok(body) => Some(body),
            Err(keys) => {
                missing.extend(keys);
                None
            }
        },
        None => None,
    };

    let bearer = match auth {
        Some(key) => match fixtures.get_str(key) {
            Some(token) => Some(token),
            None => {
                missing.push(key.to_string());
                None
            }
        },
        None => None,
    };

    if !missing.is_empty() {
        missing.sort();
        missing.dedup();
        return Err(missing);
    }

    Ok(HttpRequest {
        method: spec.method,
        path,
        query,
        headers,
        bearer,
        body,
    })
}
