//! End-to-end tests for the scenario runner
//!
//! These tests drive the runner against an in-memory implementation of the
//! authentication and users API, so the built-in suites can be verified
//! without a live service:
//! 1. The full built-in run passes and chains token and user id
//! 2. Missing fixtures skip scenarios without sending requests
//! 3. Assertion failures, transport errors and timeouts are recorded
//!    per scenario and never abort the run unless asked to

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use conformance::http::{HttpRequest, HttpResponse, Method, Transport, TransportError};
use conformance::scenario::{Outcome, Printer, RunOptions, Runner, ScenarioState, Suite};
use conformance::suites;
use conformance::Error;

const ACCESS_TOKEN: &str = "access-token-1";
const REFRESH_TOKEN: &str = "refresh-token-1";

#[derive(Clone)]
struct User {
    id: String,
    name: String,
    email: String,
}

#[derive(Default)]
struct ApiState {
    accounts: Vec<(String, String)>,
    users: Vec<User>,
    next_id: u32,
    requests: Vec<HttpRequest>,
}

/// In-memory stand-in for the API under test
#[derive(Default)]
struct FakeApi {
    state: Mutex<ApiState>,
}

impl FakeApi {
    fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    fn handle(&self, req: &HttpRequest) -> HttpResponse {
        let mut state = self.state.lock().unwrap();
        state.requests.push(req.clone());
        let body = req.body.clone().unwrap_or(Value::Null);

        match (req.method, req.path.as_str()) {
            (Method::Post, "/registration") => {
                let email = body["email"].as_str().unwrap_or_default().to_string();
                if state.accounts.iter().any(|(e, _)| *e == email) {
                    return fail(400, "Email sudah digunakan");
                }
                let password = body["password"].as_str().unwrap_or_default().to_string();
                state.accounts.push((email, password));
                HttpResponse::new(201, json!({"status": "success"}))
            }
            (Method::Post, "/authentications") => {
                let email = body["email"].as_str().unwrap_or_default();
                let password = body["password"].as_str().unwrap_or_default();
                if !state
                    .accounts
                    .iter()
                    .any(|(e, p)| e == email && p == password)
                {
                    return fail(401, "Kredensial yang Anda berikan salah");
                }
                HttpResponse::new(
                    201,
                    json!({
                        "status": "success",
                        "message": "Authentication berhasil ditambahkan",
                        "data": {
                            "user": {"email": email},
                            "accessToken": ACCESS_TOKEN,
                            "refreshToken": REFRESH_TOKEN,
                        }
                    }),
                )
            }
            (_, path) if path.starts_with("/users") => {
                if req.bearer.as_deref() != Some(ACCESS_TOKEN) {
                    return fail(401, "Missing authentication");
                }
                handle_users(&mut state, req, &body)
            }
            _ => HttpResponse::new(404, json!({"status": "404", "message": "Not Found"})),
        }
    }
}

fn handle_users(state: &mut ApiState, req: &HttpRequest, body: &Value) -> HttpResponse {
    let rest = req.path.trim_start_matches("/users");
    match (req.method, rest) {
        (Method::Get, "") => {
            let q = query(req, "q").map(|s| s.to_lowercase());
            let page: usize = query(req, "p").and_then(|p| p.parse().ok()).unwrap_or(1);
            let users: Vec<Value> = state
                .users
                .iter()
                .filter(|u| q.as_ref().map_or(true, |q| u.name.to_lowercase().contains(q)))
                .skip((page.max(1) - 1) * 10)
                .take(10)
                .map(user_json)
                .collect();
            HttpResponse::new(200, json!({"status": "success", "data": {"users": users}}))
        }
        (Method::Post, "") => {
            if let Some(message) = validate(body, true) {
                return fail(400, &message);
            }
            let email = body["email"].as_str().unwrap_or_default().to_string();
            if state.users.iter().any(|u| u.email == email) {
                return fail(400, "Email sudah digunakan");
            }
            state.next_id += 1;
            let id = format!("6d6c1840-ba23-4ae2-80b4-{:012}", state.next_id);
            state.users.push(User {
                id: id.clone(),
                name: body["name"].as_str().unwrap_or_default().to_string(),
                email,
            });
            HttpResponse::new(
                201,
                json!({
                    "status": "success",
                    "message": "User berhasil ditambahkan",
                    "data": {"userId": id}
                }),
            )
        }
        (_, "/") => HttpResponse::new(404, json!({"status": "404", "message": "Not Found"})),
        (method, id) => {
            let id = id.trim_start_matches('/');
            let index = state.users.iter().position(|u| u.id == id);
            match method {
                Method::Get => match index {
                    Some(i) => HttpResponse::new(
                        200,
                        json!({"status": "success", "data": {"user": user_json(&state.users[i])}}),
                    ),
                    None => fail(404, "id tidak valid"),
                },
                Method::Put => {
                    if let Some(message) = validate(body, false) {
                        return fail(400, &message);
                    }
                    match index {
                        Some(i) => {
                            let user = &mut state.users[i];
                            user.name = body["name"].as_str().unwrap_or_default().to_string();
                            user.email = body["email"].as_str().unwrap_or_default().to_string();
                            HttpResponse::new(
                                200,
                                json!({
                                    "status": "success",
                                    "message": "User berhasil diupdate",
                                    "data": user_json(user)
                                }),
                            )
                        }
                        None => fail(404, "id tidak valid"),
                    }
                }
                Method::Delete => match index {
                    Some(i) => {
                        state.users.remove(i);
                        HttpResponse::new(
                            200,
                            json!({"status": "success", "message": "User berhasil dihapus"}),
                        )
                    }
                    None => fail(404, "id tidak valid"),
                },
                _ => fail(405, "Method Not Allowed"),
            }
        }
    }
}

/// First failing field, in schema order, with the validator's wording
fn validate(body: &Value, with_password: bool) -> Option<String> {
    let mut fields = vec!["name", "email"];
    if with_password {
        fields.push("password");
    }
    for field in fields {
        match body.get(field).and_then(Value::as_str) {
            None => return Some(format!("\"{}\" is required", field)),
            Some("") => return Some(format!("\"{}\" is not allowed to be empty", field)),
            Some(email) if field == "email" && !valid_email(email) => {
                return Some("\"email\" must be a valid email".to_string())
            }
            Some(_) => {}
        }
    }
    None
}

fn valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn query<'a>(req: &'a HttpRequest, key: &str) -> Option<&'a str> {
    req.query
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn user_json(user: &User) -> Value {
    json!({"id": user.id, "name": user.name, "email": user.email})
}

fn fail(status: u16, message: &str) -> HttpResponse {
    HttpResponse::new(status, json!({"status": "fail", "message": message}))
}

#[async_trait]
impl Transport for FakeApi {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        Ok(self.handle(request))
    }
}

/// Transport whose every exchange fails
struct Unreachable;

#[async_trait]
impl Transport for Unreachable {
    async fn send(&self, _request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        Err(TransportError::Connect {
            url: "http://127.0.0.1:1".to_string(),
            reason: "connection refused".to_string(),
        })
    }
}

/// Transport that never answers in time
struct Stalled;

#[async_trait]
impl Transport for Stalled {
    async fn send(&self, _request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(HttpResponse::new(200, Value::Null))
    }
}

fn options() -> RunOptions {
    RunOptions {
        timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

fn suite(yaml: &str) -> Suite {
    Suite::from_yaml("inline", yaml).expect("Failed to parse inline suite")
}

const REGISTER_TWICE: &str = r#"
name: Registration
groups:
  - name: POST /registration
    scenarios:
      - name: first registration
        request:
          method: POST
          path: /registration
          body: {name: Toko Sembako Mukhti, email: nando3@gmail.com, password: "12345"}
        expect:
          status: 201
          body:
            - path: status
              equals: success
      - name: second registration
        request:
          method: POST
          path: /registration
          body: {name: Toko Sembako Mukhti, email: nando3@gmail.com, password: "12345"}
        expect:
          status: 201
          body:
            - path: status
              equals: success
"#;

const LOGIN_THEN_CREATE: &str = r#"
name: Chain
groups:
  - name: login
    scenarios:
      - name: login
        setup:
          - method: POST
            path: /registration
            body: {name: Toko, email: chain@example.com, password: "12345"}
        request:
          method: POST
          path: /authentications
          body: {email: chain@example.com, password: "12345"}
        expect:
          status: 201
        capture:
          token: data.accessToken
  - name: users
    scenarios:
      - name: create user with wrong expectation
        auth: token
        request:
          method: POST
          path: /users
          body: {name: Toko TB Sentosa, email: sentosa@yahoo.com, password: "12345"}
        expect:
          status: 200
        capture:
          userId: data.userId
      - name: list users
        auth: token
        request:
          method: GET
          path: /users
        expect:
          status: 200
          body:
            - path: data.users
              length: eq
              value: 1
      - name: get created user
        auth: token
        request:
          method: GET
          path: /users/${userId}
        expect:
          status: 200
"#;

#[tokio::test]
async fn test_builtin_suites_pass_against_conformant_api() {
    let api = FakeApi::default();
    let suites = suites::builtin().unwrap();

    let mut runner = Runner::new(&api, options()).with_printer(Printer::silent());
    let report = runner.run(&suites).await.unwrap();

    for group in &report.groups {
        for scenario in &group.scenarios {
            assert_eq!(
                scenario.outcome,
                Outcome::Passed,
                "{} / {} did not pass",
                group.name,
                scenario.name
            );
        }
    }
    assert!(report.success());
    assert_eq!(report.exit_code(), 0);
    assert!(!report.infrastructure_impacted);

    let fixtures = runner.fixtures();
    assert_eq!(fixtures.get("token"), Some(&json!(ACCESS_TOKEN)));
    assert_eq!(fixtures.get("refreshToken"), Some(&json!(REFRESH_TOKEN)));
    assert!(fixtures.is_present("userId"));
    assert!(fixtures.is_present("usersByName"));
}

#[tokio::test]
async fn test_create_user_scenario_yields_user_id() {
    let api = FakeApi::default();
    let suites = suites::builtin().unwrap();

    let mut runner = Runner::new(&api, options());
    let report = runner.run(&suites).await.unwrap();

    let create = report
        .find("POST /users", "Should return 201 and successfully create a user")
        .unwrap();
    assert_eq!(create.outcome, Outcome::Passed);
    assert_eq!(create.request.as_deref(), Some("POST /users"));

    // Later scenarios rendered the captured id into their paths
    let user_id = runner.fixtures().get("userId").unwrap().as_str().unwrap().to_string();
    let get = report
        .find("GET /users/{userId}", "Should return 200 and successfully get by ID")
        .unwrap();
    assert_eq!(get.request, Some(format!("GET /users/{}", user_id)));
}

#[tokio::test]
async fn test_missing_token_skips_without_requests() {
    let api = FakeApi::default();
    let users = suites::builtin().unwrap().remove(1);

    let mut runner = Runner::new(&api, options());
    let report = runner.run(&[users]).await.unwrap();

    assert_eq!(api.request_count(), 0);
    assert!(report.summary.total > 0);
    assert_eq!(report.summary.skipped, report.summary.total);
    for group in &report.groups {
        for scenario in &group.scenarios {
            match &scenario.outcome {
                Outcome::Skipped { missing } => {
                    assert!(missing.contains(&"token".to_string()))
                }
                other => panic!("expected skip, got {:?}", other),
            }
            assert!(scenario.request.is_none());
        }
    }
    assert!(!report.success());
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn test_duplicate_registration_fails_second_attempt() {
    let api = FakeApi::default();
    let mut runner = Runner::new(&api, options());
    let report = runner.run(&[suite(REGISTER_TWICE)]).await.unwrap();

    let first = report.find("POST /registration", "first registration").unwrap();
    assert_eq!(first.outcome, Outcome::Passed);

    let second = report.find("POST /registration", "second registration").unwrap();
    match &second.outcome {
        Outcome::Failed { failures } => {
            assert_eq!(failures[0].path, "status");
            assert_eq!(failures[0].expected, "201");
            assert_eq!(failures[0].actual, "400");
            assert_eq!(failures[1].path, "body.status");
            assert_eq!(failures[1].actual, "\"fail\"");
        }
        other => panic!("expected failure, got {:?}", other),
    }

    let response = api.handle(&HttpRequest {
        body: Some(json!({"email": "nando3@gmail.com", "password": "12345"})),
        ..HttpRequest::new(Method::Post, "/registration")
    });
    assert_eq!(response.status, 400);
    assert_eq!(response.body["message"], "Email sudah digunakan");
}

#[tokio::test]
async fn test_failed_scenario_does_not_capture_and_dependents_skip() {
    let api = FakeApi::default();
    let mut runner = Runner::new(&api, options());
    let report = runner.run(&[suite(LOGIN_THEN_CREATE)]).await.unwrap();

    let create = report
        .find("users", "create user with wrong expectation")
        .unwrap();
    assert_eq!(create.outcome.state(), ScenarioState::Failed);
    assert!(!runner.fixtures().is_present("userId"));

    // Independent scenarios keep running
    let list = report.find("users", "list users").unwrap();
    assert_eq!(list.outcome, Outcome::Passed);

    let get = report.find("users", "get created user").unwrap();
    assert_eq!(
        get.outcome,
        Outcome::Skipped {
            missing: vec!["userId".to_string()]
        }
    );

    assert_eq!(report.summary.passed, 2);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.skipped, 1);
}

#[tokio::test]
async fn test_transport_errors_are_recorded_and_run_continues() {
    let mut runner = Runner::new(&Unreachable, options());
    let report = runner.run(&[suite(LOGIN_THEN_CREATE)]).await.unwrap();

    let login = report.find("login", "login").unwrap();
    match &login.outcome {
        Outcome::Errored { error } => assert!(error.contains("connection refused")),
        other => panic!("expected error, got {:?}", other),
    }

    // Every users scenario needs the token the errored login never produced
    let users = report.groups.iter().find(|g| g.name == "users").unwrap();
    assert_eq!(users.summary.skipped, 3);

    assert!(report.infrastructure_impacted);
    assert!(!report.aborted);
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn test_abort_on_transport_error_stops_run() {
    let options = RunOptions {
        abort_on_transport_error: true,
        ..options()
    };
    let mut runner = Runner::new(&Unreachable, options);
    let report = runner.run(&[suite(LOGIN_THEN_CREATE)]).await.unwrap();

    assert!(report.aborted);
    assert_eq!(report.summary.total, 1);
    assert_eq!(report.summary.errored, 1);
    assert!(report.find("users", "list users").is_none());
    assert!(!report.success());
}

#[tokio::test]
async fn test_scenario_timeout_is_errored() {
    let yaml = r#"
name: Slow
groups:
  - name: GET /users
    scenarios:
      - name: slow list
        timeout_secs: 1
        request:
          method: GET
          path: /users
        expect:
          status: 200
"#;
    let mut runner = Runner::new(&Stalled, options());
    let report = runner.run(&[suite(yaml)]).await.unwrap();

    let slow = report.find("GET /users", "slow list").unwrap();
    match &slow.outcome {
        Outcome::Errored { error } => assert!(error.contains("timed out")),
        other => panic!("expected timeout, got {:?}", other),
    }
    assert!(report.infrastructure_impacted);
}

#[tokio::test]
async fn test_filter_limits_executed_scenarios() {
    let api = FakeApi::default();
    let options = RunOptions {
        filter: Some("POST /authentications".to_string()),
        ..options()
    };
    let mut runner = Runner::new(&api, options);
    let report = runner.run(&suites::builtin().unwrap()).await.unwrap();

    assert_eq!(report.summary.total, 1);
    assert!(report.success());
    assert!(runner.fixtures().is_present("token"));
    // Registration in setup plus the login itself
    assert_eq!(api.request_count(), 2);
}

#[tokio::test]
async fn test_repeated_name_filter_is_idempotent() {
    let api = FakeApi::default();
    let report = Runner::new(&api, options())
        .run(&suites::builtin().unwrap())
        .await
        .unwrap();

    let repeat = report
        .find(
            "GET /users",
            "Should return the same users when filtering by name again",
        )
        .unwrap();
    assert_eq!(repeat.outcome, Outcome::Passed);

    let empty = report
        .find("GET /users", "Should return 200 and show empty users")
        .unwrap();
    assert_eq!(empty.outcome, Outcome::Passed);
}

#[tokio::test]
async fn test_invalid_scenario_is_rejected_before_any_request() {
    let api = FakeApi::default();
    let mut invalid = suite(REGISTER_TWICE);
    invalid.groups[0].scenarios[1].requires.push("bad key".to_string());

    let err = Runner::new(&api, options())
        .run(&[invalid])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidScenario { .. }));
    assert_eq!(api.request_count(), 0);
}
