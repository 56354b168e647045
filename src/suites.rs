//! Built-in suites for the authentication and users API
//!
//! Embedded at compile time so the binary runs without any files on disk.
//! The authentication suite must run first: it produces the `token`
//! fixture every users scenario depends on.

use std::path::PathBuf;

use crate::common::Result;
use crate::scenario::Suite;

const BUILTIN: &[(&str, &str)] = &[
    (
        "suites/authentications.yaml",
        include_str!("../suites/authentications.yaml"),
    ),
    ("suites/users.yaml", include_str!("../suites/users.yaml")),
];

/// Parse the built-in suites in execution order
pub fn builtin() -> Result<Vec<Suite>> {
    BUILTIN
        .iter()
        .map(|(source, content)| Suite::from_yaml(source, content))
        .collect()
}

/// Load suites from files, or the built-in ones when none are given
pub fn load_or_builtin(paths: &[PathBuf]) -> Result<Vec<Suite>> {
    if paths.is_empty() {
        return builtin();
    }
    paths.iter().map(|p| Suite::load(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Assertion;
    use serde_json::json;

    #[test]
    fn test_builtin_suites_parse() {
        let suites = builtin().unwrap();
        assert_eq!(suites.len(), 2);
        assert_eq!(suites[0].name, "Authentication Module");
        assert_eq!(suites[1].name, "Users Module");
        assert!(suites[1].scenario_count() > 20);
    }

    #[test]
    fn test_login_captures_tokens() {
        let suites = builtin().unwrap();
        let login = &suites[0].groups[0].scenarios[0];
        assert_eq!(login.setup.len(), 1);
        assert_eq!(login.capture.get("token").unwrap(), "data.accessToken");
        assert_eq!(
            login.capture.get("refreshToken").unwrap(),
            "data.refreshToken"
        );
    }

    #[test]
    fn test_users_scenarios_depend_on_token() {
        let suites = builtin().unwrap();
        for group in &suites[1].groups {
            for scenario in &group.scenarios {
                let keys = scenario.preconditions().unwrap();
                assert!(
                    keys.contains(&"token".to_string()),
                    "{} does not require token",
                    scenario.name
                );
            }
        }
    }

    #[test]
    fn test_id_scenarios_depend_on_user_id() {
        let suites = builtin().unwrap();
        let users = &suites[1];
        for group in users.groups.iter().skip(1) {
            if group.name == "GET /users" {
                continue;
            }
            for scenario in &group.scenarios {
                let keys = scenario.preconditions().unwrap();
                assert!(
                    keys.contains(&"userId".to_string()),
                    "{} does not require userId",
                    scenario.name
                );
            }
        }
    }

    #[test]
    fn test_empty_name_on_update_expects_joi_message() {
        let suites = builtin().unwrap();
        let update = suites[1]
            .groups
            .iter()
            .find(|g| g.name == "PUT /users/{userId}")
            .unwrap();
        let scenario = update
            .scenarios
            .iter()
            .find(|s| s.name == "Should return 400 due to empty name field")
            .unwrap();

        assert_eq!(scenario.expect.status, 400);
        assert!(scenario.expect.body.contains(&Assertion::ExactMatch {
            path: "message".to_string(),
            value: json!("\"name\" is not allowed to be empty"),
        }));
    }
}
