//! Loading step sequences and variables from JSON or YAML files

use crate::automation::{Step, VariableCollection};
use crate::error::{AutofillError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Contents of a steps file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepsDocument {
    #[serde(default)]
    pub variables: VariableCollection,
    pub steps: Vec<Step>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StepsFileContent {
    Document(StepsDocument),
    Bare(Vec<Step>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Json,
    Yaml,
}

impl FileFormat {
    fn for_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => Ok(Self::Json),
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            _ => Err(AutofillError::config(
                "Unsupported file extension, expected .json, .yaml or .yml",
            )
            .with_path(path)),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Yaml => "YAML",
        }
    }
}

fn parse_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let format = FileFormat::for_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| {
        AutofillError::config("Failed to read file")
            .with_path(path)
            .with_source(e)
    })?;

    let parsed = match format {
        FileFormat::Json => serde_json::from_str(&content).map_err(|e| e.to_string()),
        FileFormat::Yaml => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
    };
    parsed.map_err(|message| AutofillError::Parse {
        format: format.name(),
        path: path.to_path_buf(),
        message,
    })
}

/// Load a steps file. Accepts either a bare list of steps or a document
/// with `steps` and optional `variables`.
pub fn load_steps(path: &Path) -> Result<StepsDocument> {
    let document = match parse_file::<StepsFileContent>(path)? {
        StepsFileContent::Document(document) => document,
        StepsFileContent::Bare(steps) => StepsDocument {
            variables: VariableCollection::new(),
            steps,
        },
    };

    let mut seen = std::collections::HashSet::new();
    for step in &document.steps {
        for (field, seconds) in [
            ("steps.timeout_seconds", step.timeout_seconds),
            ("steps.after_wait_seconds", step.after_wait_seconds),
        ] {
            if !seconds.is_finite() {
                return Err(AutofillError::validation(
                    field,
                    format!(
                        "Step {} in {} has a non-finite {}",
                        step.execution_order,
                        path.display(),
                        field.trim_start_matches("steps.")
                    ),
                ));
            }
        }
        if !seen.insert(step.execution_order) {
            return Err(AutofillError::validation(
                "steps.execution_order",
                format!(
                    "Duplicate execution order {} in {}",
                    step.execution_order,
                    path.display()
                ),
            ));
        }
    }
    Ok(document)
}

/// Load a flat name/value map of variables
pub fn load_variables(path: &Path) -> Result<VariableCollection> {
    parse_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::{ActionKind, RetryDisposition};
    use tempfile::TempDir;

    #[test]
    fn test_yaml_document_with_variables() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("login.yaml");
        std::fs::write(
            &path,
            r#"
variables:
  user: alice
steps:
  - execution_order: 2
    action: type
    value: "{{user}}"
    locators:
      smart: "//input[@name='user']"
    retry: restart_sequence
  - execution_order: 1
    action: change_url
    value: https://example.com/login
"#,
        )
        .unwrap();

        let document = load_steps(&path).unwrap();
        assert_eq!(document.variables.get("user"), Some("alice"));
        assert_eq!(document.steps.len(), 2);
        assert_eq!(document.steps[0].action, ActionKind::Type);
        assert_eq!(document.steps[0].retry, RetryDisposition::RestartSequence);
        assert_eq!(document.steps[1].action, ActionKind::ChangeUrl);
    }

    #[test]
    fn test_bare_json_list() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("steps.json");
        std::fs::write(
            &path,
            r#"[{"execution_order": 1, "action": "click", "timeout_seconds": 5}]"#,
        )
        .unwrap();

        let document = load_steps(&path).unwrap();
        assert!(document.variables.is_empty());
        assert_eq!(document.steps[0].timeout_seconds, 5.0);
    }

    #[test]
    fn test_duplicate_orders_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("steps.json");
        std::fs::write(
            &path,
            r#"[{"execution_order": 1, "action": "click"}, {"execution_order": 1, "action": "type"}]"#,
        )
        .unwrap();

        assert!(load_steps(&path).unwrap_err().is_validation());
    }

    #[test]
    fn test_non_finite_durations_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("steps.yaml");
        std::fs::write(
            &path,
            "- execution_order: 1\n  action: click\n  after_wait_seconds: .inf\n",
        )
        .unwrap();

        let err = load_steps(&path).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("after_wait_seconds"));
    }

    #[test]
    fn test_recorded_numeric_retry_codes() {
        let temp_dir = TempDir::new().unwrap();
        let yaml = temp_dir.path().join("recorded.yaml");
        std::fs::write(
            &yaml,
            "- execution_order: 1\n  action: click\n  retry: 10\n\
             - execution_order: 2\n  action: click\n  retry: 0\n",
        )
        .unwrap();

        let document = load_steps(&yaml).unwrap();
        assert_eq!(document.steps[0].retry, RetryDisposition::RestartSequence);
        assert_eq!(document.steps[1].retry, RetryDisposition::NoRetry);

        let json = temp_dir.path().join("recorded.json");
        std::fs::write(
            &json,
            r#"[{"execution_order": 1, "action": "click", "retry": 7}]"#,
        )
        .unwrap();
        assert!(matches!(
            load_steps(&json).unwrap_err(),
            AutofillError::Parse { format: "JSON", .. }
        ));
    }

    #[test]
    fn test_unknown_extension_and_bad_content() {
        let temp_dir = TempDir::new().unwrap();
        let txt = temp_dir.path().join("steps.txt");
        std::fs::write(&txt, "[]").unwrap();
        assert!(matches!(
            load_steps(&txt).unwrap_err(),
            AutofillError::Config { .. }
        ));

        let bad = temp_dir.path().join("steps.json");
        std::fs::write(&bad, "{\"steps\": 3}").unwrap();
        assert!(matches!(
            load_steps(&bad).unwrap_err(),
            AutofillError::Parse { format: "JSON", .. }
        ));
    }

    #[test]
    fn test_variables_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("vars.yml");
        std::fs::write(&path, "user: bob\nplan: pro\n").unwrap();

        let variables = load_variables(&path).unwrap();
        assert_eq!(variables.get("plan"), Some("pro"));
        assert_eq!(variables.len(), 2);
    }
}
