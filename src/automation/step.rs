//! Declarative step records
//!
//! A [`Step`] is created by an external editor and only ever read by the
//! engine. Variable substitution produces a transient copy via
//! [`Step::with_variables`]; the original record is left untouched.

use super::variables::VariableCollection;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a step does to the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Enter text into a field
    Type,
    Click,
    /// Toggle a checkbox or radio button
    Check,
    /// Compare an element's value against the step value
    Judge,
    SelectValue,
    SelectIndex,
    SelectText,
    SelectTextExact,
    /// Navigate the context to the URL in the step value
    ChangeUrl,
    Screenshot,
    /// Read an element's value into a variable
    GetValue,
}

impl ActionKind {
    pub const ALL: [ActionKind; 11] = [
        ActionKind::Type,
        ActionKind::Click,
        ActionKind::Check,
        ActionKind::Judge,
        ActionKind::SelectValue,
        ActionKind::SelectIndex,
        ActionKind::SelectText,
        ActionKind::SelectTextExact,
        ActionKind::ChangeUrl,
        ActionKind::Screenshot,
        ActionKind::GetValue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Type => "type",
            ActionKind::Click => "click",
            ActionKind::Check => "check",
            ActionKind::Judge => "judge",
            ActionKind::SelectValue => "select_value",
            ActionKind::SelectIndex => "select_index",
            ActionKind::SelectText => "select_text",
            ActionKind::SelectTextExact => "select_text_exact",
            ActionKind::ChangeUrl => "change_url",
            ActionKind::Screenshot => "screenshot",
            ActionKind::GetValue => "get_value",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which of the equivalent locator expressions a step prefers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorVariant {
    #[default]
    Smart,
    Short,
    Absolute,
    /// No preference; the first non-empty variant wins
    None,
}

/// The equivalent locator expressions recorded for one element
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Locators {
    #[serde(default)]
    pub smart: String,
    #[serde(default)]
    pub short: String,
    #[serde(default)]
    pub absolute: String,
}

impl Locators {
    /// Locators with only the smart variant set
    pub fn smart(expr: impl Into<String>) -> Self {
        Self {
            smart: expr.into(),
            ..Default::default()
        }
    }

    /// Pick the expression for `variant`, falling back to the first
    /// non-empty of smart, short, absolute.
    pub fn select(&self, variant: LocatorVariant) -> &str {
        let preferred = match variant {
            LocatorVariant::Smart => self.smart.as_str(),
            LocatorVariant::Short => self.short.as_str(),
            LocatorVariant::Absolute => self.absolute.as_str(),
            LocatorVariant::None => "",
        };
        if !preferred.is_empty() {
            return preferred;
        }

        [&self.smart, &self.short, &self.absolute]
            .into_iter()
            .find(|expr| !expr.is_empty())
            .map(String::as_str)
            .unwrap_or("")
    }

    fn substitute(&self, variables: &VariableCollection) -> Self {
        Self {
            smart: variables.substitute(&self.smart),
            short: variables.substitute(&self.short),
            absolute: variables.substitute(&self.absolute),
        }
    }
}

/// What the orchestrator does when this step fails.
///
/// Deserializes from either the snake_case name or the numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "DispositionRepr")]
pub enum RetryDisposition {
    #[default]
    NoRetry,
    /// Restart the whole sequence from its first step
    RestartSequence,
}

impl RetryDisposition {
    /// Disposition for the numeric code used by recorded step files
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(RetryDisposition::NoRetry),
            10 => Some(RetryDisposition::RestartSequence),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DispositionRepr {
    Code(u8),
    Name(String),
}

impl TryFrom<DispositionRepr> for RetryDisposition {
    type Error = String;

    fn try_from(repr: DispositionRepr) -> Result<Self, Self::Error> {
        match repr {
            DispositionRepr::Code(code) => RetryDisposition::from_code(code)
                .ok_or_else(|| format!("unknown retry code {code}, expected 0 or 10")),
            DispositionRepr::Name(name) => match name.as_str() {
                "no_retry" => Ok(RetryDisposition::NoRetry),
                "restart_sequence" => Ok(RetryDisposition::RestartSequence),
                other => Err(format!(
                    "unknown retry disposition '{other}', expected no_retry or restart_sequence"
                )),
            },
        }
    }
}

/// One declarative automation instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Sequencing key, also used to name the step in failures
    pub execution_order: u32,
    pub action: ActionKind,
    /// Text to type, value to judge, URL to open or variable to store into
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub locators: Locators,
    #[serde(default)]
    pub locator_variant: LocatorVariant,
    /// Sub-behavior code, interpreted by the handler for `action`
    #[serde(default)]
    pub action_pattern: u32,
    #[serde(default)]
    pub retry: RetryDisposition,
    /// Seconds before the step is abandoned; 0 means unbounded
    #[serde(default)]
    pub timeout_seconds: f64,
    /// Seconds to wait after the step completes
    #[serde(default)]
    pub after_wait_seconds: f64,
    /// Page the step was recorded on
    #[serde(default)]
    pub url: String,
}

impl Step {
    pub fn new(execution_order: u32, action: ActionKind) -> Self {
        Self {
            execution_order,
            action,
            value: String::new(),
            locators: Locators::default(),
            locator_variant: LocatorVariant::default(),
            action_pattern: 0,
            retry: RetryDisposition::default(),
            timeout_seconds: 0.0,
            after_wait_seconds: 0.0,
            url: String::new(),
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_locator(mut self, expr: impl Into<String>) -> Self {
        self.locators = Locators::smart(expr);
        self.locator_variant = LocatorVariant::Smart;
        self
    }

    pub fn with_locators(mut self, locators: Locators, variant: LocatorVariant) -> Self {
        self.locators = locators;
        self.locator_variant = variant;
        self
    }

    pub fn with_action_pattern(mut self, pattern: u32) -> Self {
        self.action_pattern = pattern;
        self
    }

    pub fn with_retry(mut self, retry: RetryDisposition) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_after_wait(mut self, seconds: f64) -> Self {
        self.after_wait_seconds = seconds;
        self
    }

    /// The locator expression this step will be dispatched with
    pub fn selected_locator(&self) -> &str {
        self.locators.select(self.locator_variant)
    }

    /// Derived copy with `{{name}}` placeholders replaced in the value,
    /// every locator variant and the url
    pub fn with_variables(&self, variables: &VariableCollection) -> Step {
        Step {
            value: variables.substitute(&self.value),
            locators: self.locators.substitute(variables),
            url: variables.substitute(&self.url),
            ..self.clone()
        }
    }

    /// Short human-readable label used for progress reporting
    pub fn describe(&self) -> String {
        const MAX_CHARS: usize = 30;
        let mut preview: String = self.value.chars().take(MAX_CHARS).collect();
        if self.value.chars().count() > MAX_CHARS {
            preview.push_str("...");
        }
        format!("{}: {}", self.action, preview)
    }
}

/// Sort steps by execution order; equal orders keep their input order
pub fn sort_by_execution_order(steps: &[Step]) -> Vec<Step> {
    let mut sorted = steps.to_vec();
    sorted.sort_by_key(|step| step.execution_order);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_kind_serde_names() {
        for kind in ActionKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
        assert_eq!(ActionKind::ALL.len(), 11);
    }

    #[test]
    fn test_locator_falls_back_when_selected_variant_empty() {
        let locators = Locators {
            smart: String::new(),
            short: "//input[@id='a']".to_string(),
            absolute: "/html/body/input".to_string(),
        };
        assert_eq!(locators.select(LocatorVariant::Absolute), "/html/body/input");
        assert_eq!(locators.select(LocatorVariant::Smart), "//input[@id='a']");
        assert_eq!(locators.select(LocatorVariant::None), "//input[@id='a']");
        assert_eq!(Locators::default().select(LocatorVariant::Short), "");
    }

    #[test]
    fn test_with_variables_leaves_original_untouched() {
        let mut vars = VariableCollection::new();
        vars.set("user", "alice");
        vars.set("row", "3");

        let step = Step::new(1, ActionKind::Type)
            .with_value("{{user}}")
            .with_locator("//tr[{{row}}]/td")
            .with_retry(RetryDisposition::RestartSequence);
        let derived = step.with_variables(&vars);

        assert_eq!(derived.value, "alice");
        assert_eq!(derived.selected_locator(), "//tr[3]/td");
        assert_eq!(derived.retry, RetryDisposition::RestartSequence);
        assert_eq!(step.value, "{{user}}");
    }

    #[test]
    fn test_describe_truncates_long_values() {
        let step = Step::new(4, ActionKind::Type).with_value("x".repeat(40));
        assert_eq!(step.describe(), format!("type: {}...", "x".repeat(30)));

        let short = Step::new(5, ActionKind::Click).with_value("ok");
        assert_eq!(short.describe(), "click: ok");
    }

    #[test]
    fn test_sort_is_stable_by_order() {
        let steps = vec![
            Step::new(3, ActionKind::Click).with_value("c"),
            Step::new(1, ActionKind::Click).with_value("a"),
            Step::new(3, ActionKind::Click).with_value("d"),
            Step::new(2, ActionKind::Click).with_value("b"),
        ];
        let values: Vec<_> = sort_by_execution_order(&steps)
            .into_iter()
            .map(|s| s.value)
            .collect();
        assert_eq!(values, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_retry_disposition_codes() {
        assert_eq!(
            RetryDisposition::from_code(10),
            Some(RetryDisposition::RestartSequence)
        );
        assert_eq!(RetryDisposition::from_code(0), Some(RetryDisposition::NoRetry));
        assert_eq!(RetryDisposition::from_code(7), None);

        let coded: RetryDisposition = serde_json::from_str("10").unwrap();
        assert_eq!(coded, RetryDisposition::RestartSequence);
        let named: RetryDisposition = serde_json::from_str("\"no_retry\"").unwrap();
        assert_eq!(named, RetryDisposition::NoRetry);
        assert!(serde_json::from_str::<RetryDisposition>("7").is_err());
        assert!(serde_json::from_str::<RetryDisposition>("\"sometimes\"").is_err());

        let json = serde_json::to_string(&RetryDisposition::RestartSequence).unwrap();
        assert_eq!(json, "\"restart_sequence\"");
    }

    #[test]
    fn test_step_deserializes_with_defaults() {
        let yaml = r#"
execution_order: 2
action: get_value
value: total
locators:
  smart: "//span[@id='total']"
retry: restart_sequence
timeout_seconds: 2.5
"#;
        let step: Step = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(step.action, ActionKind::GetValue);
        assert_eq!(step.retry, RetryDisposition::RestartSequence);
        assert_eq!(step.timeout_seconds, 2.5);
        assert_eq!(step.after_wait_seconds, 0.0);
        assert_eq!(step.selected_locator(), "//span[@id='total']");
    }
}
