//! Test data builders for step sequences

use crate::automation::{ActionKind, RetryDisposition, Step};

/// Builder for creating test step sequences.
///
/// Orders are assigned 1, 2, 3... in the order steps are added.
#[derive(Debug, Default)]
pub struct SequenceBuilder {
    steps: Vec<Step>,
}

impl SequenceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_order(&self) -> u32 {
        self.steps.len() as u32 + 1
    }

    pub fn step(mut self, action: ActionKind, value: &str) -> Self {
        let step = Step::new(self.next_order(), action)
            .with_value(value)
            .with_locator(format!("//*[@id='field{}']", self.next_order()));
        self.steps.push(step);
        self
    }

    pub fn type_text(self, value: &str) -> Self {
        self.step(ActionKind::Type, value)
    }

    pub fn click(self) -> Self {
        self.step(ActionKind::Click, "")
    }

    pub fn navigate(self, url: &str) -> Self {
        self.step(ActionKind::ChangeUrl, url)
    }

    pub fn capture(self, variable: &str) -> Self {
        self.step(ActionKind::GetValue, variable)
    }

    /// Modify the most recently added step
    pub fn last(mut self, update: impl FnOnce(Step) -> Step) -> Self {
        if let Some(step) = self.steps.pop() {
            self.steps.push(update(step));
        }
        self
    }

    pub fn restart_on_failure(self) -> Self {
        self.last(|step| step.with_retry(RetryDisposition::RestartSequence))
    }

    pub fn timeout(self, seconds: f64) -> Self {
        self.last(|step| step.with_timeout(seconds))
    }

    pub fn after_wait(self, seconds: f64) -> Self {
        self.last(|step| step.with_after_wait(seconds))
    }

    pub fn build(self) -> Vec<Step> {
        self.steps
    }
}
