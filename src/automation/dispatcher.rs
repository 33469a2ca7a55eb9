//! Boundary to the action handlers that touch the document
//!
//! The engine only knows how to shape an [`ActionRequest`] from a step and
//! how to read an [`ActionOutcome`]. What a handler does with the locator is
//! outside this crate.

use super::step::{ActionKind, Step};
use super::ContextId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Everything a handler needs to perform one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub context: ContextId,
    pub action: ActionKind,
    pub locator: String,
    pub value: String,
    pub action_pattern: u32,
    pub step_order: u32,
}

impl ActionRequest {
    /// Shape the request for an already-substituted step.
    ///
    /// Navigation carries its URL in `value` and needs no locator; a click
    /// carries no value.
    pub fn for_step(context: ContextId, step: &Step) -> Self {
        let (locator, value) = match step.action {
            ActionKind::ChangeUrl => (String::new(), step.value.clone()),
            ActionKind::Click => (step.selected_locator().to_string(), String::new()),
            _ => (step.selected_locator().to_string(), step.value.clone()),
        };
        Self {
            context,
            action: step.action,
            locator,
            value,
            action_pattern: step.action_pattern,
            step_order: step.execution_order,
        }
    }
}

/// What a handler reports back
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: Option<String>,
    /// Value read by a capture step
    pub captured_value: Option<String>,
    /// Variable to store the captured value under, if not the step value
    pub captured_name: Option<String>,
}

impl ActionOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn captured(value: impl Into<String>) -> Self {
        Self {
            success: true,
            captured_value: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn with_captured_name(mut self, name: impl Into<String>) -> Self {
        self.captured_name = Some(name.into());
        self
    }
}

/// Executes steps against a context
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    /// Perform one step. An `Err` is treated the same as a failed outcome.
    async fn dispatch(&self, request: ActionRequest) -> anyhow::Result<ActionOutcome>;
}

/// Handler for one or more action kinds
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn execute(&self, request: &ActionRequest) -> anyhow::Result<ActionOutcome>;
}

/// Dispatcher that routes each action kind to its registered handler
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<ActionKind, Arc<dyn ActionHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every kind in `kinds`, replacing earlier ones
    pub fn register(
        &mut self,
        kinds: impl IntoIterator<Item = ActionKind>,
        handler: Arc<dyn ActionHandler>,
    ) -> &mut Self {
        for kind in kinds {
            self.handlers.insert(kind, handler.clone());
        }
        self
    }

    pub fn with_handler(mut self, kind: ActionKind, handler: Arc<dyn ActionHandler>) -> Self {
        self.register([kind], handler);
        self
    }

    pub fn handles(&self, kind: ActionKind) -> bool {
        self.handlers.contains_key(&kind)
    }
}

#[async_trait]
impl ActionDispatcher for HandlerRegistry {
    async fn dispatch(&self, request: ActionRequest) -> anyhow::Result<ActionOutcome> {
        match self.handlers.get(&request.action) {
            Some(handler) => handler.execute(&request).await,
            None => {
                warn!("Unknown action type: {}", request.action);
                Ok(ActionOutcome::failed(format!(
                    "Unknown action type: {}",
                    request.action
                )))
            }
        }
    }
}

/// Handler that logs each action and reports success without touching
/// any document. Used by the command-line runner.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunHandler;

#[async_trait]
impl ActionHandler for DryRunHandler {
    async fn execute(&self, request: &ActionRequest) -> anyhow::Result<ActionOutcome> {
        info!(
            "[dry-run] step {} on context {}: {} locator={:?} value={:?} pattern={}",
            request.step_order,
            request.context,
            request.action,
            request.locator,
            request.value,
            request.action_pattern
        );
        Ok(ActionOutcome::ok())
    }
}

impl HandlerRegistry {
    /// Registry with the dry-run handler bound to every action kind
    pub fn dry_run() -> Self {
        let mut registry = Self::new();
        registry.register(ActionKind::ALL, Arc::new(DryRunHandler));
        registry
    }
}
