//! Scripted action dispatcher for testing

use crate::automation::{
    ActionDispatcher, ActionOutcome, ActionRequest, CancellationCoordinator, CANCELLED_MESSAGE,
};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the dispatcher does when a given step is dispatched
#[derive(Debug, Clone, PartialEq)]
pub enum StepBehavior {
    Succeed,
    Fail(String),
    /// Fail the first `times` dispatches of the step, then succeed
    FailTimes { times: usize, message: String },
    /// Never resolve
    Hang,
    Capture {
        value: String,
        name: Option<String>,
    },
    /// Succeed after sleeping
    Delay(Duration),
    /// Request cancellation of the running context and report it
    CancelSelf,
    /// Return an `Err` instead of an outcome
    Error(String),
    Panic(String),
}

/// Dispatcher whose outcome per step is scripted up front.
///
/// Steps without a script succeed. Every request is recorded so tests can
/// assert on what the engine actually sent.
#[derive(Clone, Default)]
pub struct ScriptedDispatcher {
    behaviors: Arc<Mutex<HashMap<u32, StepBehavior>>>,
    calls: Arc<Mutex<HashMap<u32, usize>>>,
    requests: Arc<Mutex<Vec<ActionRequest>>>,
    cancellation: Option<CancellationCoordinator>,
}

impl ScriptedDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the behavior of the step with execution order `order`
    pub fn with_behavior(self, order: u32, behavior: StepBehavior) -> Self {
        self.behaviors.lock().unwrap().insert(order, behavior);
        self
    }

    /// Coordinator used by [`StepBehavior::CancelSelf`]
    pub fn with_cancellation(mut self, cancellation: CancellationCoordinator) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    pub fn set_behavior(&self, order: u32, behavior: StepBehavior) {
        self.behaviors.lock().unwrap().insert(order, behavior);
    }

    /// Every request received, in dispatch order
    pub fn requests(&self) -> Vec<ActionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Execution orders of every request received, in dispatch order
    pub fn dispatched_orders(&self) -> Vec<u32> {
        self.requests().iter().map(|r| r.step_order).collect()
    }

    /// How many times the step with `order` was dispatched
    pub fn call_count(&self, order: u32) -> usize {
        self.calls.lock().unwrap().get(&order).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ActionDispatcher for ScriptedDispatcher {
    async fn dispatch(&self, request: ActionRequest) -> Result<ActionOutcome> {
        let order = request.step_order;
        let context = request.context;
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(order).or_insert(0);
            *count += 1;
            *count
        };
        self.requests.lock().unwrap().push(request);

        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .get(&order)
            .cloned()
            .unwrap_or(StepBehavior::Succeed);

        match behavior {
            StepBehavior::Succeed => Ok(ActionOutcome::ok()),
            StepBehavior::Fail(message) => Ok(ActionOutcome::failed(message)),
            StepBehavior::FailTimes { times, message } => {
                if call <= times {
                    Ok(ActionOutcome::failed(message))
                } else {
                    Ok(ActionOutcome::ok())
                }
            }
            StepBehavior::Hang => std::future::pending().await,
            StepBehavior::Capture { value, name } => {
                let outcome = ActionOutcome::captured(value);
                Ok(match name {
                    Some(name) => outcome.with_captured_name(name),
                    None => outcome,
                })
            }
            StepBehavior::Delay(duration) => {
                tokio::time::sleep(duration).await;
                Ok(ActionOutcome::ok())
            }
            StepBehavior::CancelSelf => {
                let Some(cancellation) = &self.cancellation else {
                    anyhow::bail!("CancelSelf scripted without a cancellation coordinator");
                };
                cancellation.request_cancellation(context);
                Ok(ActionOutcome::failed(CANCELLED_MESSAGE))
            }
            StepBehavior::Error(message) => Err(anyhow::anyhow!(message)),
            StepBehavior::Panic(message) => panic!("{}", message),
        }
    }
}
