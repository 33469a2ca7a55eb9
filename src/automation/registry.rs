//! Single-flight guard per context

use super::ContextId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Set of contexts currently running a sequence.
///
/// Clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct ActiveExecutionRegistry {
    active: Arc<Mutex<HashSet<ContextId>>>,
}

impl ActiveExecutionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn active(&self) -> MutexGuard<'_, HashSet<ContextId>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark `context` active, or return `None` if it already is.
    ///
    /// The check and the insert happen under one lock, so of two
    /// concurrent callers exactly one gets a guard.
    pub fn try_acquire(&self, context: ContextId) -> Option<ExecutionGuard> {
        if !self.active().insert(context) {
            warn!("Auto-fill already in progress for context {}", context);
            return None;
        }
        debug!("Registered active execution for context {}", context);
        Some(ExecutionGuard {
            registry: self.clone(),
            context,
        })
    }

    pub fn is_active(&self, context: ContextId) -> bool {
        self.active().contains(&context)
    }

    pub fn active_count(&self) -> usize {
        self.active().len()
    }
}

/// RAII marker for an active execution.
///
/// Dropping it unregisters the context, whether the run returned,
/// panicked, or its future was dropped mid-flight.
#[derive(Debug)]
pub struct ExecutionGuard {
    registry: ActiveExecutionRegistry,
    context: ContextId,
}

impl ExecutionGuard {
    pub fn context(&self) -> ContextId {
        self.context
    }
}

impl Drop for ExecutionGuard {
    fn drop(&mut self) {
        self.registry.active().remove(&self.context);
        debug!("Released active execution for context {}", self.context);
    }
}
