//! In-memory context store
//!
//! Keeps per-session provider contexts in process memory. The production
//! deployment supplies its own durable [`ContextStore`]; this one backs
//! tests, offline replays, and the CLI.

use chorus_domain::error::ContextError;
use chorus_domain::traits::{ContextRole, ContextStore, ProviderContext};
use chorus_domain::SessionId;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// A [`ContextStore`] holding everything in a process-local map.
#[derive(Default)]
pub struct MemoryContextStore {
    contexts: RwLock<HashMap<(SessionId, ContextRole), Vec<ProviderContext>>>,
}

impl MemoryContextStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContextStore for MemoryContextStore {
    fn persist_contexts(
        &self,
        session: &SessionId,
        updates: Vec<ProviderContext>,
        role: ContextRole,
    ) -> Result<(), ContextError> {
        let mut contexts = self
            .contexts
            .write()
            .map_err(|e| ContextError::Storage(e.to_string()))?;
        debug!(session = %session, ?role, providers = updates.len(), "contexts persisted");
        contexts.insert((session.clone(), role), updates);
        Ok(())
    }

    fn get_contexts(
        &self,
        session: &SessionId,
        role: ContextRole,
    ) -> Result<Vec<ProviderContext>, ContextError> {
        let contexts = self
            .contexts
            .read()
            .map_err(|e| ContextError::Storage(e.to_string()))?;
        contexts
            .get(&(session.clone(), role))
            .cloned()
            .ok_or_else(|| ContextError::NotFound(session.to_string()))
    }
}
