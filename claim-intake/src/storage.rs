use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::{error::Result, wizard::Wizard};

/// One user's wizard between requests.
#[derive(Debug, Clone)]
pub struct WizardSession {
    pub id: String,
    /// Account that opened the session
    pub account_id: String,
    pub wizard: Wizard,
}

impl WizardSession {
    pub fn new(account_id: impl Into<String>, wizard: Wizard) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.into(),
            wizard,
        }
    }
}

/// Trait for storing and retrieving wizard sessions
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn save(&self, session: WizardSession) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<WizardSession>>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// In-memory implementation of SessionStorage
#[derive(Default)]
pub struct InMemorySessionStorage {
    sessions: Arc<DashMap<String, WizardSession>>,
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn save(&self, session: WizardSession) -> Result<()> {
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<WizardSession>> {
        Ok(self.sessions.get(id).map(|entry| entry.clone()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.sessions.remove(id);
        Ok(())
    }
}
