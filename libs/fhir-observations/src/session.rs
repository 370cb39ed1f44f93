//! Authenticated session and transport seams

use crate::error::{Error, Result};
use crate::models::Bundle;
use async_trait::async_trait;
use std::sync::Arc;

/// Options passed with every search request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestOptions {
    /// Maximum number of pages the transport may fetch; `0` means no limit.
    pub page_limit: u32,
}

impl RequestOptions {
    /// Let the transport follow every `next` link
    pub fn unlimited() -> Self {
        Self { page_limit: 0 }
    }

    /// Whether `pages_read` pages exhaust the limit
    pub fn limit_reached(&self, pages_read: u32) -> bool {
        self.page_limit != 0 && pages_read >= self.page_limit
    }
}

/// A ready, authenticated session scoped to the current patient
#[async_trait]
pub trait PatientSession: Send + Sync {
    /// Execute a relative search URL (e.g. `Observation?code=...`) and return
    /// the result pages in order.
    async fn request(&self, query: &str, options: &RequestOptions) -> Result<Vec<Bundle>>;
}

/// Hands out the current patient session once it is ready
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn ready(&self) -> Result<Arc<dyn PatientSession>>;
}

/// Provider for a session that was authenticated up front.
#[derive(Clone)]
pub struct StaticSessionProvider {
    session: std::result::Result<Arc<dyn PatientSession>, String>,
}

impl StaticSessionProvider {
    pub fn new(session: Arc<dyn PatientSession>) -> Self {
        Self {
            session: Ok(session),
        }
    }

    /// A provider whose `ready` always fails with `reason`
    pub fn not_ready(reason: impl Into<String>) -> Self {
        Self {
            session: Err(reason.into()),
        }
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn ready(&self) -> Result<Arc<dyn PatientSession>> {
        self.session.clone().map_err(Error::SessionNotReady)
    }
}
