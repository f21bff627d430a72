//! Route table with subtree and exact patterns.

use std::sync::Arc;

use crate::backends::BackendRoute;
use crate::error::StartupError;
use crate::helm::HelmOperation;
use crate::relay::ResourceKind;

/// What must be resolved before an endpoint runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Runs without an identity.
    Public,
    /// Runs only after the auth gate produced an identity.
    Identity,
}

/// What a matched route does.
#[derive(Debug, Clone)]
pub enum Endpoint {
    Backend(Arc<BackendRoute>),
    Login,
    Logout,
    Callback,
    DeleteToken,
    ResourceList(ResourceKind),
    Helm(HelmOperation),
    HelmRelease,
    Version,
    Health,
    Static,
    Shell,
    NotFound,
}

#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub pattern: String,
    pub guard: Guard,
    pub endpoint: Endpoint,
}

impl RouteEntry {
    /// Patterns ending in `/` match their subtree, others match exactly.
    pub fn matches(&self, path: &str) -> bool {
        if self.pattern.ends_with('/') {
            path.starts_with(&self.pattern)
        } else {
            path == self.pattern
        }
    }
}

/// Built once at startup; read-only afterwards.
#[derive(Debug, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        pattern: impl Into<String>,
        guard: Guard,
        endpoint: Endpoint,
    ) -> Result<(), StartupError> {
        let pattern = pattern.into();
        if self.entries.iter().any(|e| e.pattern == pattern) {
            return Err(StartupError::DuplicateRoute(pattern));
        }
        self.entries.push(RouteEntry {
            pattern,
            guard,
            endpoint,
        });
        Ok(())
    }

    /// The matching entry with the longest pattern.
    pub fn lookup(&self, path: &str) -> Option<&RouteEntry> {
        self.entries
            .iter()
            .filter(|e| e.matches(path))
            .max_by_key(|e| e.pattern.len())
    }

    /// Subtree pattern that `path` names without its trailing slash, when
    /// `path` itself is not registered.
    pub fn redirect_target(&self, path: &str) -> Option<&str> {
        if path.ends_with('/') || self.entries.iter().any(|e| e.pattern == path) {
            return None;
        }
        self.entries
            .iter()
            .find(|e| e.pattern.strip_suffix('/') == Some(path))
            .map(|e| e.pattern.as_str())
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
