//! Session registries.
//!
//! [`SessionRegistry`] owns the id to session mapping. [`AccessFilteredRegistry`]
//! wraps any [`Registry`] and hides sessions owned by other principals.

mod filtered;
mod store;

pub use filtered::AccessFilteredRegistry;
pub use store::{EnvironmentFactory, SessionRegistry};

use crate::error::TermhubError;
use crate::session::{Environment, Session, SessionId};
use crate::Result;

/// Operations shared by all registries.
pub trait Registry: Send + Sync {
    /// Register the session built by `factory` for a registry-chosen id.
    ///
    /// The session must report that same id.
    fn add_with_factory<F>(&self, factory: F) -> Result<Session>
    where
        F: FnOnce(SessionId) -> Result<Session>;

    /// Build a session from `environment` with the registry's environment
    /// factory and register it under its own id.
    fn create_from_environment(&self, environment: Environment) -> Result<Session>;

    fn lookup(&self, id: SessionId) -> Result<Option<Session>>;

    /// Like [`Registry::lookup`] but a missing session is an error.
    fn lookup_or_fail(&self, id: SessionId) -> Result<Session> {
        self.lookup(id)?.ok_or(TermhubError::NotFound(id))
    }

    /// Drop the session with `id`, if any.
    fn remove(&self, id: SessionId) -> Result<()>;

    /// Registered ids, sorted.
    fn ids(&self) -> Result<Vec<SessionId>>;

    fn len(&self) -> usize {
        self.ids().map(|ids| ids.len()).unwrap_or(0)
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
