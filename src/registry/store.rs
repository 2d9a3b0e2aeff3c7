//! Thread-safe session storage.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use tracing::{debug, warn};

use super::Registry;
use crate::error::TermhubError;
use crate::session::{Environment, IdSource, SequentialIds, Session, SessionId};
use crate::Result;

/// Builds a session, choosing its own id, from an environment.
pub type EnvironmentFactory = Box<dyn Fn(Environment) -> Result<Session> + Send + Sync>;

/// The authoritative id to session mapping.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Session>>,
    ids: Box<dyn IdSource>,
    environment_factory: EnvironmentFactory,
}

impl SessionRegistry {
    /// Create an empty registry using `environment_factory` for
    /// [`Registry::create_from_environment`] and sequential ids.
    pub fn new<F>(environment_factory: F) -> Self
    where
        F: Fn(Environment) -> Result<Session> + Send + Sync + 'static,
    {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ids: Box::new(SequentialIds::new()),
            environment_factory: Box::new(environment_factory),
        }
    }

    /// Replace the source of ids handed to [`Registry::add_with_factory`].
    pub fn with_id_source<S: IdSource + 'static>(mut self, ids: S) -> Self {
        self.ids = Box::new(ids);
        self
    }

    /// Register `session` unless its id is taken. Check and insert happen
    /// under one write lock.
    fn insert(&self, session: Session) -> Result<Session> {
        let id = session.id();
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| TermhubError::LockPoisoned)?;

        match sessions.entry(id) {
            Entry::Occupied(_) => {
                warn!(session = %id, "duplicate session id rejected");
                Err(TermhubError::DuplicateId(id))
            }
            Entry::Vacant(entry) => {
                entry.insert(session.clone());
                debug!(session = %id, "session registered");
                Ok(session)
            }
        }
    }

    /// Remove every closed session, returning how many were removed.
    pub fn prune_closed(&self) -> Result<usize> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| TermhubError::LockPoisoned)?;

        let before = sessions.len();
        sessions.retain(|_, session| session.is_open());
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, "pruned closed sessions");
        }
        Ok(removed)
    }
}

impl Registry for SessionRegistry {
    fn add_with_factory<F>(&self, factory: F) -> Result<Session>
    where
        F: FnOnce(SessionId) -> Result<Session>,
    {
        let expected = self.ids.next_id();
        let session = factory(expected)?;

        let actual = session.id();
        if actual != expected {
            warn!(%expected, %actual, "session factory returned wrong id");
            return Err(TermhubError::IdentityMismatch { expected, actual });
        }

        self.insert(session)
    }

    fn create_from_environment(&self, environment: Environment) -> Result<Session> {
        let session = (self.environment_factory)(environment)?;
        self.insert(session)
    }

    fn lookup(&self, id: SessionId) -> Result<Option<Session>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| TermhubError::LockPoisoned)?;
        Ok(sessions.get(&id).cloned())
    }

    fn remove(&self, id: SessionId) -> Result<()> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| TermhubError::LockPoisoned)?;
        if sessions.remove(&id).is_some() {
            debug!(session = %id, "session removed");
        }
        Ok(())
    }

    fn ids(&self) -> Result<Vec<SessionId>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| TermhubError::LockPoisoned)?;
        let mut ids: Vec<SessionId> = sessions.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }
}

impl fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.len())
            .finish()
    }
}
