//! Registry view restricted to the sessions a principal may see.

use std::fmt;

use tracing::warn;

use super::Registry;
use crate::error::TermhubError;
use crate::session::{Environment, Principal, Session, SessionId};
use crate::Result;

/// Decorates a [`Registry`] so sessions whose owner fails `filter` are
/// invisible: lookups report them missing and removals ignore them.
///
/// Creation delegates first and checks afterwards. A rejected session stays
/// registered in the inner registry; the caller only sees
/// [`TermhubError::ForeignOwner`].
pub struct AccessFilteredRegistry<R, F> {
    inner: R,
    filter: F,
}

impl<R, F> AccessFilteredRegistry<R, F>
where
    R: Registry,
    F: Fn(Option<&Principal>) -> bool + Send + Sync,
{
    pub fn new(inner: R, filter: F) -> Self {
        Self { inner, filter }
    }

    /// The unfiltered registry.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn visible(&self, session: &Session) -> bool {
        (self.filter)(session.owner().as_ref())
    }

    fn verify_owner(&self, session: Session, action: &'static str) -> Result<Session> {
        if self.visible(&session) {
            Ok(session)
        } else {
            warn!(session = %session.id(), action, "session belongs to different user");
            Err(TermhubError::ForeignOwner { action })
        }
    }
}

impl<R, F> Registry for AccessFilteredRegistry<R, F>
where
    R: Registry,
    F: Fn(Option<&Principal>) -> bool + Send + Sync,
{
    fn add_with_factory<G>(&self, factory: G) -> Result<Session>
    where
        G: FnOnce(SessionId) -> Result<Session>,
    {
        let session = self.inner.add_with_factory(factory)?;
        self.verify_owner(session, "added")
    }

    fn create_from_environment(&self, environment: Environment) -> Result<Session> {
        let session = self.inner.create_from_environment(environment)?;
        self.verify_owner(session, "created")
    }

    fn lookup(&self, id: SessionId) -> Result<Option<Session>> {
        Ok(self.inner.lookup(id)?.filter(|s| self.visible(s)))
    }

    fn remove(&self, id: SessionId) -> Result<()> {
        if self.lookup(id)?.is_some() {
            self.inner.remove(id)?;
        }
        Ok(())
    }

    fn ids(&self) -> Result<Vec<SessionId>> {
        let mut visible = Vec::new();
        for id in self.inner.ids()? {
            if self.lookup(id)?.is_some() {
                visible.push(id);
            }
        }
        Ok(visible)
    }
}

impl<R: fmt::Debug, F> fmt::Debug for AccessFilteredRegistry<R, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessFilteredRegistry")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}
