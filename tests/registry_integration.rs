//! Registry integration tests.
//!
//! These tests exercise the registry and its access-filtered view through the
//! public API, including concurrent use from many threads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use termhub::registry::{AccessFilteredRegistry, Registry, SessionRegistry};
use termhub::session::{Environment, Principal, SequentialIds, Session, SessionId, Value};
use termhub::{Result, TermhubError};

fn silent(_: &str, _: &Session) -> Result<Option<Value>> {
    Ok(None)
}

fn session(id: SessionId, owner: Option<&str>) -> Result<Session> {
    let user = owner.map(Principal::parse).transpose()?;
    Session::builder(id)
        .environment(Environment::new().with_user(user))
        .evaluator(silent)
        .build()
}

/// Registry whose environment factory hands out ids from 0x100.
fn registry() -> SessionRegistry {
    let next = AtomicU64::new(0x100);
    SessionRegistry::new(move |environment: Environment| -> Result<Session> {
        Session::builder(SessionId::of(next.fetch_add(1, Ordering::SeqCst)))
            .environment(environment)
            .evaluator(silent)
            .build()
    })
}

fn principal(email: &str) -> Principal {
    Principal::parse(email).unwrap()
}

// ============================================================================
// SessionId Tests
// ============================================================================

#[test]
fn test_id_hex_round_trip() {
    for text in ["0", "1", "ff", "DEADbeef", "00a", "ffffffffffffffff"] {
        let id = SessionId::parse(text).unwrap();
        let canonical = format!("{:x}", u64::from_str_radix(text, 16).unwrap());
        assert_eq!(id.to_string(), canonical);
        assert_eq!(SessionId::parse(&id.to_string()).unwrap(), id);
    }
}

#[test]
fn test_id_rejects_malformed_text() {
    for text in ["", "xyz", "0x10", "-1", "1 2", "10000000000000000"] {
        assert!(
            matches!(SessionId::parse(text), Err(TermhubError::InvalidFormat(_))),
            "{text:?} should not parse"
        );
    }
}

#[test]
fn test_id_ordering_is_numeric() {
    let mut ids = vec![SessionId::of(0x10), SessionId::of(2), SessionId::of(0xa)];
    ids.sort();
    assert_eq!(
        ids.iter().map(ToString::to_string).collect::<Vec<_>>(),
        vec!["2", "a", "10"]
    );
}

// ============================================================================
// SessionRegistry Tests
// ============================================================================

#[test]
fn test_add_then_lookup() {
    let registry = registry().with_id_source(SequentialIds::starting_at(0x20));

    let added = registry.add_with_factory(|id| session(id, None)).unwrap();

    assert_eq!(added.id(), SessionId::of(0x20));
    let found = registry.lookup(added.id()).unwrap().unwrap();
    assert!(found.same_session(&added));
    assert!(registry.lookup_or_fail(added.id()).is_ok());
}

#[test]
fn test_duplicate_from_environment_keeps_first() {
    let registry = SessionRegistry::new(|environment: Environment| -> Result<Session> {
        Session::builder(SessionId::of(0x42))
            .environment(environment)
            .evaluator(silent)
            .build()
    });

    let first = registry.create_from_environment(Environment::new()).unwrap();
    let err = registry
        .create_from_environment(Environment::new())
        .unwrap_err();

    assert!(matches!(err, TermhubError::DuplicateId(id) if id == SessionId::of(0x42)));
    let kept = registry.lookup(SessionId::of(0x42)).unwrap().unwrap();
    assert!(kept.same_session(&first));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_duplicate_between_factory_and_environment() {
    let registry = registry().with_id_source(|| SessionId::of(0x100));

    let first = registry.add_with_factory(|id| session(id, None)).unwrap();
    let err = registry
        .create_from_environment(Environment::new())
        .unwrap_err();

    assert!(matches!(err, TermhubError::DuplicateId(_)));
    assert!(registry
        .lookup(first.id())
        .unwrap()
        .unwrap()
        .same_session(&first));
}

#[test]
fn test_factory_returning_wrong_id_is_not_registered() {
    let registry = registry();

    let err = registry
        .add_with_factory(|id| session(SessionId::of(id.as_u64() + 1), None))
        .unwrap_err();

    assert!(matches!(err, TermhubError::IdentityMismatch { .. }));
    assert!(registry.is_empty());
}

#[test]
fn test_remove_absent_is_noop() {
    let registry = registry();
    let kept = registry.create_from_environment(Environment::new()).unwrap();

    registry.remove(SessionId::of(0xdead)).unwrap();
    registry.remove(SessionId::of(0xdead)).unwrap();

    assert_eq!(registry.ids().unwrap(), vec![kept.id()]);
}

#[test]
fn test_lookup_or_fail_message() {
    let registry = registry();
    let err = registry.lookup_or_fail(SessionId::of(0xbeef)).unwrap_err();
    assert!(matches!(err, TermhubError::NotFound(_)));
    assert!(err.to_string().contains("beef"));
}

#[test]
fn test_prune_closed() {
    let registry = registry();
    let closed = registry.create_from_environment(Environment::new()).unwrap();
    let open = registry.create_from_environment(Environment::new()).unwrap();
    closed.close();

    assert_eq!(registry.prune_closed().unwrap(), 1);
    assert_eq!(registry.ids().unwrap(), vec![open.id()]);
}

#[test]
fn test_concurrent_create_and_remove() {
    let registry = Arc::new(registry());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let mut kept = Vec::new();
                for i in 0..50 {
                    let session = registry.create_from_environment(Environment::new()).unwrap();
                    if i % 2 == 0 {
                        registry.remove(session.id()).unwrap();
                    } else {
                        kept.push(session.id());
                    }
                }
                kept
            })
        })
        .collect();

    let mut kept: Vec<SessionId> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    kept.sort();

    assert_eq!(kept.len(), 16 * 25);
    assert_eq!(registry.ids().unwrap(), kept);
}

#[test]
fn test_concurrent_same_id_single_winner() {
    let registry = Arc::new(registry().with_id_source(|| SessionId::of(7)));

    let handles: Vec<_> = (0..24)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.add_with_factory(|id| session(id, None)).is_ok())
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();

    assert_eq!(winners, 1);
    assert_eq!(registry.len(), 1);
}

// ============================================================================
// AccessFilteredRegistry Tests
// ============================================================================

#[test]
fn test_filtered_lookup_hides_foreign_sessions() {
    let alice = principal("alice@example.com");
    let bob = principal("bob@example.com");

    let inner = registry().with_id_source(SequentialIds::starting_at(1));
    let owned = inner
        .add_with_factory(|id| session(id, Some("alice@example.com")))
        .unwrap();

    let as_bob = AccessFilteredRegistry::new(inner, move |user: Option<&Principal>| {
        user == Some(&bob)
    });

    assert!(as_bob.lookup(owned.id()).unwrap().is_none());
    assert!(matches!(
        as_bob.lookup_or_fail(owned.id()),
        Err(TermhubError::NotFound(_))
    ));
    assert!(as_bob.ids().unwrap().is_empty());

    // the session is still there underneath
    let found = as_bob.inner().lookup(owned.id()).unwrap().unwrap();
    assert_eq!(found.owner(), Some(alice));
}

#[test]
fn test_filtered_remove_foreign_is_silent_noop() {
    let inner = registry();
    let owned = inner
        .create_from_environment(Environment::new().with_user(Some(principal("alice@example.com"))))
        .unwrap();

    let as_bob = AccessFilteredRegistry::new(inner, |user: Option<&Principal>| {
        user.map(Principal::as_str) == Some("bob@example.com")
    });

    as_bob.remove(owned.id()).unwrap();
    assert!(as_bob.inner().lookup(owned.id()).unwrap().is_some());
}

#[test]
fn test_filtered_create_rejects_foreign_owner_without_rollback() {
    let as_alice = AccessFilteredRegistry::new(registry(), |user: Option<&Principal>| {
        user.map(Principal::as_str) == Some("alice@example.com")
    });

    let err = as_alice
        .create_from_environment(Environment::new().with_user(Some(principal("bob@example.com"))))
        .unwrap_err();

    assert!(matches!(err, TermhubError::ForeignOwner { .. }));
    assert_eq!(err.to_string(), "created session belongs to different user");
    assert_eq!(as_alice.inner().len(), 1);
    assert!(as_alice.is_empty());
}

#[test]
fn test_filtered_own_session_round_trip() {
    let as_alice = AccessFilteredRegistry::new(registry(), |user: Option<&Principal>| {
        user.map(Principal::as_str) == Some("alice@example.com")
    });

    let mine = as_alice
        .create_from_environment(
            Environment::new().with_user(Some(principal("alice@example.com"))),
        )
        .unwrap();

    assert!(as_alice.lookup(mine.id()).unwrap().is_some());
    as_alice.remove(mine.id()).unwrap();
    assert!(as_alice.inner().is_empty());
}
