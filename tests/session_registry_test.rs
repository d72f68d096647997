mod common;

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use common::{FLAKY_KEYSPACE, ScriptedConnector, UNREACHABLE_HOST};
use cqlbridge::{CqlBridgeError, RequestDescriptor, SessionRegistry};

fn request(account: &str) -> RequestDescriptor {
    RequestDescriptor::new("cql://node1.local:9042/bundle")
        .with_account(account)
        .with_schema("shop")
}

#[test]
fn test_concurrent_lookups_share_one_session() {
    let registry = Arc::new(SessionRegistry::new(
        ScriptedConnector::new().with_connect_delay(Duration::from_millis(50)),
    ));
    let num_threads = 16;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let registry = registry.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                registry.get_session(&request("svc"), true).unwrap().unwrap()
            })
        })
        .collect();

    let sessions: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(registry.connector().connects(), 1);
    assert_eq!(registry.len(), 1);
    for session in &sessions[1..] {
        assert!(Arc::ptr_eq(&sessions[0], session));
    }
}

#[test]
fn test_accounts_get_separate_sessions() {
    let registry = SessionRegistry::new(ScriptedConnector::new());

    let alice = registry.session(&request("alice")).unwrap();
    let bob = registry.session(&request("bob")).unwrap();

    assert!(!Arc::ptr_eq(&alice, &bob));
    assert_eq!(registry.len(), 2);
    assert_ne!(
        registry.resolve_key(&request("alice")).unwrap(),
        registry.resolve_key(&request("bob")).unwrap()
    );
}

#[test]
fn test_close_then_lookup_returns_none() {
    let registry = SessionRegistry::new(ScriptedConnector::new());
    let config = request("svc");

    registry.session(&config).unwrap();
    assert!(registry.close_session(&config).unwrap().is_none());

    assert!(registry.get_session(&config, false).unwrap().is_none());
    assert!(registry.is_empty());
    assert_eq!(registry.connector().closes(), 1);
}

#[test]
fn test_close_of_unknown_session_is_noop() {
    let registry = SessionRegistry::new(ScriptedConnector::new());

    assert!(registry.close_session(&request("ghost")).unwrap().is_none());
    assert_eq!(registry.connector().closes(), 0);
}

#[test]
fn test_failed_release_still_removes_entry() {
    let registry = SessionRegistry::new(ScriptedConnector::new());
    let config = request("svc").with_schema(FLAKY_KEYSPACE);

    registry.session(&config).unwrap();
    let release_error = registry.close_session(&config).unwrap().expect("release should fail");

    assert_eq!(release_error.key, registry.resolve_key(&config).unwrap());
    assert!(!registry.contains(&config).unwrap());
}

#[test]
fn test_close_all_empties_registry_despite_failures() {
    let registry = SessionRegistry::new(ScriptedConnector::new());
    registry.session(&request("a")).unwrap();
    registry.session(&request("b").with_schema(FLAKY_KEYSPACE)).unwrap();
    registry.session(&request("c")).unwrap();
    registry.session(&request("d").with_schema(FLAKY_KEYSPACE)).unwrap();

    let errors = registry.close_all();

    assert_eq!(errors.len(), 2);
    assert!(registry.is_empty());
    // every session got its release attempt
    assert_eq!(registry.connector().closes(), 4);
}

#[test]
fn test_connect_failure_leaves_no_entry() {
    let registry = SessionRegistry::new(ScriptedConnector::new());
    let config = RequestDescriptor::new(format!("cql://{UNREACHABLE_HOST}:9042")).with_account("svc");

    let err = registry.get_session(&config, true).unwrap_err();

    assert!(matches!(err, CqlBridgeError::Connect { .. }));
    assert!(registry.is_empty());
    assert!(registry.get_session(&config, false).unwrap().is_none());
}

#[test]
fn test_malformed_target_creates_nothing() {
    let registry = SessionRegistry::new(ScriptedConnector::new());
    let config = RequestDescriptor::new("://missing-scheme").with_account("svc");

    assert!(matches!(
        registry.get_session(&config, true),
        Err(CqlBridgeError::MalformedTarget { .. })
    ));
    assert!(matches!(
        registry.close_session(&config),
        Err(CqlBridgeError::MalformedTarget { .. })
    ));
    assert_eq!(registry.connector().connects(), 0);
}

#[test]
fn test_racing_close_and_lookup_never_leak_sessions() {
    let registry = Arc::new(SessionRegistry::new(
        ScriptedConnector::new().with_connect_delay(Duration::from_millis(1)),
    ));
    let num_threads = 8;
    let iterations = 50;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|i| {
            let registry = registry.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..iterations {
                    if i % 2 == 0 {
                        registry.session(&request("shared")).unwrap();
                    } else {
                        registry.close_session(&request("shared")).unwrap();
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(registry.len() <= 1);
    assert!(registry.close_all().is_empty());
    assert!(registry.is_empty());

    // each created session was released exactly once
    let connector = registry.connector();
    assert_eq!(connector.connects(), connector.closes());
}
