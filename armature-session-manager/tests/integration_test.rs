//! Integration tests for armature-session-manager

use armature_session_manager::*;
use chrono::{TimeZone, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

struct Counters {
    starts: Arc<AtomicUsize>,
    ends: Arc<AtomicUsize>,
}

fn store_with_counters(timeout: Duration, sweep: Duration) -> (SessionStore<String>, Counters) {
    let starts = Arc::new(AtomicUsize::new(0));
    let ends = Arc::new(AtomicUsize::new(0));
    let s = starts.clone();
    let e = ends.clone();

    let store = SessionStore::builder()
        .timeout(timeout)
        .sweep_interval(sweep)
        .on_start(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        })
        .on_end(move |_| {
            e.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    (store, Counters { starts, ends })
}

#[tokio::test]
async fn test_reaper_evicts_idle_session() {
    let (store, counters) =
        store_with_counters(Duration::from_millis(100), Duration::from_millis(10));

    let session = store.get_or_create("").unwrap();
    let old_id = session.id().to_string();
    assert_eq!(counters.starts.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(600)).await;

    assert!(!store.has(&old_id));
    assert_eq!(counters.ends.load(Ordering::SeqCst), 1);

    // The old id behaves like any unknown id
    let replacement = store.get_or_create(&old_id).unwrap();
    assert_ne!(replacement.id(), old_id);
    assert_eq!(counters.starts.load(Ordering::SeqCst), 2);
    assert_eq!(counters.ends.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_expiry_is_relative_to_last_touch() {
    // One time unit is 500ms; timeout is two units
    let unit = Duration::from_millis(500);
    let (store, counters) = store_with_counters(unit * 2, Duration::from_millis(10));

    let a = store.get_or_create("").unwrap();
    tokio::time::sleep(unit).await;

    let touched = store.get_or_create(a.id()).unwrap();
    assert_eq!(touched.id(), a.id());

    // 2.5 units after creation, 1.5 units after the touch
    tokio::time::sleep(unit * 3 / 2).await;
    assert!(store.has(a.id()));
    assert_eq!(counters.ends.load(Ordering::SeqCst), 0);

    // Well past two units since the touch
    tokio::time::sleep(unit * 3).await;
    assert!(!store.has(a.id()));
    assert_eq!(counters.ends.load(Ordering::SeqCst), 1);
    assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_reaper_keeps_running_after_hook_panic() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = calls.clone();
    let store: SessionStore<()> = SessionStore::builder()
        .timeout(Duration::from_millis(20))
        .sweep_interval(Duration::from_millis(5))
        .on_end(move |_| {
            if c.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("first on_end fails");
            }
        })
        .build()
        .unwrap();

    let first = store.get_or_create("").unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!store.has(first.id()));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let second = store.get_or_create("").unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(!store.has(second.id()));
    assert!(store.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_far_future_expiry_keeps_four_digit_year() {
    let store: SessionStore<()> = SessionStore::builder()
        .timeout(Duration::from_secs(10_000 * 365 * 24 * 60 * 60))
        .build()
        .unwrap();

    let session = store.get_or_create("").unwrap();
    let header = store.set_cookie_header(&session);

    assert!(header.ends_with("-Dec-9999 23:59:59 GMT;"), "{}", header);
    assert_eq!(cookie::candidate_id(Some(&header)), session.id());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creation_with_reaper_running() {
    const K: usize = 256;

    let (store, counters) =
        store_with_counters(Duration::from_secs(300), Duration::from_millis(1));
    let store = Arc::new(store);

    let tasks: Vec<_> = (0..K)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.get_or_create("").unwrap().id().to_string() })
        })
        .collect();

    let ids: HashSet<String> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(ids.len(), K);
    assert_eq!(store.len(), K);
    assert_eq!(counters.starts.load(Ordering::SeqCst), K);
    assert_eq!(counters.ends.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_touches_share_one_session() {
    let (store, counters) =
        store_with_counters(Duration::from_secs(300), Duration::from_millis(1));
    let store = Arc::new(store);
    let id = store.get_or_create("").unwrap().id().to_string();

    let tasks: Vec<_> = (0..64)
        .map(|_| {
            let store = store.clone();
            let id = id.clone();
            tokio::spawn(async move { store.get_or_create(&id).unwrap().id().to_string() })
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        assert_eq!(result.unwrap(), id);
    }
    assert_eq!(store.len(), 1);
    assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_remove_then_access_mints_new_id() {
    let (store, counters) =
        store_with_counters(Duration::from_secs(300), Duration::from_secs(1));

    let session = store.get_or_create("").unwrap();
    let old_id = session.id().to_string();
    store.remove(&old_id);

    let next = store.get_or_create(&old_id).unwrap();
    assert_ne!(next.id(), old_id);
    assert_eq!(counters.ends.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_request_round_trip_through_cookies() {
    let store: SessionStore<String> = SessionStore::new(SessionConfig::default()).unwrap();

    let session = store.resolve(None).unwrap();
    session.set_value("alice".to_string());
    let set_cookie = store.set_cookie_header(&session);

    // A browser echoes back only the name=value pair
    let echoed = format!("lang=en; {}", set_cookie.split(';').next().unwrap());
    let again = store.resolve(Some(&echoed)).unwrap();

    assert_eq!(again.id(), session.id());
    assert_eq!(again.value().as_deref(), Some("alice"));
}

#[test]
fn test_cookie_wire_format_round_trip() {
    let expires = Utc.with_ymd_and_hms(2024, 1, 5, 15, 4, 5).unwrap();
    let header = cookie::format_set_cookie("abc123", "/", expires);

    assert_eq!(
        header,
        "SessionId=abc123; path=/; expires=Fri, 05-Jan-2024 15:04:05 GMT;"
    );
    assert_eq!(cookie::candidate_id(Some(&header)), "abc123");
}

#[tokio::test]
async fn test_shutdown_stops_reaper() {
    let ends = Arc::new(AtomicUsize::new(0));
    let e = ends.clone();
    let store: SessionStore<()> = SessionStore::builder()
        .timeout(Duration::from_millis(20))
        .sweep_interval(Duration::from_millis(5))
        .on_end(move |_| {
            e.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    let session = store.get_or_create("").unwrap();
    store.shutdown().await;

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(ends.load(Ordering::SeqCst), 0);
    assert!(session.is_expired());
}

#[test]
fn test_config_from_lookup() {
    let config = SessionConfig::from_lookup(|key| match key {
        "ARMATURE_SESSION_TIMEOUT" => Some("10".to_string()),
        _ => None,
    })
    .unwrap();

    assert_eq!(config.timeout, Duration::from_secs(10));
    assert_eq!(config.cookie_path, "/");
}
