//! Integration tests for the admin session window.
//!
//! Uses a manual clock and scheduler so the hour can pass instantly.

#![allow(clippy::unwrap_used)]

use chrono::{TimeDelta, TimeZone, Utc};
use folio_site::services::auth::IDENTITY_KEY;
use folio_site::session::{
    ContextStorage, ManualClock, ManualScheduler, MemoryStorage, SESSION_TIMEOUT_KEY,
    SessionNotice, SessionStatus, SessionTimer, SessionUpdate,
};

type TestTimer = SessionTimer<MemoryStorage, ManualClock, ManualScheduler>;

fn timer(storage: &MemoryStorage, clock: &ManualClock) -> TestTimer {
    SessionTimer::new(
        storage.clone(),
        clock.clone(),
        ManualScheduler::new(clock.clone()),
    )
}

fn start_clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())
}

#[tokio::test]
async fn test_countdown_halfway_through() {
    let storage = MemoryStorage::new();
    let clock = start_clock();
    let mut timer = timer(&storage, &clock);

    timer.start_session().await.unwrap();
    assert_eq!(timer.countdown().as_deref(), Some("60:00"));

    clock.advance(TimeDelta::seconds(1800));
    assert_eq!(
        timer.next_event().await.unwrap(),
        Some(SessionUpdate::Countdown("30:00".to_owned()))
    );
}

#[tokio::test]
async fn test_deadline_logs_out() {
    let storage = MemoryStorage::new();
    let clock = start_clock();
    let mut timer = timer(&storage, &clock);

    storage
        .set(IDENTITY_KEY, r#"{"email":"owner@example.com","display_name":"O"}"#.to_owned())
        .await
        .unwrap();
    timer.start_session().await.unwrap();

    clock.advance(TimeDelta::seconds(3601));
    assert_eq!(
        timer.next_event().await.unwrap(),
        Some(SessionUpdate::Expired(SessionNotice::Expired))
    );
    assert!(storage.is_empty().await);
    assert_eq!(timer.window(), None);
    assert_eq!(timer.next_event().await.unwrap(), None);
}

#[tokio::test]
async fn test_page_reload_resumes_remaining_time() {
    let storage = MemoryStorage::new();
    let clock = start_clock();
    let started = timer(&storage, &clock).start_session().await.unwrap();

    clock.advance(TimeDelta::minutes(20));
    let mut reloaded = timer(&storage, &clock);
    let first = reloaded.resume_session().await.unwrap();
    let second = reloaded.resume_session().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(
        first,
        SessionStatus::Active {
            window: started,
            remaining: TimeDelta::minutes(40),
        }
    );
    assert_eq!(reloaded.countdown().as_deref(), Some("40:00"));
}

#[tokio::test]
async fn test_reload_after_deadline_reports_expiry() {
    let storage = MemoryStorage::new();
    let clock = start_clock();
    timer(&storage, &clock).start_session().await.unwrap();

    clock.advance(TimeDelta::hours(2));
    let status = timer(&storage, &clock).resume_session().await.unwrap();
    assert_eq!(status, SessionStatus::Expired(SessionNotice::Expired));
    assert!(!storage.contains(SESSION_TIMEOUT_KEY).await);
}

#[tokio::test]
async fn test_reload_without_window_is_silent() {
    let storage = MemoryStorage::new();
    storage
        .set(IDENTITY_KEY, r#"{"email":"owner@example.com","display_name":"O"}"#.to_owned())
        .await
        .unwrap();

    let status = timer(&storage, &start_clock())
        .resume_session()
        .await
        .unwrap();
    assert_eq!(status, SessionStatus::Inactive);
    assert!(!storage.contains(IDENTITY_KEY).await);
}

#[tokio::test]
async fn test_reload_after_deadline_while_signed_in_starts_new_window() {
    let storage = MemoryStorage::new();
    let clock = start_clock();
    storage
        .set(IDENTITY_KEY, r#"{"email":"owner@example.com","display_name":"O"}"#.to_owned())
        .await
        .unwrap();
    timer(&storage, &clock).start_session().await.unwrap();

    clock.advance(TimeDelta::hours(2));
    let mut reloaded = timer(&storage, &clock);
    let status = reloaded.revalidate().await.unwrap();

    assert_eq!(
        status,
        SessionStatus::Active {
            window: reloaded.window().unwrap(),
            remaining: TimeDelta::hours(1),
        }
    );
    assert_eq!(reloaded.countdown().as_deref(), Some("60:00"));
    assert!(storage.contains(IDENTITY_KEY).await);
}
