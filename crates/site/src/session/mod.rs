//! Admin session timer.
//!
//! A signed-in admin gets a fixed one-hour window. The window start and end
//! are persisted in [`ContextStorage`] as epoch milliseconds so that it
//! survives page reloads. Activity never extends it. When the window ends the
//! identity is cleared and the admin sees an expiry notice.

pub mod clock;
pub mod scheduler;
pub mod storage;

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;

use crate::services::auth;

pub use clock::{Clock, ManualClock, SystemClock};
pub use scheduler::{ManualScheduler, Scheduler, TICK_PERIOD, TimerEvent, TokioScheduler};
pub use storage::{ContextStorage, MemoryStorage, StorageError};

/// Storage key holding the window start (epoch ms).
pub const SESSION_START_KEY: &str = "admin_session_start";

/// Storage key holding the window end (epoch ms).
pub const SESSION_TIMEOUT_KEY: &str = "admin_session_timeout";

/// Length of every admin session.
pub const SESSION_DURATION: TimeDelta = TimeDelta::hours(1);

/// Session timer errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// The window ran out.
    Expired,
    /// The admin clicked "log out".
    UserRequested,
}

/// User-visible notice produced by a forced logout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionNotice {
    Expired,
}

impl SessionNotice {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Expired => "Your session has expired. Please log in again.",
        }
    }
}

impl std::fmt::Display for SessionNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// A persisted session window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionWindow {
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionWindow {
    /// A fresh window starting at `now`.
    #[must_use]
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            started_at: now,
            expires_at: now + SESSION_DURATION,
        }
    }

    /// Time left at `now`, never negative.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> TimeDelta {
        (self.expires_at - now).max(TimeDelta::zero())
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Result of re-validating a session on page load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// The window is still open and the timer has been re-armed.
    Active {
        window: SessionWindow,
        remaining: TimeDelta,
    },
    /// The window had ended; the admin has been logged out.
    Expired(SessionNotice),
    /// No window was persisted; any identity has been cleared silently.
    Inactive,
}

/// Output of a running timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// Refreshed countdown text, e.g. `59:59`.
    Countdown(String),
    /// The session ended and the identity was cleared.
    Expired(SessionNotice),
}

/// Format a remaining duration as `M:SS`.
#[must_use]
pub fn format_countdown(remaining: TimeDelta) -> String {
    let total = remaining.num_seconds().max(0);
    format!("{}:{:02}", total / 60, total % 60)
}

/// Tracks one admin session's expiry for a single browser context.
pub struct SessionTimer<S, C, K> {
    storage: S,
    clock: C,
    scheduler: K,
    window: Option<SessionWindow>,
}

impl<S, C, K> SessionTimer<S, C, K>
where
    S: ContextStorage,
    C: Clock,
    K: Scheduler,
{
    pub const fn new(storage: S, clock: C, scheduler: K) -> Self {
        Self {
            storage,
            clock,
            scheduler,
            window: None,
        }
    }

    /// The storage this timer persists into.
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// The window currently armed, if any.
    pub const fn window(&self) -> Option<SessionWindow> {
        self.window
    }

    /// Countdown text for the armed window.
    pub fn countdown(&self) -> Option<String> {
        self.window
            .map(|window| format_countdown(window.remaining(self.clock.now())))
    }

    /// Open a new one-hour window starting now, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the window cannot be persisted.
    pub async fn start_session(&mut self) -> Result<SessionWindow, SessionError> {
        let window = SessionWindow::starting_at(self.clock.now());

        self.storage
            .set(
                SESSION_START_KEY,
                window.started_at.timestamp_millis().to_string(),
            )
            .await?;
        self.storage
            .set(
                SESSION_TIMEOUT_KEY,
                window.expires_at.timestamp_millis().to_string(),
            )
            .await?;

        self.arm(window);
        tracing::info!(expires_at = %window.expires_at, "Admin session started");
        Ok(window)
    }

    /// Re-validate the persisted window, as on every page load.
    ///
    /// An open window is re-armed with its remaining time; calling this
    /// repeatedly leaves exactly one deadline armed. A missing or ended
    /// window forces a logout.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read or cleared.
    pub async fn resume_session(&mut self) -> Result<SessionStatus, SessionError> {
        let now = self.clock.now();

        match self.persisted_window().await? {
            Some(window) if !window.is_expired(now) => {
                self.arm(window);
                Ok(SessionStatus::Active {
                    window,
                    remaining: window.remaining(now),
                })
            }
            Some(_) => {
                let notice = self.force_logout(LogoutReason::Expired).await?;
                Ok(notice.map_or(SessionStatus::Inactive, SessionStatus::Expired))
            }
            None => {
                self.force_logout(LogoutReason::UserRequested).await?;
                Ok(SessionStatus::Inactive)
            }
        }
    }

    /// An identity has just appeared: keep a still-open window, otherwise
    /// start a new one.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read or written.
    pub async fn establish(&mut self) -> Result<SessionWindow, SessionError> {
        let now = self.clock.now();
        match self.persisted_window().await? {
            Some(window) if !window.is_expired(now) => {
                self.arm(window);
                Ok(window)
            }
            _ => self.start_session().await,
        }
    }

    /// Page-load check for an admin page.
    ///
    /// A signed-in identity keeps its open window or gets a fresh one, even
    /// when the stored window has already ended. Without an identity this is
    /// [`SessionTimer::resume_session`].
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read or written.
    pub async fn revalidate(&mut self) -> Result<SessionStatus, SessionError> {
        if auth::current_identity(&self.storage).await.is_none() {
            return self.resume_session().await;
        }

        let window = self.establish().await?;
        Ok(SessionStatus::Active {
            window,
            remaining: window.remaining(self.clock.now()),
        })
    }

    /// End the session: clear the identity and the persisted window and stop
    /// the countdown.
    ///
    /// Returns the notice to show, which is only present for expiry.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be cleared.
    pub async fn force_logout(
        &mut self,
        reason: LogoutReason,
    ) -> Result<Option<SessionNotice>, SessionError> {
        self.scheduler.cancel();
        self.window = None;

        auth::clear_identity(&self.storage).await?;
        self.storage.remove(SESSION_START_KEY).await?;
        self.storage.remove(SESSION_TIMEOUT_KEY).await?;
        self.storage.flush().await?;

        match reason {
            LogoutReason::Expired => {
                tracing::info!("Admin session expired");
                Ok(Some(SessionNotice::Expired))
            }
            LogoutReason::UserRequested => {
                tracing::debug!("Admin session cleared");
                Ok(None)
            }
        }
    }

    /// Drive the timer: wait for the next tick or the deadline.
    ///
    /// Returns `None` once nothing is armed (or, with a manual scheduler,
    /// when nothing is due yet).
    ///
    /// # Errors
    ///
    /// Returns an error if the forced logout at the deadline fails.
    pub async fn next_event(&mut self) -> Result<Option<SessionUpdate>, SessionError> {
        match self.scheduler.next_event().await {
            Some(TimerEvent::Tick) => Ok(self.countdown().map(SessionUpdate::Countdown)),
            Some(TimerEvent::Deadline) => {
                let notice = self
                    .force_logout(LogoutReason::Expired)
                    .await?
                    .unwrap_or(SessionNotice::Expired);
                Ok(Some(SessionUpdate::Expired(notice)))
            }
            None => Ok(None),
        }
    }

    fn arm(&mut self, window: SessionWindow) {
        self.scheduler.arm(window.expires_at);
        self.window = Some(window);
    }

    async fn persisted_window(&self) -> Result<Option<SessionWindow>, SessionError> {
        let started_at = self.read_instant(SESSION_START_KEY).await?;
        let expires_at = self.read_instant(SESSION_TIMEOUT_KEY).await?;

        Ok(expires_at.map(|expires_at| SessionWindow {
            started_at: started_at.unwrap_or(expires_at - SESSION_DURATION),
            expires_at,
        }))
    }

    async fn read_instant(&self, key: &str) -> Result<Option<DateTime<Utc>>, SessionError> {
        let raw = self.storage.get(key).await?;
        Ok(raw
            .and_then(|value| value.trim().parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis))
    }
}

impl<S, C, K> std::fmt::Debug for SessionTimer<S, C, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTimer")
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}
