//! In-memory session store behind an injectable clock.
//!
//! Tokens are opaque v4 UUIDs valid for a fixed window. Expired entries are
//! swept on every validation, so the table never grows past the set of
//! tokens issued within one TTL. The store is process-local; a deployment
//! with more than one worker needs a shared backend instead.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A freshly issued session.
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionStore {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    sessions: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl SessionStore {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        SessionStore {
            ttl,
            clock,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Issues a new opaque token expiring one TTL from now.
    pub fn create(&self) -> Session {
        let token = Uuid::new_v4().to_string();
        let expires_at = self.clock.now() + self.ttl;
        self.sessions
            .lock()
            .expect("session lock poisoned")
            .insert(token.clone(), expires_at);
        Session { token, expires_at }
    }

    /// True iff the token exists and has not expired. Sweeps expired
    /// entries first, so the check itself keeps the table bounded.
    pub fn validate(&self, token: &str) -> bool {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock().expect("session lock poisoned");
        sessions.retain(|_, expires_at| *expires_at > now);
        sessions.contains_key(token)
    }

    /// Removes a token immediately, valid or not.
    pub fn expire(&self, token: &str) {
        self.sessions
            .lock()
            .expect("session lock poisoned")
            .remove(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn starting_at(now: DateTime<Utc>) -> Arc<Self> {
            Arc::new(ManualClock(Mutex::new(now)))
        }

        fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now = *now + by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn epoch() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_created_token_validates() {
        let clock = ManualClock::starting_at(epoch());
        let store = SessionStore::new(Duration::hours(8), clock);
        let session = store.create();
        assert!(store.validate(&session.token));
    }

    #[test]
    fn test_unknown_token_is_invalid() {
        let clock = ManualClock::starting_at(epoch());
        let store = SessionStore::new(Duration::hours(8), clock);
        assert!(!store.validate("not-a-token"));
    }

    #[test]
    fn test_token_expires_after_ttl() {
        let clock = ManualClock::starting_at(epoch());
        let store = SessionStore::new(Duration::hours(8), clock.clone());
        let session = store.create();

        clock.advance(Duration::hours(7));
        assert!(store.validate(&session.token), "still inside the window");

        clock.advance(Duration::hours(2));
        assert!(!store.validate(&session.token), "past the window");
    }

    #[test]
    fn test_expiry_reported_matches_ttl() {
        let clock = ManualClock::starting_at(epoch());
        let store = SessionStore::new(Duration::hours(8), clock);
        let session = store.create();
        assert_eq!(session.expires_at, epoch() + Duration::hours(8));
    }

    #[test]
    fn test_validation_sweeps_expired_entries() {
        let clock = ManualClock::starting_at(epoch());
        let store = SessionStore::new(Duration::hours(8), clock.clone());
        store.create();
        store.create();

        clock.advance(Duration::hours(9));
        assert!(!store.validate("anything"));
        assert!(store.sessions.lock().unwrap().is_empty());
    }

    #[test]
    fn test_expire_removes_valid_token() {
        let clock = ManualClock::starting_at(epoch());
        let store = SessionStore::new(Duration::hours(8), clock);
        let session = store.create();
        store.expire(&session.token);
        assert!(!store.validate(&session.token));
    }
}
