use crate::clock::Clock;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sessions live for 24 hours.
pub const SESSION_TTL_MS: i64 = 24 * 60 * 60 * 1000;

pub const SESSION_COOKIE: &str = "sessionId";

#[derive(Debug, Clone)]
struct Session {
    username: String,
    created_at: i64,
}

/// Configured operator login
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    /// Lowercase hex SHA-256 of the password
    pub password_sha256: String,
}

pub fn sha256_hex(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

/// In-memory login sessions. Lost on restart.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    credentials: Credentials,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(credentials: Credentials, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            credentials,
            clock,
        }
    }

    /// Returns a new session id when the credentials match.
    pub fn login(&self, username: &str, password: &str) -> Option<String> {
        if username != self.credentials.username
            || sha256_hex(password) != self.credentials.password_sha256.to_ascii_lowercase()
        {
            warn!("Rejected login for {}", username);
            return None;
        }

        let now = self.clock.now_ms();
        let id = uuid::Uuid::new_v4().simple().to_string();
        let mut sessions = self.sessions.lock();
        // sessions that are never looked up again only go away here
        sessions.retain(|_, s| now - s.created_at <= SESSION_TTL_MS);
        sessions.insert(
            id.clone(),
            Session {
                username: username.to_string(),
                created_at: now,
            },
        );
        drop(sessions);
        info!("Operator {} logged in", username);
        Some(id)
    }

    pub fn logout(&self, id: &str) {
        if let Some(session) = self.sessions.lock().remove(id) {
            info!("Operator {} logged out", session.username);
        }
    }

    /// Checks a session, dropping it if it has expired.
    pub fn is_valid(&self, id: &str) -> bool {
        let now = self.clock.now_ms();
        let mut sessions = self.sessions.lock();
        match sessions.get(id) {
            Some(session) if now - session.created_at > SESSION_TTL_MS => {
                debug!("Session for {} expired", session.username);
                sessions.remove(id);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    #[cfg(test)]
    fn active_sessions(&self) -> usize {
        self.sessions.lock().len()
    }
}

/// Pulls the session id out of a `Cookie` header value.
pub fn session_id_from_cookie(header: &str) -> Option<&str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::ManualClock;

    fn store() -> (Arc<ManualClock>, SessionStore) {
        let clock = Arc::new(ManualClock::at(0));
        let credentials = Credentials {
            username: "operator".to_string(),
            password_sha256: sha256_hex("secret"),
        };
        (clock.clone(), SessionStore::new(credentials, clock))
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_login_with_wrong_password() {
        let (_, store) = store();
        assert!(store.login("operator", "nope").is_none());
        assert!(store.login("someone", "secret").is_none());
    }

    #[test]
    fn test_login_then_logout() {
        let (_, store) = store();
        let id = store.login("operator", "secret").unwrap();
        assert!(store.is_valid(&id));

        store.logout(&id);
        assert!(!store.is_valid(&id));
    }

    #[test]
    fn test_session_expires_after_ttl() {
        let (clock, store) = store();
        let id = store.login("operator", "secret").unwrap();

        clock.set(SESSION_TTL_MS);
        assert!(store.is_valid(&id));

        clock.set(SESSION_TTL_MS + 1);
        assert!(!store.is_valid(&id));

        // already purged
        clock.set(0);
        assert!(!store.is_valid(&id));
    }

    #[test]
    fn test_cookie_parsing() {
        assert_eq!(session_id_from_cookie("sessionId=abc"), Some("abc"));
        assert_eq!(
            session_id_from_cookie("theme=dark; sessionId=abc; lang=en"),
            Some("abc")
        );
        assert_eq!(session_id_from_cookie("theme=dark"), None);
        assert_eq!(session_id_from_cookie("sessionId="), None);
    }

    #[test]
    fn test_login_purges_expired_sessions() {
        let (clock, store) = store();
        let old = store.login("operator", "secret").unwrap();
        store.login("operator", "secret").unwrap();
        assert_eq!(store.active_sessions(), 2);

        clock.set(SESSION_TTL_MS + 1);
        let fresh = store.login("operator", "secret").unwrap();

        assert_eq!(store.active_sessions(), 1);
        assert!(store.is_valid(&fresh));
        assert!(!store.is_valid(&old));
    }
}
