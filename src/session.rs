// Copyright (c) 2026 The floe Authors
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Dual-token session lifecycle. The session token authenticates ordinary
//! requests and expires on a short window; the master token only renews the
//! session token and expires on a fixed window four times as long, set once
//! at login and never extended.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::RngCore;

use crate::error::{FloeError, Result};

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub session_token: String,
    pub master_token: String,
    pub username: String,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub created_at: u64,
    pub last_accessed_at: u64,
    pub expires_at: u64,
    pub master_expires_at: u64,
    pub session_validity_seconds: u64,
    pub master_validity_seconds: u64,
    pub params: HashMap<String, String>,
}

pub struct SessionManager {
    by_id: RwLock<HashMap<String, Session>>,
    session_index: RwLock<HashMap<String, String>>,
    master_index: RwLock<HashMap<String, String>>,
    next_id: AtomicU64,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        SessionManager {
            by_id: RwLock::new(HashMap::new()),
            session_index: RwLock::new(HashMap::new()),
            master_index: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(now_secs() * 1_000_000),
        }
    }

    /// Monotonic, time-seeded session id. Unlike the session/master tokens,
    /// this is never used as a secret, so it does not need to be random.
    fn next_session_id(&self) -> String {
        self.next_id.fetch_add(1, Ordering::Relaxed).to_string()
    }

    /// Create a new session. `master_validity_seconds` is always four times
    /// `session_validity_seconds`, fixed for the session's lifetime.
    pub fn create_session(
        &self,
        username: &str,
        database: Option<String>,
        schema: Option<String>,
        session_validity_seconds: u64,
    ) -> Session {
        let now = now_secs();
        let master_validity_seconds = session_validity_seconds * 4;
        let session = Session {
            id: self.next_session_id(),
            session_token: random_token(),
            master_token: random_token(),
            username: username.to_string(),
            database,
            schema,
            created_at: now,
            last_accessed_at: now,
            expires_at: now + session_validity_seconds,
            master_expires_at: now + master_validity_seconds,
            session_validity_seconds,
            master_validity_seconds,
            params: HashMap::new(),
        };

        self.session_index.write().unwrap().insert(session.session_token.clone(), session.id.clone());
        self.master_index.write().unwrap().insert(session.master_token.clone(), session.id.clone());
        self.by_id.write().unwrap().insert(session.id.clone(), session.clone());
        session
    }

    fn id_for_session_token(&self, session_token: &str) -> Result<String> {
        self.session_index
            .read()
            .unwrap()
            .get(session_token)
            .cloned()
            .ok_or_else(|| FloeError::SessionNotFound("unknown session token".to_string()))
    }

    fn id_for_master_token(&self, master_token: &str) -> Result<String> {
        self.master_index
            .read()
            .unwrap()
            .get(master_token)
            .cloned()
            .ok_or_else(|| FloeError::SessionNotFound("unknown master token".to_string()))
    }

    /// Validate a session token: must exist and not be expired. Bumps
    /// `last_accessed_at` but does not extend `expires_at` (use
    /// `heartbeat` for a sliding window).
    pub fn validate_session(&self, session_token: &str) -> Result<Session> {
        let id = self.id_for_session_token(session_token)?;
        let mut sessions = self.by_id.write().unwrap();
        let expired = sessions
            .get(&id)
            .map(|s| now_secs() > s.expires_at)
            .ok_or_else(|| FloeError::SessionNotFound("unknown session".to_string()))?;
        if expired {
            if let Some(session) = sessions.remove(&id) {
                self.session_index.write().unwrap().remove(&session.session_token);
                self.master_index.write().unwrap().remove(&session.master_token);
            }
            return Err(FloeError::SessionExpired(format!("session {id} expired")));
        }
        let session = sessions.get_mut(&id).expect("checked above");
        session.last_accessed_at = now_secs();
        Ok(session.clone())
    }

    /// Extend a session's expiry by its configured validity window.
    pub fn heartbeat(&self, session_token: &str) -> Result<()> {
        let id = self.id_for_session_token(session_token)?;
        let mut sessions = self.by_id.write().unwrap();
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| FloeError::SessionNotFound("unknown session".to_string()))?;
        if now_secs() > session.expires_at {
            return Err(FloeError::SessionExpired(format!("session {id} expired")));
        }
        let now = now_secs();
        session.last_accessed_at = now;
        session.expires_at = now + session.session_validity_seconds;
        Ok(())
    }

    /// Mint a fresh session token from a still-valid master token. The
    /// master token's own expiry is independent of the session token's and
    /// is never extended by renewal.
    pub fn renew(&self, master_token: &str) -> Result<Session> {
        let id = self.id_for_master_token(master_token)?;
        let mut sessions = self.by_id.write().unwrap();
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| FloeError::SessionNotFound("unknown session".to_string()))?;
        if now_secs() > session.master_expires_at {
            return Err(FloeError::SessionExpired(format!("master token for session {id} expired")));
        }

        let old_token = session.session_token.clone();
        let new_token = random_token();
        session.session_token = new_token.clone();
        let now = now_secs();
        session.last_accessed_at = now;
        session.expires_at = now + session.session_validity_seconds;
        let result = session.clone();

        let mut index = self.session_index.write().unwrap();
        index.remove(&old_token);
        index.insert(new_token, id);

        Ok(result)
    }

    pub fn update_context(&self, session_token: &str, database: Option<String>, schema: Option<String>) -> Result<()> {
        let id = self.id_for_session_token(session_token)?;
        let mut sessions = self.by_id.write().unwrap();
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| FloeError::SessionNotFound("unknown session".to_string()))?;
        if let Some(db) = database {
            session.database = Some(db);
        }
        if let Some(schema) = schema {
            session.schema = Some(schema);
        }
        Ok(())
    }

    pub fn set_param(&self, session_token: &str, key: &str, value: &str) -> Result<()> {
        let id = self.id_for_session_token(session_token)?;
        let mut sessions = self.by_id.write().unwrap();
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| FloeError::SessionNotFound("unknown session".to_string()))?;
        session.params.insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn close_session(&self, session_token: &str) -> Result<()> {
        let id = self.id_for_session_token(session_token)?;
        let session = self.by_id.write().unwrap().remove(&id);
        self.session_index.write().unwrap().remove(session_token);
        if let Some(session) = session {
            self.master_index.write().unwrap().remove(&session.master_token);
        }
        Ok(())
    }

    /// Remove every session whose token has expired. Intended to run on a
    /// cadence tied to the shortest configured session validity.
    pub fn reap_expired(&self) {
        let now = now_secs();
        let mut by_id = self.by_id.write().unwrap();
        let expired_ids: Vec<String> = by_id
            .iter()
            .filter(|(_, s)| now > s.expires_at)
            .map(|(id, _)| id.clone())
            .collect();
        let mut session_index = self.session_index.write().unwrap();
        let mut master_index = self.master_index.write().unwrap();
        for id in expired_ids {
            if let Some(session) = by_id.remove(&id) {
                session_index.remove(&session.session_token);
                master_index.remove(&session.master_token);
            }
        }
    }

    pub fn reap_interval(&self, session_validity_seconds: u64) -> Duration {
        Duration::from_secs((session_validity_seconds / 2).max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_validity_is_four_times_session_validity() {
        let mgr = SessionManager::new();
        let session = mgr.create_session("alice", None, None, 100);
        assert_eq!(session.master_validity_seconds, 400);
    }

    #[test]
    fn validate_accepts_fresh_session() {
        let mgr = SessionManager::new();
        let session = mgr.create_session("alice", None, None, 100);
        assert!(mgr.validate_session(&session.session_token).is_ok());
    }

    #[test]
    fn validate_rejects_unknown_token() {
        let mgr = SessionManager::new();
        assert!(mgr.validate_session("nope").is_err());
    }

    #[test]
    fn renew_mints_new_session_token_and_revokes_old() {
        let mgr = SessionManager::new();
        let session = mgr.create_session("alice", None, None, 100);
        let renewed = mgr.renew(&session.master_token).unwrap();
        assert_ne!(renewed.session_token, session.session_token);
        assert!(mgr.validate_session(&session.session_token).is_err());
        assert!(mgr.validate_session(&renewed.session_token).is_ok());
    }

    #[test]
    fn renew_does_not_extend_master_expiry() {
        let mgr = SessionManager::new();
        let session = mgr.create_session("alice", None, None, 100);
        let renewed = mgr.renew(&session.master_token).unwrap();
        assert_eq!(renewed.master_expires_at, session.master_expires_at);
    }

    #[test]
    fn close_session_removes_both_tokens() {
        let mgr = SessionManager::new();
        let session = mgr.create_session("alice", None, None, 100);
        mgr.close_session(&session.session_token).unwrap();
        assert!(mgr.validate_session(&session.session_token).is_err());
        assert!(mgr.renew(&session.master_token).is_err());
    }
}
