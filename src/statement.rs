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

//! Owns every in-flight and recently-completed statement. Handles are
//! opaque to callers beyond their `"01"` prefix (mirroring the warehouse's
//! own handle shape); status transitions are one-directional, terminal
//! states (`Success`, `Failed`, `Canceled`) never revert.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use crate::engine::EngineRows;
use crate::error::{FloeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementStatus {
    Pending,
    Running,
    Success,
    Failed,
    Canceled,
}

impl StatementStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StatementStatus::Success | StatementStatus::Failed | StatementStatus::Canceled)
    }
}

/// A cancel hook is a thunk the statement's runner installs so
/// `StatementManager::cancel` can interrupt in-flight work. Demo statements
/// never install one; the field exists for callers that run genuinely
/// cancellable work.
pub type CancelFn = Box<dyn Fn() + Send + Sync>;

pub struct Statement {
    pub handle: String,
    pub status: StatementStatus,
    pub sql_text: String,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub warehouse: Option<String>,
    pub created_at: u64,
    pub completed_at: Option<u64>,
    pub result: Option<EngineRows>,
    pub rows_affected: Option<u64>,
    pub error: Option<String>,
    cancel_hook: Mutex<Option<CancelFn>>,
}

impl std::fmt::Debug for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("handle", &self.handle)
            .field("status", &self.status)
            .field("sql_text", &self.sql_text)
            .finish()
    }
}

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// Generate a statement handle: `"01"` followed by 40 hex characters, at
/// least 36 characters long in total.
pub fn new_handle() -> String {
    let a = Uuid::new_v4().to_string().replace('-', "");
    let b = Uuid::new_v4().to_string().replace('-', "");
    format!("01{}{}", a, &b[..8])
}

pub struct StatementManager {
    statements: RwLock<HashMap<String, Statement>>,
    ttl: Duration,
}

impl StatementManager {
    pub fn new(ttl: Duration) -> Self {
        StatementManager { statements: RwLock::new(HashMap::new()), ttl }
    }

    pub fn create(&self, sql_text: &str, database: Option<String>, schema: Option<String>, warehouse: Option<String>) -> String {
        let handle = new_handle();
        let statement = Statement {
            handle: handle.clone(),
            status: StatementStatus::Pending,
            sql_text: sql_text.to_string(),
            database,
            schema,
            warehouse,
            created_at: now_secs(),
            completed_at: None,
            result: None,
            rows_affected: None,
            error: None,
            cancel_hook: Mutex::new(None),
        };
        self.statements.write().unwrap().insert(handle.clone(), statement);
        handle
    }

    fn with_statement<R>(&self, handle: &str, f: impl FnOnce(&Statement) -> R) -> Result<R> {
        let statements = self.statements.read().unwrap();
        let statement = statements
            .get(handle)
            .ok_or_else(|| FloeError::ObjectNotFound(format!("statement {handle} not found")))?;
        Ok(f(statement))
    }

    pub fn status(&self, handle: &str) -> Result<StatementStatus> {
        self.with_statement(handle, |s| s.status)
    }

    pub fn sql_text(&self, handle: &str) -> Result<String> {
        self.with_statement(handle, |s| s.sql_text.clone())
    }

    pub fn result(&self, handle: &str) -> Result<Option<EngineRows>> {
        self.with_statement(handle, |s| s.result.clone())
    }

    pub fn error(&self, handle: &str) -> Result<Option<String>> {
        self.with_statement(handle, |s| s.error.clone())
    }

    fn update_terminal<F>(&self, handle: &str, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Statement),
    {
        let mut statements = self.statements.write().unwrap();
        let statement = statements
            .get_mut(handle)
            .ok_or_else(|| FloeError::ObjectNotFound(format!("statement {handle} not found")))?;
        if statement.status.is_terminal() {
            return Err(FloeError::InvalidParameter(format!(
                "statement {handle} is already terminal"
            )));
        }
        mutate(statement);
        Ok(())
    }

    pub fn set_running(&self, handle: &str) -> Result<()> {
        self.update_terminal(handle, |s| s.status = StatementStatus::Running)
    }

    pub fn set_result(&self, handle: &str, rows: EngineRows) -> Result<()> {
        self.update_terminal(handle, |s| {
            s.result = Some(rows);
            s.status = StatementStatus::Success;
            s.completed_at = Some(now_secs());
        })
    }

    pub fn set_affected(&self, handle: &str, rows_affected: u64) -> Result<()> {
        self.update_terminal(handle, |s| {
            s.rows_affected = Some(rows_affected);
            s.status = StatementStatus::Success;
            s.completed_at = Some(now_secs());
        })
    }

    pub fn set_error(&self, handle: &str, message: &str) -> Result<()> {
        self.update_terminal(handle, |s| {
            s.error = Some(message.to_string());
            s.status = StatementStatus::Failed;
            s.completed_at = Some(now_secs());
        })
    }

    pub fn set_cancel_hook(&self, handle: &str, hook: CancelFn) -> Result<()> {
        let statements = self.statements.read().unwrap();
        let statement = statements
            .get(handle)
            .ok_or_else(|| FloeError::ObjectNotFound(format!("statement {handle} not found")))?;
        *statement.cancel_hook.lock().unwrap() = Some(hook);
        Ok(())
    }

    pub fn cancel(&self, handle: &str) -> Result<()> {
        let hook = {
            let statements = self.statements.read().unwrap();
            let statement = statements
                .get(handle)
                .ok_or_else(|| FloeError::ObjectNotFound(format!("statement {handle} not found")))?;
            if statement.status.is_terminal() {
                return Err(FloeError::InvalidParameter(format!(
                    "statement {handle} is already terminal"
                )));
            }
            let hook = statement.cancel_hook.lock().unwrap().take();
            hook
        };
        if let Some(hook) = hook {
            hook();
        }
        self.update_terminal(handle, |s| {
            s.status = StatementStatus::Canceled;
            s.completed_at = Some(now_secs());
        })
    }

    pub fn delete(&self, handle: &str) {
        self.statements.write().unwrap().remove(handle);
    }

    /// Evict terminal statements whose `completed_at` is older than the
    /// manager's ttl. Intended to run on a `ttl / 2` cadence.
    pub fn reap_expired(&self) {
        let cutoff = now_secs().saturating_sub(self.ttl.as_secs());
        let mut statements = self.statements.write().unwrap();
        statements.retain(|_, s| match s.completed_at {
            Some(completed_at) => completed_at > cutoff,
            None => true,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_has_required_prefix_and_length() {
        let handle = new_handle();
        assert!(handle.starts_with("01"));
        assert!(handle.len() >= 36);
    }

    #[test]
    fn lifecycle_pending_to_success() {
        let mgr = StatementManager::new(Duration::from_secs(3600));
        let handle = mgr.create("SELECT 1", None, None, None);
        assert_eq!(mgr.status(&handle).unwrap(), StatementStatus::Pending);
        mgr.set_running(&handle).unwrap();
        assert_eq!(mgr.status(&handle).unwrap(), StatementStatus::Running);
        mgr.set_affected(&handle, 0).unwrap();
        assert_eq!(mgr.status(&handle).unwrap(), StatementStatus::Success);
    }

    #[test]
    fn terminal_statement_cannot_transition_again() {
        let mgr = StatementManager::new(Duration::from_secs(3600));
        let handle = mgr.create("SELECT 1", None, None, None);
        mgr.set_affected(&handle, 0).unwrap();
        assert!(mgr.set_error(&handle, "late failure").is_err());
        assert!(mgr.cancel(&handle).is_err());
    }

    #[test]
    fn reap_expired_removes_old_terminal_statements_only() {
        let mgr = StatementManager::new(Duration::from_secs(0));
        let handle = mgr.create("SELECT 1", None, None, None);
        mgr.set_affected(&handle, 0).unwrap();
        mgr.reap_expired();
        assert!(mgr.status(&handle).is_err());
    }

    #[test]
    fn pending_statement_survives_reap() {
        let mgr = StatementManager::new(Duration::from_secs(0));
        let handle = mgr.create("SELECT 1", None, None, None);
        mgr.reap_expired();
        assert!(mgr.status(&handle).is_ok());
    }
}
