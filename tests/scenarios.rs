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

//! End-to-end scenarios exercising session lifecycle, statement execution,
//! COPY/MERGE processing, and the TTL sweeps, wired together the way
//! `floe-server` itself wires them.

use std::sync::Arc;
use std::time::Duration;

use floe::bind::BindingValue;
use floe::catalog::{Catalog, DemoCatalog};
use floe::demo_engine::DemoEngine;
use floe::engine::{EngineValue, SqlEngine};
use floe::executor::{ExecOutcome, Executor};
use floe::session::SessionManager;
use floe::stage::{DemoStage, Stage};
use floe::statement::StatementManager;

fn new_executor() -> (Executor, Arc<DemoCatalog>, Arc<DemoStage>) {
    let engine: Arc<dyn SqlEngine> = Arc::new(DemoEngine::new());
    let catalog = Arc::new(DemoCatalog::new());
    catalog.register("FLOE", "PUBLIC");
    let stage = Arc::new(DemoStage::new());
    let executor = Executor::new(
        engine,
        Arc::<DemoCatalog>::clone(&catalog) as Arc<dyn Catalog>,
        Arc::<DemoStage>::clone(&stage) as Arc<dyn Stage>,
    );
    (executor, catalog, stage)
}

/// Scenario A: login, run a query, logout.
#[test]
fn scenario_login_query_logout() {
    let sessions = SessionManager::new();
    let (executor, _catalog, _stage) = new_executor();

    let session = sessions.create_session("alice", Some("FLOE".to_string()), Some("PUBLIC".to_string()), 3600);
    assert!(sessions.validate_session(&session.session_token).is_ok());

    executor.execute("CREATE TABLE t (id INTEGER)", "FLOE", "PUBLIC").unwrap();
    let outcome = executor.execute("SELECT COUNT(*) FROM t", "FLOE", "PUBLIC").unwrap();
    match outcome {
        ExecOutcome::Rows(rows) => assert_eq!(rows.rows[0][0], EngineValue::Int(0)),
        _ => panic!("expected rows"),
    }

    sessions.close_session(&session.session_token).unwrap();
    assert!(sessions.validate_session(&session.session_token).is_err());
}

/// Scenario B: master-token renewal mints a new session token without
/// extending the master token's own expiry.
#[test]
fn scenario_master_token_renewal() {
    let sessions = SessionManager::new();
    let session = sessions.create_session("alice", None, None, 3600);

    let renewed = sessions.renew(&session.master_token).unwrap();
    assert_ne!(renewed.session_token, session.session_token);
    assert_eq!(renewed.master_expires_at, session.master_expires_at);
    assert!(sessions.validate_session(&renewed.session_token).is_ok());
    assert!(sessions.validate_session(&session.session_token).is_err());
}

/// Scenario C: COPY with a header row to skip.
#[test]
fn scenario_copy_with_header_skip() {
    let (executor, catalog, stage) = new_executor();
    executor.execute("CREATE TABLE floe.public.t (id INTEGER, name VARCHAR)", "FLOE", "PUBLIC").unwrap();

    let schema_id = catalog.resolve_schema("FLOE", "PUBLIC").unwrap();
    stage.put_file(schema_id, "mystage", "people.csv", b"id,name\n1,Ada\n2,Grace\n");

    let outcome = executor
        .execute(
            "COPY INTO floe.public.t FROM @mystage FILE_FORMAT=(TYPE=CSV SKIP_HEADER=1)",
            "FLOE",
            "PUBLIC",
        )
        .unwrap();
    match outcome {
        ExecOutcome::Affected(n) => assert_eq!(n, 2),
        _ => panic!("expected affected row count"),
    }

    let result = executor.execute("SELECT COUNT(*) FROM floe.public.t", "FLOE", "PUBLIC").unwrap();
    match result {
        ExecOutcome::Rows(rows) => assert_eq!(rows.rows[0][0], EngineValue::Int(2)),
        _ => panic!("expected rows"),
    }
}

/// Scenario D: MERGE performs an upsert against existing rows.
#[test]
fn scenario_merge_upsert() {
    let (executor, _catalog, _stage) = new_executor();
    executor.execute("CREATE TABLE target (id INTEGER, v VARCHAR)", "FLOE", "PUBLIC").unwrap();
    executor.execute("CREATE TABLE incoming (id INTEGER, v VARCHAR)", "FLOE", "PUBLIC").unwrap();
    executor.execute("INSERT INTO target VALUES (1, 'old')", "FLOE", "PUBLIC").unwrap();
    executor.execute("INSERT INTO incoming VALUES (1, 'new')", "FLOE", "PUBLIC").unwrap();
    executor.execute("INSERT INTO incoming VALUES (2, 'fresh')", "FLOE", "PUBLIC").unwrap();

    let sql = "MERGE INTO target t USING incoming s ON t.id = s.id \
               WHEN MATCHED THEN UPDATE SET v = s.v \
               WHEN NOT MATCHED THEN INSERT (id, v) VALUES (s.id, s.v)";
    let outcome = executor.execute(sql, "FLOE", "PUBLIC").unwrap();
    match outcome {
        ExecOutcome::Affected(n) => assert_eq!(n, 2),
        _ => panic!("expected affected row count"),
    }

    let result = executor.execute("SELECT COUNT(*) FROM target", "FLOE", "PUBLIC").unwrap();
    match result {
        ExecOutcome::Rows(rows) => assert_eq!(rows.rows[0][0], EngineValue::Int(2)),
        _ => panic!("expected rows"),
    }
}

/// Scenario E: a binding that looks like an injection attempt is rejected
/// by type validation before it ever reaches the engine.
#[test]
fn scenario_injection_resistant_binding() {
    let (executor, _catalog, _stage) = new_executor();
    executor.execute("CREATE TABLE accounts (id INTEGER, name VARCHAR)", "FLOE", "PUBLIC").unwrap();
    executor.execute("INSERT INTO accounts VALUES (1, 'Ada')", "FLOE", "PUBLIC").unwrap();

    let malicious = vec![BindingValue::new("INTEGER", "1; DROP TABLE accounts; --")];
    let result = executor.execute_with_bindings(
        "SELECT * FROM accounts WHERE id = :1",
        &malicious,
        "FLOE",
        "PUBLIC",
    );
    assert!(result.is_err());

    let still_there = executor.execute("SELECT COUNT(*) FROM accounts", "FLOE", "PUBLIC").unwrap();
    match still_there {
        ExecOutcome::Rows(rows) => assert_eq!(rows.rows[0][0], EngineValue::Int(1)),
        _ => panic!("expected rows"),
    }
}

/// Scenario F: a completed statement older than the TTL is swept away,
/// while one still inside the TTL window survives.
#[test]
fn scenario_statement_ttl_sweep() {
    let manager = StatementManager::new(Duration::from_secs(0));
    let handle = manager.create("SELECT 1", None, None, None);
    manager.set_affected(&handle, 0).unwrap();
    manager.reap_expired();
    assert!(manager.status(&handle).is_err());

    let long_ttl_manager = StatementManager::new(Duration::from_secs(3600));
    let still_pending = long_ttl_manager.create("SELECT 1", None, None, None);
    long_ttl_manager.reap_expired();
    assert!(long_ttl_manager.status(&still_pending).is_ok());
}
