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

//! Wire-compatible HTTP server binary.
//!
//! Usage:
//!     floe-server [OPTIONS]
//!
//! Options:
//!     --host <HOST>               Listen address (default: 127.0.0.1)
//!     --port <PORT>                Listen port (default: 8080)
//!     --session-validity <SECS>   Session token validity window (default: 3600)
//!     --verbose                   Enable verbose logging

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use clap::Parser;
use serde::{Deserialize, Serialize};

use floe::bind::BindingValue;
use floe::catalog::{Catalog, DemoCatalog};
use floe::demo_engine::DemoEngine;
use floe::engine::{EngineRows, SqlEngine};
use floe::executor::{ExecOutcome, Executor};
use floe::session::SessionManager;
use floe::stage::{DemoStage, Stage};
use floe::statement::{StatementManager, StatementStatus};

#[derive(Parser)]
#[command(name = "floe-server", version, about = "Wire-compatible warehouse protocol emulator")]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 8080)]
    port: u16,

    #[arg(long, default_value_t = 3600)]
    session_validity: u64,

    #[arg(long)]
    verbose: bool,
}

struct AppState {
    sessions: SessionManager,
    statements: StatementManager,
    executor: Executor,
    session_validity: u64,
    verbose: bool,
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    database: Option<String>,
    schema: Option<String>,
}

#[derive(Serialize)]
struct LoginData {
    token: String,
    #[serde(rename = "masterToken")]
    master_token: String,
    #[serde(rename = "sessionId")]
    session_id: String,
    #[serde(rename = "validityInSeconds")]
    validity_in_seconds: u64,
    #[serde(rename = "masterValidityInSeconds")]
    master_validity_in_seconds: u64,
}

#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    data: Option<T>,
    message: Option<String>,
    code: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(ApiResponse { success: true, data: Some(data), message: None, code: None })
    }

    fn err(error: &floe::FloeError) -> Json<Self> {
        Json(ApiResponse {
            success: false,
            data: None,
            message: Some(error.message().to_string()),
            code: Some(error.code().to_string()),
        })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get("authorization")?.to_str().ok()?;
    raw.strip_prefix("Snowflake Token=\"")
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| raw.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Json<ApiResponse<LoginData>> {
    let session = state.sessions.create_session(
        &req.username,
        req.database,
        req.schema,
        state.session_validity,
    );
    if state.verbose {
        eprintln!("[login] user={} session={}", req.username, session.id);
    }
    ApiResponse::ok(LoginData {
        token: session.session_token,
        master_token: session.master_token,
        session_id: session.id,
        validity_in_seconds: session.session_validity_seconds,
        master_validity_in_seconds: session.master_validity_seconds,
    })
}

async fn renew(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Json<ApiResponse<LoginData>> {
    let Some(master_token) = bearer_token(&headers) else {
        return ApiResponse::err(&floe::FloeError::AuthenticationFailed("missing master token".to_string()));
    };
    match state.sessions.renew(&master_token) {
        Ok(session) => {
            if state.verbose {
                eprintln!("[renew] session={}", session.id);
            }
            ApiResponse::ok(LoginData {
                token: session.session_token,
                master_token: session.master_token,
                session_id: session.id,
                validity_in_seconds: session.session_validity_seconds,
                master_validity_in_seconds: session.master_validity_seconds,
            })
        }
        Err(e) => ApiResponse::err(&e),
    }
}

async fn heartbeat(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Json<ApiResponse<()>> {
    let Some(token) = bearer_token(&headers) else {
        return ApiResponse::err(&floe::FloeError::AuthenticationFailed("missing session token".to_string()));
    };
    match state.sessions.heartbeat(&token) {
        Ok(()) => ApiResponse::ok(()),
        Err(e) => ApiResponse::err(&e),
    }
}

async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Json<ApiResponse<()>> {
    let Some(token) = bearer_token(&headers) else {
        return ApiResponse::err(&floe::FloeError::AuthenticationFailed("missing session token".to_string()));
    };
    match state.sessions.close_session(&token) {
        Ok(()) => {
            if state.verbose {
                eprintln!("[logout] session token revoked");
            }
            ApiResponse::ok(())
        }
        Err(e) => ApiResponse::err(&e),
    }
}

#[derive(Deserialize)]
struct QueryRequest {
    #[serde(rename = "sqlText")]
    sql_text: String,
    bindings: Option<HashMap<String, WireBinding>>,
}

#[derive(Deserialize)]
struct WireBinding {
    #[serde(rename = "type")]
    type_tag: String,
    value: Option<String>,
}

#[derive(Serialize)]
struct QueryData {
    #[serde(rename = "queryId")]
    query_id: String,
    status: String,
    rows: Vec<Vec<Option<String>>>,
    columns: Vec<ColumnWire>,
    #[serde(rename = "rowsAffected")]
    rows_affected: Option<u64>,
}

#[derive(Serialize)]
struct ColumnWire {
    name: String,
    #[serde(rename = "type")]
    type_name: &'static str,
    nullable: bool,
}

fn rows_to_wire(rows: EngineRows) -> (Vec<ColumnWire>, Vec<Vec<Option<String>>>) {
    let metas = floe::type_map::infer_columns(&rows.columns);
    let columns = metas
        .iter()
        .map(|m| ColumnWire { name: m.name.clone(), type_name: m.type_name, nullable: m.nullable })
        .collect();
    let wire_rows = rows
        .rows
        .iter()
        .map(|row| row.iter().map(floe::type_map::format_value).collect())
        .collect();
    (columns, wire_rows)
}

async fn query(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<QueryRequest>,
) -> (StatusCode, Json<ApiResponse<QueryData>>) {
    let Some(token) = bearer_token(&headers) else {
        return (
            StatusCode::UNAUTHORIZED,
            ApiResponse::err(&floe::FloeError::AuthenticationFailed("missing session token".to_string())),
        );
    };
    let session = match state.sessions.validate_session(&token) {
        Ok(s) => s,
        Err(e) => return (StatusCode::UNAUTHORIZED, ApiResponse::err(&e)),
    };

    let handle = state.statements.create(
        &req.sql_text,
        session.database.clone(),
        session.schema.clone(),
        None,
    );
    let _ = state.statements.set_running(&handle);

    let database = session.database.clone().unwrap_or_else(|| "FLOE".to_string());
    let schema = session.schema.clone().unwrap_or_else(|| "PUBLIC".to_string());

    let outcome = if let Some(wire_bindings) = req.bindings {
        let mut ordered: Vec<(usize, WireBinding)> = wire_bindings
            .into_iter()
            .filter_map(|(k, v)| k.parse::<usize>().ok().map(|n| (n, v)))
            .collect();
        ordered.sort_by_key(|(n, _)| *n);
        let bindings: Vec<BindingValue> = ordered
            .into_iter()
            .map(|(_, b)| match b.value {
                Some(v) => BindingValue::new(b.type_tag, v),
                None => BindingValue::null(b.type_tag),
            })
            .collect();
        state.executor.execute_with_bindings(&req.sql_text, &bindings, &database, &schema)
    } else {
        state.executor.execute(&req.sql_text, &database, &schema)
    };

    match outcome {
        Ok(ExecOutcome::Rows(rows)) => {
            let _ = state.statements.set_result(&handle, rows.clone());
            let (columns, wire_rows) = rows_to_wire(rows);
            (
                StatusCode::OK,
                ApiResponse::ok(QueryData {
                    query_id: handle,
                    status: "success".to_string(),
                    rows: wire_rows,
                    columns,
                    rows_affected: None,
                }),
            )
        }
        Ok(ExecOutcome::Affected(n)) => {
            let _ = state.statements.set_affected(&handle, n);
            (
                StatusCode::OK,
                ApiResponse::ok(QueryData {
                    query_id: handle,
                    status: "success".to_string(),
                    rows: Vec::new(),
                    columns: Vec::new(),
                    rows_affected: Some(n),
                }),
            )
        }
        Err(e) => {
            let _ = state.statements.set_error(&handle, &e.message().to_string());
            if state.verbose {
                eprintln!("[query] handle={handle} failed: {e}");
            }
            (StatusCode::BAD_REQUEST, ApiResponse::err(&e))
        }
    }
}

#[derive(Deserialize)]
struct StatementPath {
    handle: String,
}

async fn cancel(
    State(state): State<Arc<AppState>>,
    axum::extract::Path(path): axum::extract::Path<StatementPath>,
) -> Json<ApiResponse<()>> {
    match state.statements.cancel(&path.handle) {
        Ok(()) => ApiResponse::ok(()),
        Err(e) => ApiResponse::err(&e),
    }
}

async fn status(
    State(state): State<Arc<AppState>>,
    axum::extract::Path(path): axum::extract::Path<StatementPath>,
) -> Json<ApiResponse<String>> {
    match state.statements.status(&path.handle) {
        Ok(StatementStatus::Pending) => ApiResponse::ok("pending".to_string()),
        Ok(StatementStatus::Running) => ApiResponse::ok("running".to_string()),
        Ok(StatementStatus::Success) => ApiResponse::ok("success".to_string()),
        Ok(StatementStatus::Failed) => ApiResponse::ok("failed".to_string()),
        Ok(StatementStatus::Canceled) => ApiResponse::ok("canceled".to_string()),
        Err(e) => ApiResponse::err(&e),
    }
}

fn build_state(session_validity: u64, verbose: bool) -> Arc<AppState> {
    let engine: Arc<dyn SqlEngine> = Arc::new(DemoEngine::new());
    let catalog: Arc<dyn Catalog> = Arc::new(DemoCatalog::new());
    let stage: Arc<dyn Stage> = Arc::new(DemoStage::new());
    Arc::new(AppState {
        sessions: SessionManager::new(),
        statements: StatementManager::new(std::time::Duration::from_secs(session_validity)),
        executor: Executor::new(engine, catalog, stage),
        session_validity,
        verbose,
    })
}

async fn spawn_sweeps(state: Arc<AppState>) {
    let interval = (state.session_validity / 2).max(1);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval));
        loop {
            ticker.tick().await;
            state.sessions.reap_expired();
            state.statements.reap_expired();
            if state.verbose {
                eprintln!("[sweep] reclaimed expired sessions and statements");
            }
        }
    });
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let state = build_state(args.session_validity, args.verbose);
    spawn_sweeps(state.clone()).await;

    let app = Router::new()
        .route("/session/v1/login-request", post(login))
        .route("/session/token-request", post(renew))
        .route("/session/heartbeat", post(heartbeat))
        .route("/session/logout-request", post(logout))
        .route("/queries/v1/query-request", post(query))
        .route("/queries/{handle}/cancel", post(cancel))
        .route("/queries/{handle}/status", axum::routing::get(status))
        .with_state(state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Error: failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    eprintln!("floe-server listening on {addr}");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            eprintln!("\nShutting down...");
        })
        .await
    {
        eprintln!("Error: server failed: {e}");
        std::process::exit(1);
    }
}
