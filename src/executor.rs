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

//! Ties the pieces together: classify a statement, translate it (or hand it
//! to the COPY/MERGE processors, which need the untranslated text), and run
//! it against the engine. COPY and MERGE take the engine handle directly
//! rather than calling back into the executor, which sidesteps the
//! construction-order problem a recursive "processor calls executor calls
//! processor" design would otherwise have.

use std::sync::Arc;

use crate::bind::{self, BindingValue};
use crate::catalog::Catalog;
use crate::classify::{self, StatementKind};
use crate::copy;
use crate::engine::{EngineRows, SqlEngine};
use crate::error::{FloeError, Result};
use crate::merge;
use crate::resolver;
use crate::stage::Stage;
use crate::translate;

#[derive(Debug, Clone)]
pub enum ExecOutcome {
    Rows(EngineRows),
    Affected(u64),
}

pub struct Executor {
    engine: Arc<dyn SqlEngine>,
    catalog: Arc<dyn Catalog>,
    stage: Arc<dyn Stage>,
}

fn normalize_transaction_control(sql: &str) -> String {
    let upper = sql.trim().to_ascii_uppercase();
    if upper == "BEGIN" || upper == "START TRANSACTION" {
        "BEGIN TRANSACTION".to_string()
    } else {
        sql.trim().to_string()
    }
}

/// Find the identifier-like token (letters, digits, `_`, `.`) immediately
/// following a whole-word, case-insensitive `keyword` in `sql`. Returns its
/// byte range in `sql` and its text.
fn ident_after(sql: &str, keyword: &str) -> Option<(usize, usize, String)> {
    let upper = sql.to_ascii_uppercase();
    let mut search_from = 0;
    while let Some(rel) = upper[search_from..].find(keyword) {
        let idx = search_from + rel;
        let before_ok = idx == 0
            || !(upper.as_bytes()[idx - 1].is_ascii_alphanumeric() || upper.as_bytes()[idx - 1] == b'_');
        let after_idx = idx + keyword.len();
        let after_ok = upper
            .as_bytes()
            .get(after_idx)
            .map(|b| !(b.is_ascii_alphanumeric() || *b == b'_'))
            .unwrap_or(true);
        if before_ok && after_ok {
            let rest = &sql[after_idx..];
            let ident_start = after_idx + (rest.len() - rest.trim_start().len());
            let tail = &sql[ident_start..];
            let ident_len = tail
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
                .unwrap_or(tail.len());
            if ident_len > 0 {
                return Some((ident_start, ident_start + ident_len, sql[ident_start..ident_start + ident_len].to_string()));
            }
        }
        search_from = idx + keyword.len();
    }
    None
}

/// Rewrite the table reference named by a dotted `db.schema.table` (or
/// `schema.table`) form into the engine-qualified name, via the same
/// resolver convention `copy` uses for COPY targets (`resolver::engine_name`).
/// Bare, undotted references are left untouched — the engine already holds
/// those under their own name. This keeps every path that hands a table
/// name to the engine — plain DDL/DML here and COPY's target resolution —
/// in agreement about what a given `db.schema.table` reference resolves to.
fn qualify_table_reference(sql: &str) -> String {
    let upper = sql.trim_start().to_ascii_uppercase();
    let keyword = if upper.starts_with("CREATE TABLE") || upper.starts_with("DROP TABLE") {
        "TABLE"
    } else if upper.starts_with("INSERT") {
        "INTO"
    } else if upper.starts_with("UPDATE") {
        "UPDATE"
    } else if upper.starts_with("DELETE") || upper.starts_with("SELECT") {
        "FROM"
    } else {
        return sql.to_string();
    };

    match ident_after(sql, keyword) {
        Some((start, end, ident)) if ident.contains('.') => {
            let resolved = resolver::engine_name_for(&ident);
            format!("{}{}{}", &sql[..start], resolved, &sql[end..])
        }
        _ => sql.to_string(),
    }
}

impl Executor {
    pub fn new(engine: Arc<dyn SqlEngine>, catalog: Arc<dyn Catalog>, stage: Arc<dyn Stage>) -> Self {
        Executor { engine, catalog, stage }
    }

    /// Run one statement in the given session context.
    pub fn execute(&self, sql: &str, database: &str, schema: &str) -> Result<ExecOutcome> {
        match classify::classify(sql) {
            StatementKind::Copy => {
                let parsed = copy::parse_copy(sql)?;
                let outcome = copy::run_copy(
                    &parsed,
                    self.catalog.as_ref(),
                    self.stage.as_ref(),
                    self.engine.as_ref(),
                    database,
                    schema,
                )?;
                Ok(ExecOutcome::Affected(outcome.rows_loaded))
            }
            StatementKind::Merge => {
                let parsed = merge::parse_merge(sql)?;
                let outcome = merge::run_merge(sql, &parsed, self.engine.as_ref())?;
                let total = outcome.rows_inserted + outcome.rows_updated + outcome.rows_deleted;
                Ok(ExecOutcome::Affected(total))
            }
            StatementKind::TransactionControl => {
                let normalized = normalize_transaction_control(sql);
                let n = self
                    .engine
                    .exec(&normalized)
                    .map_err(|e| FloeError::SqlExecution(e.to_string()))?;
                Ok(ExecOutcome::Affected(n))
            }
            StatementKind::Query => {
                let translated = translate::translate(sql);
                let qualified = qualify_table_reference(&translated);
                let rows = self
                    .engine
                    .query(&qualified)
                    .map_err(|e| FloeError::SqlExecution(e.to_string()))?;
                Ok(ExecOutcome::Rows(rows))
            }
            StatementKind::Ddl | StatementKind::Dml => {
                let translated = translate::translate(sql);
                let qualified = qualify_table_reference(&translated);
                let n = self
                    .engine
                    .exec(&qualified)
                    .map_err(|e| FloeError::SqlExecution(e.to_string()))?;
                Ok(ExecOutcome::Affected(n))
            }
        }
    }

    /// Bind parameters then run the resulting statement. Binding runs
    /// before translation: a binding error never lets an unbound statement
    /// reach the engine.
    pub fn execute_with_bindings(
        &self,
        sql: &str,
        bindings: &[BindingValue],
        database: &str,
        schema: &str,
    ) -> Result<ExecOutcome> {
        let bound = bind::bind(sql, bindings)?;
        self.execute(&bound, database, schema)
    }

    /// Run a statement against the engine without classification or
    /// translation, for callers that already hold engine-dialect SQL.
    pub fn execute_raw(&self, sql: &str) -> Result<u64> {
        self.engine.exec(sql).map_err(|e| FloeError::SqlExecution(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DemoCatalog;
    use crate::demo_engine::DemoEngine;
    use crate::stage::DemoStage;

    fn setup() -> Executor {
        let engine = Arc::new(DemoEngine::new());
        let catalog = Arc::new(DemoCatalog::new());
        catalog.register("DB", "PUBLIC");
        let stage = Arc::new(DemoStage::new());
        Executor::new(engine, catalog, stage)
    }

    #[test]
    fn create_insert_select_flow() {
        let exec = setup();
        exec.execute("CREATE TABLE t (id INTEGER, name VARCHAR)", "DB", "PUBLIC").unwrap();
        exec.execute("INSERT INTO t VALUES (1, 'Alice')", "DB", "PUBLIC").unwrap();
        let outcome = exec.execute("SELECT * FROM t", "DB", "PUBLIC").unwrap();
        match outcome {
            ExecOutcome::Rows(rows) => assert_eq!(rows.rows.len(), 1),
            _ => panic!("expected rows"),
        }
    }

    #[test]
    fn function_dialect_is_translated_before_dispatch() {
        let exec = setup();
        exec.execute("CREATE TABLE t (id INTEGER, name VARCHAR)", "DB", "PUBLIC").unwrap();
        exec.execute("INSERT INTO t VALUES (1, NULL)", "DB", "PUBLIC").unwrap();
        let outcome = exec
            .execute("SELECT IFF(name IS NULL, 'none', name) AS label FROM t", "DB", "PUBLIC")
            .unwrap();
        match outcome {
            ExecOutcome::Rows(rows) => assert_eq!(rows.columns[0].name, "label"),
            _ => panic!("expected rows"),
        }
    }

    #[test]
    fn begin_is_normalized_and_accepted() {
        let exec = setup();
        let outcome = exec.execute("BEGIN", "DB", "PUBLIC").unwrap();
        assert!(matches!(outcome, ExecOutcome::Affected(0)));
    }

    #[test]
    fn binding_error_prevents_execution() {
        let exec = setup();
        exec.execute("CREATE TABLE t (id INTEGER)", "DB", "PUBLIC").unwrap();
        let bindings = vec![BindingValue::new("INTEGER", "not-a-number")];
        let result = exec.execute_with_bindings("INSERT INTO t VALUES (:1)", &bindings, "DB", "PUBLIC");
        assert!(result.is_err());
        let outcome = exec.execute("SELECT COUNT(*) FROM t", "DB", "PUBLIC").unwrap();
        match outcome {
            ExecOutcome::Rows(rows) => assert_eq!(rows.rows[0][0], crate::engine::EngineValue::Int(0)),
            _ => panic!("expected rows"),
        }
    }

    #[test]
    fn dotted_table_reference_resolves_the_same_way_everywhere() {
        let exec = setup();
        exec.execute("CREATE TABLE db.public.t (id INTEGER, name VARCHAR)", "DB", "PUBLIC").unwrap();
        exec.execute("INSERT INTO db.public.t VALUES (1, 'Alice')", "DB", "PUBLIC").unwrap();
        let outcome = exec.execute("SELECT COUNT(*) FROM db.public.t", "DB", "PUBLIC").unwrap();
        match outcome {
            ExecOutcome::Rows(rows) => assert_eq!(rows.rows[0][0], crate::engine::EngineValue::Int(1)),
            _ => panic!("expected rows"),
        }
    }

    #[test]
    fn bare_table_reference_is_left_untouched() {
        assert_eq!(qualify_table_reference("CREATE TABLE t (id INTEGER)"), "CREATE TABLE t (id INTEGER)");
    }

    #[test]
    fn dotted_reference_is_rewritten_to_the_resolver_convention() {
        assert_eq!(
            qualify_table_reference("SELECT * FROM db.public.t"),
            "SELECT * FROM DB.PUBLIC_T"
        );
    }
}
