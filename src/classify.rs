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

//! Detects statement kind from the trimmed, uppercased textual prefix.

/// Fine-grained statement kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Query,
    Ddl,
    Copy,
    Merge,
    TransactionControl,
    Dml,
}

impl StatementKind {
    /// The numeric statement-type code carried on the wire.
    pub fn wire_code(&self) -> i32 {
        match self {
            StatementKind::Query => 1,
            StatementKind::Ddl => 2,
            StatementKind::Copy => 3,
            StatementKind::Merge => 4,
            StatementKind::TransactionControl => 5,
            StatementKind::Dml => 6,
        }
    }
}

const QUERY_PREFIXES: &[&str] = &["SELECT", "SHOW", "DESCRIBE", "DESC", "EXPLAIN"];
const DDL_PREFIXES: &[&str] = &["CREATE", "DROP", "ALTER"];
const TXN_PREFIXES: &[&str] = &["BEGIN", "START TRANSACTION", "COMMIT", "ROLLBACK"];

/// Classify a statement by its trimmed, uppercased prefix. Priority: query
/// keywords, then DDL, then `COPY`, then `MERGE`, then transaction control,
/// else DML.
pub fn classify(sql: &str) -> StatementKind {
    let upper = sql.trim().to_ascii_uppercase();

    if QUERY_PREFIXES.iter().any(|p| upper.starts_with(p)) {
        return StatementKind::Query;
    }
    if DDL_PREFIXES.iter().any(|p| upper.starts_with(p)) {
        return StatementKind::Ddl;
    }
    if upper.starts_with("COPY") {
        return StatementKind::Copy;
    }
    if upper.starts_with("MERGE") {
        return StatementKind::Merge;
    }
    if TXN_PREFIXES.iter().any(|p| upper.starts_with(p)) {
        return StatementKind::TransactionControl;
    }
    StatementKind::Dml
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_query_keywords() {
        for sql in ["select 1", "SHOW TABLES", "describe t", "DESC t", "explain select 1"] {
            assert_eq!(classify(sql), StatementKind::Query, "{sql}");
        }
    }

    #[test]
    fn classifies_ddl() {
        for sql in ["create table t(a int)", "DROP TABLE t", "alter table t add column a int"] {
            assert_eq!(classify(sql), StatementKind::Ddl, "{sql}");
        }
    }

    #[test]
    fn classifies_copy_and_merge() {
        assert_eq!(classify("COPY INTO t FROM @s"), StatementKind::Copy);
        assert_eq!(classify("merge into t using s on t.id=s.id"), StatementKind::Merge);
    }

    #[test]
    fn classifies_transaction_control() {
        for sql in ["BEGIN", "start transaction", "COMMIT", "rollback"] {
            assert_eq!(classify(sql), StatementKind::TransactionControl, "{sql}");
        }
    }

    #[test]
    fn defaults_to_dml() {
        assert_eq!(classify("insert into t values (1)"), StatementKind::Dml);
        assert_eq!(classify("update t set a=1"), StatementKind::Dml);
        assert_eq!(classify("delete from t"), StatementKind::Dml);
    }

    #[test]
    fn query_priority_beats_ddl_lookalikes() {
        assert_eq!(classify("  select * from create_log"), StatementKind::Query);
    }
}
