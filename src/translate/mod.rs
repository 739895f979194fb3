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

//! Rewrites warehouse SQL into the embedded engine's dialect.
//!
//! Three paths, picked by the statement's textual prefix:
//! - `CREATE`/`ALTER`: type-name rewriting only, never through the parser
//!   (round-tripping DDL through an AST re-quotes identifiers the target
//!   dialect rejects).
//! - `DROP`/`TRUNCATE`/`SHOW`/`DESCRIBE`/`DESC`/`EXPLAIN`: passed through
//!   verbatim.
//! - everything else: function-call rewriting, gated by parseability; an
//!   unparsable statement degrades to the original text unchanged, never an
//!   error.

pub mod functions;
pub mod litmask;
pub mod typenames;

const DDL_TYPE_ONLY_PREFIXES: &[&str] = &["CREATE", "ALTER"];
const VERBATIM_PREFIXES: &[&str] = &["DROP", "TRUNCATE", "SHOW", "DESCRIBE", "DESC", "EXPLAIN"];

fn starts_with_any(upper: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| upper.starts_with(p))
}

/// Translate a single SQL statement from the warehouse dialect to the
/// embedded engine's dialect. Idempotent: `translate(translate(s))` equals
/// `translate(s)` modulo whitespace.
pub fn translate(sql: &str) -> String {
    let upper = sql.trim_start().to_ascii_uppercase();

    if starts_with_any(&upper, DDL_TYPE_ONLY_PREFIXES) {
        return typenames::rewrite_type_names(sql);
    }

    if starts_with_any(&upper, VERBATIM_PREFIXES) {
        return sql.to_string();
    }

    if !functions::is_parseable(sql) {
        return sql.to_string();
    }

    functions::rewrite_functions(sql)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(s: &str) -> String {
        s.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_lowercase()
    }

    #[test]
    fn translate_is_idempotent_modulo_whitespace() {
        let cases = [
            "SELECT IFF(a>1,'x','y') FROM t",
            "SELECT NVL(x,0) FROM t",
            "CREATE TABLE f(a NUMBER, b VARIANT)",
            "DROP TABLE t",
            "COPY INTO t FROM @s PATTERN='*.csv'",
        ];
        for sql in cases {
            let once = translate(sql);
            let twice = translate(&once);
            assert_eq!(norm(&once), norm(&twice), "not idempotent for {sql}");
        }
    }

    #[test]
    fn ddl_path_never_touches_parser() {
        let out = translate("CREATE TABLE f(name VARCHAR DEFAULT 'TEXT')");
        assert_eq!(out, "CREATE TABLE f(name VARCHAR DEFAULT 'TEXT')");
    }

    #[test]
    fn verbatim_prefixes_pass_through() {
        assert_eq!(translate("DROP TABLE t"), "DROP TABLE t");
        assert_eq!(translate("SHOW TABLES"), "SHOW TABLES");
    }

    #[test]
    fn unparsable_statement_degrades_gracefully() {
        let copy_sql = "COPY INTO t FROM @s PATTERN='*.csv' ON_ERROR=CONTINUE";
        assert_eq!(translate(copy_sql), copy_sql);
    }

    #[test]
    fn create_table_type_rewrite_seed() {
        let out = translate("CREATE TABLE f(a NUMBER, b TIMESTAMP_NTZ, c VARIANT)");
        assert_eq!(out, "CREATE TABLE f(a NUMERIC, b TIMESTAMP, c JSON)");
    }
}
