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

//! Rewrites warehouse-specific function calls to their dialect equivalents.
//!
//! Parseability is checked with `sqlparser` first (the graceful-degradation
//! gate); the rewrite itself walks the string-literal-protected text,
//! post-order over nested calls, matching balanced parentheses rather than
//! mutating `sqlparser`'s expression tree directly. `CAST` type components
//! are rewritten the same way the DDL path rewrites type names.

use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use super::{litmask, typenames};

const SIMPLE_RENAMES: &[(&str, &str)] = &[
    ("IFF", "IF"),
    ("NVL", "COALESCE"),
    ("IFNULL", "COALESCE"),
    ("LISTAGG", "STRING_AGG"),
    ("OBJECT_CONSTRUCT", "json_object"),
    ("FLATTEN", "UNNEST"),
];

/// True if `sqlparser` accepts the statement under a generic dialect.
pub fn is_parseable(sql: &str) -> bool {
    Parser::parse_sql(&GenericDialect {}, sql).is_ok()
}

/// Rewrite every recognized function call in `sql`. Callers should only
/// invoke this after confirming [`is_parseable`]; an unparsable statement is
/// returned unchanged by the translator's graceful-degradation contract.
pub fn rewrite_functions(sql: &str) -> String {
    let (masked, literals) = litmask::protect(sql);
    let rewritten = rewrite_calls(&masked);
    let stripped = strip_from_dual(&rewritten);
    litmask::restore(&stripped, &literals)
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Find the index of the `)` matching the `(` at `open`, honoring nesting.
/// The text passed in has already had string literals masked out.
fn match_paren(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut i = open;
    while i < chars.len() {
        match chars[i] {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Split at top-level commas only, respecting nested parentheses.
fn split_top_level_commas(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, c) in chars.iter().enumerate() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(chars[start..i].iter().collect::<String>());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(chars[start..].iter().collect::<String>());
    parts
}

/// Post-order rewrite: recurse into a call's arguments before deciding what
/// to do with the call itself, so nested rewrites (e.g. `TO_VARIANT` inside
/// a `LISTAGG` argument) land correctly.
fn rewrite_calls(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if is_ident_start(chars[i]) {
            let start = i;
            let mut j = i;
            while j < chars.len() && is_ident_char(chars[j]) {
                j += 1;
            }
            let ident: String = chars[start..j].iter().collect();
            let mut k = j;
            while k < chars.len() && chars[k].is_whitespace() {
                k += 1;
            }
            if k < chars.len() && chars[k] == '(' {
                if let Some(close) = match_paren(&chars, k) {
                    let inner: String = chars[k + 1..close].iter().collect();
                    let inner = rewrite_calls(&inner);
                    out.push_str(&emit_call(&ident, &inner));
                    i = close + 1;
                    continue;
                }
            }
            out.push_str(&ident);
            i = j;
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn emit_call(ident: &str, inner: &str) -> String {
    let upper = ident.to_ascii_uppercase();

    if let Some((_, renamed)) = SIMPLE_RENAMES.iter().find(|(k, _)| *k == upper) {
        return format!("{renamed}({inner})");
    }

    if upper == "NVL2" {
        let args = split_top_level_commas(inner);
        if args.len() == 3 {
            return format!(
                "IF({} IS NOT NULL, {}, {})",
                args[0].trim(),
                args[1].trim(),
                args[2].trim()
            );
        }
    }

    if upper == "TO_VARIANT" || upper == "PARSE_JSON" {
        return format!("CAST({} AS JSON)", inner.trim());
    }

    if upper == "DATEADD" {
        let args = split_top_level_commas(inner);
        if args.len() == 3 {
            return format!(
                "(CAST({} AS DATE) + interval {} {})",
                args[2].trim(),
                args[1].trim(),
                args[0].trim()
            );
        }
    }

    if upper == "DATEDIFF" {
        let args = split_top_level_commas(inner);
        if args.len() == 3 {
            return format!(
                "DATE_DIFF('{}', CAST({} AS DATE), CAST({} AS DATE))",
                args[0].trim(),
                args[1].trim(),
                args[2].trim()
            );
        }
    }

    if (upper == "CURRENT_TIMESTAMP" || upper == "CURRENT_DATE") && inner.trim().is_empty() {
        return ident.to_string();
    }

    if upper == "CAST" {
        if let Some(rewritten) = rewrite_cast_type(inner) {
            return format!("CAST({rewritten})");
        }
    }

    format!("{ident}({inner})")
}

/// `CAST(expr AS type)`: translate only the type component, at the last
/// top-level `AS` keyword, through the same table the DDL path uses.
fn rewrite_cast_type(inner: &str) -> Option<String> {
    let chars: Vec<char> = inner.chars().collect();
    let mut depth = 0i32;
    let mut as_at = None;
    let mut i = 0;
    while i + 1 < chars.len() {
        match chars[i] {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
        if depth == 0
            && (chars[i] == 'a' || chars[i] == 'A')
            && (chars[i + 1] == 's' || chars[i + 1] == 'S')
            && (i == 0 || chars[i - 1].is_whitespace())
            && (i + 2 >= chars.len() || chars[i + 2].is_whitespace())
        {
            as_at = Some(i);
        }
        i += 1;
    }
    let as_at = as_at?;
    let expr: String = chars[..as_at].iter().collect();
    let ty: String = chars[as_at + 2..].iter().collect();
    Some(format!(
        "{}AS {}",
        expr,
        typenames::rewrite_words(ty.trim())
    ))
}

/// Strip a trailing Oracle-style `FROM DUAL` some AST serializers append to
/// a single-row `SELECT` with no real `FROM` clause.
fn strip_from_dual(sql: &str) -> String {
    let trimmed = sql.trim_end();
    let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();
    let lower = trimmed.to_ascii_lowercase();
    if lower.ends_with("from dual") {
        let cut = trimmed.len() - "from dual".len();
        return trimmed[..cut].trim_end().to_string();
    }
    sql.to_string()
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
    fn iff_renames_to_if() {
        let out = rewrite_functions("SELECT IFF(age>18,'a','b') FROM t");
        assert_eq!(norm(&out), norm("SELECT IF(age>18,'a','b') FROM t"));
    }

    #[test]
    fn nvl_and_ifnull_rename_to_coalesce() {
        let out = rewrite_functions("SELECT NVL(x,0), IFNULL(y,0) FROM t");
        assert_eq!(
            norm(&out),
            norm("SELECT COALESCE(x,0), COALESCE(y,0) FROM t")
        );
    }

    #[test]
    fn nvl2_shape_changes_to_if_is_not_null() {
        let out = rewrite_functions("SELECT NVL2(c,1,0) FROM t");
        assert_eq!(norm(&out), norm("SELECT IF(c IS NOT NULL, 1, 0) FROM t"));
    }

    #[test]
    fn dateadd_becomes_interval_arithmetic() {
        let out = rewrite_functions("SELECT DATEADD(day,7,d) FROM t");
        assert_eq!(
            norm(&out),
            norm("SELECT (CAST(d AS DATE) + interval 7 day) FROM t")
        );
    }

    #[test]
    fn datediff_becomes_date_diff_call() {
        let out = rewrite_functions("SELECT DATEDIFF(day,s,e) FROM t");
        assert_eq!(
            norm(&out),
            norm("SELECT DATE_DIFF('day', CAST(s AS DATE), CAST(e AS DATE)) FROM t")
        );
    }

    #[test]
    fn to_variant_and_parse_json_become_cast_as_json() {
        let out = rewrite_functions("SELECT TO_VARIANT(x), PARSE_JSON(y) FROM t");
        assert_eq!(
            norm(&out),
            norm("SELECT CAST(x AS JSON), CAST(y AS JSON) FROM t")
        );
    }

    #[test]
    fn listagg_renames_to_string_agg() {
        let out = rewrite_functions("SELECT LISTAGG(n,', ') FROM t GROUP BY c");
        assert_eq!(
            norm(&out),
            norm("SELECT STRING_AGG(n,', ') FROM t GROUP BY c")
        );
    }

    #[test]
    fn unparseable_statement_is_never_attempted() {
        assert!(!is_parseable("COPY INTO t FROM @s PATTERN='*.csv'"));
    }

    #[test]
    fn nested_marker_inside_listagg_argument_rewrites_both() {
        let out = rewrite_functions("SELECT LISTAGG(TO_VARIANT(x), ',') FROM t");
        assert_eq!(
            norm(&out),
            norm("SELECT STRING_AGG(CAST(x AS JSON), ',') FROM t")
        );
    }
}
