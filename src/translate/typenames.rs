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

//! Word-boundary type-name rewriting, used on the DDL path and for `CAST`
//! type components on the query path.

use super::litmask;

/// Source-name/target-name pairs. Order doesn't matter here; [`rewrite_words`]
/// sorts by descending source length before matching so `TIMESTAMP_NTZ` is
/// rewritten before the shorter `TIMESTAMP`.
const TYPE_TABLE: &[(&str, &str)] = &[
    ("TIMESTAMP_NTZ", "TIMESTAMP"),
    ("TIMESTAMP_LTZ", "TIMESTAMPTZ"),
    ("TIMESTAMP_TZ", "TIMESTAMPTZ"),
    ("CHARACTER", "VARCHAR"),
    ("VARBINARY", "BLOB"),
    ("DATETIME", "TIMESTAMP"),
    ("BYTEINT", "TINYINT"),
    ("VARIANT", "JSON"),
    ("NUMBER", "NUMERIC"),
    ("STRING", "VARCHAR"),
    ("OBJECT", "JSON"),
    ("BINARY", "BLOB"),
    ("FLOAT4", "FLOAT"),
    ("FLOAT8", "DOUBLE"),
    ("ARRAY", "JSON"),
    ("TEXT", "VARCHAR"),
    ("CHAR", "VARCHAR"),
];

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Rewrite every case-insensitive, word-boundary occurrence of a known
/// warehouse type name to its dialect equivalent. Does not touch string
/// literals; the caller is responsible for protecting them first.
pub fn rewrite_words(text: &str) -> String {
    let mut table: Vec<(&str, &str)> = TYPE_TABLE.to_vec();
    table.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    'outer: while i < chars.len() {
        if chars[i].is_ascii_alphabetic() || chars[i] == '_' {
            let start = i;
            let mut j = i;
            while j < chars.len() && is_word_char(chars[j]) {
                j += 1;
            }
            let word: String = chars[start..j].iter().collect();
            let upper = word.to_ascii_uppercase();
            for (from, to) in &table {
                if upper == *from {
                    out.push_str(to);
                    i = j;
                    continue 'outer;
                }
            }
            out.push_str(&word);
            i = j;
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// DDL-path entry point: protect string literals, rewrite type-name words,
/// then restore the literals byte-identical.
pub fn rewrite_type_names(sql: &str) -> String {
    let (masked, literals) = litmask::protect(sql);
    let rewritten = rewrite_words(&masked);
    litmask::restore(&rewritten, &literals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_known_types_word_boundary_safe() {
        let out = rewrite_type_names("CREATE TABLE f(a NUMBER, b TIMESTAMP_NTZ, c VARIANT)");
        assert_eq!(out, "CREATE TABLE f(a NUMERIC, b TIMESTAMP, c JSON)");
    }

    #[test]
    fn longest_match_wins_over_prefix() {
        let out = rewrite_words("TIMESTAMP_NTZ TIMESTAMP");
        assert_eq!(out, "TIMESTAMP TIMESTAMP");
    }

    #[test]
    fn string_literal_equal_to_type_name_is_untouched() {
        let out = rewrite_type_names("CREATE TABLE f(name VARCHAR DEFAULT 'TEXT')");
        assert_eq!(out, "CREATE TABLE f(name VARCHAR DEFAULT 'TEXT')");
    }

    #[test]
    fn does_not_rewrite_inside_longer_identifier() {
        let out = rewrite_words("my_char_count");
        assert_eq!(out, "my_char_count");
    }
}
