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

//! Protects single-quoted string literals behind numbered placeholders so
//! later textual passes never rewrite characters inside a literal.

/// Replace every single-quoted literal (`''`-escaped quotes honored) with a
/// `__STRLIT_n__` placeholder. Returns the masked text and the literals in
/// order, quotes included, for later restoration.
pub fn protect(sql: &str) -> (String, Vec<String>) {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut literals = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\'' {
            let start = i;
            i += 1;
            loop {
                if i >= chars.len() {
                    break;
                }
                if chars[i] == '\'' {
                    if i + 1 < chars.len() && chars[i + 1] == '\'' {
                        i += 2;
                        continue;
                    }
                    i += 1;
                    break;
                }
                i += 1;
            }
            let literal: String = chars[start..i].iter().collect();
            let placeholder = format!("__STRLIT_{}__", literals.len());
            literals.push(literal);
            out.push_str(&placeholder);
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    (out, literals)
}

/// Reverse [`protect`]: substitute every placeholder back to its literal.
pub fn restore(masked: &str, literals: &[String]) -> String {
    let mut text = masked.to_string();
    for (idx, literal) in literals.iter().enumerate() {
        let placeholder = format!("__STRLIT_{idx}__");
        text = text.replace(&placeholder, literal);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protects_and_restores_simple_literal() {
        let (masked, lits) = protect("name = 'hello'");
        assert!(!masked.contains('\''));
        assert_eq!(restore(&masked, &lits), "name = 'hello'");
    }

    #[test]
    fn handles_doubled_quote_escape() {
        let (masked, lits) = protect("name = 'O''Brien'");
        assert_eq!(lits[0], "'O''Brien'");
        assert_eq!(restore(&masked, &lits), "name = 'O''Brien'");
    }

    #[test]
    fn literal_survives_type_name_inside_it() {
        let (masked, lits) = protect("x DEFAULT 'NUMBER'");
        assert!(!masked.contains("NUMBER"));
        assert_eq!(restore(&masked, &lits), "x DEFAULT 'NUMBER'");
    }
}
