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

//! A small in-memory [`SqlEngine`] sufficient to run the translated SQL
//! subset this crate's scenarios exercise: table creation, insertion,
//! projection/filtering/ordering, and the `UPDATE ... FROM` / `DELETE ...
//! USING` / `INSERT ... SELECT ... WHERE NOT EXISTS` shapes the MERGE
//! processor's decomposition path emits. It is scaffolding, not a
//! reimplementation of any production engine's planner: no joins beyond the
//! two-table shapes above, no subqueries beyond a single correlated
//! `EXISTS`, no aggregates beyond `COUNT(*)`.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::engine::{EngineColumn, EngineResult, EngineRows, EngineValue, SqlEngine, SqlExecError};

#[derive(Debug, Clone)]
struct ColumnDef {
    name: String,
    decl_type: String,
}

#[derive(Debug, Clone, Default)]
struct Table {
    columns: Vec<ColumnDef>,
    rows: Vec<Vec<EngineValue>>,
}

impl Table {
    fn col_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    fn engine_type_for(&self, idx: usize) -> String {
        decl_to_engine_type(&self.columns[idx].decl_type)
    }
}

fn decl_to_engine_type(decl: &str) -> String {
    let upper = decl.to_ascii_uppercase();
    if upper.contains("INT") {
        "int64".to_string()
    } else if upper.contains("FLOAT") || upper.contains("DOUBLE") || upper.contains("NUMERIC") || upper.contains("DECIMAL") {
        "float64".to_string()
    } else if upper.contains("BOOL") {
        "bool".to_string()
    } else if upper.contains("TIMESTAMP") {
        "timestamp_ntz".to_string()
    } else if upper.contains("JSON") {
        "json".to_string()
    } else {
        "utf8".to_string()
    }
}

/// An in-memory, single-threaded-semantics (guarded by a lock) demo engine.
#[derive(Debug, Default)]
pub struct DemoEngine {
    tables: RwLock<HashMap<String, Table>>,
}

impl DemoEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Num(String),
    Str(String),
    Punct(char),
    Op(String),
}

fn tokenize(sql: &str) -> Vec<Tok> {
    let chars: Vec<char> = sql.chars().collect();
    let mut toks = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '\'' {
            let start = i;
            i += 1;
            while i < chars.len() {
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
            let raw: String = chars[start + 1..i.saturating_sub(1)].iter().collect();
            toks.push(Tok::Str(raw.replace("''", "'")));
            continue;
        }
        if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).map(|n| n.is_ascii_digit()).unwrap_or(false) && matches!(toks.last(), Some(Tok::Op(_)) | Some(Tok::Punct('(')) | Some(Tok::Punct(',')) | None)) {
            let start = i;
            if c == '-' {
                i += 1;
            }
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            toks.push(Tok::Num(chars[start..i].iter().collect()));
            continue;
        }
        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len()
                && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.')
            {
                i += 1;
            }
            toks.push(Tok::Ident(chars[start..i].iter().collect()));
            continue;
        }
        match c {
            '(' | ')' | ',' | '*' | ';' => {
                toks.push(Tok::Punct(c));
                i += 1;
            }
            '<' | '>' | '!' | '=' => {
                let start = i;
                i += 1;
                if i < chars.len() && chars[i] == '=' {
                    i += 1;
                }
                toks.push(Tok::Op(chars[start..i].iter().collect()));
            }
            _ => {
                i += 1;
            }
        }
    }
    toks
}

fn kw(tok: &Tok, word: &str) -> bool {
    matches!(tok, Tok::Ident(s) if s.eq_ignore_ascii_case(word))
}

// ---------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Expr {
    Column(String),
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Cmp(Box<Expr>, String, Box<Expr>),
    Exists(bool, Box<SelectPlan>),
}

struct Scope<'a> {
    vars: HashMap<String, EngineValue>,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    fn get(&self, key: &str) -> Option<EngineValue> {
        if let Some(v) = self.vars.get(&key.to_ascii_uppercase()) {
            return Some(v.clone());
        }
        self.parent.and_then(|p| p.get(key))
    }
}

fn eval(expr: &Expr, scope: &Scope, engine: &DemoEngine) -> EngineValue {
    match expr {
        Expr::Column(name) => scope.get(name).unwrap_or(EngineValue::Null),
        Expr::Int(v) => EngineValue::Int(*v),
        Expr::Float(v) => EngineValue::Float(*v),
        Expr::Str(v) => EngineValue::Text(v.clone()),
        Expr::Bool(v) => EngineValue::Bool(*v),
        Expr::Null => EngineValue::Null,
        Expr::Not(e) => EngineValue::Bool(!truthy(&eval(e, scope, engine))),
        Expr::And(a, b) => {
            EngineValue::Bool(truthy(&eval(a, scope, engine)) && truthy(&eval(b, scope, engine)))
        }
        Expr::Or(a, b) => {
            EngineValue::Bool(truthy(&eval(a, scope, engine)) || truthy(&eval(b, scope, engine)))
        }
        Expr::Cmp(a, op, b) => {
            let va = eval(a, scope, engine);
            let vb = eval(b, scope, engine);
            EngineValue::Bool(compare(&va, op, &vb))
        }
        Expr::Exists(negated, plan) => {
            let rows = run_select_correlated(plan, engine, Some(scope));
            let found = !rows.is_empty();
            EngineValue::Bool(found != *negated)
        }
    }
}

fn truthy(v: &EngineValue) -> bool {
    matches!(v, EngineValue::Bool(true))
}

fn compare(a: &EngineValue, op: &str, b: &EngineValue) -> bool {
    let ord = match (a, b) {
        (EngineValue::Int(x), EngineValue::Int(y)) => x.partial_cmp(y),
        (EngineValue::Float(x), EngineValue::Float(y)) => x.partial_cmp(y),
        (EngineValue::Int(x), EngineValue::Float(y)) => (*x as f64).partial_cmp(y),
        (EngineValue::Float(x), EngineValue::Int(y)) => x.partial_cmp(&(*y as f64)),
        (EngineValue::Text(x), EngineValue::Text(y)) => x.partial_cmp(y),
        (EngineValue::Bool(x), EngineValue::Bool(y)) => x.partial_cmp(y),
        (EngineValue::Null, EngineValue::Null) => return op == "=" || op == "<=" || op == ">=",
        (EngineValue::Null, _) | (_, EngineValue::Null) => return false,
        _ => return false,
    };
    let Some(ord) = ord else { return false };
    match op {
        "=" => ord == std::cmp::Ordering::Equal,
        "<>" | "!=" => ord != std::cmp::Ordering::Equal,
        "<" => ord == std::cmp::Ordering::Less,
        "<=" => ord != std::cmp::Ordering::Greater,
        ">" => ord == std::cmp::Ordering::Greater,
        ">=" => ord != std::cmp::Ordering::Less,
        _ => false,
    }
}

struct ExprParser<'a> {
    toks: &'a [Tok],
    pos: usize,
}

impl<'a> ExprParser<'a> {
    fn new(toks: &'a [Tok]) -> Self {
        ExprParser { toks, pos: 0 }
    }

    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Tok> {
        let t = self.toks.get(self.pos);
        self.pos += 1;
        t
    }

    fn parse_or(&mut self) -> Expr {
        let mut left = self.parse_and();
        while matches!(self.peek(), Some(t) if kw(t, "OR")) {
            self.advance();
            let right = self.parse_and();
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        left
    }

    fn parse_and(&mut self) -> Expr {
        let mut left = self.parse_not();
        while matches!(self.peek(), Some(t) if kw(t, "AND")) {
            self.advance();
            let right = self.parse_not();
            left = Expr::And(Box::new(left), Box::new(right));
        }
        left
    }

    fn parse_not(&mut self) -> Expr {
        if matches!(self.peek(), Some(t) if kw(t, "NOT")) {
            self.advance();
            if matches!(self.peek(), Some(t) if kw(t, "EXISTS")) {
                self.advance();
                return self.parse_exists(true);
            }
            return Expr::Not(Box::new(self.parse_not()));
        }
        if matches!(self.peek(), Some(t) if kw(t, "EXISTS")) {
            self.advance();
            return self.parse_exists(false);
        }
        self.parse_cmp()
    }

    fn parse_exists(&mut self, negated: bool) -> Expr {
        // expects '(' SELECT ... ')'
        self.advance(); // (
        let mut depth = 1;
        let start = self.pos;
        while depth > 0 {
            match self.advance() {
                Some(Tok::Punct('(')) => depth += 1,
                Some(Tok::Punct(')')) => depth -= 1,
                Some(_) => {}
                None => break,
            }
        }
        let inner = &self.toks[start..self.pos - 1];
        let plan = parse_select_tokens(inner);
        Expr::Exists(negated, Box::new(plan))
    }

    fn parse_cmp(&mut self) -> Expr {
        let left = self.parse_primary();
        if matches!(self.peek(), Some(Tok::Op(_))) {
            if let Some(Tok::Op(op)) = self.advance().cloned() {
                let right = self.parse_primary();
                return Expr::Cmp(Box::new(left), op, Box::new(right));
            }
        }
        if matches!(self.peek(), Some(t) if kw(t, "IS")) {
            self.advance();
            let negate = matches!(self.peek(), Some(t) if kw(t, "NOT"));
            if negate {
                self.advance();
            }
            // expect NULL
            self.advance();
            let is_null = Expr::Cmp(Box::new(left), "=".to_string(), Box::new(Expr::Null));
            return if negate {
                Expr::Not(Box::new(is_null))
            } else {
                is_null
            };
        }
        left
    }

    fn parse_primary(&mut self) -> Expr {
        match self.advance().cloned() {
            Some(Tok::Punct('(')) => {
                let e = self.parse_or();
                // consume ')'
                if matches!(self.peek(), Some(Tok::Punct(')'))) {
                    self.advance();
                }
                e
            }
            Some(Tok::Num(n)) => {
                if n.contains('.') {
                    Expr::Float(n.parse().unwrap_or(0.0))
                } else {
                    Expr::Int(n.parse().unwrap_or(0))
                }
            }
            Some(Tok::Str(s)) => Expr::Str(s),
            Some(Tok::Ident(id)) => {
                if id.eq_ignore_ascii_case("NULL") {
                    Expr::Null
                } else if id.eq_ignore_ascii_case("TRUE") {
                    Expr::Bool(true)
                } else if id.eq_ignore_ascii_case("FALSE") {
                    Expr::Bool(false)
                } else {
                    Expr::Column(id)
                }
            }
            _ => Expr::Null,
        }
    }
}

fn parse_expr(toks: &[Tok]) -> Expr {
    ExprParser::new(toks).parse_or()
}

// ---------------------------------------------------------------------
// SELECT
// ---------------------------------------------------------------------

#[derive(Debug, Clone)]
enum SelectItem {
    Star,
    CountStar,
    Expr(Expr, Option<String>),
}

#[derive(Debug, Clone, Default)]
struct SelectPlan {
    items: Vec<SelectItem>,
    from: Option<(String, Option<String>)>,
    where_expr: Option<Expr>,
    order_by: Option<(String, bool)>,
    limit: Option<usize>,
}

fn split_top(toks: &[Tok]) -> Vec<Vec<Tok>> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, t) in toks.iter().enumerate() {
        match t {
            Tok::Punct('(') => depth += 1,
            Tok::Punct(')') => depth -= 1,
            Tok::Punct(',') if depth == 0 => {
                parts.push(toks[start..i].to_vec());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(toks[start..].to_vec());
    parts
}

fn find_kw(toks: &[Tok], word: &str) -> Option<usize> {
    let mut depth = 0i32;
    for (i, t) in toks.iter().enumerate() {
        match t {
            Tok::Punct('(') => depth += 1,
            Tok::Punct(')') => depth -= 1,
            _ => {}
        }
        if depth == 0 && kw(t, word) {
            return Some(i);
        }
    }
    None
}

fn parse_select_tokens(toks: &[Tok]) -> SelectPlan {
    let mut toks = toks;
    if matches!(toks.first(), Some(t) if kw(t, "SELECT")) {
        toks = &toks[1..];
    }

    let from_idx = find_kw(toks, "FROM");
    let (item_toks, rest) = match from_idx {
        Some(idx) => (&toks[..idx], &toks[idx + 1..]),
        None => (toks, &toks[0..0]),
    };

    let mut plan = SelectPlan::default();
    for item in split_top(item_toks) {
        if item.len() == 1 && item[0] == Tok::Punct('*') {
            plan.items.push(SelectItem::Star);
            continue;
        }
        if item.len() >= 3
            && kw(&item[0], "COUNT")
            && item[1] == Tok::Punct('(')
            && item[2] == Tok::Punct('*')
        {
            plan.items.push(SelectItem::CountStar);
            continue;
        }
        // optional trailing "AS alias" or bare "alias"
        let mut expr_end = item.len();
        let mut alias = None;
        if item.len() >= 2 {
            if kw(&item[item.len() - 2], "AS") {
                if let Tok::Ident(name) = &item[item.len() - 1] {
                    alias = Some(name.clone());
                    expr_end = item.len() - 2;
                }
            }
        }
        let expr = parse_expr(&item[..expr_end]);
        plan.items.push(SelectItem::Expr(expr, alias));
    }

    if !rest.is_empty() {
        let where_idx = find_kw(rest, "WHERE");
        let order_idx = find_kw(rest, "ORDER");
        let limit_idx = find_kw(rest, "LIMIT");

        let from_end = [where_idx, order_idx, limit_idx]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(rest.len());
        let from_toks = &rest[..from_end];
        if let Some(Tok::Ident(name)) = from_toks.first() {
            let alias = from_toks.get(1).and_then(|t| match t {
                Tok::Ident(a) if !kw(t, "WHERE") && !kw(t, "ORDER") => Some(a.clone()),
                _ => None,
            });
            plan.from = Some((name.clone(), alias));
        }

        if let Some(w) = where_idx {
            let end = [order_idx, limit_idx]
                .into_iter()
                .flatten()
                .filter(|&x| x > w)
                .min()
                .unwrap_or(rest.len());
            plan.where_expr = Some(parse_expr(&rest[w + 1..end]));
        }

        if let Some(o) = order_idx {
            let mut i = o + 1;
            if matches!(rest.get(i), Some(t) if kw(t, "BY")) {
                i += 1;
            }
            let end = limit_idx.filter(|&x| x > o).unwrap_or(rest.len());
            if let Some(Tok::Ident(col)) = rest.get(i) {
                let asc = !matches!(rest.get(i + 1), Some(t) if kw(t, "DESC"));
                let _ = end;
                plan.order_by = Some((col.clone(), asc));
            }
        }

        if let Some(l) = limit_idx {
            if let Some(Tok::Num(n)) = rest.get(l + 1) {
                plan.limit = n.parse().ok();
            }
        }
    }

    plan
}

fn load_table_rows(engine: &DemoEngine, table: &str) -> Option<(Vec<String>, Vec<Vec<EngineValue>>)> {
    let tables = engine.tables.read().unwrap();
    let t = tables.get(&table.to_ascii_uppercase())?;
    Some((
        t.columns.iter().map(|c| c.name.clone()).collect(),
        t.rows.clone(),
    ))
}

fn row_scope<'a>(alias: &str, cols: &[String], row: &[EngineValue], parent: Option<&'a Scope<'a>>) -> Scope<'a> {
    let mut vars = HashMap::new();
    for (c, v) in cols.iter().zip(row.iter()) {
        vars.insert(format!("{}.{}", alias.to_ascii_uppercase(), c.to_ascii_uppercase()), v.clone());
        vars.insert(c.to_ascii_uppercase(), v.clone());
    }
    Scope { vars, parent }
}

fn run_select_correlated(plan: &SelectPlan, engine: &DemoEngine, outer: Option<&Scope>) -> Vec<EngineValue> {
    let Some((table, alias)) = &plan.from else {
        return Vec::new();
    };
    let Some((cols, rows)) = load_table_rows(engine, table) else {
        return Vec::new();
    };
    let alias = alias.clone().unwrap_or_else(|| table.clone());
    let mut out = Vec::new();
    for row in &rows {
        let scope = row_scope(&alias, &cols, row, outer);
        let ok = plan
            .where_expr
            .as_ref()
            .map(|e| truthy(&eval(e, &scope, engine)))
            .unwrap_or(true);
        if ok {
            out.push(EngineValue::Int(1));
        }
    }
    out
}

fn exec_select(plan: &SelectPlan, engine: &DemoEngine) -> EngineRows {
    let Some((table, alias)) = &plan.from else {
        // no FROM: evaluate items against an empty scope, single row.
        let scope = Scope { vars: HashMap::new(), parent: None };
        let mut columns = Vec::new();
        let mut values = Vec::new();
        for item in &plan.items {
            if let SelectItem::Expr(e, alias) = item {
                let v = eval(e, &scope, engine);
                columns.push(EngineColumn {
                    name: alias.clone().unwrap_or_else(|| "column".to_string()),
                    engine_type: value_engine_type(&v),
                    length: None,
                    precision: None,
                    scale: None,
                    nullable: true,
                });
                values.push(v);
            }
        }
        return EngineRows { columns, rows: vec![values] };
    };

    let Some((cols, rows)) = load_table_rows(engine, table) else {
        return EngineRows::default();
    };
    let table_alias = alias.clone().unwrap_or_else(|| table.clone());

    let mut filtered: Vec<&Vec<EngineValue>> = Vec::new();
    for row in &rows {
        let scope = row_scope(&table_alias, &cols, row, None);
        let ok = plan
            .where_expr
            .as_ref()
            .map(|e| truthy(&eval(e, &scope, engine)))
            .unwrap_or(true);
        if ok {
            filtered.push(row);
        }
    }

    if let Some((order_col, asc)) = &plan.order_by {
        if let Some(idx) = cols.iter().position(|c| c.eq_ignore_ascii_case(order_col)) {
            filtered.sort_by(|a, b| {
                let ord = compare_ord(&a[idx], &b[idx]);
                if *asc {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }
    }

    if let Some(n) = plan.limit {
        filtered.truncate(n);
    }

    let tables = engine.tables.read().unwrap();
    let t = tables.get(&table.to_ascii_uppercase());

    let mut out_columns = Vec::new();
    let mut out_rows = Vec::new();

    let wants_star = matches!(plan.items.first(), Some(SelectItem::Star)) && plan.items.len() == 1;
    let wants_count = matches!(plan.items.first(), Some(SelectItem::CountStar)) && plan.items.len() == 1;

    if wants_star {
        if let Some(t) = t {
            for (i, c) in t.columns.iter().enumerate() {
                out_columns.push(EngineColumn {
                    name: c.name.clone(),
                    engine_type: t.engine_type_for(i),
                    length: None,
                    precision: None,
                    scale: None,
                    nullable: true,
                });
            }
        }
        for row in filtered {
            out_rows.push(row.clone());
        }
    } else if wants_count {
        out_columns.push(EngineColumn {
            name: "count".to_string(),
            engine_type: "int64".to_string(),
            length: None,
            precision: None,
            scale: None,
            nullable: false,
        });
        out_rows.push(vec![EngineValue::Int(filtered.len() as i64)]);
    } else {
        for item in &plan.items {
            if let SelectItem::Expr(e, alias) = item {
                let name = alias.clone().unwrap_or_else(|| match e {
                    Expr::Column(c) => c.clone(),
                    _ => "column".to_string(),
                });
                out_columns.push(EngineColumn {
                    name,
                    engine_type: "utf8".to_string(),
                    length: None,
                    precision: None,
                    scale: None,
                    nullable: true,
                });
            }
        }
        for row in filtered {
            let scope = row_scope(&table_alias, &cols, row, None);
            let mut out_row = Vec::new();
            for item in &plan.items {
                if let SelectItem::Expr(e, _) = item {
                    out_row.push(eval(e, &scope, engine));
                }
            }
            out_rows.push(out_row);
        }
    }

    EngineRows { columns: out_columns, rows: out_rows }
}

fn compare_ord(a: &EngineValue, b: &EngineValue) -> std::cmp::Ordering {
    match (a, b) {
        (EngineValue::Int(x), EngineValue::Int(y)) => x.cmp(y),
        (EngineValue::Float(x), EngineValue::Float(y)) => x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal),
        (EngineValue::Text(x), EngineValue::Text(y)) => x.cmp(y),
        _ => std::cmp::Ordering::Equal,
    }
}

fn value_engine_type(v: &EngineValue) -> String {
    match v {
        EngineValue::Int(_) => "int64".to_string(),
        EngineValue::Float(_) => "float64".to_string(),
        EngineValue::Bool(_) => "bool".to_string(),
        EngineValue::Text(_) => "utf8".to_string(),
        EngineValue::Bytes(_) => "binary".to_string(),
        EngineValue::Null => "utf8".to_string(),
    }
}

// ---------------------------------------------------------------------
// Mutating statements
// ---------------------------------------------------------------------

fn exec_create_table(engine: &DemoEngine, toks: &[Tok]) -> EngineResult<u64> {
    // CREATE TABLE name ( col type, ... )
    let mut i = 2; // skip CREATE TABLE
    let Some(Tok::Ident(name)) = toks.get(i) else {
        return Err(SqlExecError("malformed CREATE TABLE".to_string()));
    };
    i += 1;
    if toks.get(i) != Some(&Tok::Punct('(')) {
        return Err(SqlExecError("expected ( in CREATE TABLE".to_string()));
    }
    let mut depth = 1;
    let start = i + 1;
    let mut j = start;
    while j < toks.len() && depth > 0 {
        match toks[j] {
            Tok::Punct('(') => depth += 1,
            Tok::Punct(')') => depth -= 1,
            _ => {}
        }
        j += 1;
    }
    let body = &toks[start..j - 1];
    let mut columns = Vec::new();
    for def in split_top(body) {
        if let Some(Tok::Ident(col_name)) = def.first() {
            let decl_type = def
                .get(1)
                .map(|t| match t {
                    Tok::Ident(s) => s.clone(),
                    _ => "TEXT".to_string(),
                })
                .unwrap_or_else(|| "TEXT".to_string());
            columns.push(ColumnDef { name: col_name.clone(), decl_type });
        }
    }
    engine
        .tables
        .write()
        .unwrap()
        .insert(name.to_ascii_uppercase(), Table { columns, rows: Vec::new() });
    Ok(0)
}

fn exec_drop_table(engine: &DemoEngine, toks: &[Tok]) -> EngineResult<u64> {
    let name = toks
        .iter()
        .rev()
        .find_map(|t| match t {
            Tok::Ident(s) => Some(s.clone()),
            _ => None,
        })
        .ok_or_else(|| SqlExecError("malformed DROP TABLE".to_string()))?;
    engine.tables.write().unwrap().remove(&name.to_ascii_uppercase());
    Ok(0)
}

fn parse_paren_ident_list(toks: &[Tok]) -> (Vec<String>, usize) {
    if toks.first() != Some(&Tok::Punct('(')) {
        return (Vec::new(), 0);
    }
    let mut depth = 1;
    let mut j = 1;
    while j < toks.len() && depth > 0 {
        match toks[j] {
            Tok::Punct('(') => depth += 1,
            Tok::Punct(')') => depth -= 1,
            _ => {}
        }
        j += 1;
    }
    let names = split_top(&toks[1..j - 1])
        .into_iter()
        .filter_map(|t| match t.first() {
            Some(Tok::Ident(s)) => Some(s.clone()),
            _ => None,
        })
        .collect();
    (names, j)
}

fn exec_insert(engine: &DemoEngine, toks: &[Tok]) -> EngineResult<u64> {
    // INSERT INTO name [(cols)] VALUES (...), (...)  |  INSERT INTO name [(cols)] SELECT ...
    let mut i = 2; // skip INSERT INTO
    let Some(Tok::Ident(table_name)) = toks.get(i) else {
        return Err(SqlExecError("malformed INSERT".to_string()));
    };
    i += 1;
    let (explicit_cols, consumed) = parse_paren_ident_list(&toks[i..]);
    i += consumed;

    if matches!(toks.get(i), Some(t) if kw(t, "VALUES")) {
        i += 1;
        let mut inserted = 0u64;
        while i < toks.len() && toks[i] == Tok::Punct('(') {
            let mut depth = 1;
            let start = i + 1;
            let mut j = start;
            while j < toks.len() && depth > 0 {
                match toks[j] {
                    Tok::Punct('(') => depth += 1,
                    Tok::Punct(')') => depth -= 1,
                    _ => {}
                }
                j += 1;
            }
            let values: Vec<EngineValue> = split_top(&toks[start..j - 1])
                .into_iter()
                .map(|v| eval(&parse_expr(&v), &Scope { vars: HashMap::new(), parent: None }, engine))
                .collect();
            inserted += insert_row(engine, table_name, &explicit_cols, values)?;
            i = j;
            if toks.get(i) == Some(&Tok::Punct(',')) {
                i += 1;
            }
        }
        return Ok(inserted);
    }

    if matches!(toks.get(i), Some(t) if kw(t, "SELECT")) {
        let plan = parse_select_tokens(&toks[i..]);
        let source_rows = run_insert_select(&plan, engine);
        let mut inserted = 0u64;
        for row in source_rows {
            inserted += insert_row(engine, table_name, &explicit_cols, row)?;
        }
        return Ok(inserted);
    }

    Err(SqlExecError("malformed INSERT".to_string()))
}

fn run_insert_select(plan: &SelectPlan, engine: &DemoEngine) -> Vec<Vec<EngineValue>> {
    let Some((table, alias)) = &plan.from else {
        return Vec::new();
    };
    let Some((cols, rows)) = load_table_rows(engine, table) else {
        return Vec::new();
    };
    let alias = alias.clone().unwrap_or_else(|| table.clone());
    let mut out = Vec::new();
    for row in &rows {
        let scope = row_scope(&alias, &cols, row, None);
        let ok = plan
            .where_expr
            .as_ref()
            .map(|e| truthy(&eval(e, &scope, engine)))
            .unwrap_or(true);
        if !ok {
            continue;
        }
        let mut out_row = Vec::new();
        for item in &plan.items {
            if let SelectItem::Expr(e, _) = item {
                out_row.push(eval(e, &scope, engine));
            }
        }
        out.push(out_row);
    }
    out
}

fn insert_row(
    engine: &DemoEngine,
    table_name: &str,
    explicit_cols: &[String],
    values: Vec<EngineValue>,
) -> EngineResult<u64> {
    let mut tables = engine.tables.write().unwrap();
    let table = tables
        .get_mut(&table_name.to_ascii_uppercase())
        .ok_or_else(|| SqlExecError(format!("table {table_name} does not exist")))?;

    let mut row = vec![EngineValue::Null; table.columns.len()];
    if explicit_cols.is_empty() {
        for (i, v) in values.into_iter().enumerate() {
            if i < row.len() {
                row[i] = v;
            }
        }
    } else {
        for (col, v) in explicit_cols.iter().zip(values.into_iter()) {
            if let Some(idx) = table.columns.iter().position(|c| c.name.eq_ignore_ascii_case(col)) {
                row[idx] = v;
            }
        }
    }
    table.rows.push(row);
    Ok(1)
}

fn exec_update(engine: &DemoEngine, toks: &[Tok]) -> EngineResult<u64> {
    // UPDATE target SET col=expr, ... [FROM source [alias]] WHERE cond
    let Some(Tok::Ident(target)) = toks.get(1) else {
        return Err(SqlExecError("malformed UPDATE".to_string()));
    };
    let set_idx = find_kw(toks, "SET").ok_or_else(|| SqlExecError("UPDATE missing SET".to_string()))?;
    let from_idx = find_kw(toks, "FROM");
    let where_idx = find_kw(toks, "WHERE").ok_or_else(|| SqlExecError("UPDATE missing WHERE".to_string()))?;

    let set_end = from_idx.unwrap_or(where_idx);
    let assignments: Vec<(String, Expr)> = split_top(&toks[set_idx + 1..set_end])
        .into_iter()
        .filter_map(|chunk| {
            if let Some(Tok::Ident(col)) = chunk.first() {
                let rhs = parse_expr(&chunk[2..]);
                Some((col.clone(), rhs))
            } else {
                None
            }
        })
        .collect();

    let (source_table, source_alias) = if let Some(f) = from_idx {
        let name = match toks.get(f + 1) {
            Some(Tok::Ident(n)) => n.clone(),
            _ => return Err(SqlExecError("malformed FROM in UPDATE".to_string())),
        };
        let alias = match toks.get(f + 2) {
            Some(Tok::Ident(a)) if f + 2 < where_idx => Some(a.clone()),
            _ => None,
        };
        (Some(name), alias)
    } else {
        (None, None)
    };

    let where_expr = parse_expr(&toks[where_idx + 1..]);

    let source_data = source_table.as_ref().and_then(|t| load_table_rows(engine, t));
    let source_alias = source_alias.unwrap_or_else(|| source_table.clone().unwrap_or_default());

    let mut tables = engine.tables.write().unwrap();
    let target_cols: Vec<String> = tables
        .get(&target.to_ascii_uppercase())
        .map(|t| t.columns.iter().map(|c| c.name.clone()).collect())
        .ok_or_else(|| SqlExecError(format!("table {target} does not exist")))?;

    let mut updated = 0u64;
    let row_count = tables.get(&target.to_ascii_uppercase()).unwrap().rows.len();
    for row_idx in 0..row_count {
        let target_row = tables.get(&target.to_ascii_uppercase()).unwrap().rows[row_idx].clone();
        let matched_source_row = if let Some((src_cols, src_rows)) = &source_data {
            src_rows.iter().find(|src_row| {
                let target_scope = row_scope(target, &target_cols, &target_row, None);
                let scope = row_scope(&source_alias, src_cols, src_row, Some(&target_scope));
                truthy(&eval(&where_expr, &scope, engine))
            })
        } else {
            let scope = row_scope(target, &target_cols, &target_row, None);
            if truthy(&eval(&where_expr, &scope, engine)) {
                Some(&target_row)
            } else {
                None
            }
        };

        if let Some(src_row) = matched_source_row {
            let src_cols = source_data.as_ref().map(|(c, _)| c.clone()).unwrap_or_default();
            let target_scope = row_scope(target, &target_cols, &target_row, None);
            let eval_scope = row_scope(&source_alias, &src_cols, src_row, Some(&target_scope));
            let mut new_row = target_row.clone();
            for (col, expr) in &assignments {
                if let Some(idx) = target_cols.iter().position(|c| c.eq_ignore_ascii_case(col)) {
                    new_row[idx] = eval(expr, &eval_scope, engine);
                }
            }
            tables.get_mut(&target.to_ascii_uppercase()).unwrap().rows[row_idx] = new_row;
            updated += 1;
        }
    }
    Ok(updated)
}

fn exec_delete(engine: &DemoEngine, toks: &[Tok]) -> EngineResult<u64> {
    // DELETE FROM target [USING source [alias]] WHERE cond
    let Some(Tok::Ident(target)) = toks.get(2) else {
        return Err(SqlExecError("malformed DELETE".to_string()));
    };
    let using_idx = find_kw(toks, "USING");
    let where_idx = find_kw(toks, "WHERE").ok_or_else(|| SqlExecError("DELETE missing WHERE".to_string()))?;

    let (source_table, source_alias) = if let Some(u) = using_idx {
        let name = match toks.get(u + 1) {
            Some(Tok::Ident(n)) => n.clone(),
            _ => return Err(SqlExecError("malformed USING in DELETE".to_string())),
        };
        let alias = match toks.get(u + 2) {
            Some(Tok::Ident(a)) if u + 2 < where_idx => Some(a.clone()),
            _ => None,
        };
        (Some(name), alias)
    } else {
        (None, None)
    };
    let source_alias = source_alias.unwrap_or_else(|| source_table.clone().unwrap_or_default());
    let where_expr = parse_expr(&toks[where_idx + 1..]);
    let source_data = source_table.as_ref().and_then(|t| load_table_rows(engine, t));

    let mut tables = engine.tables.write().unwrap();
    let target_cols: Vec<String> = tables
        .get(&target.to_ascii_uppercase())
        .map(|t| t.columns.iter().map(|c| c.name.clone()).collect())
        .ok_or_else(|| SqlExecError(format!("table {target} does not exist")))?;

    let t = tables.get_mut(&target.to_ascii_uppercase()).unwrap();
    let original_len = t.rows.len();
    let mut keep = Vec::with_capacity(original_len);
    for row in t.rows.drain(..) {
        let matched = if let Some((src_cols, src_rows)) = &source_data {
            src_rows.iter().any(|src_row| {
                let target_scope = row_scope(target, &target_cols, &row, None);
                let scope = row_scope(&source_alias, src_cols, src_row, Some(&target_scope));
                truthy(&eval(&where_expr, &scope, engine))
            })
        } else {
            let scope = row_scope(target, &target_cols, &row, None);
            truthy(&eval(&where_expr, &scope, engine))
        };
        if matched {
            continue;
        }
        keep.push(row);
    }
    let deleted = (original_len - keep.len()) as u64;
    t.rows = keep;
    Ok(deleted)
}

// ---------------------------------------------------------------------
// SqlEngine impl
// ---------------------------------------------------------------------

impl SqlEngine for DemoEngine {
    fn exec(&self, sql: &str) -> EngineResult<u64> {
        let trimmed = sql.trim().trim_end_matches(';');
        let toks = tokenize(trimmed);
        let Some(first) = toks.first() else {
            return Ok(0);
        };

        if kw(first, "CREATE") {
            return exec_create_table(self, &toks);
        }
        if kw(first, "DROP") {
            return exec_drop_table(self, &toks);
        }
        if kw(first, "INSERT") {
            return exec_insert(self, &toks);
        }
        if kw(first, "UPDATE") {
            return exec_update(self, &toks);
        }
        if kw(first, "DELETE") {
            return exec_delete(self, &toks);
        }
        if kw(first, "MERGE") {
            return Err(SqlExecError("native MERGE not supported".to_string()));
        }
        if kw(first, "BEGIN") || kw(first, "COMMIT") || kw(first, "ROLLBACK") || kw(first, "START") {
            return Ok(0);
        }
        Err(SqlExecError(format!("unsupported statement: {trimmed}")))
    }

    fn query(&self, sql: &str) -> EngineResult<EngineRows> {
        let trimmed = sql.trim().trim_end_matches(';');
        let toks = tokenize(trimmed);
        if !matches!(toks.first(), Some(t) if kw(t, "SELECT")) {
            return Err(SqlExecError(format!("unsupported query: {trimmed}")));
        }
        let plan = parse_select_tokens(&toks);
        Ok(exec_select(&plan, self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_insert_select_round_trip() {
        let engine = DemoEngine::new();
        engine.exec("CREATE TABLE t (id INTEGER, name VARCHAR)").unwrap();
        engine.exec("INSERT INTO t VALUES (1, 'Alice')").unwrap();
        engine.exec("INSERT INTO t VALUES (2, 'Bob')").unwrap();
        let rows = engine.query("SELECT * FROM t ORDER BY id").unwrap();
        assert_eq!(rows.rows.len(), 2);
        assert_eq!(rows.rows[0][1], EngineValue::Text("Alice".to_string()));
    }

    #[test]
    fn count_star() {
        let engine = DemoEngine::new();
        engine.exec("CREATE TABLE t (id INTEGER)").unwrap();
        engine.exec("INSERT INTO t VALUES (1)").unwrap();
        engine.exec("INSERT INTO t VALUES (2)").unwrap();
        let rows = engine.query("SELECT COUNT(*) FROM t").unwrap();
        assert_eq!(rows.rows[0][0], EngineValue::Int(2));
    }

    #[test]
    fn literal_select_with_no_from() {
        let engine = DemoEngine::new();
        let rows = engine.query("SELECT 1 AS n").unwrap();
        assert_eq!(rows.columns[0].name, "n");
        assert_eq!(rows.rows[0][0], EngineValue::Int(1));
    }

    #[test]
    fn native_merge_is_rejected_to_force_decomposition() {
        let engine = DemoEngine::new();
        assert!(engine.exec("MERGE INTO t USING s ON t.id=s.id").is_err());
    }

    #[test]
    fn update_from_join_applies_matching_rows() {
        let engine = DemoEngine::new();
        engine.exec("CREATE TABLE t (id INTEGER, v VARCHAR)").unwrap();
        engine.exec("CREATE TABLE s (id INTEGER, v VARCHAR)").unwrap();
        engine.exec("INSERT INTO t VALUES (1, 'old')").unwrap();
        engine.exec("INSERT INTO s VALUES (1, 'new')").unwrap();
        let n = engine
            .exec("UPDATE t SET v=s.v FROM s s WHERE t.id=s.id")
            .unwrap();
        assert_eq!(n, 1);
        let rows = engine.query("SELECT v FROM t").unwrap();
        assert_eq!(rows.rows[0][0], EngineValue::Text("new".to_string()));
    }

    #[test]
    fn insert_select_not_exists_skips_matching_rows() {
        let engine = DemoEngine::new();
        engine.exec("CREATE TABLE t (id INTEGER, v VARCHAR)").unwrap();
        engine.exec("CREATE TABLE s (id INTEGER, v VARCHAR)").unwrap();
        engine.exec("INSERT INTO t VALUES (1, 'old')").unwrap();
        engine.exec("INSERT INTO s VALUES (1, 'new')").unwrap();
        engine.exec("INSERT INTO s VALUES (2, 'ins')").unwrap();
        let n = engine
            .exec(
                "INSERT INTO t (id, v) SELECT s.id, s.v FROM s s WHERE NOT EXISTS (SELECT 1 FROM t t WHERE t.id=s.id)",
            )
            .unwrap();
        assert_eq!(n, 1);
        let rows = engine.query("SELECT COUNT(*) FROM t").unwrap();
        assert_eq!(rows.rows[0][0], EngineValue::Int(2));
    }
}
