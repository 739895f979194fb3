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

//! A stage is an opaque directory of files keyed by `(schema_id, stage_name,
//! file_name)`, the source of COPY data. Object storage itself is an
//! external collaborator; this module only declares the interface the COPY
//! processor needs plus an in-memory stand-in for tests and the demo binary.

use crate::catalog::SchemaId;
use crate::error::{FloeError, Result};

pub trait Stage: Send + Sync {
    /// List file names in a stage, optionally filtered by a glob-like
    /// pattern (`*` matches any run of characters).
    fn list_files(
        &self,
        schema_id: SchemaId,
        stage_name: &str,
        pattern: Option<&str>,
    ) -> Result<Vec<String>>;

    /// Read a staged file's full contents.
    fn read_file(&self, schema_id: SchemaId, stage_name: &str, file_name: &str) -> Result<Vec<u8>>;

    /// Delete a staged file (used by `PURGE=TRUE`).
    fn delete_file(&self, schema_id: SchemaId, stage_name: &str, file_name: &str) -> Result<()>;
}

/// Match a simple `*`-glob pattern against a file name. `*` matches any run
/// of characters, including none; there is no other wildcard.
pub fn glob_match(pattern: &str, name: &str) -> bool {
    fn helper(p: &[u8], n: &[u8]) -> bool {
        match (p.first(), n.first()) {
            (None, None) => true,
            (Some(b'*'), _) => helper(&p[1..], n) || (!n.is_empty() && helper(p, &n[1..])),
            (Some(pc), Some(nc)) if pc == nc => helper(&p[1..], &n[1..]),
            _ => false,
        }
    }
    helper(pattern.as_bytes(), name.as_bytes())
}

#[derive(Debug, Default)]
struct StageFiles {
    files: std::collections::HashMap<String, Vec<u8>>,
}

/// An in-memory stage: files are registered directly by test/demo code
/// rather than uploaded through any transport.
#[derive(Debug, Default)]
pub struct DemoStage {
    stages: std::sync::RwLock<std::collections::HashMap<(SchemaId, String), StageFiles>>,
}

impl DemoStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_file(&self, schema_id: SchemaId, stage_name: &str, file_name: &str, contents: &[u8]) {
        let mut stages = self.stages.write().unwrap();
        let entry = stages
            .entry((schema_id, stage_name.to_string()))
            .or_default();
        entry.files.insert(file_name.to_string(), contents.to_vec());
    }
}

impl Stage for DemoStage {
    fn list_files(
        &self,
        schema_id: SchemaId,
        stage_name: &str,
        pattern: Option<&str>,
    ) -> Result<Vec<String>> {
        let stages = self.stages.read().unwrap();
        let Some(entry) = stages.get(&(schema_id, stage_name.to_string())) else {
            return Ok(Vec::new());
        };
        let mut names: Vec<String> = entry
            .files
            .keys()
            .filter(|name| pattern.map(|p| glob_match(p, name)).unwrap_or(true))
            .cloned()
            .collect();
        names.sort();
        Ok(names)
    }

    fn read_file(&self, schema_id: SchemaId, stage_name: &str, file_name: &str) -> Result<Vec<u8>> {
        let stages = self.stages.read().unwrap();
        stages
            .get(&(schema_id, stage_name.to_string()))
            .and_then(|entry| entry.files.get(file_name))
            .cloned()
            .ok_or_else(|| FloeError::ObjectNotFound(format!("stage file {file_name} not found")))
    }

    fn delete_file(&self, schema_id: SchemaId, stage_name: &str, file_name: &str) -> Result<()> {
        let mut stages = self.stages.write().unwrap();
        if let Some(entry) = stages.get_mut(&(schema_id, stage_name.to_string())) {
            entry.files.remove(file_name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_star_matches_any_run() {
        assert!(glob_match("*.csv", "data.csv"));
        assert!(!glob_match("*.csv", "data.json"));
        assert!(glob_match("dir/*", "dir/a.csv"));
    }

    #[test]
    fn list_filters_by_pattern() {
        let stage = DemoStage::new();
        stage.put_file(1, "s", "a.csv", b"x");
        stage.put_file(1, "s", "b.json", b"y");
        let files = stage.list_files(1, "s", Some("*.csv")).unwrap();
        assert_eq!(files, vec!["a.csv".to_string()]);
    }

    #[test]
    fn purge_removes_file() {
        let stage = DemoStage::new();
        stage.put_file(1, "s", "a.csv", b"x");
        stage.delete_file(1, "s", "a.csv").unwrap();
        assert!(stage.read_file(1, "s", "a.csv").is_err());
    }
}
