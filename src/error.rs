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

//! Error kinds shared across the crate.
//!
//! Every failure that can reach a client materializes as a `FloeError`, which
//! carries a fixed six-digit code and a fixed SQL-state string alongside a
//! human-readable message, per the wire protocol's `{success, code, sqlState,
//! message}` envelope.

use std::fmt;

/// A failure surfaced to a client, or propagated internally before being
/// wrapped into the wire envelope.
#[derive(Debug, Clone)]
pub enum FloeError {
    AuthenticationFailed(String),
    SessionNotFound(String),
    SessionExpired(String),
    InvalidParameter(String),
    SqlCompilation(String),
    SqlExecution(String),
    ObjectNotFound(String),
    ObjectAlreadyExists(String),
    PermissionDenied(String),
    Internal(String),
}

impl FloeError {
    /// Fixed six-digit error code for this kind.
    pub fn code(&self) -> &'static str {
        match self {
            FloeError::AuthenticationFailed(_) => "390100",
            FloeError::SessionNotFound(_) => "390200",
            FloeError::SessionExpired(_) => "390201",
            FloeError::InvalidParameter(_) => "390400",
            FloeError::SqlCompilation(_) => "390500",
            FloeError::SqlExecution(_) => "390600",
            FloeError::ObjectNotFound(_) => "390700",
            FloeError::ObjectAlreadyExists(_) => "390701",
            FloeError::PermissionDenied(_) => "390800",
            FloeError::Internal(_) => "390900",
        }
    }

    /// Fixed 5-character SQL-state code for this kind.
    pub fn sql_state(&self) -> &'static str {
        match self {
            FloeError::SessionNotFound(_) | FloeError::SessionExpired(_) => "02000",
            FloeError::InvalidParameter(_) => "22000",
            FloeError::ObjectNotFound(_) => "02000",
            _ => "42000",
        }
    }

    /// The message text, stripped of the variant wrapper.
    pub fn message(&self) -> &str {
        match self {
            FloeError::AuthenticationFailed(m)
            | FloeError::SessionNotFound(m)
            | FloeError::SessionExpired(m)
            | FloeError::InvalidParameter(m)
            | FloeError::SqlCompilation(m)
            | FloeError::SqlExecution(m)
            | FloeError::ObjectNotFound(m)
            | FloeError::ObjectAlreadyExists(m)
            | FloeError::PermissionDenied(m)
            | FloeError::Internal(m) => m,
        }
    }
}

impl fmt::Display for FloeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message())
    }
}

impl std::error::Error for FloeError {}

pub type Result<T> = std::result::Result<T, FloeError>;
