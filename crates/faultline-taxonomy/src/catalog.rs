// SPDX-License-Identifier: MIT OR Apache-2.0
//! Browsable catalog of every published error code.

use crate::{ErrorCode, ErrorKind};
use serde::Serialize;

/// Documentation entry for one code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    /// Dotted code string.
    pub code: ErrorCode,
    /// Kind the code belongs to.
    pub kind: ErrorKind,
    /// HTTP status rendered for the code.
    pub status: u16,
    /// Short human title.
    pub title: &'static str,
    /// What the caller can do about it.
    pub fixit: &'static str,
    /// Whether the failure is retryable by default.
    pub retryable: bool,
}

impl From<ErrorCode> for CatalogEntry {
    fn from(code: ErrorCode) -> Self {
        Self {
            code,
            kind: code.kind(),
            status: code.status(),
            title: code.title(),
            fixit: code.fixit(),
            retryable: code.kind().retryable_by_default(),
        }
    }
}

/// Static lookup over [`ErrorCode::ALL`].
pub struct ErrorCatalog;

impl ErrorCatalog {
    /// Look up a code by its dotted string (e.g. `"auth.token_expired"`).
    #[must_use]
    pub fn lookup(code: &str) -> Option<CatalogEntry> {
        code.parse::<ErrorCode>().ok().map(CatalogEntry::from)
    }

    /// Every published code.
    #[must_use]
    pub fn all() -> Vec<CatalogEntry> {
        ErrorCode::ALL.iter().copied().map(CatalogEntry::from).collect()
    }

    /// Every code of one kind.
    #[must_use]
    pub fn by_kind(kind: ErrorKind) -> Vec<CatalogEntry> {
        ErrorCode::ALL
            .iter()
            .filter(|c| c.kind() == kind)
            .copied()
            .map(CatalogEntry::from)
            .collect()
    }
}
