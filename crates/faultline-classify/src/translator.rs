// SPDX-License-Identifier: MIT OR Apache-2.0
//! Named predicate + mapper pairs.

use crate::failure::Failure;
use crate::pattern::{CompiledPattern, FailurePattern};
use faultline_taxonomy::ErrorRecord;
use std::fmt;
use std::sync::Arc;

/// Pure function from a failure to a canonical record.
///
/// Implemented for every `Fn(&Failure) -> ErrorRecord + Send + Sync`.
pub trait FailureMapper: Send + Sync {
    /// Produce the record. Called only for failures the translator's
    /// pattern matched.
    fn map(&self, failure: &Failure) -> ErrorRecord;
}

impl<F> FailureMapper for F
where
    F: Fn(&Failure) -> ErrorRecord + Send + Sync,
{
    fn map(&self, failure: &Failure) -> ErrorRecord {
        self(failure)
    }
}

/// A named rule that claims failures matching its pattern.
#[derive(Clone)]
pub struct Translator {
    name: String,
    pattern: FailurePattern,
    mapper: Arc<dyn FailureMapper>,
}

impl Translator {
    /// New translator. The pattern is compiled at registration.
    pub fn new(
        name: impl Into<String>,
        pattern: FailurePattern,
        mapper: impl FailureMapper + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            pattern,
            mapper: Arc::new(mapper),
        }
    }

    /// Name used in observability events.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared predicate.
    pub fn pattern(&self) -> &FailurePattern {
        &self.pattern
    }

    /// Run the mapper.
    pub fn translate(&self, failure: &Failure) -> ErrorRecord {
        self.mapper.map(failure)
    }
}

impl fmt::Debug for Translator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Translator")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// A translator together with its compiled pattern.
#[derive(Debug, Clone)]
pub(crate) struct Compiled {
    pub(crate) translator: Translator,
    pub(crate) matcher: CompiledPattern,
}

impl Compiled {
    pub(crate) fn matches(&self, failure: &Failure) -> bool {
        self.matcher.matches(failure)
    }
}
