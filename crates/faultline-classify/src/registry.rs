// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ordered translator registry with a build phase and a frozen serving phase.
//!
//! [`RegistryBuilder`] is the only mutable form. [`RegistryBuilder::freeze`]
//! consumes it and yields a [`TranslatorRegistry`], which has no mutating
//! methods and is cheap to clone across request handlers. A process-wide
//! registry can be installed exactly once with [`install_global`].

use crate::builtin::{self, Capabilities};
use crate::failure::Failure;
use crate::pattern::FailurePattern;
use crate::translator::{Compiled, Translator};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Fatal registration problems.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Two translators declared structurally identical patterns.
    #[error("translator {name:?} claims the same predicate as {existing:?}")]
    DuplicatePredicate {
        /// Translator being registered.
        name: String,
        /// Translator that already owns the predicate.
        existing: String,
    },
    /// Two translators share a name.
    #[error("translator name {0:?} is already registered")]
    DuplicateName(String),
    /// A glob in the pattern failed to compile.
    #[error("translator {name:?} has an invalid pattern: {source}")]
    InvalidPattern {
        /// Translator being registered.
        name: String,
        /// Glob compilation error.
        #[source]
        source: globset::Error,
    },
    /// [`install_global`] was called twice.
    #[error("the global translator registry is already installed")]
    AlreadyInstalled,
}

// ---------------------------------------------------------------------------
// RegistryBuilder
// ---------------------------------------------------------------------------

/// Startup-phase registry. Registration order is the match order.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: Vec<Compiled>,
    owners: HashMap<FailurePattern, String>,
    names: HashSet<String>,
}

impl RegistryBuilder {
    /// Empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pre-loaded with the built-in translators `caps` enables.
    pub fn with_builtins(caps: &Capabilities) -> Result<Self, RegistryError> {
        let mut builder = Self::new();
        builder.register_all(builtin::translators(caps))?;
        Ok(builder)
    }

    /// Append a translator.
    ///
    /// Fails if its name or its pattern (up to [`FailurePattern::normalized`])
    /// is already registered.
    pub fn register(&mut self, translator: Translator) -> Result<&mut Self, RegistryError> {
        if self.names.contains(translator.name()) {
            return Err(RegistryError::DuplicateName(translator.name().to_string()));
        }
        let key = translator.pattern().normalized();
        if let Some(existing) = self.owners.get(&key) {
            return Err(RegistryError::DuplicatePredicate {
                name: translator.name().to_string(),
                existing: existing.clone(),
            });
        }
        let matcher =
            translator
                .pattern()
                .compile()
                .map_err(|source| RegistryError::InvalidPattern {
                    name: translator.name().to_string(),
                    source,
                })?;
        debug!(
            target: "faultline.registry",
            translator = translator.name(),
            position = self.entries.len(),
            "registered translator"
        );
        self.owners.insert(key, translator.name().to_string());
        self.names.insert(translator.name().to_string());
        self.entries.push(Compiled {
            translator,
            matcher,
        });
        Ok(self)
    }

    /// Append several translators in order, stopping at the first error.
    pub fn register_all(
        &mut self,
        translators: impl IntoIterator<Item = Translator>,
    ) -> Result<&mut Self, RegistryError> {
        for t in translators {
            self.register(t)?;
        }
        Ok(self)
    }

    /// Append the built-in translators `caps` enables.
    pub fn register_builtins(&mut self, caps: &Capabilities) -> Result<&mut Self, RegistryError> {
        self.register_all(builtin::translators(caps))
    }

    /// Number of registered translators.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// End the registration phase.
    #[must_use]
    pub fn freeze(self) -> TranslatorRegistry {
        TranslatorRegistry {
            entries: self.entries.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// TranslatorRegistry
// ---------------------------------------------------------------------------

/// Frozen, read-only registry.
#[derive(Debug, Clone)]
pub struct TranslatorRegistry {
    entries: Arc<[Compiled]>,
}

impl TranslatorRegistry {
    /// First translator, in registration order, whose pattern matches.
    #[must_use]
    pub fn find(&self, failure: &Failure) -> Option<&Translator> {
        self.entries
            .iter()
            .find(|e| e.matches(failure))
            .map(|e| &e.translator)
    }

    /// Translator names in match order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.translator.name())
    }

    /// Number of translators.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Process-wide registry
// ---------------------------------------------------------------------------

static GLOBAL: OnceLock<TranslatorRegistry> = OnceLock::new();

/// Install the process-wide registry. Succeeds once; later calls fail with
/// [`RegistryError::AlreadyInstalled`].
pub fn install_global(
    registry: TranslatorRegistry,
) -> Result<&'static TranslatorRegistry, RegistryError> {
    GLOBAL
        .set(registry)
        .map_err(|_| RegistryError::AlreadyInstalled)?;
    GLOBAL.get().ok_or(RegistryError::AlreadyInstalled)
}

/// The process-wide registry, once installed.
pub fn global() -> Option<&'static TranslatorRegistry> {
    GLOBAL.get()
}
