// SPDX-License-Identifier: MIT OR Apache-2.0
//! Failure classification for the faultline API boundary.
//!
//! Collaborator layers raise [`Failure`] values. A [`TranslatorRegistry`],
//! built once at startup through a [`RegistryBuilder`] and then frozen, maps
//! each failure to a canonical [`faultline_taxonomy::ErrorRecord`]. The
//! [`Classifier`] applies the first matching translator in registration
//! order and falls back to a generic internal record when none matches.
//!
//! ```
//! use faultline_classify::{Capabilities, Classifier, PersistenceFailure, RegistryBuilder};
//! use faultline_taxonomy::ErrorCode;
//!
//! let registry = RegistryBuilder::with_builtins(&Capabilities::all())
//!     .unwrap()
//!     .freeze();
//! let classifier = Classifier::new(registry);
//! let failure = PersistenceFailure::database(Some("23505"), "duplicate key").into();
//! assert_eq!(classifier.classify(&failure).code(), ErrorCode::ConflictUniqueViolation);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod builtin;
mod classifier;
mod failure;
mod pattern;
mod registry;
mod translator;

pub use builtin::Capabilities;
pub use classifier::{Classification, Classifier};
pub use failure::{
    AuthFailure, Failure, FailureLayer, HttpFailure, PersistenceCondition, PersistenceFailure,
    ResolverFailure, ResolverFailureKind, SourceLocation, UnexpectedFailure, UpstreamCondition,
    UpstreamFailure, ValidationFailure, Violation, bearer_token, looks_like_jwt, sqlstate_shape,
};
pub use pattern::{CompiledPattern, FailurePattern};
pub use registry::{RegistryBuilder, RegistryError, TranslatorRegistry, global, install_global};
pub use translator::{FailureMapper, Translator};
