// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in translators, grouped by the collaborator layer they understand.
//!
//! Which groups are registered is decided by [`Capabilities`], so a
//! deployment without a graph engine never carries graph translators.

mod application;
mod auth;
mod graph;
mod http;
mod persistence;
mod upstream;
mod validation;

use crate::failure::Failure;
use crate::translator::Translator;
use faultline_taxonomy::{DEBUG_DETAIL_PREFIX, ErrorCode, ErrorRecord, GENERIC_INTERNAL_MESSAGE};
use serde::{Deserialize, Serialize};

/// Detail key holding the raw failure text.
pub const DEBUG_FAILURE: &str = "debug_failure";
/// Detail key holding the failure shape name.
pub const DEBUG_FAILURE_SHAPE: &str = "debug_failure_shape";

/// Translator groups a deployment enables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// Schema validation failures.
    pub validation: bool,
    /// Relational persistence failures.
    pub persistence: bool,
    /// Graph resolver failures.
    pub graph: bool,
    /// Token authentication and access control.
    pub auth: bool,
    /// Framework-generated HTTP failures.
    pub http: bool,
    /// Downstream service failures.
    pub upstream: bool,
    /// Records raised directly by business logic.
    pub application: bool,
}

impl Capabilities {
    /// Every group enabled.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            validation: true,
            persistence: true,
            graph: true,
            auth: true,
            http: true,
            upstream: true,
            application: true,
        }
    }

    /// Every group disabled.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            validation: false,
            persistence: false,
            graph: false,
            auth: false,
            http: false,
            upstream: false,
            application: false,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

/// Built-in translators for the enabled groups, in registration order.
pub fn translators(caps: &Capabilities) -> Vec<Translator> {
    let groups: [(bool, fn() -> Vec<Translator>); 7] = [
        (caps.application, application::translators),
        (caps.validation, validation::translators),
        (caps.persistence, persistence::translators),
        (caps.graph, graph::translators),
        (caps.auth, auth::translators),
        (caps.http, http::translators),
        (caps.upstream, upstream::translators),
    ];
    groups
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .flat_map(|(_, build)| build())
        .collect()
}

/// The record every unclaimed or unreadable failure becomes.
///
/// The raw text survives only under debug-prefixed detail keys.
pub fn internal_record(failure: &Failure) -> ErrorRecord {
    ErrorRecord::new(ErrorCode::Internal, GENERIC_INTERNAL_MESSAGE)
        .with_retryable(false)
        .with_detail(DEBUG_FAILURE, failure.to_string())
        .with_detail(DEBUG_FAILURE_SHAPE, failure.shape())
}

/// Debug-only detail key for `name`.
pub(crate) fn debug_key(name: &str) -> String {
    format!("{DEBUG_DETAIL_PREFIX}{name}")
}
