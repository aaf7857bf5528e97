// SPDX-License-Identifier: MIT OR Apache-2.0
//! Composable predicates over failure shapes.

use crate::failure::{Failure, FailureLayer};
use globset::{GlobBuilder, GlobMatcher};
use serde::{Deserialize, Serialize};

/// Declarative predicate a translator uses to claim failures.
///
/// Patterns compare structurally (`Eq`/`Hash`) after
/// [`FailurePattern::normalized`], which is how the registry detects two
/// translators claiming the identical predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePattern {
    /// Matches every failure.
    Any,
    /// Matches failures raised by one layer.
    Layer(FailureLayer),
    /// Glob over [`Failure::shape`] (e.g. `persistence.*_violation`).
    Shape(String),
    /// Glob over [`Failure::constraint`]; never matches a failure without one.
    Constraint(String),
    /// Case-insensitive glob over the failure's display text.
    Message(String),
    /// Every child must match.
    AllOf(Vec<FailurePattern>),
    /// At least one child must match.
    AnyOf(Vec<FailurePattern>),
    /// Negates the inner pattern.
    Not(Box<FailurePattern>),
}

impl FailurePattern {
    /// Shorthand for [`FailurePattern::Shape`].
    pub fn shape(glob: impl Into<String>) -> Self {
        Self::Shape(glob.into())
    }

    /// Canonical form for equality: `AllOf`/`AnyOf` children sorted and
    /// deduplicated, single-child groups unwrapped, double negation removed.
    #[must_use]
    pub fn normalized(&self) -> Self {
        match self {
            Self::AllOf(ps) => Self::group(ps, Self::AllOf),
            Self::AnyOf(ps) => Self::group(ps, Self::AnyOf),
            Self::Not(inner) => match inner.normalized() {
                Self::Not(twice) => *twice,
                other => Self::Not(Box::new(other)),
            },
            other => other.clone(),
        }
    }

    fn group(children: &[Self], wrap: fn(Vec<Self>) -> Self) -> Self {
        let mut ps: Vec<Self> = children.iter().map(Self::normalized).collect();
        ps.sort();
        ps.dedup();
        if ps.len() == 1 {
            ps.remove(0)
        } else {
            wrap(ps)
        }
    }

    /// Compile every glob once so matching allocates nothing.
    pub fn compile(&self) -> Result<CompiledPattern, globset::Error> {
        Ok(match self {
            Self::Any => CompiledPattern::Any,
            Self::Layer(layer) => CompiledPattern::Layer(*layer),
            Self::Shape(g) => CompiledPattern::Shape(glob(g, false)?),
            Self::Constraint(g) => CompiledPattern::Constraint(glob(g, false)?),
            Self::Message(g) => CompiledPattern::Message(glob(g, true)?),
            Self::AllOf(ps) => {
                CompiledPattern::AllOf(ps.iter().map(Self::compile).collect::<Result<_, _>>()?)
            }
            Self::AnyOf(ps) => {
                CompiledPattern::AnyOf(ps.iter().map(Self::compile).collect::<Result<_, _>>()?)
            }
            Self::Not(inner) => CompiledPattern::Not(Box::new(inner.compile()?)),
        })
    }
}

fn glob(pattern: &str, case_insensitive: bool) -> Result<GlobMatcher, globset::Error> {
    Ok(GlobBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()?
        .compile_matcher())
}

/// A [`FailurePattern`] with its globs compiled.
#[derive(Debug, Clone)]
pub enum CompiledPattern {
    /// See [`FailurePattern::Any`].
    Any,
    /// See [`FailurePattern::Layer`].
    Layer(FailureLayer),
    /// See [`FailurePattern::Shape`].
    Shape(GlobMatcher),
    /// See [`FailurePattern::Constraint`].
    Constraint(GlobMatcher),
    /// See [`FailurePattern::Message`].
    Message(GlobMatcher),
    /// See [`FailurePattern::AllOf`].
    AllOf(Vec<CompiledPattern>),
    /// See [`FailurePattern::AnyOf`].
    AnyOf(Vec<CompiledPattern>),
    /// See [`FailurePattern::Not`].
    Not(Box<CompiledPattern>),
}

impl CompiledPattern {
    /// Evaluate against `failure`.
    #[must_use]
    pub fn matches(&self, failure: &Failure) -> bool {
        match self {
            Self::Any => true,
            Self::Layer(layer) => failure.layer() == *layer,
            Self::Shape(m) => m.is_match(failure.shape()),
            Self::Constraint(m) => failure.constraint().is_some_and(|c| m.is_match(c)),
            Self::Message(m) => m.is_match(failure.to_string()),
            Self::AllOf(ps) => ps.iter().all(|p| p.matches(failure)),
            Self::AnyOf(ps) => ps.iter().any(|p| p.matches(failure)),
            Self::Not(inner) => !inner.matches(failure),
        }
    }
}
