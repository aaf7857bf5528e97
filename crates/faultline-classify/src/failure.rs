// SPDX-License-Identifier: MIT OR Apache-2.0
//! Failure shapes raised by collaborator layers.
//!
//! Each collaborator (schema validator, relational store, graph engine,
//! token verifier, web framework, downstream service) is represented only by
//! the failure it raises. [`Failure`] is the tagged union the translator
//! registry dispatches on.

use chrono::{DateTime, Utc};
use faultline_taxonomy::{ErrorRecord, PathSegment, display_path};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::LazyLock;

// ---------------------------------------------------------------------------
// Failure
// ---------------------------------------------------------------------------

/// Which collaborator raised a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureLayer {
    /// Schema / field validation.
    Validation,
    /// Relational persistence.
    Persistence,
    /// Graph query engine.
    Resolver,
    /// Token authentication and access control.
    Auth,
    /// Web framework (routing, body extraction).
    Http,
    /// A downstream service.
    Upstream,
    /// Business logic that already produced a canonical record.
    Application,
    /// Anything else.
    Unexpected,
}

impl FailureLayer {
    /// Stable string form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Persistence => "persistence",
            Self::Resolver => "resolver",
            Self::Auth => "auth",
            Self::Http => "http",
            Self::Upstream => "upstream",
            Self::Application => "application",
            Self::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for FailureLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raised failure from any collaborator layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "layer", rename_all = "snake_case")]
pub enum Failure {
    /// Schema validation failure.
    #[error(transparent)]
    Validation(ValidationFailure),
    /// Relational persistence failure.
    #[error(transparent)]
    Persistence(PersistenceFailure),
    /// Graph resolver failure.
    #[error(transparent)]
    Resolver(ResolverFailure),
    /// Authentication or access-control failure.
    #[error(transparent)]
    Auth(AuthFailure),
    /// Framework-level HTTP failure.
    #[error(transparent)]
    Http(HttpFailure),
    /// Downstream service failure.
    #[error(transparent)]
    Upstream(UpstreamFailure),
    /// Business logic raised an already-classified record.
    #[error(transparent)]
    Application(ErrorRecord),
    /// Failure of no known shape.
    #[error(transparent)]
    Unexpected(UnexpectedFailure),
}

impl Failure {
    /// The layer that raised this failure.
    pub fn layer(&self) -> FailureLayer {
        match self {
            Self::Validation(_) => FailureLayer::Validation,
            Self::Persistence(_) => FailureLayer::Persistence,
            Self::Resolver(_) => FailureLayer::Resolver,
            Self::Auth(_) => FailureLayer::Auth,
            Self::Http(_) => FailureLayer::Http,
            Self::Upstream(_) => FailureLayer::Upstream,
            Self::Application(_) => FailureLayer::Application,
            Self::Unexpected(_) => FailureLayer::Unexpected,
        }
    }

    /// Fine-grained shape name, always prefixed by the layer
    /// (e.g. `persistence.unique_violation`, `auth.token_expired`).
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation.schema",
            Self::Persistence(p) => p.shape(),
            Self::Resolver(r) => r.kind.shape(),
            Self::Auth(a) => a.shape(),
            Self::Http(h) => h.shape(),
            Self::Upstream(u) => u.condition.shape(),
            Self::Application(_) => "application.record",
            Self::Unexpected(u) if u.is_panic() => "unexpected.panic",
            Self::Unexpected(_) => "unexpected.error",
        }
    }

    /// Constraint identifier carried by the failure, if any.
    pub fn constraint(&self) -> Option<&str> {
        match self {
            Self::Persistence(p) => p.constraint.as_deref(),
            Self::Validation(v) => v.violations.first().map(|x| x.constraint.as_str()),
            _ => None,
        }
    }

    /// Follow resolver wrappers to the failure that was actually raised.
    ///
    /// Returns the innermost failure and the outermost non-empty response
    /// path seen on the way.
    pub fn innermost(&self) -> (&Failure, Option<&[PathSegment]>) {
        let mut current = self;
        let mut path: Option<&[PathSegment]> = None;
        while let Self::Resolver(ResolverFailure {
            path: p,
            kind: ResolverFailureKind::Wrapped { failure },
        }) = current
        {
            if path.is_none() && !p.is_empty() {
                path = Some(p.as_slice());
            }
            current = failure.as_ref();
        }
        if let Self::Resolver(r) = current {
            if path.is_none() && !r.path.is_empty() {
                path = Some(r.path.as_slice());
            }
        }
        (current, path)
    }

    /// Capture an arbitrary error as an unexpected failure.
    pub fn unexpected<E>(err: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        Self::Unexpected(UnexpectedFailure::from_error(std::any::type_name::<E>(), err))
    }

    /// Capture a panic payload as an unexpected failure.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        Self::Unexpected(UnexpectedFailure::from_panic(payload))
    }
}

macro_rules! impl_from_shape {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Failure {
                fn from(f: $ty) -> Self {
                    Self::$variant(f)
                }
            }
        )*
    };
}

impl_from_shape! {
    ValidationFailure => Validation,
    PersistenceFailure => Persistence,
    ResolverFailure => Resolver,
    AuthFailure => Auth,
    HttpFailure => Http,
    UpstreamFailure => Upstream,
    ErrorRecord => Application,
    UnexpectedFailure => Unexpected,
}

fn known_shape(err: &(dyn std::error::Error + 'static)) -> Option<Failure> {
    if let Some(f) = err.downcast_ref::<Failure>() {
        return Some(f.clone());
    }
    macro_rules! try_shape {
        ($($ty:ty),*) => {
            $(
                if let Some(f) = err.downcast_ref::<$ty>() {
                    return Some(Failure::from(f.clone()));
                }
            )*
        };
    }
    try_shape!(
        ValidationFailure,
        PersistenceFailure,
        ResolverFailure,
        AuthFailure,
        HttpFailure,
        UpstreamFailure,
        ErrorRecord
    );
    None
}

impl From<anyhow::Error> for Failure {
    /// Recover a known shape from anywhere in the error chain, otherwise
    /// capture the error as unexpected.
    fn from(err: anyhow::Error) -> Self {
        err.chain()
            .find_map(|e| known_shape(e))
            .unwrap_or_else(|| Self::Unexpected(UnexpectedFailure::from_anyhow(&err)))
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// One failed field constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Path to the offending value.
    #[serde(default)]
    pub path: Vec<PathSegment>,
    /// Name of the failed constraint (`type`, `minimum`, `required`...).
    pub constraint: String,
    /// The rejected value, when the validator exposes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_value: Option<Value>,
    /// Validator message.
    pub message: String,
}

impl Violation {
    /// New violation without an invalid value.
    pub fn new<I, S>(path: I, constraint: impl Into<String>, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PathSegment>,
    {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            constraint: constraint.into(),
            invalid_value: None,
            message: message.into(),
        }
    }

    /// Attach the rejected value.
    #[must_use]
    pub fn with_invalid_value(mut self, value: Value) -> Self {
        self.invalid_value = Some(value);
        self
    }
}

/// One or more failed field constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// Every violation, in validator order.
    pub violations: Vec<Violation>,
}

impl ValidationFailure {
    /// Wrap a list of violations.
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    /// Collect the errors of a JSON-schema validation run.
    pub fn from_jsonschema<'a, I>(errors: I) -> Self
    where
        I: IntoIterator<Item = jsonschema::ValidationError<'a>>,
    {
        Self::new(errors.into_iter().map(violation_from_jsonschema).collect())
    }

    /// Validate `instance` and return every violation as one failure.
    pub fn check(validator: &jsonschema::Validator, instance: &Value) -> Result<(), Self> {
        let failure = Self::from_jsonschema(validator.iter_errors(instance));
        if failure.violations.is_empty() {
            Ok(())
        } else {
            Err(failure)
        }
    }
}

static DESERIALIZE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<path>[^\s:]+): (?P<msg>.+)$").expect("invalid deserialize path regex")
});

static DESERIALIZE_POSITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r" at line \d+ column \d+$").expect("invalid deserialize position regex")
});

static MISSING_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^missing field `(?P<field>[^`]+)`").expect("invalid missing field regex")
});

impl ValidationFailure {
    /// Parse a typed-body deserialization message into a single violation.
    ///
    /// Messages carry the offending path as a prefix
    /// (`items[2].name: invalid type: integer `7`, expected a string at line 1
    /// column 30`), the format produced by `serde_path_to_error` and therefore
    /// by axum's `Json` extractor. A missing field is appended to the path.
    pub fn from_deserialize_message(message: &str) -> Self {
        let message = message.trim();
        let (mut path, inner) = match DESERIALIZE_PATH.captures(message) {
            Some(caps) => {
                let path = parse_dotted_path(&caps["path"])
                    .into_iter()
                    .filter(|seg| *seg != PathSegment::from("?"))
                    .collect::<Vec<_>>();
                (path, caps.name("msg").map_or("", |m| m.as_str()))
            }
            None => (Vec::new(), message),
        };
        let inner = DESERIALIZE_POSITION.replace(inner, "").into_owned();
        let constraint = if let Some(caps) = MISSING_FIELD.captures(&inner) {
            path.push(PathSegment::from(&caps["field"]));
            "required"
        } else if inner.starts_with("invalid type") {
            "type"
        } else if inner.starts_with("invalid value") {
            "value"
        } else if inner.starts_with("invalid length") {
            "length"
        } else if inner.starts_with("unknown variant") {
            "enum"
        } else if inner.starts_with("unknown field") {
            "additional_properties"
        } else {
            "deserialize"
        };
        Self::new(vec![Violation {
            path,
            constraint: constraint.to_string(),
            invalid_value: None,
            message: inner,
        }])
    }
}

fn violation_from_jsonschema(err: jsonschema::ValidationError<'_>) -> Violation {
    let message = err.to_string();
    let mut path = parse_json_pointer(&err.instance_path.to_string());
    let schema_path = err.schema_path.to_string();
    let constraint = schema_path
        .rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or("schema")
        .to_string();
    let mut invalid_value = Some(err.instance.as_ref().clone());
    if let jsonschema::error::ValidationErrorKind::Required { property } = &err.kind {
        if let Some(name) = property.as_str() {
            path.push(PathSegment::from(name));
        }
        invalid_value = None;
    }
    Violation {
        path,
        constraint,
        invalid_value,
        message,
    }
}

/// Split an RFC 6901 pointer (`/items/0/qty`) into path segments.
pub(crate) fn parse_json_pointer(pointer: &str) -> Vec<PathSegment> {
    pointer
        .split('/')
        .skip(1)
        .map(|raw| {
            let seg = raw.replace("~1", "/").replace("~0", "~");
            match seg.parse::<usize>() {
                Ok(i) => PathSegment::Index(i),
                Err(_) => PathSegment::Key(seg),
            }
        })
        .collect()
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.violations.as_slice() {
            [] => f.write_str("validation failed"),
            [only] => write!(f, "{}: {}", display_path(&only.path), only.message),
            [first, rest @ ..] => write!(
                f,
                "{}: {} (and {} more)",
                display_path(&first.path),
                first.message,
                rest.len()
            ),
        }
    }
}

impl std::error::Error for ValidationFailure {}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// What a relational store reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceCondition {
    /// A query expected one row and found none.
    NoResult,
    /// A query expected one row and found several.
    MultipleResults,
    /// The database raised an error.
    Database,
}

/// A relational store failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct PersistenceFailure {
    /// Broad condition.
    pub condition: PersistenceCondition,
    /// Entity being looked up, for missing-row conditions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    /// Five-character SQLSTATE, when the driver reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqlstate: Option<String>,
    /// Violated constraint name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
    /// Affected table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Affected columns, when the driver reports them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    /// Primary driver message.
    pub message: String,
    /// Secondary detail line (e.g. `Key (email)=(a@b.c) already exists.`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

static PG_KEY_DETAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Key \((?P<cols>[^)]+)\)=\((?P<vals>.*)\)").expect("invalid key detail regex")
});

static PG_NOT_NULL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"null value in column "(?P<col>[^"]+)""#).expect("invalid not-null regex")
});

static SQLITE_CONSTRAINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<kind>UNIQUE|NOT NULL|CHECK|FOREIGN KEY) constraint failed(?::\s*(?P<cols>.+))?$")
        .expect("invalid sqlite constraint regex")
});

impl PersistenceFailure {
    fn with_condition(condition: PersistenceCondition, message: impl Into<String>) -> Self {
        Self {
            condition,
            entity: None,
            sqlstate: None,
            constraint: None,
            table: None,
            columns: Vec::new(),
            message: message.into(),
            detail: None,
        }
    }

    /// A lookup for `entity` found no row.
    pub fn no_result(entity: impl Into<String>) -> Self {
        let entity = entity.into();
        let mut f = Self::with_condition(PersistenceCondition::NoResult, format!("no {entity} found"));
        f.entity = Some(entity);
        f
    }

    /// A lookup for `entity` found more than one row.
    pub fn multiple_results(entity: impl Into<String>) -> Self {
        let entity = entity.into();
        let mut f = Self::with_condition(
            PersistenceCondition::MultipleResults,
            format!("multiple {entity} rows found"),
        );
        f.entity = Some(entity);
        f
    }

    /// A database error with an optional SQLSTATE.
    pub fn database(sqlstate: Option<&str>, message: impl Into<String>) -> Self {
        let mut f = Self::with_condition(PersistenceCondition::Database, message);
        f.sqlstate = sqlstate.map(str::to_string);
        f
    }

    /// Set the constraint name.
    #[must_use]
    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }

    /// Set the table name.
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Set the affected columns.
    #[must_use]
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the detail line.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Shape name derived from the condition, SQLSTATE or driver message.
    pub fn shape(&self) -> &'static str {
        match self.condition {
            PersistenceCondition::NoResult => "persistence.no_result",
            PersistenceCondition::MultipleResults => "persistence.multiple_results",
            PersistenceCondition::Database => match self.sqlstate.as_deref() {
                Some(state) => sqlstate_shape(state),
                None => self.message_shape(),
            },
        }
    }

    fn message_shape(&self) -> &'static str {
        let Some(caps) = SQLITE_CONSTRAINT.captures(&self.message) else {
            return "persistence.other";
        };
        match &caps["kind"] {
            "UNIQUE" => "persistence.unique_violation",
            "NOT NULL" => "persistence.not_null_violation",
            "CHECK" => "persistence.check_violation",
            _ => "persistence.foreign_key_violation",
        }
    }

    /// Affected columns: explicit ones first, otherwise parsed from the
    /// driver's detail or message text.
    pub fn resolved_columns(&self) -> Vec<String> {
        if !self.columns.is_empty() {
            return self.columns.clone();
        }
        if let Some(caps) = self.detail.as_deref().and_then(|d| PG_KEY_DETAIL.captures(d)) {
            return split_list(&caps["cols"]);
        }
        if let Some(caps) = PG_NOT_NULL.captures(&self.message) {
            return vec![caps["col"].to_string()];
        }
        if let Some(cols) = SQLITE_CONSTRAINT
            .captures(&self.message)
            .and_then(|c| c.name("cols"))
        {
            return split_list(cols.as_str())
                .into_iter()
                .map(|c| c.rsplit('.').next().unwrap_or_default().to_string())
                .collect();
        }
        Vec::new()
    }

    /// Conflicting values parsed from a `Key (..)=(..)` detail line.
    pub fn conflicting_values(&self) -> Option<Vec<String>> {
        let caps = PG_KEY_DETAIL.captures(self.detail.as_deref()?)?;
        Some(split_list(&caps["vals"]))
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|p| p.trim().trim_matches('"').to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Map a SQLSTATE to a persistence shape name.
pub fn sqlstate_shape(state: &str) -> &'static str {
    match state {
        "23505" => "persistence.unique_violation",
        "23503" => "persistence.foreign_key_violation",
        "23514" => "persistence.check_violation",
        "23502" => "persistence.not_null_violation",
        "23P01" => "persistence.exclusion_violation",
        "40001" | "40P01" => "persistence.serialization_failure",
        "57014" => "persistence.query_canceled",
        "57P01" | "53300" => "persistence.connection",
        s if s.starts_with("08") => "persistence.connection",
        s if s.starts_with("23") => "persistence.integrity",
        _ => "persistence.other",
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Line/column in a graph query document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
}

/// What went wrong inside the graph engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolverFailureKind {
    /// The query document failed to parse.
    Syntax {
        /// Parser message.
        message: String,
        /// Positions in the document.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        locations: Vec<SourceLocation>,
    },
    /// A variable failed input coercion.
    VariableInvalid {
        /// Variable name without the `$`.
        variable: String,
        /// Path into the variable value, starting with the variable name.
        path: Vec<PathSegment>,
        /// Coercion message.
        message: String,
    },
    /// A field argument was rejected.
    InvalidArgument {
        /// Argument name.
        argument: String,
        /// Rejection message.
        message: String,
    },
    /// The engine failed while executing a resolver.
    Execution {
        /// Engine message.
        message: String,
    },
    /// A resolver raised some other failure.
    Wrapped {
        /// The original failure.
        failure: Box<Failure>,
    },
}

impl ResolverFailureKind {
    /// Shape name.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Syntax { .. } => "resolver.syntax",
            Self::VariableInvalid { .. } => "resolver.variable_invalid",
            Self::InvalidArgument { .. } => "resolver.invalid_argument",
            Self::Execution { .. } => "resolver.execution",
            Self::Wrapped { .. } => "resolver.wrapped",
        }
    }
}

/// A graph-query failure, with the response path of the failing field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverFailure {
    /// Response path of the field that failed; empty for request-level failures.
    #[serde(default)]
    pub path: Vec<PathSegment>,
    /// What happened.
    pub kind: ResolverFailureKind,
}

static VARIABLE_INVALID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^Variable '\$(?P<var>[^']+)' ",
        r"got invalid value (?:.* at '(?P<path>[^']+)'|.*?)",
        r"; (?:Expected type '[^']+'\. )?(?P<msg>.*)$",
    ))
    .expect("invalid variable regex")
});

impl ResolverFailure {
    /// A resolver at `path` raised `failure`.
    pub fn wrap<I, S>(path: I, failure: impl Into<Failure>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PathSegment>,
    {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            kind: ResolverFailureKind::Wrapped {
                failure: Box::new(failure.into()),
            },
        }
    }

    /// A request-level syntax error.
    pub fn syntax(message: impl Into<String>) -> Self {
        Self {
            path: Vec::new(),
            kind: ResolverFailureKind::Syntax {
                message: message.into(),
                locations: Vec::new(),
            },
        }
    }

    /// Classify a raw engine message.
    ///
    /// Variable coercion messages of the form
    /// `Variable '$user' got invalid value -1 at 'user.age'; Must be positive`
    /// become [`ResolverFailureKind::VariableInvalid`] with a structured path.
    /// Messages starting with `Syntax Error` become syntax failures. Everything
    /// else is an execution failure.
    pub fn from_engine_message(message: &str) -> Self {
        let kind = if let Some(caps) = VARIABLE_INVALID.captures(message) {
            let variable = caps["var"].to_string();
            let mut path = caps
                .name("path")
                .map(|p| parse_dotted_path(p.as_str()))
                .unwrap_or_default();
            if path.first() != Some(&PathSegment::Key(variable.clone())) {
                path.insert(0, PathSegment::from(variable.as_str()));
            }
            ResolverFailureKind::VariableInvalid {
                variable,
                path,
                message: caps["msg"].to_string(),
            }
        } else if message.starts_with("Syntax Error") {
            ResolverFailureKind::Syntax {
                message: message.to_string(),
                locations: Vec::new(),
            }
        } else {
            ResolverFailureKind::Execution {
                message: message.to_string(),
            }
        };
        Self {
            path: Vec::new(),
            kind,
        }
    }

    /// Set the response path.
    #[must_use]
    pub fn at<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PathSegment>,
    {
        self.path = path.into_iter().map(Into::into).collect();
        self
    }
}

/// Split `a.b[0].c` into `[a, b, 0, c]`.
fn parse_dotted_path(raw: &str) -> Vec<PathSegment> {
    let mut out = Vec::new();
    for part in raw.split('.').filter(|p| !p.is_empty()) {
        let mut rest = part;
        if let Some(open) = rest.find('[') {
            if open > 0 {
                out.push(PathSegment::from(&rest[..open]));
            }
            rest = &rest[open..];
            while let Some(close) = rest.find(']') {
                let inner = &rest[1..close];
                out.push(match inner.parse::<usize>() {
                    Ok(i) => PathSegment::Index(i),
                    Err(_) => PathSegment::from(inner),
                });
                rest = &rest[close + 1..];
                if !rest.starts_with('[') {
                    break;
                }
            }
        } else {
            out.push(match rest.parse::<usize>() {
                Ok(i) => PathSegment::Index(i),
                Err(_) => PathSegment::from(rest),
            });
        }
    }
    out
}

impl fmt::Display for ResolverFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ResolverFailureKind::Syntax { message, .. } => f.write_str(message),
            ResolverFailureKind::VariableInvalid {
                variable, message, ..
            } => write!(f, "variable ${variable}: {message}"),
            ResolverFailureKind::InvalidArgument { argument, message } => {
                write!(f, "argument {argument}: {message}")
            }
            ResolverFailureKind::Execution { message } => f.write_str(message),
            ResolverFailureKind::Wrapped { failure } => {
                write!(f, "resolver {} failed: {failure}", display_path(&self.path))
            }
        }
    }
}

impl std::error::Error for ResolverFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ResolverFailureKind::Wrapped { failure } => Some(failure.as_ref()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Authentication and access-control failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "condition", rename_all = "snake_case")]
pub enum AuthFailure {
    /// No credential was presented.
    #[error("authentication required")]
    Missing,
    /// The token has expired.
    #[error("token expired")]
    Expired {
        /// When the token expired, if known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expired_at: Option<DateTime<Utc>>,
    },
    /// The token could not be decoded.
    #[error("malformed token: {reason}")]
    Malformed {
        /// Decoder message.
        reason: String,
    },
    /// The token signature did not verify.
    #[error("token signature invalid")]
    SignatureInvalid,
    /// A token claim was rejected.
    #[error("token claim rejected: {claim}")]
    ClaimsInvalid {
        /// Claim name (`aud`, `iss`, `nbf`...).
        claim: String,
    },
    /// Username/password or API key mismatch.
    #[error("invalid credentials")]
    CredentialsInvalid,
    /// The caller lacks one of the listed roles.
    #[error("role required: {}", .roles.join(", "))]
    RoleRequired {
        /// Acceptable roles.
        roles: Vec<String>,
    },
    /// The caller lacks one of the listed permissions.
    #[error("permission required: {}", .permissions.join(", "))]
    PermissionRequired {
        /// Missing permissions.
        permissions: Vec<String>,
    },
    /// Access denied for another reason.
    #[error("access denied")]
    Forbidden {
        /// Optional caller-safe reason.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl AuthFailure {
    /// Shape name.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Missing => "auth.missing",
            Self::Expired { .. } => "auth.token_expired",
            Self::Malformed { .. } => "auth.token_malformed",
            Self::SignatureInvalid => "auth.token_signature_invalid",
            Self::ClaimsInvalid { .. } => "auth.token_claims_invalid",
            Self::CredentialsInvalid => "auth.credentials_invalid",
            Self::RoleRequired { .. } => "auth.role_required",
            Self::PermissionRequired { .. } => "auth.permission_required",
            Self::Forbidden { .. } => "auth.forbidden",
        }
    }
}

/// Whether `token` has the three non-empty dot-separated segments of a JWT.
pub fn looks_like_jwt(token: &str) -> bool {
    let parts: Vec<&str> = token.split('.').collect();
    parts.len() == 3 && parts.iter().all(|p| !p.is_empty())
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthFailure> {
    let header = header.map(str::trim).filter(|h| !h.is_empty());
    let Some(header) = header else {
        return Err(AuthFailure::Missing);
    };
    let (scheme, token) = header.split_once(' ').unwrap_or((header, ""));
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthFailure::Malformed {
            reason: format!("unsupported authorization scheme {scheme:?}"),
        });
    }
    let token = token.trim();
    if !looks_like_jwt(token) {
        return Err(AuthFailure::Malformed {
            reason: "bearer token is not a JWT".to_string(),
        });
    }
    Ok(token)
}

// ---------------------------------------------------------------------------
// Http
// ---------------------------------------------------------------------------

/// A failure the web framework produced before or around the handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("http {status}: {message}")]
pub struct HttpFailure {
    /// Status the framework chose.
    pub status: u16,
    /// Framework message.
    pub message: String,
    /// Name of the body extractor rejection, if the body was refused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection: Option<String>,
}

impl HttpFailure {
    /// New framework failure.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            rejection: None,
        }
    }

    /// Mark the failure as a body rejection.
    #[must_use]
    pub fn with_rejection(mut self, rejection: impl Into<String>) -> Self {
        self.rejection = Some(rejection.into());
        self
    }

    /// Shape name.
    pub fn shape(&self) -> &'static str {
        match (self.status, self.rejection.is_some()) {
            (_, true) => "http.body_rejected",
            (400..=499, false) => "http.client_error",
            (500..=599, false) => "http.server_error",
            _ => "http.other",
        }
    }
}

// ---------------------------------------------------------------------------
// Upstream
// ---------------------------------------------------------------------------

/// How a downstream call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamCondition {
    /// The call did not complete in time.
    Timeout,
    /// The service could not be reached.
    Unavailable,
    /// The service answered with something unusable.
    BadResponse,
}

impl UpstreamCondition {
    /// Shape name.
    pub fn shape(self) -> &'static str {
        match self {
            Self::Timeout => "upstream.timeout",
            Self::Unavailable => "upstream.unavailable",
            Self::BadResponse => "upstream.bad_response",
        }
    }
}

/// A downstream collaborator failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{service}: {message}")]
pub struct UpstreamFailure {
    /// Logical service name.
    pub service: String,
    /// How it failed.
    pub condition: UpstreamCondition,
    /// Status the service answered with, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Raw failure text.
    pub message: String,
}

impl UpstreamFailure {
    /// New downstream failure.
    pub fn new(
        service: impl Into<String>,
        condition: UpstreamCondition,
        message: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            condition,
            status: None,
            message: message.into(),
        }
    }

    /// Set the status the service answered with.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

// ---------------------------------------------------------------------------
// Unexpected
// ---------------------------------------------------------------------------

const PANIC_TYPE: &str = "panic";

/// Snapshot of an error of no known shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct UnexpectedFailure {
    /// Rust type name of the error, or `panic`.
    pub type_name: String,
    /// Display text.
    pub message: String,
    /// Display text of each source, nearest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chain: Vec<String>,
}

impl UnexpectedFailure {
    /// Capture `err` and its source chain.
    pub fn from_error<E>(type_name: &str, err: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let chain = std::iter::successors(err.source(), |e| e.source())
            .map(|e| e.to_string())
            .collect();
        Self {
            type_name: type_name.to_string(),
            message: err.to_string(),
            chain,
        }
    }

    /// Capture an `anyhow` error and its context chain.
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        Self {
            type_name: "anyhow::Error".to_string(),
            message: err.to_string(),
            chain: err.chain().skip(1).map(|e| e.to_string()).collect(),
        }
    }

    /// Capture a panic payload.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic with non-string payload".to_string());
        Self {
            type_name: PANIC_TYPE.to_string(),
            message,
            chain: Vec::new(),
        }
    }

    /// Whether this came from a caught panic.
    pub fn is_panic(&self) -> bool {
        self.type_name == PANIC_TYPE
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
