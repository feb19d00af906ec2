//! Input contracts - required/optional key schemas checked before a pipe runs

use crate::core::error::ContractViolation;
use crate::core::result::PipeResult;
use crate::core::value::ValueKind;
use std::collections::BTreeMap;
use std::fmt;

/// Declared type of a contract key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Any non-null value
    Any,
    Bool,
    Integer,
    Float,
    /// Integer or float
    Number,
    Text,
    List,
    Map,
    Handle,
}

impl ParamType {
    /// Whether a value of `kind` is assignable to this type
    pub fn accepts(self, kind: ValueKind) -> bool {
        match (self, kind) {
            (_, ValueKind::Null) => false,
            (ParamType::Any, _) => true,
            (ParamType::Bool, ValueKind::Bool) => true,
            (ParamType::Integer, ValueKind::Integer) => true,
            (ParamType::Float, ValueKind::Float) => true,
            (ParamType::Number, ValueKind::Integer | ValueKind::Float) => true,
            (ParamType::Text, ValueKind::Text) => true,
            (ParamType::List, ValueKind::List) => true,
            (ParamType::Map, ValueKind::Map) => true,
            (ParamType::Handle, ValueKind::Handle) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamType::Any => "any",
            ParamType::Bool => "bool",
            ParamType::Integer => "integer",
            ParamType::Float => "float",
            ParamType::Number => "number",
            ParamType::Text => "text",
            ParamType::List => "list",
            ParamType::Map => "map",
            ParamType::Handle => "handle",
        };
        f.write_str(name)
    }
}

/// Required and optional key schemas for a pipe's merged input
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputContract {
    required: BTreeMap<String, ParamType>,
    optional: BTreeMap<String, ParamType>,
}

impl InputContract {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, key: impl Into<String>, ty: ParamType) -> Self {
        self.required.insert(key.into(), ty);
        self
    }

    pub fn optional(mut self, key: impl Into<String>, ty: ParamType) -> Self {
        self.optional.insert(key.into(), ty);
        self
    }

    pub fn required_keys(&self) -> impl Iterator<Item = (&str, ParamType)> {
        self.required.iter().map(|(k, t)| (k.as_str(), *t))
    }

    pub fn optional_keys(&self) -> impl Iterator<Item = (&str, ParamType)> {
        self.optional.iter().map(|(k, t)| (k.as_str(), *t))
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.optional.is_empty()
    }

    /// Check `input` against this contract
    pub fn check(&self, input: &PipeResult) -> Result<(), ContractViolation> {
        check(input, &self.required, &self.optional)
    }
}

/// Validate `input` against required and optional schemas.
///
/// Required keys must be present, non-null and of the declared type.
/// Optional keys are skipped when absent or null, otherwise type-checked.
/// Keys are checked in lexicographic order, required before optional, so the
/// first violation reported is stable.
pub fn check(
    input: &PipeResult,
    required: &BTreeMap<String, ParamType>,
    optional: &BTreeMap<String, ParamType>,
) -> Result<(), ContractViolation> {
    for (key, expected) in required {
        let kind = input
            .type_of(key)
            .ok_or_else(|| ContractViolation::Missing { key: key.clone() })?;
        if kind == ValueKind::Null {
            return Err(ContractViolation::Null { key: key.clone() });
        }
        check_type(key, *expected, kind)?;
    }

    for (key, expected) in optional {
        match input.type_of(key) {
            None | Some(ValueKind::Null) => continue,
            Some(kind) => check_type(key, *expected, kind)?,
        }
    }

    Ok(())
}

fn check_type(key: &str, expected: ParamType, actual: ValueKind) -> Result<(), ContractViolation> {
    if expected.accepts(actual) {
        Ok(())
    } else {
        Err(ContractViolation::TypeMismatch {
            key: key.to_string(),
            expected,
            actual,
        })
    }
}
