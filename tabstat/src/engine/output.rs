//! Typed access to a routine's named output fields.

use serde::Serialize;
use serde_json::{Map, Value};

use super::{EngineError, EngineResult};

/// The flat object of named fields one routine returned.
///
/// Required accessors fail with [`EngineError::MissingField`] or
/// [`EngineError::InvalidField`]; optional accessors return `Ok(None)` for an
/// absent or null field but still reject a field of the wrong shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineOutput {
    routine: String,
    fields: Map<String, Value>,
}

impl EngineOutput {
    pub fn new(routine: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            routine: routine.into(),
            fields,
        }
    }

    /// Wraps a JSON value, which must be an object.
    pub fn from_value(routine: impl Into<String>, value: Value) -> EngineResult<Self> {
        let routine = routine.into();
        match value {
            Value::Object(fields) => Ok(Self { routine, fields }),
            other => Err(EngineError::routine(
                routine,
                format!("expected an object of named fields, got {}", json_type(&other)),
            )),
        }
    }

    pub fn routine(&self) -> &str {
        &self.routine
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn has(&self, field: &str) -> bool {
        matches!(self.fields.get(field), Some(v) if !v.is_null())
    }

    /// A required finite number.
    pub fn number(&self, field: &str) -> EngineResult<f64> {
        self.optional_number(field)?
            .ok_or_else(|| self.missing(field))
    }

    pub fn optional_number(&self, field: &str) -> EngineResult<Option<f64>> {
        match self.present(field) {
            None => Ok(None),
            Some(value) => as_finite(value)
                .map(Some)
                .ok_or_else(|| self.invalid(field, "a finite number")),
        }
    }

    /// A required non-negative integer.
    pub fn count(&self, field: &str) -> EngineResult<usize> {
        match self.present(field) {
            None => Err(self.missing(field)),
            Some(value) => value
                .as_u64()
                .or_else(|| {
                    value
                        .as_f64()
                        .filter(|n| *n >= 0.0 && n.fract() == 0.0)
                        .map(|n| n as u64)
                })
                .map(|n| n as usize)
                .ok_or_else(|| self.invalid(field, "a non-negative integer")),
        }
    }

    pub fn numbers(&self, field: &str) -> EngineResult<Vec<f64>> {
        self.optional_numbers(field)?
            .ok_or_else(|| self.missing(field))
    }

    pub fn optional_numbers(&self, field: &str) -> EngineResult<Option<Vec<f64>>> {
        match self.present(field) {
            None => Ok(None),
            Some(value) => number_array(value)
                .map(Some)
                .ok_or_else(|| self.invalid(field, "an array of numbers")),
        }
    }

    pub fn strings(&self, field: &str) -> EngineResult<Vec<String>> {
        self.optional_strings(field)?
            .ok_or_else(|| self.missing(field))
    }

    pub fn optional_strings(&self, field: &str) -> EngineResult<Option<Vec<String>>> {
        match self.present(field) {
            None => Ok(None),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
                .map(Some)
                .ok_or_else(|| self.invalid(field, "an array of strings")),
            Some(_) => Err(self.invalid(field, "an array of strings")),
        }
    }

    /// A required array of equal-length numeric rows.
    pub fn matrix(&self, field: &str) -> EngineResult<Vec<Vec<f64>>> {
        self.optional_matrix(field)?
            .ok_or_else(|| self.missing(field))
    }

    pub fn optional_matrix(&self, field: &str) -> EngineResult<Option<Vec<Vec<f64>>>> {
        let value = match self.present(field) {
            None => return Ok(None),
            Some(value) => value,
        };
        let rows = value
            .as_array()
            .and_then(|rows| rows.iter().map(number_array).collect::<Option<Vec<_>>>())
            .ok_or_else(|| self.invalid(field, "a numeric matrix"))?;
        if let Some(width) = rows.first().map(Vec::len) {
            if rows.iter().any(|r| r.len() != width) {
                return Err(self.invalid(field, "a rectangular matrix"));
            }
        }
        Ok(Some(rows))
    }

    pub fn text(&self, field: &str) -> EngineResult<String> {
        self.optional_text(field)?
            .ok_or_else(|| self.missing(field))
    }

    pub fn optional_text(&self, field: &str) -> EngineResult<Option<String>> {
        match self.present(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(self.invalid(field, "a string")),
        }
    }

    pub fn optional_bool(&self, field: &str) -> EngineResult<Option<bool>> {
        match self.present(field) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(self.invalid(field, "a boolean")),
        }
    }

    /// An array of objects, each wrapped so the typed accessors apply to it.
    pub fn nested(&self, field: &str) -> EngineResult<Vec<EngineOutput>> {
        self.optional_nested(field)?
            .ok_or_else(|| self.missing(field))
    }

    pub fn optional_nested(&self, field: &str) -> EngineResult<Option<Vec<EngineOutput>>> {
        match self.present(field) {
            None => Ok(None),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| {
                    v.as_object()
                        .map(|fields| EngineOutput::new(self.routine.clone(), fields.clone()))
                })
                .collect::<Option<Vec<_>>>()
                .map(Some)
                .ok_or_else(|| self.invalid(field, "an array of objects")),
            Some(_) => Err(self.invalid(field, "an array of objects")),
        }
    }

    fn present(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    fn missing(&self, field: &str) -> EngineError {
        EngineError::MissingField {
            routine: self.routine.clone(),
            field: field.to_string(),
        }
    }

    fn invalid(&self, field: &str, expected: &str) -> EngineError {
        EngineError::InvalidField {
            routine: self.routine.clone(),
            field: field.to_string(),
            expected: expected.to_string(),
        }
    }
}

fn as_finite(value: &Value) -> Option<f64> {
    value.as_f64().filter(|n| n.is_finite())
}

fn number_array(value: &Value) -> Option<Vec<f64>> {
    value.as_array()?.iter().map(as_finite).collect()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
