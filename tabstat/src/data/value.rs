//! Scalar cell values as they arrive from uploaded data.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell of an uploaded record.
///
/// Deserializes from plain JSON scalars: `null` becomes [`CellValue::Empty`],
/// booleans, numbers and strings map to their variants.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Null, absent or blank.
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Returns true for null cells and for text that is blank after trimming.
    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Name of the value's type, used in "unexpected type" messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Empty => "empty",
            CellValue::Bool(_) => "boolean",
            CellValue::Number(_) => "number",
            CellValue::Text(_) => "text",
        }
    }

    /// Renders the value as a category label.
    ///
    /// Integral numbers render without a fractional part so that `1.0` and
    /// `"1"` land in the same group.
    pub fn as_label(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Bool(b) => Some(b.to_string()),
            CellValue::Number(n) if !n.is_finite() => None,
            CellValue::Number(n) => Some(format_number_label(*n)),
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
        }
    }
}

pub(crate) fn format_number_label(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => f.write_str("null"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Number(n) => f.write_str(&format_number_label(*n)),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Number(f64::from(value))
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Empty, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_json_scalars() {
        let values: Vec<CellValue> =
            serde_json::from_str(r#"[null, true, 1.5, "abc", 2]"#).unwrap();
        assert_eq!(
            values,
            vec![
                CellValue::Empty,
                CellValue::Bool(true),
                CellValue::Number(1.5),
                CellValue::Text("abc".to_string()),
                CellValue::Number(2.0),
            ]
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(CellValue::Number(1.0).as_label(), Some("1".to_string()));
        assert_eq!(CellValue::Number(1.5).as_label(), Some("1.5".to_string()));
        assert_eq!(CellValue::Text("  a ".into()).as_label(), Some("a".to_string()));
        assert_eq!(CellValue::Text("   ".into()).as_label(), None);
        assert_eq!(CellValue::Empty.as_label(), None);
        assert_eq!(CellValue::Number(f64::NAN).as_label(), None);
    }

    #[test]
    fn test_missing() {
        assert!(CellValue::Empty.is_missing());
        assert!(CellValue::Text(String::new()).is_missing());
        assert!(!CellValue::Number(0.0).is_missing());
        assert!(!CellValue::Bool(false).is_missing());
    }
}
