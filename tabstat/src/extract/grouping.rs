//! Splitting aligned values by a categorical column.

use crate::error::{Result, TabstatError};

/// Numeric values partitioned by group label, groups in first-seen order.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedValues {
    names: Vec<String>,
    groups: Vec<Vec<f64>>,
}

impl GroupedValues {
    /// Partitions `values` by the label at the same aligned position.
    pub fn split(values: &[f64], labels: &[String]) -> Result<Self> {
        if values.len() != labels.len() {
            return Err(TabstatError::validation(format!(
                "cannot group {} values by {} labels",
                values.len(),
                labels.len()
            )));
        }
        let mut names: Vec<String> = Vec::new();
        let mut groups: Vec<Vec<f64>> = Vec::new();
        for (value, label) in values.iter().zip(labels) {
            match names.iter().position(|n| n == label) {
                Some(idx) => groups[idx].push(*value),
                None => {
                    names.push(label.clone());
                    groups.push(vec![*value]);
                }
            }
        }
        Ok(Self { names, groups })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn groups(&self) -> &[Vec<f64>] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Fails unless there are at least `min` groups.
    pub fn require_groups(&self, min: usize) -> Result<&Self> {
        if self.len() < min {
            return Err(TabstatError::validation(format!(
                "minimum {min} groups required (found {})",
                self.len()
            )));
        }
        Ok(self)
    }

    /// Fails unless there are exactly `count` groups.
    pub fn require_exact_groups(&self, count: usize) -> Result<&Self> {
        if self.len() < count {
            return self.require_groups(count);
        }
        if self.len() > count {
            return Err(TabstatError::validation(format!(
                "exactly {count} groups required (found {})",
                self.len()
            )));
        }
        Ok(self)
    }

    /// Fails if any group has fewer than `min` observations.
    pub fn require_group_size(&self, min: usize) -> Result<&Self> {
        for (name, group) in self.names.iter().zip(&self.groups) {
            if group.len() < min {
                return Err(TabstatError::insufficient(
                    format!("group '{name}'"),
                    min,
                    group.len(),
                ));
            }
        }
        Ok(self)
    }
}

/// Distinct labels in first-seen order.
pub fn levels(labels: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for label in labels {
        if !out.contains(label) {
            out.push(label.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_split_preserves_first_seen_order() {
        let grouped =
            GroupedValues::split(&[1.0, 2.0, 3.0, 4.0], &labels(&["b", "a", "b", "c"])).unwrap();
        assert_eq!(grouped.names(), &["b", "a", "c"]);
        assert_eq!(grouped.groups()[0], vec![1.0, 3.0]);
        assert_eq!(grouped.len(), 3);
    }

    #[test]
    fn test_group_requirements() {
        let grouped = GroupedValues::split(&[1.0, 2.0], &labels(&["a", "a"])).unwrap();
        let err = grouped.require_groups(2).unwrap_err();
        assert!(err.to_string().contains("minimum 2 groups required"));

        let grouped =
            GroupedValues::split(&[1.0, 2.0, 3.0], &labels(&["a", "b", "c"])).unwrap();
        assert!(grouped.require_exact_groups(2).is_err());
        assert!(grouped.require_group_size(2).is_err());
    }

    #[test]
    fn test_levels() {
        assert_eq!(levels(&labels(&["x", "y", "x"])), labels(&["x", "y"]));
    }
}
