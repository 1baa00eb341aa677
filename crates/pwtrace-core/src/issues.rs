use crate::field_path::FieldPath;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A configuration problem located by its field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredIssue {
    pub kind: String,
    pub field_path: FieldPath,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl StructuredIssue {
    pub fn error(kind: &str, field_path: FieldPath, message: impl Into<String>) -> Self {
        Self {
            kind: kind.to_string(),
            field_path,
            message: message.into(),
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: &str) -> Self {
        self.reference = Some(reference.to_string());
        self
    }

    pub fn sort_stable(issues: &mut [Self]) {
        issues.sort_by(|left, right| {
            (&left.kind, &left.field_path, &left.message).cmp(&(
                &right.kind,
                &right.field_path,
                &right.message,
            ))
        });
    }
}

impl Display for StructuredIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}: {}", self.kind, self.field_path, self.message)
    }
}

#[cfg(test)]
#[path = "issues_test.rs"]
mod tests;
