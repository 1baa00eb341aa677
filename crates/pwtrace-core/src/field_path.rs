use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Dotted key path into a JSON document, rendered as `$.a.b.c`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct FieldPath {
    keys: Vec<String>,
}

impl FieldPath {
    pub fn root() -> Self {
        Self { keys: Vec::new() }
    }

    pub fn from_keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn push_key(&mut self, key: impl Into<String>) {
        self.keys.push(key.into());
    }

    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut child = self.clone();
        child.push_key(key);
        child
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "$")?;
        for key in &self.keys {
            write!(f, ".{key}")?;
        }
        Ok(())
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.to_string()
    }
}

impl From<String> for FieldPath {
    fn from(text: String) -> Self {
        let trimmed = text.strip_prefix('$').unwrap_or(text.as_str());
        FieldPath::from_keys(trimmed.split('.').filter(|key| !key.is_empty()))
    }
}

#[cfg(test)]
#[path = "field_path_test.rs"]
mod tests;
