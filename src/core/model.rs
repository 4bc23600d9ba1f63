//! Model binding: the set of entity labels a handle knows about

use crate::core::dictionary::Dictionary;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The labels the mock data factory may instantiate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelBinding {
    labels: BTreeSet<String>,
}

impl ModelBinding {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Bind every label the dictionary declares
    pub fn from_dictionary(dictionary: &Dictionary) -> Self {
        Self::new(dictionary.labels())
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
