use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered (source, target) translation direction
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

impl LanguagePair {
    pub fn new<S1: Into<String>, S2: Into<String>>(source: S1, target: S2) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Registry key, e.g. `en-de`
    pub fn id(&self) -> String {
        format!("{}-{}", self.source, self.target)
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.source, self.target)
    }
}
