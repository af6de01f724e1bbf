//! Moderation trait: screening user input before it reaches the model.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Outcome of a moderation check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationVerdict {
    pub flagged: bool,

    /// Per-category decisions as reported by the moderation service.
    #[serde(default)]
    pub categories: BTreeMap<String, bool>,
}

impl ModerationVerdict {
    /// A verdict that lets the input through.
    pub fn allowed() -> Self {
        Self::default()
    }

    /// Names of the categories that triggered, in sorted order.
    pub fn flagged_categories(&self) -> Vec<&str> {
        self.categories
            .iter()
            .filter(|(_, hit)| **hit)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

#[async_trait]
pub trait Moderator: Send + Sync {
    fn name(&self) -> &str;

    async fn moderate(&self, text: &str) -> Result<ModerationVerdict, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flagged_categories_only_lists_hits() {
        let verdict = ModerationVerdict {
            flagged: true,
            categories: BTreeMap::from([
                ("violence".to_string(), true),
                ("harassment".to_string(), false),
                ("hate".to_string(), true),
            ]),
        };
        assert_eq!(verdict.flagged_categories(), vec!["hate", "violence"]);
    }

    #[test]
    fn allowed_is_not_flagged() {
        let v = ModerationVerdict::allowed();
        assert!(!v.flagged);
        assert!(v.flagged_categories().is_empty());
    }
}
