//! Subscription levels and the features each level owns.
//!
//! A level owns its features (one-to-many). Features are always loaded
//! together with their level; deleting a level cascades to its features.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("subscription name must not be empty")]
    EmptyName,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionFeature {
    pub id: i32,
    pub feature_name: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionLevel {
    id: i32,
    subscription_name: String,
    features: Vec<SubscriptionFeature>,
}

impl SubscriptionLevel {
    /// # Errors
    /// Returns `EmptyName` when `name` is blank after trimming.
    pub fn new(
        id: i32,
        name: &str,
        features: Vec<SubscriptionFeature>,
    ) -> Result<Self, SubscriptionError> {
        if name.trim().is_empty() {
            return Err(SubscriptionError::EmptyName);
        }
        Ok(Self {
            id,
            subscription_name: name.to_string(),
            features,
        })
    }

    #[must_use]
    pub fn id(&self) -> i32 {
        self.id
    }

    #[must_use]
    pub fn subscription_name(&self) -> &str {
        &self.subscription_name
    }

    #[must_use]
    pub fn features(&self) -> &[SubscriptionFeature] {
        &self.features
    }
}

#[async_trait]
pub trait SubscriptionCatalog: Send + Sync {
    /// All levels with their features, ordered by level id.
    async fn list_levels(&self) -> anyhow::Result<Vec<SubscriptionLevel>>;
}

/// Catalog backed by a fixed list.
#[derive(Debug, Clone, Default)]
pub struct StaticSubscriptionCatalog {
    levels: Vec<SubscriptionLevel>,
}

impl StaticSubscriptionCatalog {
    #[must_use]
    pub fn new(mut levels: Vec<SubscriptionLevel>) -> Self {
        levels.sort_by_key(SubscriptionLevel::id);
        Self { levels }
    }
}

#[async_trait]
impl SubscriptionCatalog for StaticSubscriptionCatalog {
    async fn list_levels(&self) -> anyhow::Result<Vec<SubscriptionLevel>> {
        Ok(self.levels.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn feature(id: i32, name: &str) -> SubscriptionFeature {
        SubscriptionFeature {
            id,
            feature_name: name.to_string(),
        }
    }

    #[test]
    fn level_requires_non_empty_name() {
        assert_eq!(
            SubscriptionLevel::new(1, "  ", Vec::new()),
            Err(SubscriptionError::EmptyName)
        );
        assert!(SubscriptionLevel::new(1, "Free", Vec::new()).is_ok());
    }

    #[test]
    fn level_serializes_with_owned_features() -> Result<()> {
        let level = SubscriptionLevel::new(2, "Pro", vec![feature(7, "Unlimited QR codes")])?;
        let value = serde_json::to_value(&level)?;
        assert_eq!(
            value,
            serde_json::json!({
                "id": 2,
                "subscriptionName": "Pro",
                "features": [{"id": 7, "featureName": "Unlimited QR codes"}]
            })
        );
        Ok(())
    }

    #[tokio::test]
    async fn static_catalog_orders_by_id() -> Result<()> {
        let catalog = StaticSubscriptionCatalog::new(vec![
            SubscriptionLevel::new(3, "Team", Vec::new())?,
            SubscriptionLevel::new(1, "Free", Vec::new())?,
        ]);
        let levels = catalog.list_levels().await?;
        let ids: Vec<_> = levels.iter().map(SubscriptionLevel::id).collect();
        assert_eq!(ids, vec![1, 3]);
        Ok(())
    }
}
