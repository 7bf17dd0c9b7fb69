use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::BTreeMap;
use tracing::Instrument;

use crate::subscription::{SubscriptionCatalog, SubscriptionFeature, SubscriptionLevel};

#[derive(Clone, Debug)]
pub struct PgSubscriptionCatalog {
    pool: PgPool,
}

impl PgSubscriptionCatalog {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionCatalog for PgSubscriptionCatalog {
    async fn list_levels(&self) -> Result<Vec<SubscriptionLevel>> {
        let query = r"
            SELECT l.id AS level_id, l.subscription_name,
                   f.id AS feature_id, f.feature_name
            FROM subscription_levels l
            LEFT JOIN subscription_features f ON f.subscription_level_id = l.id
            ORDER BY l.id, f.id
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .context("failed to load subscription levels")?;

        let mut grouped: BTreeMap<i32, (String, Vec<SubscriptionFeature>)> = BTreeMap::new();
        for row in rows {
            let level_id: i32 = row.get("level_id");
            let entry = grouped
                .entry(level_id)
                .or_insert_with(|| (row.get("subscription_name"), Vec::new()));
            let feature_id: Option<i32> = row.get("feature_id");
            if let Some(feature_id) = feature_id {
                entry.1.push(SubscriptionFeature {
                    id: feature_id,
                    feature_name: row.get("feature_name"),
                });
            }
        }

        grouped
            .into_iter()
            .map(|(id, (name, features))| {
                SubscriptionLevel::new(id, &name, features)
                    .with_context(|| format!("invalid subscription level {id}"))
            })
            .collect()
    }
}
