use anyhow::Result;
use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue, DatabaseConnection, EntityTrait, TransactionTrait};
use tracing::{debug, warn};

use crate::entities::{prelude::*, settings};
use quickdraw_core::{KeyValueStore, StoredValue, WriteBatch};

/// Settings persisted in SQLite, one row per (bucket, name)
#[derive(Clone)]
pub struct SettingsRepository {
    db: DatabaseConnection,
}

impl SettingsRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn decode(model: &settings::Model) -> Option<StoredValue> {
        match serde_json::from_str(&model.value) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(
                    "Ignoring unreadable setting {}.{} = {:?}: {}",
                    model.bucket, model.name, model.value, e
                );
                None
            }
        }
    }
}

#[async_trait]
impl KeyValueStore for SettingsRepository {
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<StoredValue>> {
        let model = Settings::find_by_id((bucket.to_string(), key.to_string()))
            .one(&self.db)
            .await?;

        Ok(model.as_ref().and_then(Self::decode))
    }

    async fn commit(&self, bucket: &str, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let now: chrono::DateTime<chrono::FixedOffset> = chrono::Utc::now().into();
        let txn = self.db.begin().await?;

        for (name, value) in batch.entries() {
            let row = settings::ActiveModel {
                bucket: ActiveValue::Set(bucket.to_string()),
                name: ActiveValue::Set(name.clone()),
                value: ActiveValue::Set(serde_json::to_string(value)?),
                updated_at: ActiveValue::Set(now),
            };

            Settings::insert(row)
                .on_conflict(
                    OnConflict::columns([settings::Column::Bucket, settings::Column::Name])
                        .update_columns([settings::Column::Value, settings::Column::UpdatedAt])
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await?;
        }

        // Dropping the transaction on an early return rolls it back
        txn.commit().await?;
        debug!("Committed {} settings to bucket {}", batch.len(), bucket);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect_to_memory_database;
    use migration::{Migrator, MigratorTrait};
    use quickdraw_core::{SETTINGS_BUCKET, SettingsStore};
    use quickdraw_types::GameSettings;
    use std::sync::Arc;

    async fn setup_test_db() -> SettingsRepository {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        SettingsRepository::new(db)
    }

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let repo = setup_test_db().await;
        let value = repo.get(SETTINGS_BUCKET, "timer_duration").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_commit_and_get() {
        let repo = setup_test_db().await;

        let mut batch = WriteBatch::new();
        batch
            .put("timer_duration", StoredValue::Int(30))
            .put("vibration", StoredValue::Bool(false));
        repo.commit(SETTINGS_BUCKET, batch).await.unwrap();

        assert_eq!(
            repo.get(SETTINGS_BUCKET, "timer_duration").await.unwrap(),
            Some(StoredValue::Int(30))
        );
        assert_eq!(
            repo.get(SETTINGS_BUCKET, "vibration").await.unwrap(),
            Some(StoredValue::Bool(false))
        );
    }

    #[tokio::test]
    async fn test_commit_overwrites_existing_rows() {
        let repo = setup_test_db().await;

        for seconds in [20, 45] {
            let mut batch = WriteBatch::new();
            batch.put("timer_duration", StoredValue::Int(seconds));
            repo.commit(SETTINGS_BUCKET, batch).await.unwrap();
        }

        let rows = Settings::find().all(&repo.db).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, "45");
    }

    #[tokio::test]
    async fn test_buckets_are_separate() {
        let repo = setup_test_db().await;

        let mut batch = WriteBatch::new();
        batch.put("timer_duration", StoredValue::Int(50));
        repo.commit("other_app", batch).await.unwrap();

        assert!(repo.get(SETTINGS_BUCKET, "timer_duration").await.unwrap().is_none());
        assert_eq!(
            repo.get("other_app", "timer_duration").await.unwrap(),
            Some(StoredValue::Int(50))
        );
    }

    #[tokio::test]
    async fn test_unreadable_value_is_treated_as_missing() {
        let repo = setup_test_db().await;

        let row = settings::ActiveModel {
            bucket: ActiveValue::Set(SETTINGS_BUCKET.to_string()),
            name: ActiveValue::Set("timer_duration".to_string()),
            value: ActiveValue::Set("\"fast\"".to_string()),
            updated_at: ActiveValue::Set(chrono::Utc::now().into()),
        };
        Settings::insert(row)
            .exec_without_returning(&repo.db)
            .await
            .unwrap();

        assert!(repo.get(SETTINGS_BUCKET, "timer_duration").await.unwrap().is_none());

        let store = SettingsStore::new(Arc::new(repo));
        let settings = store.load().await.unwrap();
        assert_eq!(settings.timer_duration_seconds, 15);
    }

    #[tokio::test]
    async fn test_settings_store_round_trip() {
        let repo = setup_test_db().await;
        let store = SettingsStore::new(Arc::new(repo.clone()));

        let settings = GameSettings {
            timer_duration_seconds: 25,
            min_players: 3,
            max_players: 6,
            enable_sound_effects: false,
            enable_vibration: true,
        };
        store.save(&settings).await.unwrap();

        // A fresh store over the same database sees the saved values
        let reloaded = SettingsStore::new(Arc::new(repo)).load().await.unwrap();
        assert_eq!(reloaded, settings);
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let repo = setup_test_db().await;
        repo.commit(SETTINGS_BUCKET, WriteBatch::new()).await.unwrap();

        let rows = Settings::find().all(&repo.db).await.unwrap();
        assert!(rows.is_empty());
    }
}
