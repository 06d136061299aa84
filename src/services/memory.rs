use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::models::relation::{RelationKey, RelationKind, RelationRow};
use crate::services::store::RelationStore;

/// 内存关系存储，每个 (主体, 目标, 类型) 至多一行
#[derive(Debug, Default)]
pub struct InMemoryRelationStore {
    rows: DashMap<RelationKey, RelationRow>,
}

impl InMemoryRelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(keys: impl IntoIterator<Item = RelationKey>) -> Self {
        let store = Self::new();
        for key in keys {
            store.rows.insert(key.clone(), Self::row_for(&key));
        }
        store
    }

    pub fn contains(&self, key: &RelationKey) -> bool {
        self.rows.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 目标上某类关系的行数
    pub fn count_for(&self, target_id: &str, kind: RelationKind) -> u64 {
        self.rows
            .iter()
            .filter(|entry| entry.key().target_id == target_id && entry.key().kind == kind)
            .count() as u64
    }

    fn row_for(key: &RelationKey) -> RelationRow {
        RelationRow {
            id: Some(Uuid::new_v4().to_string()),
            subject_id: key.subject_id.clone(),
            target_id: key.target_id.clone(),
            kind: key.kind,
            created_at: Some(Utc::now()),
        }
    }
}

#[async_trait]
impl RelationStore for InMemoryRelationStore {
    async fn find_relation(&self, key: &RelationKey) -> Result<Option<RelationRow>> {
        Ok(self.rows.get(key).map(|row| row.value().clone()))
    }

    async fn insert_relation(&self, key: &RelationKey) -> Result<()> {
        debug!("Inserting relation {}", key);
        self.rows
            .entry(key.clone())
            .or_insert_with(|| Self::row_for(key));
        Ok(())
    }

    async fn delete_relation(&self, key: &RelationKey) -> Result<()> {
        debug!("Deleting relation {}", key);
        self.rows.remove(key);
        Ok(())
    }
}
