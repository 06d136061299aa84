use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::relation::{null_as_zero, RelationKind, Toggleable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: String,
    pub user_id: String,
    pub media_url: String,
    #[serde(default)]
    pub media_type: MediaType,
    // 快拍表没有点赞计数列时为 0
    #[serde(default, deserialize_with = "null_as_zero")]
    pub likes_count: u64,
    pub created_at: Option<DateTime<Utc>>,
}

impl Toggleable for Story {
    fn relation_kind(&self) -> RelationKind {
        RelationKind::LikeStory
    }

    fn target_id(&self) -> &str {
        &self.id
    }

    fn display_count(&self) -> u64 {
        self.likes_count
    }

    fn owner_id(&self) -> &str {
        &self.user_id
    }
}
