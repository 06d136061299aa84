use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::relation::{null_as_zero, RelationKind, Toggleable};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reel {
    pub id: String,
    pub user_id: String,
    pub video_url: String,
    pub caption: Option<String>,
    pub music: Option<String>,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub likes_count: u64,
    pub created_at: Option<DateTime<Utc>>,
}

impl Toggleable for Reel {
    fn relation_kind(&self) -> RelationKind {
        RelationKind::LikeReel
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
