use serde::{Deserialize, Serialize};

use crate::models::relation::{null_as_zero, RelationKind, Toggleable};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub username: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub website: Option<String>,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub followers_count: u64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub following_count: u64,
}

impl Toggleable for Profile {
    fn relation_kind(&self) -> RelationKind {
        RelationKind::Follow
    }

    fn target_id(&self) -> &str {
        &self.id
    }

    fn display_count(&self) -> u64 {
        self.followers_count
    }

    fn owner_id(&self) -> &str {
        &self.id
    }
}
