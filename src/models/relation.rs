use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;
use crate::models::subject::SubjectId;

/// 主体与目标之间可切换的关系类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationKind {
    LikePost,
    LikeReel,
    LikeStory,
    Follow,
}

impl RelationKind {
    pub const ALL: [RelationKind; 4] = [
        RelationKind::LikePost,
        RelationKind::LikeReel,
        RelationKind::LikeStory,
        RelationKind::Follow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::LikePost => "like-post",
            RelationKind::LikeReel => "like-reel",
            RelationKind::LikeStory => "like-story",
            RelationKind::Follow => "follow",
        }
    }

    pub fn is_like(&self) -> bool {
        !matches!(self, RelationKind::Follow)
    }

    pub fn default_table(&self) -> &'static str {
        if self.is_like() {
            "likes"
        } else {
            "follows"
        }
    }

    pub fn subject_column(&self) -> &'static str {
        if self.is_like() {
            "user_id"
        } else {
            "follower_id"
        }
    }

    pub fn target_column(&self) -> &'static str {
        match self {
            RelationKind::LikePost => "post_id",
            RelationKind::LikeReel => "reel_id",
            RelationKind::LikeStory => "story_id",
            RelationKind::Follow => "following_id",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RelationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("Unknown relation kind: {}", s)))
    }
}

/// 一条完整的关系边：谁、对什么、哪种关系
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationKey {
    pub subject_id: SubjectId,
    pub target_id: String,
    pub kind: RelationKind,
}

impl RelationKey {
    pub fn new(subject_id: SubjectId, target_id: impl Into<String>, kind: RelationKind) -> Self {
        Self {
            subject_id,
            target_id: target_id.into(),
            kind,
        }
    }
}

impl fmt::Display for RelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}->{}", self.kind, self.subject_id, self.target_id)
    }
}

/// 后端持久化的关系行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationRow {
    pub id: Option<String>,
    pub subject_id: SubjectId,
    pub target_id: String,
    pub kind: RelationKind,
    pub created_at: Option<DateTime<Utc>>,
}

impl RelationRow {
    pub fn key(&self) -> RelationKey {
        RelationKey::new(self.subject_id.clone(), self.target_id.clone(), self.kind)
    }
}

/// UI 观察到的状态：布尔值与计数器总是一起变化
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RelationSnapshot {
    pub active: bool,
    pub count: u64,
}

impl RelationSnapshot {
    pub fn new(active: bool, count: u64) -> Self {
        Self { active, count }
    }

    /// 切换后的状态，计数器最小为 0
    pub fn toggled(self) -> Self {
        if self.active {
            Self::new(false, self.count.saturating_sub(1))
        } else {
            Self::new(true, self.count.saturating_add(1))
        }
    }
}

/// 可被点赞或关注的记录
pub trait Toggleable {
    fn relation_kind(&self) -> RelationKind;
    fn target_id(&self) -> &str;
    fn display_count(&self) -> u64;
    /// 记录所属用户；关注关系中即被关注者本人
    fn owner_id(&self) -> &str;
}

/// 后端计数器可能为 null
pub(crate) fn null_as_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<i64> = Option::deserialize(deserializer)?;
    Ok(value.map(|v| v.max(0) as u64).unwrap_or(0))
}
