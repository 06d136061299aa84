use std::sync::Arc;
use tracing::debug;

use crate::models::{Post, Profile, Reel, RelationKind, Story, Subject, Toggleable};
use crate::services::optimistic::OptimisticRelation;
use crate::services::store::RelationStore;

/// 为帖子、短视频、快拍和用户资料挂载乐观切换控制器
#[derive(Clone)]
pub struct RelationService {
    store: Arc<dyn RelationStore>,
}

impl RelationService {
    pub fn new(store: Arc<dyn RelationStore>) -> Self {
        Self { store }
    }

    pub async fn mount<T: Toggleable + ?Sized>(
        &self,
        target: &T,
        subject: Option<&Subject>,
    ) -> OptimisticRelation {
        self.mount_guarded(
            target.relation_kind(),
            target.target_id(),
            target.owner_id(),
            target.display_count(),
            subject,
        )
        .await
    }

    /// 只知道目标 ID 和计数时挂载；关注关系的所有者就是目标用户
    pub async fn mount_target(
        &self,
        kind: RelationKind,
        target_id: &str,
        initial_count: u64,
        subject: Option<&Subject>,
    ) -> OptimisticRelation {
        let owner_id = if kind.is_like() { "" } else { target_id };
        self.mount_guarded(kind, target_id, owner_id, initial_count, subject)
            .await
    }

    async fn mount_guarded(
        &self,
        kind: RelationKind,
        target_id: &str,
        owner_id: &str,
        initial_count: u64,
        subject: Option<&Subject>,
    ) -> OptimisticRelation {
        // 防止自己关注自己
        let subject = subject
            .filter(|s| kind.is_like() || s.id.as_str() != owner_id)
            .cloned();
        if subject.is_none() {
            debug!("Mounting read-only {} relation on {}", kind, target_id);
        }

        OptimisticRelation::initialize(
            Arc::clone(&self.store),
            subject,
            kind,
            target_id,
            initial_count,
        )
        .await
    }

    pub async fn mount_post(&self, post: &Post, subject: Option<&Subject>) -> OptimisticRelation {
        self.mount(post, subject).await
    }

    pub async fn mount_reel(&self, reel: &Reel, subject: Option<&Subject>) -> OptimisticRelation {
        self.mount(reel, subject).await
    }

    pub async fn mount_story(
        &self,
        story: &Story,
        subject: Option<&Subject>,
    ) -> OptimisticRelation {
        self.mount(story, subject).await
    }

    pub async fn mount_follow(
        &self,
        profile: &Profile,
        subject: Option<&Subject>,
    ) -> OptimisticRelation {
        self.mount(profile, subject).await
    }
}
