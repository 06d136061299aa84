//! 乐观切换控制器
//!
//! `toggle()` 先同步修改本地状态，再在后台向远程存储发请求。
//! 请求失败时回滚到切换前的状态；不重试，也不向调用方返回错误。
//! `toggle_pending()` 把确认阶段交给调用方：未确认就被丢弃的 [`PendingToggle`] 同样会回滚。
//!
//! 每次切换都会取得一个递增的请求令牌。只有最新令牌对应的失败才会回滚，
//! 过期请求的失败被忽略，避免迟到的响应覆盖更新的意图。

use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::models::relation::{RelationKey, RelationKind, RelationSnapshot};
use crate::models::subject::Subject;
use crate::services::store::RelationStore;

/// 确认阶段的结果，仅供观察和日志使用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleOutcome {
    /// 远程存储已接受
    Confirmed,
    /// 请求失败，本地状态已恢复到切换前
    RolledBack,
    /// 请求失败，但之后已有更新的切换，本地状态保持不变
    Superseded,
    /// 请求失败时控制器已被释放
    Detached,
}

#[derive(Debug)]
struct LocalState {
    snapshot: RelationSnapshot,
    latest_token: u64,
}

pub struct OptimisticRelation {
    store: Arc<dyn RelationStore>,
    subject: Option<Subject>,
    kind: RelationKind,
    target_id: String,
    state: Arc<Mutex<LocalState>>,
}

impl OptimisticRelation {
    /// 使用已知状态创建控制器，不做远程查询
    pub fn new(
        store: Arc<dyn RelationStore>,
        subject: Option<Subject>,
        kind: RelationKind,
        target_id: impl Into<String>,
        snapshot: RelationSnapshot,
    ) -> Self {
        Self {
            store,
            subject,
            kind,
            target_id: target_id.into(),
            state: Arc::new(Mutex::new(LocalState {
                snapshot,
                latest_token: 0,
            })),
        }
    }

    /// 挂载时预取一次关系状态
    ///
    /// 没有登录用户或查询失败时视为关系不存在，计数器保持 `initial_count`。
    pub async fn initialize(
        store: Arc<dyn RelationStore>,
        subject: Option<Subject>,
        kind: RelationKind,
        target_id: impl Into<String>,
        initial_count: u64,
    ) -> Self {
        let target_id = target_id.into();
        let mut active = false;

        if let Some(subject) = &subject {
            let key = RelationKey::new(subject.id.clone(), target_id.clone(), kind);
            match store.find_relation(&key).await {
                Ok(row) => active = row.is_some(),
                Err(e) => {
                    warn!(code = e.error_code(), "Relation lookup for {} failed: {}", key, e);
                }
            }
        }

        info!(
            "Mounted {} relation on {} (active: {}, count: {})",
            kind, target_id, active, initial_count
        );

        Self::new(
            store,
            subject,
            kind,
            target_id,
            RelationSnapshot::new(active, initial_count),
        )
    }

    pub fn snapshot(&self) -> RelationSnapshot {
        self.state.lock().snapshot
    }

    pub fn is_active(&self) -> bool {
        self.snapshot().active
    }

    pub fn count(&self) -> u64 {
        self.snapshot().count
    }

    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn subject(&self) -> Option<&Subject> {
        self.subject.as_ref()
    }

    pub fn can_toggle(&self) -> bool {
        self.subject.is_some()
    }

    /// 乐观切换，确认阶段在运行时后台执行
    ///
    /// 返回时本地状态已经更新，请求已经发出。未登录时什么都不做，返回 `None`。
    pub fn toggle(&self) -> Option<JoinHandle<ToggleOutcome>> {
        self.toggle_pending().map(PendingToggle::spawn)
    }

    /// 只应用乐观更新，由调用方驱动确认阶段
    pub fn toggle_pending(&self) -> Option<PendingToggle> {
        let Some(subject) = &self.subject else {
            debug!("Ignoring {} toggle on {}: no subject", self.kind, self.target_id);
            return None;
        };

        let (previous, current, token) = {
            let mut state = self.state.lock();
            let previous = state.snapshot;
            state.snapshot = previous.toggled();
            state.latest_token += 1;
            (previous, state.snapshot, state.latest_token)
        };

        let key = RelationKey::new(subject.id.clone(), self.target_id.clone(), self.kind);
        debug!(
            token,
            "Toggled {} optimistically: {:?} -> {:?}", key, previous, current
        );

        Some(PendingToggle {
            store: Arc::clone(&self.store),
            state: Arc::downgrade(&self.state),
            key,
            previous,
            intent: current.active,
            token,
            settled: false,
        })
    }
}

impl fmt::Debug for OptimisticRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptimisticRelation")
            .field("subject", &self.subject.as_ref().map(|s| s.id.as_str()))
            .field("kind", &self.kind)
            .field("target_id", &self.target_id)
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

/// 已乐观应用、尚未确认的一次切换
#[must_use = "the relation is only written to the store when the toggle is confirmed or spawned"]
pub struct PendingToggle {
    store: Arc<dyn RelationStore>,
    state: Weak<Mutex<LocalState>>,
    key: RelationKey,
    previous: RelationSnapshot,
    intent: bool,
    token: u64,
    settled: bool,
}

impl PendingToggle {
    pub fn key(&self) -> &RelationKey {
        &self.key
    }

    /// `true` 表示插入，`false` 表示删除
    pub fn intent(&self) -> bool {
        self.intent
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    pub async fn confirm(mut self) -> ToggleOutcome {
        self.settled = true;

        let result = if self.intent {
            self.store.insert_relation(&self.key).await
        } else {
            self.store.delete_relation(&self.key).await
        };

        let error = match result {
            Ok(()) => {
                debug!(token = self.token, "Relation {} confirmed", self.key);
                return ToggleOutcome::Confirmed;
            }
            Err(e) => e,
        };

        let Some(state) = self.state.upgrade() else {
            warn!(
                code = error.error_code(),
                "Relation {} failed after unmount: {}", self.key, error
            );
            return ToggleOutcome::Detached;
        };

        let mut state = state.lock();
        if state.latest_token != self.token {
            warn!(
                code = error.error_code(),
                token = self.token,
                latest = state.latest_token,
                "Ignoring stale failure for {}: {}",
                self.key,
                error
            );
            return ToggleOutcome::Superseded;
        }

        state.snapshot = self.previous;
        warn!(
            code = error.error_code(),
            token = self.token,
            "Relation {} failed, rolled back to {:?}: {}",
            self.key,
            self.previous,
            error
        );
        ToggleOutcome::RolledBack
    }

    pub fn spawn(self) -> JoinHandle<ToggleOutcome> {
        tokio::spawn(self.confirm())
    }
}

impl Drop for PendingToggle {
    // 未确认就被丢弃：请求不会再发出，按最新令牌规则撤销乐观更新
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let mut state = state.lock();
        if state.latest_token == self.token {
            state.snapshot = self.previous;
            warn!(token = self.token, "Unconfirmed toggle of {} dropped, rolled back", self.key);
        }
    }
}

impl fmt::Debug for PendingToggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingToggle")
            .field("key", &self.key)
            .field("intent", &self.intent)
            .field("token", &self.token)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::relation::RelationRow;
    use crate::services::memory::InMemoryRelationStore;
    use crate::services::store::MockRelationStore;

    fn subject() -> Option<Subject> {
        Some(Subject::new("u1"))
    }

    fn relation(
        store: impl RelationStore + 'static,
        active: bool,
        count: u64,
    ) -> OptimisticRelation {
        OptimisticRelation::new(
            Arc::new(store),
            subject(),
            RelationKind::LikePost,
            "p1",
            RelationSnapshot::new(active, count),
        )
    }

    async fn mounted(
        store: impl RelationStore + 'static,
        subject: Option<Subject>,
        kind: RelationKind,
        target_id: &str,
        count: u64,
    ) -> OptimisticRelation {
        OptimisticRelation::initialize(Arc::new(store), subject, kind, target_id, count).await
    }

    #[tokio::test]
    async fn test_initialize_finds_existing_row() {
        let store = InMemoryRelationStore::with_rows([RelationKey::new(
            "u1".into(),
            "p1",
            RelationKind::LikePost,
        )]);

        let relation = mounted(store, subject(), RelationKind::LikePost, "p1", 7).await;

        assert_eq!(relation.snapshot(), RelationSnapshot::new(true, 7));
    }

    #[tokio::test]
    async fn test_initialize_swallows_lookup_failure() {
        let mut store = MockRelationStore::new();
        store
            .expect_find_relation()
            .times(1)
            .returning(|_| Err(AppError::store(500, "down")));

        let relation = mounted(store, subject(), RelationKind::Follow, "u2", 3).await;

        assert_eq!(relation.snapshot(), RelationSnapshot::new(false, 3));
    }

    #[tokio::test]
    async fn test_initialize_without_subject_skips_lookup() {
        // 没有设置期望，任何调用都会失败
        let store = MockRelationStore::new();

        let relation = mounted(store, None, RelationKind::LikeReel, "r1", 4).await;

        assert_eq!(relation.snapshot(), RelationSnapshot::new(false, 4));
        assert!(!relation.can_toggle());
    }

    #[tokio::test]
    async fn test_toggle_confirmed() {
        let relation = relation(InMemoryRelationStore::new(), false, 10);

        let pending = relation.toggle_pending().unwrap();
        assert_eq!(relation.snapshot(), RelationSnapshot::new(true, 11));
        assert!(pending.intent());

        assert_eq!(pending.confirm().await, ToggleOutcome::Confirmed);
        assert_eq!(relation.snapshot(), RelationSnapshot::new(true, 11));
    }

    #[tokio::test]
    async fn test_toggle_failure_rolls_back() {
        let mut store = MockRelationStore::new();
        store
            .expect_delete_relation()
            .times(1)
            .returning(|_| Err(AppError::store(503, "unavailable")));
        let relation = relation(store, true, 5);

        let pending = relation.toggle_pending().unwrap();
        assert_eq!(relation.snapshot(), RelationSnapshot::new(false, 4));

        assert_eq!(pending.confirm().await, ToggleOutcome::RolledBack);
        assert_eq!(relation.snapshot(), RelationSnapshot::new(true, 5));
    }

    #[tokio::test]
    async fn test_rollback_at_zero_floor_restores_exactly() {
        let mut store = MockRelationStore::new();
        store
            .expect_delete_relation()
            .returning(|_| Err(AppError::store(500, "boom")));
        let relation = relation(store, true, 0);

        let pending = relation.toggle_pending().unwrap();
        assert_eq!(relation.snapshot(), RelationSnapshot::new(false, 0));

        pending.confirm().await;
        assert_eq!(relation.snapshot(), RelationSnapshot::new(true, 0));
    }

    #[tokio::test]
    async fn test_toggle_without_subject_is_noop() {
        let store = MockRelationStore::new();
        let relation = OptimisticRelation::new(
            Arc::new(store),
            None,
            RelationKind::LikeStory,
            "s1",
            RelationSnapshot::new(false, 2),
        );

        assert!(relation.toggle().is_none());
        assert!(relation.toggle_pending().is_none());
        assert_eq!(relation.snapshot(), RelationSnapshot::new(false, 2));
    }

    #[tokio::test]
    async fn test_stale_failure_is_superseded() {
        let mut store = MockRelationStore::new();
        store
            .expect_insert_relation()
            .returning(|_| Err(AppError::store(500, "late failure")));
        store.expect_delete_relation().returning(|_| Ok(()));
        let relation = relation(store, false, 0);

        let first = relation.toggle_pending().unwrap();
        let second = relation.toggle_pending().unwrap();
        assert_eq!(relation.snapshot(), RelationSnapshot::new(false, 0));
        assert!(second.token() > first.token());

        assert_eq!(second.confirm().await, ToggleOutcome::Confirmed);
        assert_eq!(first.confirm().await, ToggleOutcome::Superseded);
        assert_eq!(relation.snapshot(), RelationSnapshot::new(false, 0));
    }

    #[tokio::test]
    async fn test_failure_after_unmount_is_detached() {
        let mut store = MockRelationStore::new();
        store
            .expect_insert_relation()
            .returning(|_| Err(AppError::store(500, "boom")));
        let relation = relation(store, false, 1);

        let pending = relation.toggle_pending().unwrap();
        drop(relation);

        assert_eq!(pending.confirm().await, ToggleOutcome::Detached);
    }

    #[tokio::test]
    async fn test_toggle_spawns_confirmation() {
        let mut store = MockRelationStore::new();
        store
            .expect_insert_relation()
            .times(1)
            .returning(|_| Err(AppError::store(500, "boom")));
        let relation = relation(store, false, 9);

        let handle = relation.toggle().unwrap();
        assert_eq!(relation.snapshot(), RelationSnapshot::new(true, 10));

        assert_eq!(handle.await.unwrap(), ToggleOutcome::RolledBack);
        assert_eq!(relation.snapshot(), RelationSnapshot::new(false, 9));
    }

    #[tokio::test]
    async fn test_dropped_pending_toggle_rolls_back() {
        // 没有设置期望：丢弃的切换不会访问存储
        let relation = relation(MockRelationStore::new(), false, 10);

        let _ = relation.toggle_pending();
        assert_eq!(relation.snapshot(), RelationSnapshot::new(false, 10));
    }

    #[tokio::test]
    async fn test_dropped_stale_pending_toggle_keeps_newer_state() {
        let relation = relation(MockRelationStore::new(), false, 10);

        let first = relation.toggle_pending().unwrap();
        let second = relation.toggle_pending().unwrap();
        let third = relation.toggle_pending().unwrap();
        drop(first);
        drop(second);
        assert_eq!(relation.snapshot(), RelationSnapshot::new(true, 11));

        drop(third);
        assert_eq!(relation.snapshot(), RelationSnapshot::new(false, 10));
    }

    #[tokio::test]
    async fn test_lookup_row_shape_is_ignored() {
        let mut store = MockRelationStore::new();
        store.expect_find_relation().returning(|key| {
            Ok(Some(RelationRow {
                id: None,
                subject_id: key.subject_id.clone(),
                target_id: key.target_id.clone(),
                kind: key.kind,
                created_at: None,
            }))
        });

        let relation = mounted(store, subject(), RelationKind::Follow, "u9", 0).await;
        assert!(relation.is_active());
        assert_eq!(relation.count(), 0);
    }
}
