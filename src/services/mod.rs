pub mod auth;
pub mod memory;
pub mod optimistic;
pub mod relation;
pub mod rest;
pub mod store;

// 重新导出常用类型
pub use auth::AuthService;
pub use memory::InMemoryRelationStore;
pub use optimistic::{OptimisticRelation, PendingToggle, ToggleOutcome};
pub use relation::RelationService;
pub use rest::RestRelationStore;
pub use store::RelationStore;
