use std::sync::Arc;

use crate::{
    config::Config,
    error::Result,
    services::{
        auth::AuthService, memory::InMemoryRelationStore, relation::RelationService,
        rest::RestRelationStore, store::RelationStore,
    },
};

/// 应用程序的共享状态
#[derive(Clone)]
pub struct AppState {
    /// 应用配置
    pub config: Config,

    /// 认证服务
    pub auth_service: AuthService,

    /// 关系服务
    pub relation_service: RelationService,
}

impl AppState {
    /// 按配置选择存储；离线模式下使用内存存储
    pub fn new(config: Config, access_token: Option<&str>) -> Result<Self> {
        let store: Arc<dyn RelationStore> = if config.is_offline() {
            Arc::new(InMemoryRelationStore::new())
        } else {
            let rest = RestRelationStore::new(&config)?;
            match access_token {
                Some(token) => Arc::new(rest.with_access_token(token)),
                None => Arc::new(rest),
            }
        };

        Ok(Self {
            auth_service: AuthService::new(&config)?,
            relation_service: RelationService::new(store),
            config,
        })
    }
}
