use async_trait::async_trait;

use crate::error::Result;
use crate::models::relation::{RelationKey, RelationRow};

/// 远程关系存储：点查、插入、删除
///
/// 插入和删除是无条件的，没有版本检查。实现应当让重复插入和删除不存在的行都返回成功。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RelationStore: Send + Sync {
    async fn find_relation(&self, key: &RelationKey) -> Result<Option<RelationRow>>;

    async fn insert_relation(&self, key: &RelationKey) -> Result<()>;

    async fn delete_relation(&self, key: &RelationKey) -> Result<()>;
}
