use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::relation::{RelationKey, RelationKind, RelationRow};
use crate::services::store::RelationStore;

/// 托管后端表接口上的关系存储
#[derive(Clone)]
pub struct RestRelationStore {
    http_client: Client,
    base_url: String,
    anon_key: String,
    access_token: Option<String>,
    likes_table: String,
    follows_table: String,
}

impl RestRelationStore {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
            anon_key: config.backend_anon_key.clone(),
            access_token: None,
            likes_table: config.likes_table.clone(),
            follows_table: config.follows_table.clone(),
        })
    }

    /// 以用户会话访问，行级权限按该用户判断
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    fn table(&self, kind: RelationKind) -> &str {
        if kind.is_like() {
            &self.likes_table
        } else {
            &self.follows_table
        }
    }

    fn table_url(&self, kind: RelationKind) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table(kind))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        self.http_client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    fn key_filters(key: &RelationKey) -> [(&'static str, String); 2] {
        [
            (key.kind.subject_column(), format!("eq.{}", key.subject_id)),
            (key.kind.target_column(), format!("eq.{}", key.target_id)),
        ]
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AppError::store(status.as_u16(), body))
    }

    fn parse_row(key: &RelationKey, row: &Value) -> RelationRow {
        let id = match row.get("id") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let created_at = row
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        RelationRow {
            id,
            subject_id: key.subject_id.clone(),
            target_id: key.target_id.clone(),
            kind: key.kind,
            created_at,
        }
    }
}

#[async_trait]
impl RelationStore for RestRelationStore {
    async fn find_relation(&self, key: &RelationKey) -> Result<Option<RelationRow>> {
        debug!("Looking up relation {}", key);

        let response = self
            .request(Method::GET, &self.table_url(key.kind))
            .query(&[("select", "*".to_string()), ("limit", "1".to_string())])
            .query(&Self::key_filters(key))
            .send()
            .await?;
        let rows: Vec<Value> = Self::check(response).await?.json().await?;

        Ok(rows.first().map(|row| Self::parse_row(key, row)))
    }

    async fn insert_relation(&self, key: &RelationKey) -> Result<()> {
        debug!("Inserting relation {}", key);

        let mut body = Map::new();
        body.insert(
            key.kind.subject_column().to_string(),
            Value::String(key.subject_id.to_string()),
        );
        body.insert(
            key.kind.target_column().to_string(),
            Value::String(key.target_id.clone()),
        );

        let response = self
            .request(Method::POST, &self.table_url(key.kind))
            .header("Prefer", "return=minimal")
            .json(&Value::Object(body))
            .send()
            .await?;

        // 唯一约束冲突说明行已存在
        if response.status() == StatusCode::CONFLICT {
            warn!("Relation {} already exists", key);
            return Ok(());
        }
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_relation(&self, key: &RelationKey) -> Result<()> {
        debug!("Deleting relation {}", key);

        let response = self
            .request(Method::DELETE, &self.table_url(key.kind))
            .query(&Self::key_filters(key))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
