use crate::{
    config::Config,
    error::{AppError, Result},
    models::subject::{Subject, SubjectId},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const AUTHENTICATED_AUDIENCE: &str = "authenticated";

#[derive(Clone)]
pub struct AuthService {
    config: Config,
    http_client: Client,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,        // 用户ID
    pub exp: i64,           // 过期时间
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthUserResponse {
    id: String,
    email: Option<String>,
}

impl AuthService {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config: config.clone(),
            http_client,
        })
    }

    pub fn verify_jwt(&self, token: &str) -> Result<Claims> {
        let secret = self
            .config
            .jwt_secret
            .as_deref()
            .ok_or_else(|| AppError::Config("JWT_SECRET is not configured".to_string()))?;
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[AUTHENTICATED_AUDIENCE]);

        // 受众由 validation 校验，不需要出现在 Claims 里
        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            warn!("JWT verification failed: {}", e);
            e
        })?;
        debug!("JWT token verified for user: {}", token_data.claims.sub);
        Ok(token_data.claims)
    }

    /// 向后端认证接口查询令牌对应的用户
    pub async fn fetch_user(&self, token: &str) -> Result<Subject> {
        let url = format!("{}/auth/v1/user", self.config.backend_url);
        let response = self
            .http_client
            .get(&url)
            .header("apikey", &self.config.backend_anon_key)
            .bearer_auth(token)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let user: AuthUserResponse = response.json().await?;
                Ok(Subject {
                    id: SubjectId::new(user.id),
                    email: user.email,
                })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(AppError::unauthorized("Session is not valid"))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(AppError::store(status.as_u16(), body))
            }
        }
    }

    pub async fn authenticate(&self, token: &str) -> Result<Subject> {
        if self.config.jwt_secret.is_some() {
            let claims = self.verify_jwt(token)?;
            return Ok(Subject {
                id: SubjectId::new(claims.sub),
                email: claims.email,
            });
        }
        self.fetch_user(token).await
    }

    /// 每个渲染周期取一次；令牌缺失或无效都视为未登录
    pub async fn current_subject(&self, token: Option<&str>) -> Option<Subject> {
        let token = token.filter(|t| !t.is_empty())?;
        match self.authenticate(token).await {
            Ok(subject) => Some(subject),
            Err(e) => {
                warn!(code = e.error_code(), "Treating session as unauthenticated: {}", e);
                None
            }
        }
    }
}
