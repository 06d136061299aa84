use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // 运行环境
    pub environment: String,
    pub log_level: String,
    pub log_format: String,

    // 托管后端
    pub backend_url: String,
    pub backend_anon_key: String,
    pub jwt_secret: Option<String>,
    pub request_timeout_secs: u64,

    // 关系表
    pub likes_table: String,
    pub follows_table: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Ok(Config {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),

            backend_url: env::var("BACKEND_URL")
                .unwrap_or_else(|_| "http://localhost:54321".to_string())
                .trim_end_matches('/')
                .to_string(),
            backend_anon_key: env::var("BACKEND_ANON_KEY").unwrap_or_default(),
            jwt_secret: env::var("JWT_SECRET").ok().filter(|s| !s.is_empty()),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,

            likes_table: env::var("LIKES_TABLE").unwrap_or_else(|_| "likes".to_string()),
            follows_table: env::var("FOLLOWS_TABLE").unwrap_or_else(|_| "follows".to_string()),
        })
    }

    /// `LOG_FORMAT=json` 时输出结构化日志
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }

    /// 离线模式使用内存存储，不访问后端
    pub fn is_offline(&self) -> bool {
        self.environment == "offline"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            backend_url: "http://localhost:54321".to_string(),
            backend_anon_key: String::new(),
            jwt_secret: None,
            request_timeout_secs: 10,
            likes_table: "likes".to_string(),
            follows_table: "follows".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_selection() {
        let mut config = Config::default();
        assert!(!config.json_logs());

        config.log_format = "JSON".to_string();
        assert!(config.json_logs());
    }
}
