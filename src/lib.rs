//! Eziogram 客户端的点赞/关注关系核心

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{AppError, Result};
