pub mod config;
pub mod error;
pub mod api;

// 重新导出常用的类型
pub use api::{CategorySet, ImageApiClient, ImageResult, ImageType, RandomScope, RequestStats, ServiceReport};
pub use config::ClientConfig;
pub use error::ApiError;
