use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// 图片类型，限定为 sfw / nsfw 两种
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    Sfw,
    Nsfw,
}

impl ImageType {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageType::Sfw => "sfw",
            ImageType::Nsfw => "nsfw",
        }
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageType {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sfw" => Ok(ImageType::Sfw),
            "nsfw" => Ok(ImageType::Nsfw),
            other => Err(ApiError::Validation(format!(
                "类型必须是 \"sfw\" 或 \"nsfw\"，而不是 \"{other}\""
            ))),
        }
    }
}

/// 随机取图的范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandomScope {
    Sfw,
    Nsfw,
    Any,
}

impl RandomScope {
    pub fn as_str(self) -> &'static str {
        match self {
            RandomScope::Sfw => "sfw",
            RandomScope::Nsfw => "nsfw",
            RandomScope::Any => "any",
        }
    }
}

impl fmt::Display for RandomScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RandomScope {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sfw" => Ok(RandomScope::Sfw),
            "nsfw" => Ok(RandomScope::Nsfw),
            "any" => Ok(RandomScope::Any),
            other => Err(ApiError::Validation(format!(
                "类型必须是 \"sfw\"、\"nsfw\" 或 \"any\"，而不是 \"{other}\""
            ))),
        }
    }
}

/// 服务端已知的分类集合，按类型分为两组
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CategorySet {
    #[serde(default)]
    pub sfw: Vec<String>,
    #[serde(default)]
    pub nsfw: Vec<String>,
}

impl CategorySet {
    pub fn by_type(&self, image_type: ImageType) -> &[String] {
        match image_type {
            ImageType::Sfw => &self.sfw,
            ImageType::Nsfw => &self.nsfw,
        }
    }

    // 同组内去重，保持首次出现的顺序
    pub(crate) fn normalized(mut self) -> Self {
        dedup_in_place(&mut self.sfw);
        dedup_in_place(&mut self.nsfw);
        self
    }
}

fn dedup_in_place(names: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    names.retain(|name| seen.insert(name.clone()));
}

/// 一次成功取图的结果
#[derive(Debug, Clone, Serialize)]
pub struct ImageResult {
    pub url: String,
    pub mime_type: String,
    pub size: u64,
    pub category: String,
    pub filename: String,
    /// 服务端附带的元数据，按原样透传
    pub meta: Value,
}

/// 请求计数器
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RequestStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
}

impl RequestStats {
    /// 成功率百分比字符串，总数为0时返回 "0%"
    pub fn success_rate(&self) -> String {
        if self.total_requests == 0 {
            return "0%".to_string();
        }
        let rate = self.successful_requests as f64 / self.total_requests as f64 * 100.0;
        format!("{rate:.1}%")
    }
}

/// 健康/状态检查的结果，失败时不抛错而是携带错误信息
#[derive(Debug, Clone, Serialize)]
pub struct ServiceReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceReport {
    pub(crate) fn ok(data: Value) -> Self {
        let status = data
            .get("status")
            .and_then(|v| v.as_str())
            .map(String::from);
        ServiceReport {
            success: true,
            status,
            data: Some(data),
            error: None,
        }
    }

    pub(crate) fn failure(error: impl Into<String>) -> Self {
        ServiceReport {
            success: false,
            status: None,
            data: None,
            error: Some(error.into()),
        }
    }
}

// GET /categories 的响应体
#[derive(Debug, Deserialize)]
pub(crate) struct CategoriesResponse {
    #[serde(default)]
    pub success: bool,
    pub data: Option<CategorySet>,
}

// GET /{type}/{category} 的响应体
#[derive(Debug, Deserialize)]
pub(crate) struct ImageEnvelope {
    #[serde(default)]
    pub success: bool,
    pub data: Option<ImagePayload>,
    #[serde(default)]
    pub meta: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImagePayload {
    #[serde(default)]
    pub url: String,
    #[serde(default, rename = "mimeType")]
    pub mime_type: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub filename: String,
}

// 服务端错误响应中的说明文字
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: Option<String>,
}
