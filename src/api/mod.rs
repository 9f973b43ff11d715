mod models;

use std::sync::Mutex;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::error::ApiError;

pub use self::models::*;

// 分类接口不可用时的静态兜底列表，不代表服务端实时数据
const DEFAULT_SFW: &[&str] = &[
    "kurumi",
    "rushia",
    "waifu",
    "maid",
    "marin-kitagawa",
    "mori-calliope",
    "raiden-shogun",
    "oppai",
    "uniform",
    "kamisato-ayaka",
];
const DEFAULT_NSFW: &[&str] = &["ass", "hentai", "redo-of-healer", "blowjob", "waifu", "milf"];

// 带时间戳的分类缓存，过期或显式失效前不变
#[derive(Debug)]
struct CategoryCache {
    categories: CategorySet,
    fetched_at: Instant,
}

/// Waifu Haven API客户端
///
/// 每个实例独立持有自己的分类缓存和请求计数器，没有进程级共享状态。
/// 所有方法一次只发起一个网络请求，失败时不自动重试。
#[derive(Debug)]
pub struct ImageApiClient {
    client: Client,
    config: ClientConfig,
    // 鉴权接口的请求头，构造时组装一次
    auth_headers: header::HeaderMap,
    cache: Mutex<Option<CategoryCache>>,
    stats: Mutex<RequestStats>,
    rng: Mutex<StdRng>,
}

impl ImageApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        if config.api_key.trim().is_empty() {
            return Err(ApiError::Config("API密钥不能为空".to_string()));
        }

        let auth_headers = build_auth_headers(&config)?;

        // 创建HTTP客户端
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .map_err(ApiError::Transport)?;

        Ok(Self {
            client,
            config,
            auth_headers,
            cache: Mutex::new(None),
            stats: Mutex::new(RequestStats::default()),
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    /// 使用固定随机数种子，供测试固定随机选择结果
    pub fn with_rng_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    /// 获取可用分类列表
    ///
    /// 缓存未过期时直接返回缓存；否则请求 GET /categories 并以新的
    /// 有效期缓存结果。任何失败（网络错误、非200、success:false）都
    /// 降级为静态默认分类而不向调用方抛错；降级结果不会写入缓存，
    /// 下一次调用会重新尝试服务端。
    pub async fn get_categories(&self) -> CategorySet {
        {
            let cache = self.cache.lock().expect("分类缓存锁中毒");
            if let Some(entry) = cache.as_ref() {
                if entry.fetched_at.elapsed() < self.config.category_cache_ttl {
                    debug!("使用缓存的分类列表");
                    return entry.categories.clone();
                }
            }
        }

        match self.fetch_categories().await {
            Ok(categories) => {
                let mut cache = self.cache.lock().expect("分类缓存锁中毒");
                *cache = Some(CategoryCache {
                    categories: categories.clone(),
                    fetched_at: Instant::now(),
                });
                categories
            }
            Err(e) => {
                warn!("获取分类列表失败，使用静态默认分类: {}", e);
                default_categories()
            }
        }
    }

    /// 使分类缓存立即失效，下次调用将重新请求服务端
    pub fn invalidate_categories(&self) {
        let mut cache = self.cache.lock().expect("分类缓存锁中毒");
        *cache = None;
    }

    /// 获取指定分类的图片
    ///
    /// 分类必须存在于当前有效分类集合中对应类型的一组里，否则返回
    /// 校验错误并列出可用分类。计数器在成功和失败路径上都会更新。
    pub async fn get_image(
        &self,
        category: &str,
        image_type: ImageType,
    ) -> Result<ImageResult, ApiError> {
        {
            let mut stats = self.stats.lock().expect("计数器锁中毒");
            stats.total_requests += 1;
        }

        let result = self.fetch_image(category, image_type).await;

        {
            let mut stats = self.stats.lock().expect("计数器锁中毒");
            match &result {
                Ok(_) => stats.successful_requests += 1,
                Err(_) => stats.failed_requests += 1,
            }
        }

        if let Err(e) = &result {
            error!("获取图片失败: {}", e);
        }
        result
    }

    /// 获取SFW图片（便捷方法）
    pub async fn get_sfw(&self, category: &str) -> Result<ImageResult, ApiError> {
        self.get_image(category, ImageType::Sfw).await
    }

    /// 获取NSFW图片（便捷方法）
    pub async fn get_nsfw(&self, category: &str) -> Result<ImageResult, ApiError> {
        self.get_image(category, ImageType::Nsfw).await
    }

    /// 从指定范围随机取一张图片
    ///
    /// 范围为 any 时先抛一枚均匀硬币决定 sfw/nsfw，再从选中的一组里
    /// 均匀取样，因此两种类型的长期占比约为50/50；取样后按分类的实际
    /// 归属确定请求类型（同名分类可能同时出现在两组里，sfw优先）。
    pub async fn get_random_image(&self, scope: RandomScope) -> Result<ImageResult, ApiError> {
        let categories = self.get_categories().await;

        let pool_type = match scope {
            RandomScope::Sfw => ImageType::Sfw,
            RandomScope::Nsfw => ImageType::Nsfw,
            RandomScope::Any => {
                let mut rng = self.rng.lock().expect("随机数锁中毒");
                if rng.gen_bool(0.5) {
                    ImageType::Sfw
                } else {
                    ImageType::Nsfw
                }
            }
        };

        let pool = categories.by_type(pool_type);
        if pool.is_empty() {
            return Err(ApiError::Validation(format!(
                "类型 {scope} 下没有可用分类"
            )));
        }

        let category = {
            let mut rng = self.rng.lock().expect("随机数锁中毒");
            pool[rng.gen_range(0..pool.len())].clone()
        };

        let actual_type = match scope {
            RandomScope::Any => {
                if categories.sfw.iter().any(|c| c == &category) {
                    ImageType::Sfw
                } else {
                    ImageType::Nsfw
                }
            }
            _ => pool_type,
        };

        debug!("随机选中分类: {} ({})", category, actual_type);
        self.get_image(&category, actual_type).await
    }

    /// 检查服务健康状态，失败时返回 success:false 而不是抛错
    pub async fn get_health(&self) -> ServiceReport {
        self.service_report("/health", false).await
    }

    /// 查询服务运行状态，失败时返回 success:false 而不是抛错
    pub async fn get_status(&self) -> ServiceReport {
        self.service_report("/status", true).await
    }

    /// 读取当前请求计数器快照
    pub fn get_stats(&self) -> RequestStats {
        *self.stats.lock().expect("计数器锁中毒")
    }

    /// 将所有计数器清零
    pub fn reset_stats(&self) {
        let mut stats = self.stats.lock().expect("计数器锁中毒");
        *stats = RequestStats::default();
    }

    async fn fetch_categories(&self) -> Result<CategorySet, ApiError> {
        let url = format!("{}/categories", self.config.base_url);
        debug!("请求分类列表: {}", url);

        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers.clone())
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(map_error_response(status, response, None).await);
        }

        let body: CategoriesResponse = response.json().await?;
        match body.data {
            Some(data) if body.success => {
                let categories = data.normalized();
                info!(
                    "已刷新分类列表: {}个sfw, {}个nsfw",
                    categories.sfw.len(),
                    categories.nsfw.len()
                );
                Ok(categories)
            }
            _ => Err(ApiError::Unknown {
                status: status.as_u16(),
                message: "获取分类列表失败".to_string(),
            }),
        }
    }

    async fn fetch_image(
        &self,
        category: &str,
        image_type: ImageType,
    ) -> Result<ImageResult, ApiError> {
        if category.trim().is_empty() {
            return Err(ApiError::Validation("分类名称不能为空".to_string()));
        }

        // 先用当前有效的分类集合校验
        let categories = self.get_categories().await;
        let valid = categories.by_type(image_type);
        if !valid.iter().any(|c| c == category) {
            return Err(ApiError::Validation(format!(
                "无效的{}分类 \"{}\"，可用分类: {}",
                image_type.as_str().to_uppercase(),
                category,
                valid.join(", ")
            )));
        }

        let url = format!("{}/{}/{}", self.config.base_url, image_type, category);
        debug!("请求图片: {}", url);

        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers.clone())
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(map_error_response(status, response, Some(category)).await);
        }

        let envelope: ImageEnvelope = response.json().await?;
        match envelope.data {
            Some(data) if envelope.success => {
                info!("已获取图片: {} ({})", data.filename, data.mime_type);
                Ok(ImageResult {
                    url: data.url,
                    mime_type: data.mime_type,
                    size: data.size,
                    category: data.category,
                    filename: data.filename,
                    meta: envelope.meta,
                })
            }
            _ => Err(ApiError::Unknown {
                status: status.as_u16(),
                message: "获取图片失败".to_string(),
            }),
        }
    }

    // health/status共用的请求逻辑，任何失败都折叠成结果对象
    async fn service_report(&self, path: &str, authed: bool) -> ServiceReport {
        let url = format!("{}{}", self.config.base_url, path);
        debug!("服务检查: {}", url);

        let mut request = self.client.get(&url);
        if authed {
            request = request.headers(self.auth_headers.clone());
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                if !status.is_success() {
                    warn!("服务检查返回非成功状态: {}", status);
                    return ServiceReport::failure(format!("HTTP {status}"));
                }
                match response.json::<Value>().await {
                    Ok(data) => ServiceReport::ok(data),
                    Err(e) => ServiceReport::failure(e.to_string()),
                }
            }
            Err(e) => {
                warn!("服务检查失败: {}", e);
                ServiceReport::failure(e.to_string())
            }
        }
    }
}

// 组装鉴权接口的请求头
fn build_auth_headers(config: &ClientConfig) -> Result<header::HeaderMap, ApiError> {
    let mut headers = header::HeaderMap::new();

    let bearer = format!("Bearer {}", config.api_key);
    headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&bearer)
            .map_err(|_| ApiError::Config("API密钥包含非法字符".to_string()))?,
    );
    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::HeaderName::from_static("x-bot-platform"),
        header::HeaderValue::from_str(&config.platform)
            .map_err(|_| ApiError::Config("平台名称包含非法字符".to_string()))?,
    );

    let optional = [
        ("x-bot-guild", config.guild_id.as_deref()),
        ("x-bot-user", config.user_id.as_deref()),
        ("x-bot-version", config.bot_version.as_deref()),
    ];
    for (name, value) in optional {
        if let Some(value) = value {
            headers.insert(
                header::HeaderName::from_static(name),
                header::HeaderValue::from_str(value)
                    .map_err(|_| ApiError::Config(format!("{name}请求头包含非法字符")))?,
            );
        }
    }

    Ok(headers)
}

// 按状态码表把错误响应映射成对应的错误类型
async fn map_error_response(
    status: StatusCode,
    response: reqwest::Response,
    category: Option<&str>,
) -> ApiError {
    let retry_after_secs = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());

    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.message);

    match status {
        StatusCode::BAD_REQUEST => {
            ApiError::InvalidRequest(message.unwrap_or_else(|| "请求格式错误".to_string()))
        }
        StatusCode::UNAUTHORIZED => ApiError::InvalidCredentials,
        StatusCode::FORBIDDEN => ApiError::AccessDenied,
        StatusCode::NOT_FOUND => {
            ApiError::CategoryNotFound(category.unwrap_or("unknown").to_string())
        }
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited { retry_after_secs },
        StatusCode::INTERNAL_SERVER_ERROR => ApiError::ServerError,
        _ => ApiError::Unknown {
            status: status.as_u16(),
            message: message.unwrap_or_else(|| "未知错误".to_string()),
        },
    }
}

// 静态默认分类，仅在分类接口不可用时使用
fn default_categories() -> CategorySet {
    CategorySet {
        sfw: DEFAULT_SFW.iter().map(|s| s.to_string()).collect(),
        nsfw: DEFAULT_NSFW.iter().map(|s| s.to_string()).collect(),
    }
}
