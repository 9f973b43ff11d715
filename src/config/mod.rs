use std::env;
use std::time::Duration;

use crate::error::ApiError;

/// 默认API地址
pub const DEFAULT_BASE_URL: &str = "http://waifu-haven.ddns.net:50006";
/// 默认请求超时
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// 默认User-Agent
pub const DEFAULT_USER_AGENT: &str = "WaifuHavenClient/2.1.0 (rust)";
/// 分类缓存有效期（5分钟）
pub const DEFAULT_CATEGORY_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

// Discord机器人预设的User-Agent
const DISCORD_BOT_USER_AGENT: &str = "DiscordBot (Auto-Config, 2.1.0)";

/// 客户端配置
///
/// 除API密钥外所有字段都有文档化的默认值，可通过 `with_*` 方法覆盖。
/// 网络参数（地址、超时、User-Agent）采用调用方可覆盖的策略。
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // API密钥，必填且非空
    pub api_key: String,

    // 网络配置
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,

    // 分类缓存有效期，测试可缩短以触发过期
    pub category_cache_ttl: Duration,

    // 机器人平台元数据，映射到 X-Bot-* 请求头
    pub platform: String,
    pub guild_id: Option<String>,
    pub user_id: Option<String>,
    pub bot_version: Option<String>,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ApiError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ApiError::Config("API密钥不能为空".to_string()));
        }

        Ok(ClientConfig {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            category_cache_ttl: DEFAULT_CATEGORY_CACHE_TTL,
            platform: "discord".to_string(),
            guild_id: None,
            user_id: None,
            bot_version: None,
        })
    }

    /// Discord机器人的预设配置
    pub fn for_discord_bot(api_key: impl Into<String>) -> Result<Self, ApiError> {
        Ok(Self::new(api_key)?.with_user_agent(DISCORD_BOT_USER_AGENT))
    }

    /// 从环境变量加载配置
    ///
    /// WAIFU_API_KEY 必填；WAIFU_BASE_URL、WAIFU_TIMEOUT_SECS、
    /// WAIFU_USER_AGENT 可选，缺省时使用默认值。
    pub fn from_env() -> Result<Self, ApiError> {
        let api_key = env::var("WAIFU_API_KEY")
            .map_err(|_| ApiError::Config("缺少WAIFU_API_KEY环境变量".to_string()))?;

        let mut config = Self::new(api_key)?;

        if let Ok(base_url) = env::var("WAIFU_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(secs) = env::var("WAIFU_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| ApiError::Config("WAIFU_TIMEOUT_SECS必须是数字".to_string()))?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Ok(user_agent) = env::var("WAIFU_USER_AGENT") {
            config.user_agent = user_agent;
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        // 统一去掉末尾斜杠，拼接路径时再补
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        self.base_url = base_url;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_category_cache_ttl(mut self, ttl: Duration) -> Self {
        self.category_cache_ttl = ttl;
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn with_guild_id(mut self, guild_id: impl Into<String>) -> Self {
        self.guild_id = Some(guild_id.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_bot_version(mut self, version: impl Into<String>) -> Self {
        self.bot_version = Some(version.into());
        self
    }
}

/// 校验API密钥格式：非空且至少10个字符
pub fn validate_api_key(api_key: &str) -> bool {
    api_key.chars().count() >= 10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_key_rejected() {
        assert!(matches!(ClientConfig::new(""), Err(ApiError::Config(_))));
        assert!(matches!(ClientConfig::new("   "), Err(ApiError::Config(_))));
    }

    #[test]
    fn defaults_applied() {
        let config = ClientConfig::new("waifu_live_abc123xyz").unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.category_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.platform, "discord");
    }

    #[test]
    fn discord_bot_preset_user_agent() {
        let config = ClientConfig::for_discord_bot("waifu_live_abc123xyz").unwrap();
        assert_eq!(config.user_agent, DISCORD_BOT_USER_AGENT);
    }

    #[test]
    fn base_url_trailing_slash_stripped() {
        let config = ClientConfig::new("waifu_live_abc123xyz")
            .unwrap()
            .with_base_url("http://localhost:8080/");
        assert_eq!(config.base_url, "http://localhost:8080");
    }

    #[test]
    fn api_key_format() {
        assert!(validate_api_key("waifu_live_abc"));
        assert!(!validate_api_key("short"));
        assert!(!validate_api_key(""));
    }
}
