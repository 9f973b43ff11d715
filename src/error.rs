use thiserror::Error;

// API客户端的错误分类
#[derive(Debug, Error)]
pub enum ApiError {
    /// 客户端构造或配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 调用方输入校验失败
    #[error("参数校验失败: {0}")]
    Validation(String),

    /// HTTP 400
    #[error("无效请求: {0}")]
    InvalidRequest(String),

    /// HTTP 401
    #[error("API密钥无效，请检查凭证")]
    InvalidCredentials,

    /// HTTP 403
    #[error("访问被拒绝，请检查API密钥权限")]
    AccessDenied,

    /// HTTP 404
    #[error("分类 \"{0}\" 下没有找到图片")]
    CategoryNotFound(String),

    /// HTTP 429
    #[error("请求频率超限，请降低请求速度{}", .retry_after_secs.map(|s| format!("，{s}秒后可重试")).unwrap_or_default())]
    RateLimited { retry_after_secs: Option<u64> },

    /// HTTP 500
    #[error("服务器内部错误")]
    ServerError,

    /// 其他HTTP状态码
    #[error("API错误 ({status}): {message}")]
    Unknown { status: u16, message: String },

    /// 网络层失败（连接、超时等）
    #[error("网络请求失败: {0}")]
    Transport(#[from] reqwest::Error),
}
