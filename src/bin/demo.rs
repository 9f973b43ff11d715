use anyhow::Result;
use chrono::Local;
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{fmt, EnvFilter};

use waifuhaven_api::api::RandomScope;
use waifuhaven_api::{ClientConfig, ImageApiClient};

struct LocalOnlyTime;

impl FormatTime for LocalOnlyTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = Local::now().format("%Y-%m-%d %H:%M:%S");
        write!(w, "{}", now)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 先加载 .env 中的环境变量，确保日志级别设置生效
    dotenv().ok();
    // 默认 INFO，本crate启用 DEBUG，可通过 RUST_LOG 环境变量覆盖
    let default_filter = "info,waifuhaven_api=debug";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt::fmt()
        .with_env_filter(env_filter)
        .with_timer(LocalOnlyTime) // 只输出日期和时分秒
        .compact() // 使用精简格式，去除多余字段
        .init();

    // 初始化配置，WAIFU_API_KEY 必须已设置
    let config = ClientConfig::from_env()?;
    let client = ImageApiClient::new(config)?;
    info!("客户端已创建");

    // 服务健康与运行状态
    let health = client.get_health().await;
    println!("健康检查: success={} status={:?}", health.success, health.status);

    let status = client.get_status().await;
    println!("服务状态: success={}", status.success);

    // 分类列表（失败时自动降级为静态默认分类）
    let categories = client.get_categories().await;
    println!("SFW分类: {}", categories.sfw.join(", "));

    // 取一张指定分类的图片
    match client.get_sfw("waifu").await {
        Ok(image) => println!("图片: {} ({}, {}字节)", image.url, image.mime_type, image.size),
        Err(e) => println!("取图失败: {}", e),
    }

    // 随机取一张
    match client.get_random_image(RandomScope::Any).await {
        Ok(image) => println!("随机图片: {} [{}]", image.url, image.category),
        Err(e) => println!("随机取图失败: {}", e),
    }

    // 计数器
    let stats = client.get_stats();
    println!(
        "请求统计: 总计{} 成功{} 失败{} 成功率{}",
        stats.total_requests,
        stats.successful_requests,
        stats.failed_requests,
        stats.success_rate()
    );

    Ok(())
}
