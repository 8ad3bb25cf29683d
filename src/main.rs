use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use summary_gateway::{
    AppState,
    cache::RedisCacheStore,
    config::Config,
    database::PgIdentityStore,
    fetch::HttpPageFetcher,
    middleware::RequestGate,
    quota::QuotaTracker,
    router::create_router,
    service::SummaryService,
    summarizer::GeminiSummarizer,
};
#[cfg(debug_assertions)]
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    // 设置数据库连接池
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(config.storage_timeout())
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    // 设置 Redis 客户端
    let redis_client =
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client");

    // 外部 HTTP 调用共用一个客户端
    let http = reqwest::Client::new();

    // 额度与准入
    let identities = Arc::new(PgIdentityStore::new(pool));
    let quota = QuotaTracker::new(identities, config.quota_window())
        .with_storage_timeout(config.storage_timeout());
    let gate = Arc::new(RequestGate::new(quota));

    // 摘要缓存与生成
    let cache = Arc::new(RedisCacheStore::new(Arc::new(redis_client)));
    let summarizer = Arc::new(GeminiSummarizer::new(
        http.clone(),
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
    ));
    let summaries = Arc::new(
        SummaryService::new(cache, summarizer)
            .with_cache_ttl(config.cache_ttl())
            .with_generation_timeout(config.generation_timeout())
            .with_storage_timeout(config.storage_timeout()),
    );

    // 设置应用状态
    let state = AppState {
        gate,
        summaries,
        pages: Arc::new(HttpPageFetcher::new(http)),
    };

    let router = create_router(state, &config.api_base_uri);

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(CorsLayer::permissive())
    };

    // 启动服务器
    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        router,
    )
    .await
    .expect("Failed to start server");
}
