use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use edge_gateway::{
    cache::{
        CounterStore, MemoryCounterStore, MemoryResponseStore, RedisCounterStore,
        RedisResponseStore, ResponseStore, operations, spawn_sweeper,
    },
    config::Config,
    router::create_router,
};
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
    let config = Config::from_env();
    tracing::info!("Proxying to origin {}", config.origin_url);

    // 选择存储后端
    let (counters, responses): (Arc<dyn CounterStore>, Arc<dyn ResponseStore>) =
        match &config.redis_url {
            Some(redis_url) => {
                let redis_client =
                    redis::Client::open(redis_url.as_str()).expect("Failed to create Redis client");
                let conn = operations::connect(redis_client)
                    .await
                    .expect("Failed to connect to Redis");
                tracing::info!("Using Redis stores");
                (
                    Arc::new(RedisCounterStore::new(conn.clone())),
                    Arc::new(RedisResponseStore::new(conn, config.cache_ttl())),
                )
            }
            None => {
                tracing::info!("REDIS_URL not set, using in-memory stores");
                let counters = Arc::new(MemoryCounterStore::new());
                let responses = Arc::new(MemoryResponseStore::new(Some(config.cache_ttl())));
                spawn_sweeper(
                    counters.clone(),
                    responses.clone(),
                    config.memory_sweep_interval(),
                );
                (counters, responses)
            }
        };

    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );

    let app = create_router(config, counters, responses).expect("Failed to build HTTP client");

    // 启动服务器
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
