use std::sync::Arc;

use cache::ResponseCache;
use config::Config;
use proxy::ProxyForwarder;

pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod proxy;
pub mod router;
pub mod routes;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub forwarder: ProxyForwarder,
    pub cache: ResponseCache,
}
