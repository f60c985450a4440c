// 缓存模块
// 限流计数与响应缓存的存储抽象、键生成和后端实现

pub mod keys;
pub mod layer;
pub mod memory;
pub mod models;
pub mod operations;
pub mod store;

// 重新导出常用类型，方便其他模块使用
pub use layer::ResponseCache;
pub use memory::{MemoryCounterStore, MemoryResponseStore, spawn_sweeper};
pub use models::CachedResponse;
pub use operations::{RedisCounterStore, RedisResponseStore};
pub use store::{CounterStore, ResponseStore, StoreError};
