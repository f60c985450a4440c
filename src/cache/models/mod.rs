/// 缓存数据模型
/// 定义存储中保存的数据结构
pub mod rate_limit;
pub mod response;

// 重新导出常用类型
pub use rate_limit::CachedRateLimit;
pub use response::{CachedHeader, CachedResponse};
