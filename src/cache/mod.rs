pub mod cache;
pub mod key;

pub use cache::{BoundedCache, Cache, NoopCache};
pub use key::CacheKey;
