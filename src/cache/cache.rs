// Caches are owned by the component that uses them and injected at
// construction. Nothing here is global.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::cache::key::CacheKey;

pub trait Cache<V>: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<V>;
    fn insert(&self, key: CacheKey, value: V);
    fn len(&self) -> usize;
    fn clear(&self);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Thread-safe cache with a hard entry cap. When full, the oldest inserted
/// entry is evicted first.
#[derive(Debug)]
pub struct BoundedCache<V> {
    inner: Mutex<BoundedCacheInner<V>>,
    capacity: usize,
}

#[derive(Debug)]
struct BoundedCacheInner<V> {
    map: HashMap<CacheKey, V>,
    order: VecDeque<CacheKey>,
}

impl<V> BoundedCache<V> {
    /// A zero capacity is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(BoundedCacheInner {
                map: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
            }),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<V: Clone + Send> Cache<V> for BoundedCache<V> {
    fn get(&self, key: &CacheKey) -> Option<V> {
        self.inner.lock().map.get(key).cloned()
    }

    fn insert(&self, key: CacheKey, value: V) {
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.map.get_mut(&key) {
            *existing = value;
            return;
        }
        while inner.map.len() >= self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.map.remove(&oldest);
        }
        inner.order.push_back(key.clone());
        inner.map.insert(key, value);
    }

    fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.map.clear();
        inner.order.clear();
    }
}

/// Never stores anything. Swap in to disable caching.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl<V> Cache<V> for NoopCache {
    fn get(&self, _key: &CacheKey) -> Option<V> {
        None
    }

    fn insert(&self, _key: CacheKey, _value: V) {}

    fn len(&self) -> usize {
        0
    }

    fn clear(&self) {}
}
