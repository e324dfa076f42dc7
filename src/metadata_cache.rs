use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Mutex;

use crate::request::RequestKey;
use crate::response::ResponseMetadata;
use crate::util::lock_unpoisoned;

pub const DEFAULT_METADATA_CACHE_CAPACITY: usize = 50;

/// Bounded map from request identity to the metadata of its last response.
///
/// Eviction is by insertion order: once full, adding a new key drops the
/// oldest one. Replacing the value of a present key keeps its position.
#[derive(Debug)]
pub struct ResponseMetadataCache<K = RequestKey, V = ResponseMetadata> {
    capacity: usize,
    state: Mutex<CacheState<K, V>>,
}

#[derive(Debug)]
struct CacheState<K, V> {
    entries: HashMap<K, V>,
    order: VecDeque<K>,
}

impl<K, V> ResponseMetadataCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            state: Mutex::new(CacheState {
                entries: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn put(&self, key: K, value: V) {
        let mut state = lock_unpoisoned(&self.state);
        if let Some(existing) = state.entries.get_mut(&key) {
            *existing = value;
            return;
        }

        while state.order.len() >= self.capacity {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            state.entries.remove(&oldest);
        }
        state.order.push_back(key.clone());
        state.entries.insert(key, value);
    }

    pub fn get(&self, key: &K) -> Option<V> {
        lock_unpoisoned(&self.state).entries.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        lock_unpoisoned(&self.state).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Default for ResponseMetadataCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_METADATA_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::{DEFAULT_METADATA_CACHE_CAPACITY, ResponseMetadataCache};
    use crate::request::RequestKey;
    use crate::response::ResponseMetadata;

    #[test]
    fn inserting_past_capacity_evicts_oldest_key() {
        let cache: ResponseMetadataCache = ResponseMetadataCache::default();
        let keys: Vec<RequestKey> = (0..=DEFAULT_METADATA_CACHE_CAPACITY as u64)
            .map(RequestKey::from_raw)
            .collect();

        for (index, key) in keys.iter().enumerate() {
            cache.put(*key, ResponseMetadata::with_request_id(format!("req-{index}")));
        }

        assert_eq!(cache.len(), DEFAULT_METADATA_CACHE_CAPACITY);
        assert!(cache.get(&keys[0]).is_none());
        assert_eq!(
            cache
                .get(&keys[1])
                .as_ref()
                .and_then(ResponseMetadata::request_id),
            Some("req-1")
        );
        assert_eq!(
            cache
                .get(&keys[DEFAULT_METADATA_CACHE_CAPACITY])
                .as_ref()
                .and_then(ResponseMetadata::request_id),
            Some("req-50")
        );
    }

    #[test]
    fn replacing_a_value_keeps_insertion_position() {
        let cache = ResponseMetadataCache::<u32, &str>::new(2);
        cache.put(1, "first");
        cache.put(2, "second");
        cache.put(1, "updated");
        cache.put(3, "third");

        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), Some("second"));
        assert_eq!(cache.get(&3), Some("third"));
    }

    #[test]
    fn zero_capacity_holds_one_entry() {
        let cache = ResponseMetadataCache::<u32, u32>::new(0);
        cache.put(1, 1);
        cache.put(2, 2);
        assert_eq!(cache.capacity(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&2), Some(2));
    }

    #[test]
    fn concurrent_inserts_stay_within_capacity() {
        let cache = Arc::new(ResponseMetadataCache::<u64, u64>::new(8));
        let workers: Vec<_> = (0..4_u64)
            .map(|worker| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for index in 0..100_u64 {
                        cache.put(worker * 1000 + index, index);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().expect("worker should not panic");
        }
        assert_eq!(cache.len(), 8);
    }
}
