//! Cache collaborator handed to model and view layers.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// Key/value cache of JSON values.
pub trait Cache: Send + Sync {
    fn read(&self, key: &str) -> Option<serde_json::Value>;

    /// Stores `value` under `key`; `ttl` of `None` never expires.
    fn update(&self, key: &str, value: serde_json::Value, ttl: Option<Duration>);

    /// Removes `key`, returning whether it was present.
    fn delete(&self, key: &str) -> bool;

    fn exists(&self, key: &str) -> bool {
        self.read(key).is_some()
    }
}

struct Slot {
    value: serde_json::Value,
    expires: Option<Instant>,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        self.expires.map_or(true, |at| at > now)
    }
}

/// In-process cache. Expired entries are dropped lazily on access.
///
/// # Examples
///
/// ```rust
/// use ferrous_dispatch::{Cache, MemoryCache};
///
/// let cache = MemoryCache::new();
/// cache.update("blog:1", serde_json::json!({"title": "Hello"}), None);
/// assert_eq!(cache.read("blog:1").unwrap()["title"], "Hello");
/// assert!(cache.delete("blog:1"));
/// assert!(!cache.exists("blog:1"));
/// ```
#[derive(Default)]
pub struct MemoryCache {
    slots: RwLock<HashMap<String, Slot>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.slots.read().values().filter(|slot| slot.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.slots.write().clear();
    }
}

impl Cache for MemoryCache {
    fn read(&self, key: &str) -> Option<serde_json::Value> {
        let now = Instant::now();
        {
            let slots = self.slots.read();
            match slots.get(key) {
                None => return None,
                Some(slot) if slot.is_live(now) => return Some(slot.value.clone()),
                Some(_) => {}
            }
        }
        let mut slots = self.slots.write();
        if slots.get(key).is_some_and(|slot| !slot.is_live(now)) {
            slots.remove(key);
        }
        None
    }

    fn update(&self, key: &str, value: serde_json::Value, ttl: Option<Duration>) {
        let expires = ttl.map(|ttl| Instant::now() + ttl);
        self.slots.write().insert(key.to_string(), Slot { value, expires });
    }

    fn delete(&self, key: &str) -> bool {
        self.slots.write().remove(key).is_some()
    }
}

impl fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCache").field("entries", &self.len()).finish()
    }
}
