//! Shared context handed to spectator listeners.

use std::any::Any;
use std::collections::HashMap;

use parking_lot::RwLock;

/// A thread-safe keyed bag. Listeners run concurrently on separate tasks, so
/// every accessor takes `&self`; values are cloned out on read.
#[derive(Default)]
pub struct Context {
    data: RwLock<HashMap<String, Box<dyn Any + Send + Sync>>>,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    pub fn set(
        &self,
        key: impl Into<String>,
        value: impl Any + Send + Sync,
    ) {
        self.data.write().insert(key.into(), Box::new(value));
    }

    /// Returns a clone of the stored value, or `None` when the key is absent
    /// or holds a different type.
    pub fn get<T>(
        &self,
        key: &str,
    ) -> Option<T>
    where
        T: Any + Clone,
    {
        self.data
            .read()
            .get(key)
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
    }

    pub fn remove(
        &self,
        key: &str,
    ) {
        self.data.write().remove(key);
    }
}

impl std::fmt::Debug for Context {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Context").field("keys", &self.data.read().len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_round_trip() {
        let context = Context::new();
        context.set("trigger", "myDB".to_string());

        assert_eq!(context.get::<String>("trigger"), Some("myDB".to_string()));
        assert_eq!(context.get::<String>("missing"), None);
        assert_eq!(context.get::<u64>("trigger"), None);
    }

    #[test]
    fn test_overwrite_and_remove() {
        let context = Context::new();
        context.set("count", 1u64);
        context.set("count", 2u64);
        assert_eq!(context.get::<u64>("count"), Some(2));

        context.remove("count");
        assert_eq!(context.get::<u64>("count"), None);
    }
}
