use std::fmt::Display;
use std::sync::Arc;

use crate::inference::runtime::ModelHandle;

/// Identifies a loaded artifact, displayed as `<owner_id>/<model_name>`.
///
/// The parts are compared separately, so ids containing `/` cannot collide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    owner_id: String,
    model_name: String,
}

impl CacheKey {
    pub fn new(owner_id: &str, model_name: &str) -> Self {
        CacheKey {
            owner_id: owner_id.to_string(),
            model_name: model_name.to_string(),
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner_id, self.model_name)
    }
}

/// Holds at most one loaded model, the last one that loaded successfully.
///
/// There is no expiry and no eviction; the slot is only replaced by [`ModelCache::store`].
#[derive(Default)]
pub struct ModelCache {
    slot: Option<(CacheKey, Arc<dyn ModelHandle>)>,
}

impl ModelCache {
    /// The cached handle, if it was loaded for `key`.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<dyn ModelHandle>> {
        match &self.slot {
            Some((cached, handle)) if cached == key => Some(handle.clone()),
            _ => None,
        }
    }

    pub fn store(&mut self, key: CacheKey, handle: Arc<dyn ModelHandle>) {
        self.slot = Some((key, handle));
    }

    pub fn key(&self) -> Option<&CacheKey> {
        self.slot.as_ref().map(|(key, _)| key)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;
    use crate::inference::output::OutputTensor;

    struct Dummy;

    impl ModelHandle for Dummy {
        fn inputs(&self) -> &[String] {
            &[]
        }

        fn outputs(&self) -> &[String] {
            &[]
        }

        fn run(&self, _: &str, _: &[f32]) -> Result<OutputTensor> {
            Ok(OutputTensor::new(vec![], vec![0]))
        }
    }

    #[test]
    fn starts_empty() {
        let cache = ModelCache::default();
        assert!(cache.key().is_none());
        assert!(cache.get(&CacheKey::new("u1", "m.onnx")).is_none());
    }

    #[test]
    fn keeps_a_single_slot() {
        let mut cache = ModelCache::default();
        let first = CacheKey::new("u1", "a.onnx");
        let second = CacheKey::new("u1", "b.onnx");

        cache.store(first.clone(), Arc::new(Dummy));
        assert!(cache.get(&first).is_some());
        assert!(cache.get(&second).is_none());

        cache.store(second.clone(), Arc::new(Dummy));
        assert!(cache.get(&first).is_none());
        assert!(cache.get(&second).is_some());
        assert_eq!(cache.key(), Some(&second));
    }

    #[test]
    fn keys_join_owner_and_model() {
        assert_eq!(
            CacheKey::new("user123", "sentiment.onnx").to_string(),
            "user123/sentiment.onnx"
        );
    }

    #[test]
    fn slashes_do_not_merge_keys() {
        let nested_owner = CacheKey::new("a/b", "c");
        let nested_model = CacheKey::new("a", "b/c");
        assert_eq!(nested_owner.to_string(), nested_model.to_string());
        assert_ne!(nested_owner, nested_model);

        let mut cache = ModelCache::default();
        cache.store(nested_owner, Arc::new(Dummy));
        assert!(cache.get(&nested_model).is_none());
    }
}
