//! Shared-instance registry and client factory.

use crate::{RequestConfig, Tether};
use std::sync::OnceLock;

/// Holds at most one client. The first configuration wins.
#[derive(Debug, Default)]
pub struct SingletonRegistry {
    instance: OnceLock<Tether>,
}

impl SingletonRegistry {
    pub const fn new() -> Self {
        Self {
            instance: OnceLock::new(),
        }
    }

    /// Return the registered client, building it from `config` on first use.
    /// Later configurations are ignored.
    pub fn get_or_init(&self, config: RequestConfig) -> Tether {
        let mut built = false;
        let client = self.instance.get_or_init(|| {
            built = true;
            Tether::new(config)
        });
        if !built {
            tracing::debug!("Shared client already exists; ignoring new configuration");
        }
        client.clone()
    }

    /// The registered client, if one was built.
    pub fn get(&self) -> Option<Tether> {
        self.instance.get().cloned()
    }
}

static SHARED: SingletonRegistry = SingletonRegistry::new();

/// Build a client, joining the process-wide shared instance when
/// `use_singleton` is set.
pub fn create_instance(config: RequestConfig) -> Tether {
    if config.use_singleton == Some(true) {
        SHARED.get_or_init(config)
    } else {
        Tether::new(config)
    }
}

/// The process-wide shared instance, if one exists.
pub fn shared_instance() -> Option<Tether> {
    SHARED.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_registry_first_writer_wins() {
        let registry = SingletonRegistry::new();
        assert!(registry.get().is_none());

        let first = registry.get_or_init(
            RequestConfig::builder()
                .base_url("https://first")
                .build(),
        );
        let second = registry.get_or_init(
            RequestConfig::builder()
                .base_url("https://second")
                .timeout(Duration::from_secs(1))
                .build(),
        );

        assert!(first.ptr_eq(&second));
        assert_eq!(second.defaults().base_url.as_deref(), Some("https://first"));
        assert!(registry.get().is_some_and(|c| c.ptr_eq(&first)));
    }

    #[test]
    fn test_non_singleton_instances_are_independent() {
        let a = create_instance(RequestConfig::default());
        let b = create_instance(RequestConfig::builder().use_singleton(false).build());
        assert!(!a.ptr_eq(&b));
    }
}
