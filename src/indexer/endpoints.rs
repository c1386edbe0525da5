use tracing::warn;
use url::Url;

/// Holds the primary and backup RPC endpoints and which one is in use.
#[derive(Debug, Clone)]
pub struct EndpointSelector {
    primary: Url,
    backup: Url,
    on_backup: bool,
}

impl EndpointSelector {
    pub fn new(primary: Url, backup: Url) -> Self {
        Self {
            primary,
            backup,
            on_backup: false,
        }
    }

    pub fn active(&self) -> &Url {
        if self.on_backup {
            &self.backup
        } else {
            &self.primary
        }
    }

    pub fn is_on_backup(&self) -> bool {
        self.on_backup
    }

    /// Switches to the backup endpoint. Returns `false` when already on backup.
    pub fn fail_over(&mut self) -> bool {
        if self.on_backup {
            return false;
        }
        self.on_backup = true;
        warn!("Switched to backup endpoint: {}", self.backup);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector() -> EndpointSelector {
        EndpointSelector::new(
            "https://primary.example".parse().unwrap(),
            "https://backup.example".parse().unwrap(),
        )
    }

    #[test]
    fn test_starts_on_primary() {
        let selector = selector();
        assert_eq!(selector.active().as_str(), "https://primary.example/");
        assert!(!selector.is_on_backup());
    }

    #[test]
    fn test_fail_over_is_idempotent() {
        let mut selector = selector();
        assert!(selector.fail_over());
        let after_first = selector.active().clone();
        assert!(!selector.fail_over());
        assert_eq!(selector.active(), &after_first);
        assert_eq!(selector.active().as_str(), "https://backup.example/");
    }
}
