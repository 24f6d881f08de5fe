use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use curator_core::CuratorError;

/// Keys of mutating requests currently being served.
///
/// A second request with the same key is rejected as `Busy` until the first
/// one's [`InFlightGuard`] drops. Different keys never wait on each other.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    pub fn acquire(&self, key: impl Into<String>) -> Result<InFlightGuard, CuratorError> {
        let key = key.into();
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        if !keys.insert(key.clone()) {
            return Err(CuratorError::Busy(key));
        }
        Ok(InFlightGuard {
            key,
            keys: Arc::clone(&self.keys),
        })
    }

    pub fn is_busy(&self, key: &str) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }
}

#[derive(Debug)]
pub struct InFlightGuard {
    key: String,
    keys: Arc<Mutex<HashSet<String>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}
