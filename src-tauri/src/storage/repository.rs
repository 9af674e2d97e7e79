use std::marker::PhantomData;
use std::sync::Arc;
#[cfg(test)]
use std::sync::Mutex;

use chrono::Duration;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use super::ClientStorage;

/// Durable home for one store's state.
pub trait Repository<T>: Send + Sync {
    fn load(&self) -> Result<Option<T>, String>;
    fn save(&self, value: &T) -> Result<(), String>;
    fn clear(&self) -> Result<(), String>;
}

/// Repository over a single storage key whose entry is ignored once it is
/// older than `max_age`.
pub struct StaleAfter<T> {
    storage: Arc<ClientStorage>,
    key: &'static str,
    max_age: Duration,
    _value: PhantomData<fn() -> T>,
}

impl<T> StaleAfter<T> {
    pub fn new(storage: Arc<ClientStorage>, key: &'static str, max_age: Duration) -> Self {
        Self {
            storage,
            key,
            max_age,
            _value: PhantomData,
        }
    }
}

impl<T> Repository<T> for StaleAfter<T>
where
    T: Serialize + DeserializeOwned,
{
    fn load(&self) -> Result<Option<T>, String> {
        let Some(value) = self.storage.get_item(self.key, self.max_age)? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!("Stored '{}' has an unexpected shape, ignoring: {}", self.key, e);
                Ok(None)
            }
        }
    }

    fn save(&self, value: &T) -> Result<(), String> {
        let json = serde_json::to_value(value)
            .map_err(|e| format!("Failed to serialize '{}': {}", self.key, e))?;
        self.storage.set_item(self.key, &json)
    }

    fn clear(&self) -> Result<(), String> {
        self.storage.remove_item(self.key)
    }
}

/// In-process repository with no expiry, for store tests.
#[cfg(test)]
pub struct MemoryRepository<T> {
    value: Mutex<Option<T>>,
}

#[cfg(test)]
impl<T> MemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
        }
    }
}

#[cfg(test)]
impl<T> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl<T> Repository<T> for MemoryRepository<T>
where
    T: Clone + Send,
{
    fn load(&self) -> Result<Option<T>, String> {
        self.value
            .lock()
            .map(|v| v.clone())
            .map_err(|_| "Repository lock poisoned".to_string())
    }

    fn save(&self, value: &T) -> Result<(), String> {
        let mut slot = self
            .value
            .lock()
            .map_err(|_| "Repository lock poisoned".to_string())?;
        *slot = Some(value.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), String> {
        let mut slot = self
            .value
            .lock()
            .map_err(|_| "Repository lock poisoned".to_string())?;
        *slot = None;
        Ok(())
    }
}
