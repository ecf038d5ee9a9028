//! Request/response messaging between the page side and the storage side.
//!
//! Every failure travels back as `{ "success": false, "error": ... }`; the
//! broker never returns an `Err` across the boundary.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{RecallError, Result};
use crate::storage::entry::StoredEntry;
use crate::storage::store::{EntryMap, FormStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum StorageRequest {
    SaveFormData { key: String, data: StoredEntry },
    GetFormData { key: String },
    GetAllFormData,
    DeleteFormData { key: String },
    ClearAllData,
}

impl StorageRequest {
    pub fn action(&self) -> &'static str {
        match self {
            StorageRequest::SaveFormData { .. } => "saveFormData",
            StorageRequest::GetFormData { .. } => "getFormData",
            StorageRequest::GetAllFormData => "getAllFormData",
            StorageRequest::DeleteFormData { .. } => "deleteFormData",
            StorageRequest::ClearAllData => "clearAllData",
        }
    }

    pub fn is_write(&self) -> bool {
        !matches!(
            self,
            StorageRequest::GetFormData { .. } | StorageRequest::GetAllFormData
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StorageResponse {
    pub fn ok(data: Option<Value>) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    pub fn failure(error: impl ToString) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
        }
    }
}

/// Carries requests to the storage side.
pub trait MessageTransport {
    fn send(&mut self, request: &StorageRequest) -> StorageResponse;
    /// False once the host context has been torn down.
    fn is_connected(&self) -> bool;
}

/// Storage side of the messaging surface.
pub struct StorageBroker<S: FormStore> {
    store: S,
    alive: bool,
}

impl<S: FormStore> StorageBroker<S> {
    pub fn new(store: S) -> Self {
        Self { store, alive: true }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Simulate the host environment going away.
    pub fn invalidate(&mut self) {
        self.alive = false;
    }

    pub fn handle(&mut self, request: &StorageRequest) -> StorageResponse {
        if !self.alive {
            return StorageResponse::failure(RecallError::ContextInvalidated);
        }

        debug!(action = request.action(), "storage request");
        match self.dispatch(request) {
            Ok(data) => StorageResponse::ok(data),
            Err(e) => {
                warn!(action = request.action(), error = %e, "storage request failed");
                StorageResponse::failure(e)
            }
        }
    }

    fn dispatch(&mut self, request: &StorageRequest) -> Result<Option<Value>> {
        match request {
            StorageRequest::SaveFormData { key, data } => {
                self.store.save(key, data)?;
                Ok(None)
            }
            StorageRequest::GetFormData { key } => match self.store.get(key)? {
                Some(entry) => to_value(&entry).map(Some),
                None => Ok(None),
            },
            StorageRequest::GetAllFormData => to_value(&self.store.get_all()?).map(Some),
            StorageRequest::DeleteFormData { key } => {
                self.store.delete(key)?;
                Ok(None)
            }
            StorageRequest::ClearAllData => {
                let keys: Vec<String> = self.store.get_all()?.into_keys().collect();
                self.store.clear(&keys)?;
                Ok(Some(Value::from(keys.len())))
            }
        }
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| RecallError::json("encoding response", e))
}

impl<S: FormStore> MessageTransport for StorageBroker<S> {
    fn send(&mut self, request: &StorageRequest) -> StorageResponse {
        self.handle(request)
    }

    fn is_connected(&self) -> bool {
        self.alive
    }
}

/// Page side: a [`FormStore`] backed by messages to a broker.
pub struct BrokerClient<T: MessageTransport> {
    transport: RefCell<T>,
}

impl<T: MessageTransport> BrokerClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: RefCell::new(transport),
        }
    }

    pub fn into_inner(self) -> T {
        self.transport.into_inner()
    }

    pub fn with_transport<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut transport = self.transport.borrow_mut();
        f(&mut *transport)
    }

    pub fn request(&self, request: StorageRequest) -> Result<Option<Value>> {
        let mut transport = self.transport.borrow_mut();

        if request.is_write() && !transport.is_connected() {
            return Err(RecallError::ContextInvalidated);
        }

        let response = transport.send(&request);
        if response.success {
            Ok(response.data)
        } else {
            Err(RecallError::Messaging {
                action: request.action().to_string(),
                message: response.error.unwrap_or_else(|| "unknown error".to_string()),
            })
        }
    }

    /// Number of entries removed.
    pub fn clear_all(&self) -> Result<usize> {
        let data = self.request(StorageRequest::ClearAllData)?;
        Ok(data.and_then(|v| v.as_u64()).unwrap_or(0) as usize)
    }
}

impl<T: MessageTransport> FormStore for BrokerClient<T> {
    fn save(&mut self, key: &str, entry: &StoredEntry) -> Result<()> {
        self.request(StorageRequest::SaveFormData {
            key: key.to_string(),
            data: entry.clone(),
        })
        .map(|_| ())
    }

    fn get(&self, key: &str) -> Result<Option<StoredEntry>> {
        match self.request(StorageRequest::GetFormData {
            key: key.to_string(),
        })? {
            Some(Value::Null) | None => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| RecallError::json("decoding getFormData", e)),
        }
    }

    fn get_all(&self) -> Result<EntryMap> {
        match self.request(StorageRequest::GetAllFormData)? {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| RecallError::json("decoding getAllFormData", e)),
            None => Ok(EntryMap::new()),
        }
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.request(StorageRequest::DeleteFormData {
            key: key.to_string(),
        })
        .map(|_| ())
    }

    fn clear(&mut self, keys: &[String]) -> Result<()> {
        for key in keys {
            self.delete(key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_format_uses_action_tag() {
        let json = serde_json::to_value(StorageRequest::GetFormData {
            key: "https://a.test/_form_0".into(),
        })
        .unwrap();
        assert_eq!(json["action"], "getFormData");
        assert_eq!(json["key"], "https://a.test/_form_0");

        let clear: StorageRequest =
            serde_json::from_str(r#"{"action":"clearAllData"}"#).unwrap();
        assert_eq!(clear, StorageRequest::ClearAllData);
    }

    #[test]
    fn failure_response_omits_data() {
        let json = serde_json::to_string(&StorageResponse::failure("boom")).unwrap();
        assert_eq!(json, r#"{"success":false,"error":"boom"}"#);
    }
}
