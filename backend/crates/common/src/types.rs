use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a running service process, served on `/info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub instance_id: Uuid,
    /// Where tickets live: `excel` or `postgres`.
    pub storage_backend: String,
}

impl ServiceInfo {
    pub fn new(name: &str, storage_backend: &str) -> Self {
        Self {
            name: name.to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            instance_id: Uuid::new_v4(),
            storage_backend: storage_backend.to_owned(),
        }
    }
}
