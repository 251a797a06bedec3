use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::registry::{DuplicateCheckResult, RegistryConfig};

/// Asks the service whether a device or employee ID is already registered.
///
/// The gate fails open: when the service cannot answer, the check reports no
/// conflict and registration goes ahead.
pub struct DuplicateGate {
    config: RegistryConfig,
}

impl DuplicateGate {
    pub fn new(config: RegistryConfig) -> Self {
        DuplicateGate { config }
    }

    pub fn check(&self, device: &str, employee_id: &str) -> DuplicateCheckResult {
        match self.query(device, employee_id) {
            Ok(result) => {
                debug!(?result, "duplicate check answered");
                result
            }
            Err(reason) => {
                warn!(%reason, "duplicate check failed, continuing without it");
                DuplicateCheckResult::no_conflict()
            }
        }
    }

    fn query(&self, device: &str, employee_id: &str) -> Result<DuplicateCheckResult, String> {
        let url = self
            .config
            .endpoint(&["api", "verificar-cadastro", device, employee_id])?;
        let client = self.config.http_client().map_err(|e| e.to_string())?;

        let response = client.get(url).send().map_err(|e| {
            if e.is_connect() {
                format!("cannot reach {}: {}", self.config.base_url, e)
            } else {
                e.to_string()
            }
        })?;

        if response.status() != StatusCode::OK {
            return Err(format!("unexpected status {}", response.status()));
        }
        response
            .json::<DuplicateCheckResult>()
            .map_err(|e| format!("undecodable reply: {}", e))
    }
}
