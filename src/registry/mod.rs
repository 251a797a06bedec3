//! Client side of the inventory registration service.

pub mod gate;
pub mod submit;

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::SubmitError;
use crate::hardware::types::InventoryRecord;

pub use gate::DuplicateGate;
pub use submit::SubmissionClient;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Where the registration service lives and how long to wait for it.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl RegistryConfig {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        RegistryConfig {
            base_url: base_url.into(),
            timeout,
        }
    }

    /// Joins `segments` onto the base address, percent-encoding each one.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, String> {
        let mut url = Url::parse(&self.base_url).map_err(|e| format!("invalid server URL {}: {}", self.base_url, e))?;
        url.path_segments_mut()
            .map_err(|_| format!("server URL {} cannot take a path", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn http_client(&self) -> reqwest::Result<Client> {
        Client::builder().timeout(self.timeout).build()
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig::new(DEFAULT_SERVER_URL, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

/// Answer of the duplicate-check endpoint. Keys missing from the server's
/// reply count as "not registered".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCheckResult {
    #[serde(rename(deserialize = "maquinaExiste"), default)]
    pub device_already_registered: bool,
    #[serde(rename(deserialize = "matriculaExiste"), default)]
    pub employee_id_already_registered: bool,
    #[serde(rename(deserialize = "jaExiste"), default)]
    pub server_reports_conflict: bool,
}

impl DuplicateCheckResult {
    pub fn no_conflict() -> Self {
        Self::default()
    }

    pub fn any_conflict(&self) -> bool {
        self.server_reports_conflict || self.device_already_registered || self.employee_id_already_registered
    }

    pub fn conflict_message(&self) -> String {
        let subject = match (self.device_already_registered, self.employee_id_already_registered) {
            (true, true) => "This device and this employee ID are already registered.",
            (true, false) => "This device is already registered.",
            (false, true) => "This employee ID is already registered.",
            (false, false) => "This device or employee ID is already registered.",
        };
        format!("{} Registration cannot be repeated.", subject)
    }
}

/// Runs the duplicate check and, when it is clear, submits the record.
pub struct Registrar {
    gate: DuplicateGate,
    client: SubmissionClient,
}

impl Registrar {
    pub fn new(config: RegistryConfig) -> Self {
        Registrar {
            gate: DuplicateGate::new(config.clone()),
            client: SubmissionClient::new(config),
        }
    }

    pub fn register(&self, record: &InventoryRecord) -> Result<String, SubmitError> {
        let check = self.gate.check(&record.device_name, &record.employee_id);
        if check.any_conflict() {
            info!(device = %record.device_name, "registration blocked by duplicate check");
            return Err(SubmitError::Conflict(check));
        }
        self.client.submit(record)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::types::{MemoryReport, ProcessorInfo};

    pub(crate) fn record(device: &str, employee: &str) -> InventoryRecord {
        InventoryRecord {
            logged_in_user: "jdoe".to_string(),
            device_name: device.to_string(),
            operating_system: Some("Windows 10 Pro".to_string()),
            processor: ProcessorInfo::unavailable(),
            disks: Vec::new(),
            memory: MemoryReport {
                total_gb: 16.0,
                modules: Vec::new(),
            },
            displays: Vec::new(),
            department: "Educação".to_string(),
            sector: "TI".to_string(),
            employee_id: employee.to_string(),
            full_name: "John Doe".to_string(),
            notes: String::new(),
            collected_at: "2024-01-01 10:00:00".to_string(),
        }
    }

    fn config(base: &str) -> RegistryConfig {
        RegistryConfig::new(base, Duration::from_secs(5))
    }

    #[test]
    fn endpoint_segments_are_percent_encoded() {
        let url = config("http://inventory.local:3000/").endpoint(&["api", "verificar-cadastro", "PC 01/A", "12#3"]).unwrap();
        assert_eq!(url.as_str(), "http://inventory.local:3000/api/verificar-cadastro/PC%2001%2FA/12%233");
    }

    #[test]
    fn conflict_message_names_only_conflicting_identities() {
        let device_only = DuplicateCheckResult {
            device_already_registered: true,
            employee_id_already_registered: false,
            server_reports_conflict: true,
        };
        assert!(device_only.any_conflict());
        assert!(device_only.conflict_message().starts_with("This device is already registered."));

        let both = DuplicateCheckResult {
            device_already_registered: true,
            employee_id_already_registered: true,
            server_reports_conflict: true,
        };
        assert!(both.conflict_message().contains("device and this employee ID"));

        assert!(!DuplicateCheckResult::no_conflict().any_conflict());
    }

    #[test]
    fn conflict_stops_before_submission() {
        let (base, seen) = stub::serve(vec![(200, r#"{"jaExiste":true,"maquinaExiste":false,"matriculaExiste":true}"#)]);
        let registrar = Registrar::new(config(&base));

        let result = registrar.register(&record("PC-01", "123"));

        match result {
            Err(SubmitError::Conflict(check)) => {
                assert!(check.employee_id_already_registered);
                assert!(!check.device_already_registered);
            }
            other => panic!("expected conflict, got {:?}", other),
        }
        let requests: Vec<stub::Seen> = seen.iter().collect();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "GET");
    }

    #[test]
    fn clear_check_is_followed_by_submission() {
        let (base, seen) = stub::serve(vec![
            (200, r#"{"jaExiste":false,"maquinaExiste":false,"matriculaExiste":false}"#),
            (201, r#"{"success":true,"message":"Dados de hardware registrados com sucesso!","id":7}"#),
        ]);
        let registrar = Registrar::new(config(&base));

        let message = registrar.register(&record("PC-02", "456")).unwrap();

        assert_eq!(message, "Dados de hardware registrados com sucesso!");
        let requests: Vec<stub::Seen> = seen.iter().collect();
        assert_eq!(requests[0].path, "/api/verificar-cadastro/PC-02/456");
        assert_eq!(requests[1].method, "POST");
        assert_eq!(requests[1].path, "/api/hardware-data");
        assert!(requests[1].body.contains("\"matricula\":\"456\""));
    }

    #[test]
    fn failed_check_still_submits() {
        let (base, seen) = stub::serve(vec![(500, "{}"), (201, r#"{"message":"ok"}"#)]);
        let registrar = Registrar::new(config(&base));

        let message = registrar.register(&record("PC-9", "9")).unwrap();

        assert_eq!(message, "ok");
        let requests: Vec<stub::Seen> = seen.iter().collect();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].path, "/api/verificar-cadastro/PC-9/9");
        assert_eq!(requests[1].method, "POST");
        assert_eq!(requests[1].path, "/api/hardware-data");
    }
}
