use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::SubmitError;
use crate::hardware::types::InventoryRecord;
use crate::registry::RegistryConfig;

const DEFAULT_SUCCESS_MESSAGE: &str = "Inventory registered successfully.";

#[derive(Debug, Deserialize)]
struct SubmitReply {
    message: Option<String>,
}

/// Posts inventory records to the registration service. One attempt per
/// call, no retries.
pub struct SubmissionClient {
    config: RegistryConfig,
}

impl SubmissionClient {
    pub fn new(config: RegistryConfig) -> Self {
        SubmissionClient { config }
    }

    pub fn submit(&self, record: &InventoryRecord) -> Result<String, SubmitError> {
        let url = self
            .config
            .endpoint(&["api", "hardware-data"])
            .map_err(SubmitError::Other)?;
        let client = self
            .config
            .http_client()
            .map_err(|e| SubmitError::Other(e.to_string()))?;

        debug!(%url, "submitting inventory record");
        let response = client.post(url).json(record).send().map_err(|e| {
            if e.is_connect() {
                SubmitError::Connection(e.to_string())
            } else {
                SubmitError::Other(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response.text().map_err(|e| SubmitError::Other(e.to_string()))?;

        if status != StatusCode::CREATED {
            return Err(SubmitError::ServerRejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(device = %record.device_name, "inventory record accepted");
        let message = serde_json::from_str::<SubmitReply>(&body)
            .ok()
            .and_then(|reply| reply.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SUCCESS_MESSAGE.to_string());
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::stub;
    use crate::registry::tests::record;
    use std::time::Duration;

    fn client(base: &str) -> SubmissionClient {
        SubmissionClient::new(RegistryConfig::new(base, Duration::from_secs(5)))
    }

    #[test]
    fn created_reply_uses_server_message() {
        let (base, seen) = stub::serve(vec![(201, r#"{"success":true,"message":"Dados de hardware registrados com sucesso!","id":1}"#)]);

        let message = client(&base).submit(&record("PC-01", "123")).unwrap();

        assert_eq!(message, "Dados de hardware registrados com sucesso!");
        let request = seen.recv().unwrap();
        assert_eq!(request.method, "POST");
        let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(body["nomeDispositivo"], "PC-01");
        assert_eq!(body["secretaria"], "Educação");
    }

    #[test]
    fn created_without_message_uses_default() {
        let (base, _seen) = stub::serve(vec![(201, "")]);
        assert_eq!(client(&base).submit(&record("PC-01", "123")).unwrap(), DEFAULT_SUCCESS_MESSAGE);
    }

    #[test]
    fn other_status_keeps_body_verbatim() {
        let body = r#"{"success":false,"message":"Dados incompletos. Todos os campos são obrigatórios."}"#;
        let (base, _seen) = stub::serve(vec![(400, body)]);

        match client(&base).submit(&record("PC-01", "123")) {
            Err(SubmitError::ServerRejected { status, body: returned }) => {
                assert_eq!(status, 400);
                assert_eq!(returned, body);
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn success_status_other_than_created_is_rejected() {
        let (base, _seen) = stub::serve(vec![(200, "{}")]);
        let result = client(&base).submit(&record("PC-01", "123"));
        assert!(matches!(result, Err(SubmitError::ServerRejected { status: 200, .. })));
    }

    #[test]
    fn unreachable_service_is_a_connection_error() {
        let result = client(&stub::closed_port_url()).submit(&record("PC-01", "123"));
        assert!(matches!(result, Err(SubmitError::Connection(_))));
    }

    #[test]
    fn timeout_after_connecting_is_not_a_connection_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let slow = SubmissionClient::new(RegistryConfig::new(&base, Duration::from_millis(300)));

        let result = slow.submit(&record("PC-01", "123"));

        assert!(matches!(result, Err(SubmitError::Other(_))), "got {:?}", result);
        drop(listener);
    }
}
