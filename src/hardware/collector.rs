use std::env;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use sysinfo::System;
use tracing::info;

use crate::error::MetadataError;
use crate::hardware::bridge;
use crate::hardware::platform::Platform;
use crate::hardware::types::{clean_string, or_sentinel, HardwareSnapshot, InventoryRecord};
use crate::hardware::{collect_cpu_info, collect_disks, collect_displays, collect_memory_info};

pub const COLLECTED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Runs the four collectors in sequence and captures host identity.
pub fn collect_hardware(platform: Platform) -> HardwareSnapshot {
    info!(?platform, "collecting hardware inventory");

    HardwareSnapshot {
        logged_in_user: logged_in_user(),
        device_name: or_sentinel(System::host_name().and_then(|h| clean_string(Some(h.as_str())))),
        operating_system: System::long_os_version().and_then(|v| clean_string(Some(v.as_str()))),
        processor: collect_cpu_info(platform),
        disks: collect_disks(platform),
        memory: collect_memory_info(platform),
        displays: collect_displays(platform),
    }
}

fn logged_in_user() -> String {
    let from_env = ["USERNAME", "USER"]
        .iter()
        .find_map(|var| env::var(var).ok())
        .and_then(|user| clean_string(Some(user.as_str())));

    let user = from_env.or_else(|| {
        bridge::run_command("whoami", &[])
            .ok()
            .and_then(|out| clean_string(Some(out.as_str())))
    });

    or_sentinel(user.map(|u| strip_domain(&u).to_string()))
}

/// `CORP\jdoe` -> `jdoe`.
fn strip_domain(user: &str) -> &str {
    user.rsplit_once('\\').map(|(_, name)| name).unwrap_or(user)
}

/// Fields supplied by the person running the registration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMetadata {
    pub department: String,
    pub sector: String,
    pub employee_id: String,
    pub full_name: String,
    #[serde(default)]
    pub notes: String,
}

impl UserMetadata {
    pub fn validate(&self) -> Result<(), MetadataError> {
        let required = [
            ("department", &self.department),
            ("sector", &self.sector),
            ("employee id", &self.employee_id),
            ("full name", &self.full_name),
        ];
        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((name, _)) => Err(MetadataError::Missing(*name)),
            None => Ok(()),
        }
    }
}

/// Merges a snapshot with user metadata into the record that is submitted.
pub fn assemble(snapshot: HardwareSnapshot, metadata: UserMetadata, collected_at: DateTime<Local>) -> InventoryRecord {
    InventoryRecord {
        logged_in_user: snapshot.logged_in_user,
        device_name: snapshot.device_name,
        operating_system: snapshot.operating_system,
        processor: snapshot.processor,
        disks: snapshot.disks,
        memory: snapshot.memory,
        displays: snapshot.displays,
        department: metadata.department.trim().to_string(),
        sector: metadata.sector.trim().to_string(),
        employee_id: metadata.employee_id.trim().to_string(),
        full_name: metadata.full_name.trim().to_string(),
        notes: metadata.notes.trim().to_string(),
        collected_at: collected_at.format(COLLECTED_AT_FORMAT).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::types::{DisplayInfo, MemoryReport, ProcessorInfo, UNAVAILABLE};
    use chrono::TimeZone;
    use serde_json::Value;

    fn metadata() -> UserMetadata {
        UserMetadata {
            department: "Saúde".to_string(),
            sector: " Almoxarifado ".to_string(),
            employee_id: "12345".to_string(),
            full_name: "Maria Souza".to_string(),
            notes: String::new(),
        }
    }

    fn unavailable_snapshot() -> HardwareSnapshot {
        HardwareSnapshot {
            logged_in_user: UNAVAILABLE.to_string(),
            device_name: UNAVAILABLE.to_string(),
            operating_system: None,
            processor: ProcessorInfo::unavailable(),
            disks: Vec::new(),
            memory: MemoryReport {
                total_gb: 0.0,
                modules: Vec::new(),
            },
            displays: vec![DisplayInfo::placeholder("no displays detected")],
        }
    }

    fn assert_no_nulls(value: &Value) {
        match value {
            Value::Null => panic!("record contains null"),
            Value::Array(items) => items.iter().for_each(assert_no_nulls),
            Value::Object(map) => map.values().for_each(assert_no_nulls),
            _ => {}
        }
    }

    #[test]
    fn unavailable_collectors_still_give_complete_record() {
        let collected_at = Local.with_ymd_and_hms(2024, 3, 5, 9, 7, 2).unwrap();
        let record = assemble(unavailable_snapshot(), metadata(), collected_at);
        let value = serde_json::to_value(&record).unwrap();

        assert_no_nulls(&value);
        for key in [
            "usuarioLogado",
            "nomeDispositivo",
            "sistemaOperacional",
            "processador",
            "disco",
            "ram",
            "monitores",
            "secretaria",
            "setor",
            "matricula",
            "nomeCompleto",
            "observacoes",
            "dataColeta",
        ] {
            assert!(value.get(key).is_some(), "missing key {}", key);
        }
        assert_eq!(value["sistemaOperacional"], UNAVAILABLE);
        assert_eq!(value["setor"], "Almoxarifado");
        assert_eq!(value["observacoes"], "");
        assert_eq!(value["dataColeta"], "2024-03-05 09:07:02");
        assert_eq!(value["processador"]["inferredGeneration"], "not identified");
    }

    #[test]
    fn blank_required_metadata_is_rejected() {
        assert_eq!(metadata().validate(), Ok(()));

        let mut missing = metadata();
        missing.full_name = "   ".to_string();
        assert_eq!(missing.validate(), Err(MetadataError::Missing("full name")));
    }

    #[test]
    fn domain_prefix_is_removed_from_user() {
        assert_eq!(strip_domain("CORP\\jdoe"), "jdoe");
        assert_eq!(strip_domain("jdoe"), "jdoe");
    }
}
