use serde::{Serialize, Serializer};

/// Placeholder for any value no source could resolve.
pub const UNAVAILABLE: &str = "unavailable";
pub const NOT_IDENTIFIED: &str = "not identified";

/// Serializes `None` as the `"unavailable"` sentinel so the wire record never
/// carries a null.
pub fn or_unavailable<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    match value {
        Some(v) => v.serialize(serializer),
        None => serializer.serialize_str(UNAVAILABLE),
    }
}

pub fn or_not_identified<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    match value {
        Some(v) => v.serialize(serializer),
        None => serializer.serialize_str(NOT_IDENTIFIED),
    }
}

/// Final record sent to the registration service. Top-level keys follow the
/// service's schema.
#[derive(Debug, Clone, Serialize)]
pub struct InventoryRecord {
    #[serde(rename = "usuarioLogado")]
    pub logged_in_user: String,
    #[serde(rename = "nomeDispositivo")]
    pub device_name: String,
    #[serde(rename = "sistemaOperacional", serialize_with = "or_unavailable")]
    pub operating_system: Option<String>,
    #[serde(rename = "processador")]
    pub processor: ProcessorInfo,
    #[serde(rename = "disco")]
    pub disks: Vec<DiskInfo>,
    #[serde(rename = "ram")]
    pub memory: MemoryReport,
    #[serde(rename = "monitores")]
    pub displays: Vec<DisplayInfo>,
    #[serde(rename = "secretaria")]
    pub department: String,
    #[serde(rename = "setor")]
    pub sector: String,
    #[serde(rename = "matricula")]
    pub employee_id: String,
    #[serde(rename = "nomeCompleto")]
    pub full_name: String,
    #[serde(rename = "observacoes")]
    pub notes: String,
    #[serde(rename = "dataColeta")]
    pub collected_at: String,
}

/// Everything the collectors produce before user metadata is merged in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareSnapshot {
    pub logged_in_user: String,
    pub device_name: String,
    #[serde(serialize_with = "or_unavailable")]
    pub operating_system: Option<String>,
    pub processor: ProcessorInfo,
    pub disks: Vec<DiskInfo>,
    pub memory: MemoryReport,
    pub displays: Vec<DisplayInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArchitectureWidth {
    #[serde(rename = "32-bit")]
    Bits32,
    #[serde(rename = "64-bit")]
    Bits64,
    #[serde(rename = "unknown")]
    Unknown,
}

impl ArchitectureWidth {
    pub fn from_address_width(width: u32) -> Self {
        match width {
            32 => ArchitectureWidth::Bits32,
            64 => ArchitectureWidth::Bits64,
            _ => ArchitectureWidth::Unknown,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorInfo {
    pub manufacturer: String,
    pub model_name: String,
    #[serde(serialize_with = "or_not_identified")]
    pub inferred_generation: Option<u32>,
    pub architecture_width: ArchitectureWidth,
    #[serde(serialize_with = "or_unavailable")]
    pub core_count: Option<u32>,
    #[serde(serialize_with = "or_unavailable")]
    pub thread_count: Option<u32>,
    #[serde(serialize_with = "or_unavailable")]
    pub socket_designation: Option<String>,
    #[serde(serialize_with = "or_unavailable")]
    pub current_utilization_percent: Option<f32>,
    #[serde(rename = "maxFrequencyMHz", serialize_with = "or_unavailable")]
    pub max_frequency_mhz: Option<u64>,
}

impl ProcessorInfo {
    pub fn unavailable() -> Self {
        ProcessorInfo {
            manufacturer: UNAVAILABLE.to_string(),
            model_name: UNAVAILABLE.to_string(),
            inferred_generation: None,
            architecture_width: ArchitectureWidth::Unknown,
            core_count: None,
            thread_count: None,
            socket_designation: None,
            current_utilization_percent: None,
            max_frequency_mhz: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MediaType {
    #[serde(rename = "SSD")]
    Ssd,
    #[serde(rename = "HDD")]
    Hdd,
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskInfo {
    pub device_identifier: String,
    pub model: String,
    pub manufacturer: String,
    pub media_type: MediaType,
    pub interface_type: String,
    #[serde(rename = "capacityGB")]
    pub capacity_gb: f64,
    #[serde(rename = "rotationalSpeedRPM", serialize_with = "or_unavailable")]
    pub rotational_speed_rpm: Option<u32>,
    pub partitions: Vec<PartitionInfo>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionInfo {
    pub mount_identifier: String,
    #[serde(rename = "sizeGB")]
    pub size_gb: f64,
    #[serde(rename = "freeGB")]
    pub free_gb: f64,
    pub used_percent: f64,
}

impl PartitionInfo {
    pub fn new(mount_identifier: impl Into<String>, size_bytes: u64, free_bytes: u64) -> Self {
        let used_percent = if size_bytes > 0 {
            let used = size_bytes.saturating_sub(free_bytes) as f64;
            round2(used / size_bytes as f64 * 100.0)
        } else {
            0.0
        };
        PartitionInfo {
            mount_identifier: mount_identifier.into(),
            size_gb: bytes_to_gb(size_bytes),
            free_gb: bytes_to_gb(free_bytes),
            used_percent,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryReport {
    pub total_gb: f64,
    pub modules: Vec<MemoryModuleInfo>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryModuleInfo {
    #[serde(rename = "capacityGB")]
    pub capacity_gb: f64,
    #[serde(rename = "configuredSpeedMHz", serialize_with = "or_unavailable")]
    pub configured_speed_mhz: Option<u32>,
    pub manufacturer: String,
    pub memory_type: String,
    pub part_number: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayInfo {
    pub manufacturer: String,
    pub model: String,
    #[serde(serialize_with = "or_unavailable")]
    pub diagonal_size_inches: Option<f64>,
    pub connection_name: String,
    #[serde(serialize_with = "or_unavailable")]
    pub resolution: Option<String>,
}

impl DisplayInfo {
    /// Single explanatory entry used when no real display could be listed.
    pub fn placeholder(reason: &str) -> Self {
        DisplayInfo {
            manufacturer: UNAVAILABLE.to_string(),
            model: reason.to_string(),
            diagonal_size_inches: None,
            connection_name: UNAVAILABLE.to_string(),
            resolution: None,
        }
    }
}

pub fn bytes_to_gb(bytes: u64) -> f64 {
    round2(bytes as f64 / (1024.0 * 1024.0 * 1024.0))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Trimmed, non-empty, non-placeholder string or `None`.
pub fn clean_string(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| {
            !s.is_empty()
                && *s != "Not Specified"
                && *s != "To Be Filled By O.E.M."
                && *s != "Default string"
                && *s != "Unknown"
        })
        .map(str::to_string)
}

pub fn or_sentinel(value: Option<String>) -> String {
    value.unwrap_or_else(|| UNAVAILABLE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_processor_fields_serialize_as_sentinels() {
        let value = serde_json::to_value(ProcessorInfo::unavailable()).unwrap();

        assert_eq!(value["inferredGeneration"], "not identified");
        assert_eq!(value["coreCount"], "unavailable");
        assert_eq!(value["maxFrequencyMHz"], "unavailable");
        assert_eq!(value["architectureWidth"], "unknown");
    }

    #[test]
    fn partition_usage_is_derived_from_free_space() {
        let gib = 1024 * 1024 * 1024;
        let partition = PartitionInfo::new("C:", 100 * gib, 25 * gib);

        assert_eq!(partition.size_gb, 100.0);
        assert_eq!(partition.free_gb, 25.0);
        assert_eq!(partition.used_percent, 75.0);
    }

    #[test]
    fn zero_sized_partition_reports_no_usage() {
        assert_eq!(PartitionInfo::new("/boot", 0, 0).used_percent, 0.0);
    }

    #[test]
    fn clean_string_drops_firmware_placeholders() {
        assert_eq!(clean_string(Some("  Kingston ")), Some("Kingston".to_string()));
        assert_eq!(clean_string(Some("To Be Filled By O.E.M.")), None);
        assert_eq!(clean_string(Some("   ")), None);
        assert_eq!(clean_string(None), None);
    }
}
