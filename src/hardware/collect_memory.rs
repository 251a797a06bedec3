use serde::Deserialize;
use smbioslib::*;
use sysinfo::{MemoryRefreshKind, RefreshKind, System};

use crate::error::CollectError;
use crate::hardware::bridge::{self, flexible_u64};
use crate::hardware::chain::FallbackChain;
use crate::hardware::classify::{cim_memory_type_name, is_numeric_noise, smbios_memory_type_name};
use crate::hardware::platform::Platform;
use crate::hardware::types::{
    bytes_to_gb, clean_string, or_sentinel, round2, MemoryModuleInfo, MemoryReport, NOT_IDENTIFIED,
};

const DMI_TABLE: &str = "/sys/firmware/dmi/tables/DMI";

pub fn collect_memory_info(platform: Platform) -> MemoryReport {
    let modules = FallbackChain::new("memory")
        .then_if(platform == Platform::Windows, "wmi", collect_with_wmi)
        .then_if(platform == Platform::Posix, "dmidecode", collect_with_dmidecode)
        .then_if(platform == Platform::Posix, "smbios", collect_with_smbios)
        .then("total-only", || Ok(Vec::new()))
        .resolve_or_else(Vec::new);

    MemoryReport {
        total_gb: total_memory_gb(),
        modules,
    }
}

fn total_memory_gb() -> f64 {
    let sys = System::new_with_specifics(RefreshKind::new().with_memory(MemoryRefreshKind::everything()));
    bytes_to_gb(sys.total_memory())
}

/// Vendor names that are bare JEDEC codes are reported as not identified.
fn module_manufacturer(raw: Option<&str>) -> String {
    match clean_string(raw) {
        Some(name) if is_numeric_noise(&name) => NOT_IDENTIFIED.to_string(),
        other => or_sentinel(other),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Win32PhysicalMemory {
    #[serde(default, deserialize_with = "flexible_u64")]
    capacity: Option<u64>,
    #[serde(default, deserialize_with = "flexible_u64")]
    configured_clock_speed: Option<u64>,
    manufacturer: Option<String>,
    #[serde(default, deserialize_with = "flexible_u64")]
    memory_type: Option<u64>,
    #[serde(rename = "SMBIOSMemoryType", default, deserialize_with = "flexible_u64")]
    smbios_memory_type: Option<u64>,
    part_number: Option<String>,
}

fn collect_with_wmi() -> Result<Vec<MemoryModuleInfo>, CollectError> {
    let rows: Vec<Win32PhysicalMemory> = bridge::query_cim(
        "Win32_PhysicalMemory",
        &[
            "Capacity",
            "ConfiguredClockSpeed",
            "Manufacturer",
            "MemoryType",
            "SMBIOSMemoryType",
            "PartNumber",
        ],
    )?;
    if rows.is_empty() {
        return Err(CollectError::unavailable("wmi", "no Win32_PhysicalMemory instances"));
    }
    Ok(rows.into_iter().map(module_from_wmi).collect())
}

fn module_from_wmi(row: Win32PhysicalMemory) -> MemoryModuleInfo {
    let memory_type = row
        .memory_type
        .and_then(cim_memory_type_name)
        .or_else(|| row.smbios_memory_type.and_then(smbios_memory_type_name));

    MemoryModuleInfo {
        capacity_gb: row.capacity.map(bytes_to_gb).unwrap_or(0.0),
        configured_speed_mhz: row
            .configured_clock_speed
            .filter(|mhz| *mhz > 0)
            .and_then(|mhz| u32::try_from(mhz).ok()),
        manufacturer: module_manufacturer(row.manufacturer.as_deref()),
        memory_type: or_sentinel(memory_type.map(str::to_string)),
        part_number: or_sentinel(clean_string(row.part_number.as_deref())),
    }
}

fn collect_with_dmidecode() -> Result<Vec<MemoryModuleInfo>, CollectError> {
    // -n: never block on a password prompt.
    let output = bridge::run_command("sudo", &["-n", "dmidecode", "-t", "17"])?;
    let modules = parse_dmidecode(&output);
    if modules.is_empty() {
        return Err(CollectError::incomplete("dmidecode", "Memory Device"));
    }
    Ok(modules)
}

fn parse_dmidecode(output: &str) -> Vec<MemoryModuleInfo> {
    output
        .split("Memory Device")
        .skip(1)
        .filter_map(parse_dmidecode_block)
        .collect()
}

fn dmidecode_field<'a>(block: &'a str, label: &str) -> Option<&'a str> {
    block.lines().find_map(|line| {
        let (key, value) = line.trim().split_once(':')?;
        (key.trim() == label).then(|| value.trim())
    })
}

fn is_real_value(value: &str) -> bool {
    !value.is_empty()
        && !matches!(
            value,
            "Unknown" | "No Module Installed" | "Not Specified" | "Not Provided" | "None"
        )
}

/// `8 GB`, `8192 MB` or `16384 kB` in gigabytes.
fn parse_dmidecode_size(value: &str) -> Option<f64> {
    let mut parts = value.split_whitespace();
    let amount: f64 = parts.next()?.parse().ok()?;
    let gb = match parts.next()? {
        "TB" => amount * 1024.0,
        "GB" => amount,
        "MB" => amount / 1024.0,
        "kB" | "KB" => amount / (1024.0 * 1024.0),
        _ => return None,
    };
    Some(round2(gb))
}

fn parse_speed(value: &str) -> Option<u32> {
    value.split_whitespace().next()?.parse().ok().filter(|mhz| *mhz > 0)
}

fn parse_dmidecode_block(block: &str) -> Option<MemoryModuleInfo> {
    let size = dmidecode_field(block, "Size").filter(|v| is_real_value(v))?;
    let memory_type = dmidecode_field(block, "Type").filter(|v| is_real_value(v))?;
    let speed = dmidecode_field(block, "Speed").filter(|v| is_real_value(v))?;

    let configured = dmidecode_field(block, "Configured Memory Speed")
        .or_else(|| dmidecode_field(block, "Configured Clock Speed"))
        .and_then(parse_speed);

    Some(MemoryModuleInfo {
        capacity_gb: parse_dmidecode_size(size)?,
        configured_speed_mhz: configured.or_else(|| parse_speed(speed)),
        manufacturer: module_manufacturer(dmidecode_field(block, "Manufacturer")),
        memory_type: memory_type.to_string(),
        part_number: or_sentinel(clean_string(dmidecode_field(block, "Part Number"))),
    })
}

/// Reads type 17 structures straight from the firmware table.
fn collect_with_smbios() -> Result<Vec<MemoryModuleInfo>, CollectError> {
    let smbios_data = SMBiosData::try_load_from_file(DMI_TABLE, None)
        .map_err(|e| CollectError::unavailable("smbios", e.to_string()))?;

    let modules: Vec<MemoryModuleInfo> = smbios_data
        .iter()
        .filter_map(|structure| match structure.defined_struct() {
            DefinedStruct::MemoryDevice(device) => module_from_smbios(&device),
            _ => None,
        })
        .collect();

    if modules.is_empty() {
        return Err(CollectError::incomplete("smbios", "MemoryDevice"));
    }
    Ok(modules)
}

fn module_from_smbios(device: &SMBiosMemoryDevice) -> Option<MemoryModuleInfo> {
    let size_bytes = match device.size()? {
        MemorySize::Kilobytes(kb) => u64::from(kb) * 1024,
        MemorySize::Megabytes(mb) => u64::from(mb) * 1024 * 1024,
        MemorySize::SeeExtendedSize => match device.extended_size()? {
            MemorySizeExtended::Megabytes(mb) => u64::from(mb) * 1024 * 1024,
            _ => return None,
        },
        _ => return None,
    };
    if size_bytes == 0 {
        return None;
    }

    let speed = match device.configured_memory_speed().or_else(|| device.speed()) {
        Some(MemorySpeed::MTs(mts)) if mts > 0 => Some(u32::from(mts)),
        _ => None,
    };
    let memory_type = device
        .memory_type()
        .and_then(|data| smbios_memory_type_name(u64::from(data.raw)));
    let text = |s: SMBiosString| s.to_utf8_lossy().and_then(|v| clean_string(Some(&*v)));

    Some(MemoryModuleInfo {
        capacity_gb: bytes_to_gb(size_bytes),
        configured_speed_mhz: speed,
        manufacturer: module_manufacturer(text(device.manufacturer()).as_deref()),
        memory_type: or_sentinel(memory_type.map(str::to_string)),
        part_number: or_sentinel(text(device.part_number())),
    })
}
