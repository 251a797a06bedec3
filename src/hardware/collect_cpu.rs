use serde::Deserialize;
use smbioslib::*;
use sysinfo::{CpuRefreshKind, RefreshKind, System, MINIMUM_CPU_UPDATE_INTERVAL};

use crate::error::CollectError;
use crate::hardware::bridge::{self, flexible_u64};
use crate::hardware::chain::FallbackChain;
use crate::hardware::classify::{infer_cpu_generation, normalize_cpu_vendor};
use crate::hardware::platform::Platform;
use crate::hardware::types::{clean_string, ArchitectureWidth, ProcessorInfo, UNAVAILABLE};

const DMI_TABLE: &str = "/sys/firmware/dmi/tables/DMI";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Win32Processor {
    manufacturer: Option<String>,
    name: Option<String>,
    socket_designation: Option<String>,
    #[serde(default, deserialize_with = "flexible_u64")]
    number_of_cores: Option<u64>,
    #[serde(default, deserialize_with = "flexible_u64")]
    number_of_logical_processors: Option<u64>,
    #[serde(default, deserialize_with = "flexible_u64")]
    address_width: Option<u64>,
    #[serde(default, deserialize_with = "flexible_u64")]
    max_clock_speed: Option<u64>,
}

pub fn collect_cpu_info(platform: Platform) -> ProcessorInfo {
    let mut info = FallbackChain::new("processor")
        .then_if(platform == Platform::Windows, "wmi", collect_with_wmi)
        .then_if(platform == Platform::Posix, "lscpu", collect_with_lscpu)
        .then("sysinfo", collect_with_sysinfo)
        .resolve_or_else(ProcessorInfo::unavailable);

    info.current_utilization_percent = sample_utilization();
    info
}

fn collect_with_wmi() -> Result<ProcessorInfo, CollectError> {
    let processors: Vec<Win32Processor> = bridge::query_cim(
        "Win32_Processor",
        &[
            "Manufacturer",
            "Name",
            "SocketDesignation",
            "NumberOfCores",
            "NumberOfLogicalProcessors",
            "AddressWidth",
            "MaxClockSpeed",
        ],
    )?;
    let processor = processors
        .into_iter()
        .next()
        .ok_or_else(|| CollectError::unavailable("wmi", "no Win32_Processor instances"))?;

    Ok(processor_from_wmi(processor))
}

fn processor_from_wmi(processor: Win32Processor) -> ProcessorInfo {
    let manufacturer = clean_string(processor.manufacturer.as_deref())
        .map(|m| normalize_cpu_vendor(&m))
        .unwrap_or_else(|| UNAVAILABLE.to_string());
    let model_name = clean_string(processor.name.as_deref()).unwrap_or_else(|| UNAVAILABLE.to_string());

    ProcessorInfo {
        inferred_generation: infer_cpu_generation(&manufacturer, &model_name),
        architecture_width: processor
            .address_width
            .map(|w| ArchitectureWidth::from_address_width(w as u32))
            .unwrap_or(ArchitectureWidth::Unknown),
        core_count: processor.number_of_cores.map(|c| c as u32),
        thread_count: processor.number_of_logical_processors.map(|t| t as u32),
        socket_designation: clean_string(processor.socket_designation.as_deref()),
        current_utilization_percent: None,
        max_frequency_mhz: processor.max_clock_speed.filter(|mhz| *mhz > 0),
        manufacturer,
        model_name,
    }
}

fn collect_with_lscpu() -> Result<ProcessorInfo, CollectError> {
    let output = bridge::run_command("lscpu", &[])?;
    let mut info = parse_lscpu(&output)?;
    if info.socket_designation.is_none() {
        info.socket_designation = smbios_socket_designation();
    }
    Ok(info)
}

fn lscpu_field<'a>(output: &'a str, label: &str) -> Option<&'a str> {
    output.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim() == label {
            Some(value.trim()).filter(|v| !v.is_empty())
        } else {
            None
        }
    })
}

fn parse_lscpu(output: &str) -> Result<ProcessorInfo, CollectError> {
    let model_name = lscpu_field(output, "Model name")
        .ok_or_else(|| CollectError::incomplete("lscpu", "Model name"))?
        .to_string();
    let manufacturer = lscpu_field(output, "Vendor ID")
        .map(normalize_cpu_vendor)
        .unwrap_or_else(|| UNAVAILABLE.to_string());

    let parse_u32 = |label: &str| lscpu_field(output, label).and_then(|v| v.parse::<u32>().ok());

    let thread_count = parse_u32("CPU(s)");
    let core_count = match (parse_u32("Core(s) per socket"), parse_u32("Socket(s)")) {
        (Some(per_socket), Some(sockets)) => Some(per_socket * sockets),
        (Some(per_socket), None) => Some(per_socket),
        _ => None,
    };

    let architecture_width = match lscpu_field(output, "CPU op-mode(s)") {
        Some(modes) if modes.contains("64-bit") => ArchitectureWidth::Bits64,
        Some(modes) if modes.contains("32-bit") => ArchitectureWidth::Bits32,
        _ => match lscpu_field(output, "Architecture") {
            Some(arch) if arch.contains("64") => ArchitectureWidth::Bits64,
            Some(arch) if arch.starts_with('i') && arch.ends_with("86") => ArchitectureWidth::Bits32,
            _ => ArchitectureWidth::Unknown,
        },
    };

    let max_frequency_mhz = lscpu_field(output, "CPU max MHz")
        .or_else(|| lscpu_field(output, "CPU MHz"))
        .and_then(|v| v.replace(',', ".").parse::<f64>().ok())
        .map(|mhz| mhz.round() as u64);

    Ok(ProcessorInfo {
        inferred_generation: infer_cpu_generation(&manufacturer, &model_name),
        architecture_width,
        core_count,
        thread_count,
        socket_designation: None,
        current_utilization_percent: None,
        max_frequency_mhz,
        manufacturer,
        model_name,
    })
}

/// Socket name from the first SMBIOS processor structure, if the DMI table
/// is readable (usually requires root).
fn smbios_socket_designation() -> Option<String> {
    let smbios_data = SMBiosData::try_load_from_file(DMI_TABLE, None).ok()?;
    smbios_data.iter().find_map(|structure| match structure.defined_struct() {
        DefinedStruct::ProcessorInformation(processor) => {
            let socket = processor.socket_designation().to_utf8_lossy()?;
            clean_string(Some(&*socket))
        }
        _ => None,
    })
}

/// Generic source: brand string and frequency only. No generation inference.
fn collect_with_sysinfo() -> Result<ProcessorInfo, CollectError> {
    let sys = System::new_with_specifics(RefreshKind::new().with_cpu(CpuRefreshKind::everything()));
    let cpu = sys
        .cpus()
        .first()
        .ok_or_else(|| CollectError::unavailable("sysinfo", "no CPUs reported"))?;

    let brand = clean_string(Some(cpu.brand())).unwrap_or_else(|| UNAVAILABLE.to_string());
    let manufacturer = clean_string(Some(cpu.vendor_id()))
        .map(|v| normalize_cpu_vendor(&v))
        .unwrap_or_else(|| UNAVAILABLE.to_string());

    Ok(ProcessorInfo {
        manufacturer,
        model_name: brand,
        inferred_generation: None,
        architecture_width: ArchitectureWidth::Unknown,
        core_count: None,
        thread_count: None,
        socket_designation: None,
        current_utilization_percent: None,
        max_frequency_mhz: Some(cpu.frequency()).filter(|mhz| *mhz > 0),
    })
}

/// Global CPU usage over one sysinfo update interval.
fn sample_utilization() -> Option<f32> {
    let mut sys = System::new_with_specifics(RefreshKind::new().with_cpu(CpuRefreshKind::new().with_cpu_usage()));
    std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_cpu_usage();
    let usage = sys.global_cpu_usage();
    if usage.is_finite() {
        Some((usage * 100.0).round() / 100.0)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LSCPU_INTEL: &str = "\
Architecture:            x86_64
  CPU op-mode(s):        32-bit, 64-bit
  Address sizes:         39 bits physical, 48 bits virtual
CPU(s):                  12
  On-line CPU(s) list:   0-11
Vendor ID:               GenuineIntel
  Model name:            Intel(R) Core(TM) i5-10400 CPU @ 2.90GHz
    CPU family:          6
    Thread(s) per core:  2
    Core(s) per socket:  6
    Socket(s):           1
    CPU max MHz:         4300,0000
    CPU min MHz:         800,0000
NUMA node0 CPU(s):       0-11
";

    #[test]
    fn lscpu_output_maps_to_processor_info() {
        let info = parse_lscpu(LSCPU_INTEL).unwrap();

        assert_eq!(info.manufacturer, "Intel");
        assert_eq!(info.model_name, "Intel(R) Core(TM) i5-10400 CPU @ 2.90GHz");
        assert_eq!(info.inferred_generation, Some(10));
        assert_eq!(info.thread_count, Some(12));
        assert_eq!(info.core_count, Some(6));
        assert_eq!(info.architecture_width, ArchitectureWidth::Bits64);
        assert_eq!(info.max_frequency_mhz, Some(4300));
    }

    #[test]
    fn lscpu_without_model_name_is_incomplete() {
        let result = parse_lscpu("Architecture: aarch64\nCPU(s): 4\n");
        assert!(matches!(result, Err(CollectError::ParseIncomplete { field: "Model name", .. })));
    }

    #[test]
    fn amd_lscpu_gets_no_generation() {
        let output = "Vendor ID: AuthenticAMD\nModel name: AMD Ryzen 7 5800X 8-Core Processor\nCPU(s): 16\nArchitecture: x86_64\n";
        let info = parse_lscpu(output).unwrap();

        assert_eq!(info.manufacturer, "AMD");
        assert_eq!(info.inferred_generation, None);
        assert_eq!(info.core_count, None);
        assert_eq!(info.architecture_width, ArchitectureWidth::Bits64);
    }

    #[test]
    fn wmi_processor_is_normalised() {
        let rows: Vec<Win32Processor> = bridge::parse_cim_rows(
            r#"{"Manufacturer":"GenuineIntel","Name":"12th Gen Intel(R) Core(TM) i7-12700","SocketDesignation":"LGA1700","NumberOfCores":12,"NumberOfLogicalProcessors":20,"AddressWidth":64,"MaxClockSpeed":2100}"#,
        )
        .unwrap();
        let info = processor_from_wmi(rows.into_iter().next().unwrap());

        assert_eq!(info.manufacturer, "Intel");
        assert_eq!(info.inferred_generation, Some(12));
        assert_eq!(info.socket_designation.as_deref(), Some("LGA1700"));
        assert_eq!(info.core_count, Some(12));
        assert_eq!(info.thread_count, Some(20));
        assert_eq!(info.architecture_width, ArchitectureWidth::Bits64);
        assert_eq!(info.max_frequency_mhz, Some(2100));
    }

    #[test]
    fn wmi_processor_with_missing_fields_uses_sentinels() {
        let rows: Vec<Win32Processor> = bridge::parse_cim_rows(r#"{"Name":null}"#).unwrap();
        let info = processor_from_wmi(rows.into_iter().next().unwrap());

        assert_eq!(info.manufacturer, UNAVAILABLE);
        assert_eq!(info.model_name, UNAVAILABLE);
        assert_eq!(info.architecture_width, ArchitectureWidth::Unknown);
        assert_eq!(info.core_count, None);
    }
}
