use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use sysinfo::{DiskKind, Disks};

use crate::error::CollectError;
use crate::hardware::bridge::{self, flexible_u64};
use crate::hardware::chain::FallbackChain;
use crate::hardware::classify::{
    classify_media, media_type_from_smartctl, media_type_from_windows_code,
};
use crate::hardware::platform::Platform;
use crate::hardware::types::{
    bytes_to_gb, clean_string, or_sentinel, DiskInfo, MediaType, PartitionInfo,
};

/// Entry point: collect all physical disks on this machine.
pub fn collect_disks(platform: Platform) -> Vec<DiskInfo> {
    FallbackChain::new("disks")
        .then_if(platform == Platform::Windows, "wmi", collect_with_wmi)
        .then_if(platform == Platform::Posix, "lsblk", collect_with_lsblk)
        .then("sysinfo", collect_with_sysinfo)
        .resolve_or_else(Vec::new)
}

//
// Windows: physical drives joined to logical volumes through the
// association tables.
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Win32DiskDrive {
    #[serde(rename = "DeviceID")]
    device_id: Option<String>,
    model: Option<String>,
    manufacturer: Option<String>,
    interface_type: Option<String>,
    #[serde(default, deserialize_with = "flexible_u64")]
    size: Option<u64>,
    #[serde(default, deserialize_with = "flexible_u64")]
    max_media_size: Option<u64>,
}

/// One row of an association table, flattened to the two key properties.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Association {
    antecedent: Option<String>,
    dependent: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Win32LogicalDisk {
    #[serde(rename = "DeviceID")]
    device_id: Option<String>,
    #[serde(default, deserialize_with = "flexible_u64")]
    size: Option<u64>,
    #[serde(default, deserialize_with = "flexible_u64")]
    free_space: Option<u64>,
    #[serde(default, deserialize_with = "flexible_u64")]
    media_type: Option<u64>,
}

fn query_association(class: &str) -> Result<Vec<Association>, CollectError> {
    let script = format!(
        "Get-CimInstance -ClassName {} | Select-Object @{{n='Antecedent';e={{$_.Antecedent.DeviceID}}}},@{{n='Dependent';e={{$_.Dependent.DeviceID}}}} | ConvertTo-Json -Compress",
        class
    );
    bridge::parse_cim_rows(&bridge::run_powershell(&script)?)
}

fn collect_with_wmi() -> Result<Vec<DiskInfo>, CollectError> {
    let drives: Vec<Win32DiskDrive> = bridge::query_cim(
        "Win32_DiskDrive",
        &["DeviceID", "Model", "Manufacturer", "InterfaceType", "Size", "MaxMediaSize"],
    )?;
    if drives.is_empty() {
        return Err(CollectError::unavailable("wmi", "no Win32_DiskDrive instances"));
    }

    // Partition details are best effort; a drive list alone is still useful.
    let drive_to_partition = query_association("Win32_DiskDriveToDiskPartition").unwrap_or_default();
    let partition_to_logical = query_association("Win32_LogicalDiskToPartition").unwrap_or_default();
    let logical_disks: Vec<Win32LogicalDisk> = bridge::query_cim(
        "Win32_LogicalDisk",
        &["DeviceID", "Size", "FreeSpace", "MediaType"],
    )
    .unwrap_or_default();

    Ok(join_wmi_disks(drives, &drive_to_partition, &partition_to_logical, &logical_disks))
}

/// `\\.\PHYSICALDRIVE0` and `PHYSICALDRIVE0` name the same drive depending on
/// which table they came from.
fn normalize_drive_id(id: &str) -> String {
    id.trim_start_matches("\\\\.\\").to_uppercase()
}

fn join_wmi_disks(
    drives: Vec<Win32DiskDrive>,
    drive_to_partition: &[Association],
    partition_to_logical: &[Association],
    logical_disks: &[Win32LogicalDisk],
) -> Vec<DiskInfo> {
    let logical_by_id: HashMap<&str, &Win32LogicalDisk> = logical_disks
        .iter()
        .filter_map(|l| l.device_id.as_deref().map(|id| (id, l)))
        .collect();

    drives
        .into_iter()
        .map(|drive| {
            let drive_id = drive.device_id.as_deref().map(normalize_drive_id).unwrap_or_default();

            let volumes: Vec<&Win32LogicalDisk> = drive_to_partition
                .iter()
                .filter(|link| {
                    link.antecedent.as_deref().map(normalize_drive_id).as_deref() == Some(drive_id.as_str())
                })
                .filter_map(|link| link.dependent.as_deref())
                .flat_map(move |partition_id| {
                    partition_to_logical
                        .iter()
                        .filter(move |link| link.antecedent.as_deref() == Some(partition_id))
                        .filter_map(|link| link.dependent.as_deref())
                })
                .filter_map(|logical_id| logical_by_id.get(logical_id).copied())
                .collect();

            let partitions = volumes
                .iter()
                .filter_map(|volume| {
                    let size = volume.size.filter(|s| *s > 0)?;
                    Some(PartitionInfo::new(
                        volume.device_id.clone().unwrap_or_default(),
                        size,
                        volume.free_space.unwrap_or(0),
                    ))
                })
                .collect();

            let model = or_sentinel(clean_string(drive.model.as_deref()));
            let secondary = volumes
                .iter()
                .find_map(|volume| media_type_from_windows_code(volume.media_type));
            let media_type = classify_media(&model, secondary);

            DiskInfo {
                device_identifier: or_sentinel(clean_string(drive.device_id.as_deref())),
                manufacturer: or_sentinel(clean_string(drive.manufacturer.as_deref())),
                interface_type: or_sentinel(clean_string(drive.interface_type.as_deref())),
                capacity_gb: drive.size.map(bytes_to_gb).unwrap_or(0.0),
                rotational_speed_rpm: rotational_speed(media_type, drive.max_media_size),
                media_type,
                model,
                partitions,
            }
        })
        .collect()
}

fn rotational_speed(media_type: MediaType, reported: Option<u64>) -> Option<u32> {
    match media_type {
        MediaType::Hdd => reported.filter(|v| *v > 0).and_then(|v| u32::try_from(v).ok()),
        _ => None,
    }
}

//
// Posix: lsblk for the device tree, smartctl for the media type.
//

#[derive(Debug, Deserialize)]
struct LsblkOutput {
    #[serde(default)]
    blockdevices: Vec<LsblkDevice>,
}

#[derive(Debug, Deserialize)]
struct LsblkDevice {
    name: String,
    #[serde(default)]
    size: Value,
    model: Option<String>,
    vendor: Option<String>,
    tran: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    mountpoint: Option<String>,
    #[serde(default)]
    fsavail: Value,
    #[serde(default)]
    children: Vec<LsblkDevice>,
}

/// Older util-linux prints byte counts as strings even with `-b`.
fn json_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn collect_with_lsblk() -> Result<Vec<DiskInfo>, CollectError> {
    let output = bridge::run_command(
        "lsblk",
        &["-J", "-b", "-o", "NAME,SIZE,MODEL,VENDOR,TRAN,TYPE,MOUNTPOINT,FSAVAIL"],
    )?;
    let smartctl_available = bridge::command_exists("smartctl");

    parse_lsblk(&output, |name| {
        if !smartctl_available {
            return None;
        }
        let dev_path = format!("/dev/{}", name);
        bridge::run_command_lenient("smartctl", &["-i", &dev_path]).ok()
    })
}

fn parse_lsblk<F>(output: &str, mut smartctl_info: F) -> Result<Vec<DiskInfo>, CollectError>
where
    F: FnMut(&str) -> Option<String>,
{
    let parsed: LsblkOutput = serde_json::from_str(output)
        .map_err(|e| CollectError::unavailable("lsblk", format!("invalid JSON: {}", e)))?;

    let disks = parsed
        .blockdevices
        .into_iter()
        .filter(|device| device.kind.as_deref().unwrap_or("disk") == "disk")
        .filter(|device| !device.name.starts_with("loop") && !device.name.starts_with("zram"))
        .map(|device| {
            let model = or_sentinel(clean_string(device.model.as_deref()));
            let smart = smartctl_info(&device.name)
                .as_deref()
                .and_then(media_type_from_smartctl);
            let media_type = classify_media(&model, smart.map(|(kind, _)| kind));
            let rpm = match (media_type, smart) {
                (MediaType::Hdd, Some((_, rpm))) => rpm,
                _ => None,
            };

            let mut partitions = Vec::new();
            collect_mounted(&device, &mut partitions);

            DiskInfo {
                device_identifier: format!("/dev/{}", device.name),
                manufacturer: or_sentinel(clean_string(device.vendor.as_deref())),
                interface_type: or_sentinel(clean_string(device.tran.as_deref())),
                capacity_gb: json_u64(&device.size).map(bytes_to_gb).unwrap_or(0.0),
                rotational_speed_rpm: rpm,
                media_type,
                model,
                partitions,
            }
        })
        .collect();

    Ok(disks)
}

/// Walks partitions (and nested LVM/crypt volumes) collecting mounted ones.
fn collect_mounted(device: &LsblkDevice, out: &mut Vec<PartitionInfo>) {
    for child in &device.children {
        if let (Some(mountpoint), Some(size)) = (child.mountpoint.as_deref(), json_u64(&child.size)) {
            if !mountpoint.is_empty() && mountpoint != "[SWAP]" {
                out.push(PartitionInfo::new(mountpoint, size, json_u64(&child.fsavail).unwrap_or(0)));
            }
        }
        collect_mounted(child, out);
    }
}

//
// Generic: mounted filesystems as reported by sysinfo.
//

fn collect_with_sysinfo() -> Result<Vec<DiskInfo>, CollectError> {
    let disks = Disks::new_with_refreshed_list();
    if disks.list().is_empty() {
        return Err(CollectError::unavailable("sysinfo", "no disks reported"));
    }

    Ok(disks
        .list()
        .iter()
        .map(|disk| {
            let name = disk.name().to_string_lossy().to_string();
            let mount = disk.mount_point().to_string_lossy().to_string();
            let secondary = match disk.kind() {
                DiskKind::SSD => Some(MediaType::Ssd),
                DiskKind::HDD => Some(MediaType::Hdd),
                DiskKind::Unknown(_) => None,
            };
            let model = or_sentinel(clean_string(Some(name.as_str())));

            DiskInfo {
                device_identifier: or_sentinel(clean_string(Some(name.as_str())).or_else(|| clean_string(Some(mount.as_str())))),
                media_type: classify_media(&model, secondary),
                manufacturer: or_sentinel(None),
                interface_type: or_sentinel(None),
                capacity_gb: bytes_to_gb(disk.total_space()),
                rotational_speed_rpm: None,
                partitions: vec![PartitionInfo::new(mount, disk.total_space(), disk.available_space())],
                model,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::types::UNAVAILABLE;

    const LSBLK: &str = r#"{
       "blockdevices": [
          {"name":"sda", "size":1000204886016, "model":"ST1000DM010-2EP102", "vendor":"ATA     ", "tran":"sata", "type":"disk", "mountpoint":null, "fsavail":null,
             "children": [
                {"name":"sda1", "size":"1000203837440", "model":null, "vendor":null, "tran":null, "type":"part", "mountpoint":"/data", "fsavail":"400081534976"}
             ]
          },
          {"name":"nvme0n1", "size":512110190592, "model":"Samsung SSD 970 EVO Plus 500GB", "vendor":null, "tran":"nvme", "type":"disk", "mountpoint":null, "fsavail":null,
             "children": [
                {"name":"nvme0n1p1", "size":536870912, "type":"part", "mountpoint":"/boot/efi", "fsavail":530000000},
                {"name":"nvme0n1p2", "size":511571132416, "type":"part", "mountpoint":null, "fsavail":null,
                   "children": [
                      {"name":"vg-root", "size":107374182400, "type":"lvm", "mountpoint":"/", "fsavail":53687091200},
                      {"name":"vg-swap", "size":8589934592, "type":"lvm", "mountpoint":"[SWAP]", "fsavail":null}
                   ]
                }
             ]
          },
          {"name":"loop0", "size":4096, "type":"loop", "mountpoint":"/snap/core/1"},
          {"name":"sr0", "size":1073741312, "model":"DVD-RW", "type":"rom"}
       ]
    }"#;

    #[test]
    fn lsblk_tree_becomes_physical_disks() {
        let disks = parse_lsblk(LSBLK, |name| match name {
            "sda" => Some("Rotation Rate:    7200 rpm\n".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(disks.len(), 2);

        let hdd = &disks[0];
        assert_eq!(hdd.device_identifier, "/dev/sda");
        assert_eq!(hdd.manufacturer, "ATA");
        assert_eq!(hdd.interface_type, "sata");
        assert_eq!(hdd.media_type, MediaType::Hdd);
        assert_eq!(hdd.rotational_speed_rpm, Some(7200));
        assert_eq!(hdd.partitions.len(), 1);
        assert_eq!(hdd.partitions[0].mount_identifier, "/data");

        let ssd = &disks[1];
        assert_eq!(ssd.media_type, MediaType::Ssd);
        assert_eq!(ssd.rotational_speed_rpm, None);
        let mounts: Vec<&str> = ssd.partitions.iter().map(|p| p.mount_identifier.as_str()).collect();
        assert_eq!(mounts, vec!["/boot/efi", "/"]);
        assert_eq!(ssd.partitions[1].free_gb, 50.0);
    }

    #[test]
    fn lsblk_disk_without_hints_is_unknown() {
        let output = r#"{"blockdevices":[{"name":"vda","size":"21474836480","model":null,"type":"disk"}]}"#;
        let disks = parse_lsblk(output, |_| None).unwrap();

        assert_eq!(disks[0].media_type, MediaType::Unknown);
        assert_eq!(disks[0].model, UNAVAILABLE);
        assert_eq!(disks[0].capacity_gb, 20.0);
    }

    #[test]
    fn keyword_classification_overrides_smartctl() {
        let output = r#"{"blockdevices":[{"name":"sdb","size":1,"model":"Generic Flash Disk","type":"disk"}]}"#;
        let disks = parse_lsblk(output, |_| Some("Rotation Rate: 5400 rpm".to_string())).unwrap();

        assert_eq!(disks[0].media_type, MediaType::Ssd);
        assert_eq!(disks[0].rotational_speed_rpm, None);
    }

    #[test]
    fn invalid_lsblk_output_is_soft_failure() {
        assert!(parse_lsblk("lsblk: unknown column", |_| None).is_err());
    }

    fn drive(id: &str, model: &str) -> Win32DiskDrive {
        Win32DiskDrive {
            device_id: Some(id.to_string()),
            model: Some(model.to_string()),
            manufacturer: Some("(Standard disk drives)".to_string()),
            interface_type: Some("SCSI".to_string()),
            size: Some(256 * 1024 * 1024 * 1024),
            max_media_size: Some(7200),
        }
    }

    fn link(antecedent: &str, dependent: &str) -> Association {
        Association {
            antecedent: Some(antecedent.to_string()),
            dependent: Some(dependent.to_string()),
        }
    }

    #[test]
    fn wmi_tables_join_partitions_to_drives() {
        let gib = 1024 * 1024 * 1024;
        let drives = vec![drive("\\\\.\\PHYSICALDRIVE0", "ST500LM030"), drive("\\\\.\\PHYSICALDRIVE1", "KINGSTON SA400S37")];
        let drive_to_partition = vec![
            link("\\\\.\\PHYSICALDRIVE0", "Disk #0, Partition #0"),
            link("PHYSICALDRIVE1", "Disk #1, Partition #0"),
        ];
        let partition_to_logical = vec![link("Disk #0, Partition #0", "D:"), link("Disk #1, Partition #0", "C:")];
        let logical = vec![
            Win32LogicalDisk { device_id: Some("C:".into()), size: Some(200 * gib), free_space: Some(50 * gib), media_type: Some(12) },
            Win32LogicalDisk { device_id: Some("D:".into()), size: Some(400 * gib), free_space: Some(100 * gib), media_type: Some(11) },
        ];

        let disks = join_wmi_disks(drives, &drive_to_partition, &partition_to_logical, &logical);

        assert_eq!(disks[0].partitions.len(), 1);
        assert_eq!(disks[0].partitions[0].mount_identifier, "D:");
        assert_eq!(disks[0].media_type, MediaType::Hdd);
        assert_eq!(disks[0].rotational_speed_rpm, Some(7200));

        assert_eq!(disks[1].partitions[0].mount_identifier, "C:");
        assert_eq!(disks[1].partitions[0].used_percent, 75.0);
        assert_eq!(disks[1].media_type, MediaType::Ssd);
        assert_eq!(disks[1].rotational_speed_rpm, None);
        assert_eq!(disks[1].capacity_gb, 256.0);
    }

    #[test]
    fn wmi_drive_without_links_keeps_model_classification_only() {
        let disks = join_wmi_disks(vec![drive("\\\\.\\PHYSICALDRIVE2", "Virtual Disk")], &[], &[], &[]);

        assert!(disks[0].partitions.is_empty());
        assert_eq!(disks[0].media_type, MediaType::Unknown);
        assert_eq!(disks[0].rotational_speed_rpm, None);
    }
}
