//! Pure heuristics used by the collectors.

use crate::hardware::types::MediaType;

const SSD_KEYWORDS: [&str; 5] = ["ssd", "solid", "nvme", "flash", "m.2"];
const HDD_KEYWORDS: [&str; 2] = ["hdd", "hard"];
const CORE_FAMILIES: [&str; 4] = ["i3", "i5", "i7", "i9"];
const CORE_GENERATIONS_TWO_DIGIT: std::ops::RangeInclusive<u32> = 10..=14;

/// Collapses vendor strings such as `GenuineIntel` or `AuthenticAMD`.
pub fn normalize_cpu_vendor(raw: &str) -> String {
    let lower = raw.to_lowercase();
    if lower.contains("intel") {
        "Intel".to_string()
    } else if lower.contains("amd") {
        "AMD".to_string()
    } else {
        raw.trim().to_string()
    }
}

/// Infers the generation of an Intel Core processor from its model string.
///
/// An explicit `<N>th Gen` token wins. Otherwise the model number after the
/// first `-` is read: a two-digit prefix between 10 and 14 is the generation
/// (`10400`, `1165G7`, `1255U`), otherwise the leading digit is (`8700`).
/// Anything else is not identified.
pub fn infer_cpu_generation(manufacturer: &str, model: &str) -> Option<u32> {
    if !manufacturer.to_lowercase().contains("intel") {
        return None;
    }
    let lower = model.to_lowercase();
    if !lower.contains("core") {
        return None;
    }

    if let Some(generation) = explicit_generation(&lower) {
        return Some(generation);
    }

    if !CORE_FAMILIES.iter().any(|family| lower.contains(family)) {
        return None;
    }

    let (_, suffix) = model.split_once('-')?;
    let number = suffix.trim();
    if number.chars().count() < 4 {
        return None;
    }

    let digits: String = number.chars().take_while(char::is_ascii_digit).collect();
    if let Some(prefix) = digits.get(..2).and_then(|p| p.parse::<u32>().ok()) {
        if CORE_GENERATIONS_TWO_DIGIT.contains(&prefix) {
            return Some(prefix);
        }
    }

    number.chars().next()?.to_digit(10).filter(|d| *d > 0)
}

/// `12th Gen`, `13th gen` or a fused `12thgen`.
fn explicit_generation(lower: &str) -> Option<u32> {
    let tokens: Vec<&str> = lower.split_whitespace().collect();
    tokens.iter().enumerate().find_map(|(i, token)| {
        if !token.starts_with(|c: char| c.is_ascii_digit()) {
            return None;
        }
        let followed_by_gen = tokens.get(i + 1).is_some_and(|next| next.starts_with("gen"));
        if !token.contains("gen") && !followed_by_gen {
            return None;
        }
        let digits: String = token.chars().take_while(char::is_ascii_digit).collect();
        digits.parse().ok()
    })
}

/// First-pass media classification from the model string.
pub fn media_type_from_model(model: &str) -> Option<MediaType> {
    let lower = model.to_lowercase();
    if SSD_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Some(MediaType::Ssd)
    } else if HDD_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Some(MediaType::Hdd)
    } else {
        None
    }
}

/// Fallback for Windows: the logical disk's media-type code.
pub fn media_type_from_windows_code(code: Option<u64>) -> Option<MediaType> {
    match code? {
        12 => Some(MediaType::Ssd),
        _ => Some(MediaType::Hdd),
    }
}

/// Fallback for Posix: the `Rotation Rate:` field of `smartctl -i`.
/// Returns the media type and, for spinning disks, the RPM.
pub fn media_type_from_smartctl(output: &str) -> Option<(MediaType, Option<u32>)> {
    if output.contains("Solid State Device") {
        return Some((MediaType::Ssd, None));
    }

    let rate = output
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("Rotation Rate:"))?
        .trim();

    let rpm = rate
        .split_whitespace()
        .next()
        .and_then(|n| n.parse::<u32>().ok())?;
    Some((MediaType::Hdd, Some(rpm)))
}

/// Final classification: model keywords, then the secondary source.
pub fn classify_media(model: &str, secondary: Option<MediaType>) -> MediaType {
    media_type_from_model(model)
        .or(secondary)
        .unwrap_or(MediaType::Unknown)
}

/// CIM `MemoryType` codes.
const CIM_MEMORY_TYPES: [&str; 28] = [
    "Unknown",
    "Other",
    "DRAM",
    "EDRAM",
    "VRAM",
    "SRAM",
    "RAM",
    "ROM",
    "Flash",
    "EEPROM",
    "FEPROM",
    "EPROM",
    "CDRAM",
    "3DRAM",
    "SDRAM",
    "SGRAM",
    "RDRAM",
    "DDR",
    "DDR2",
    "DDR2 FB-DIMM",
    "DDR3",
    "FBD2",
    "DDR4",
    "LPDDR",
    "LPDDR2",
    "LPDDR3",
    "LPDDR4",
    "DDR5",
];

pub fn cim_memory_type_name(code: u64) -> Option<&'static str> {
    match code {
        0 => None,
        c => CIM_MEMORY_TYPES.get(c as usize).copied(),
    }
}

/// SMBIOS memory device type codes (type 17, offset 0x12).
pub fn smbios_memory_type_name(code: u64) -> Option<&'static str> {
    let name = match code {
        0x01 => "Other",
        0x03 => "DRAM",
        0x04 => "EDRAM",
        0x05 => "VRAM",
        0x06 => "SRAM",
        0x07 => "RAM",
        0x08 => "ROM",
        0x09 => "Flash",
        0x0A => "EEPROM",
        0x0B => "FEPROM",
        0x0C => "EPROM",
        0x0D => "CDRAM",
        0x0E => "3DRAM",
        0x0F => "SDRAM",
        0x10 => "SGRAM",
        0x11 => "RDRAM",
        0x12 => "DDR",
        0x13 => "DDR2",
        0x14 => "DDR2 FB-DIMM",
        0x18 => "DDR3",
        0x19 => "FBD2",
        0x1A => "DDR4",
        0x1B => "LPDDR",
        0x1C => "LPDDR2",
        0x1D => "LPDDR3",
        0x1E => "LPDDR4",
        0x1F => "Logical non-volatile device",
        0x20 => "HBM",
        0x21 => "HBM2",
        0x22 => "DDR5",
        0x23 => "LPDDR5",
        0x24 => "HBM3",
        _ => return None,
    };
    Some(name)
}

/// Module vendors reported as bare JEDEC numbers carry no information.
pub fn is_numeric_noise(manufacturer: &str) -> bool {
    let trimmed = manufacturer.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit())
}
