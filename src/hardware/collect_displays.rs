use crate::error::CollectError;
use crate::hardware::bridge;
use crate::hardware::chain::FallbackChain;
use crate::hardware::platform::Platform;
use crate::hardware::types::{clean_string, or_sentinel, DisplayInfo, UNAVAILABLE};

const HELPER_SCRIPT: &str = include_str!("../../scripts/collect_displays.ps1");

const NO_DISPLAYS_SENTINEL: &str = "NENHUM_MONITOR_DETECTADO";
const RECORD_SEPARATOR: &str = "---FIM_MONITOR---";
const NO_DISPLAYS_DETECTED: &str = "no displays detected";
const XRANDR_MISSING: &str = "display information not available (xrandr not found)";
const DISPLAYS_UNAVAILABLE: &str = "display information unavailable";
const DETECTED: &str = "Detected";

pub fn collect_displays(platform: Platform) -> Vec<DisplayInfo> {
    let displays = FallbackChain::new("displays")
        .then_if(platform == Platform::Windows, "display helper", || {
            DisplayHelper::query().map(|output| parse_helper_output(&output))
        })
        .then_if(platform == Platform::Posix, "xrandr", collect_with_xrandr)
        .run()
        .map(|(displays, _)| displays);

    let xrandr_present = platform == Platform::Posix && bridge::command_exists("xrandr");
    displays_or_placeholder(displays, platform, xrandr_present)
}

/// Never empty: a failed or empty lookup becomes one explanatory entry.
fn displays_or_placeholder(found: Option<Vec<DisplayInfo>>, platform: Platform, xrandr_present: bool) -> Vec<DisplayInfo> {
    let reason = match found {
        Some(displays) if !displays.is_empty() => return displays,
        Some(_) => NO_DISPLAYS_DETECTED,
        None if platform == Platform::Posix && !xrandr_present => XRANDR_MISSING,
        None if platform == Platform::Posix => DISPLAYS_UNAVAILABLE,
        None => NO_DISPLAYS_DETECTED,
    };
    vec![DisplayInfo::placeholder(reason)]
}

/// Embedded PowerShell helper that enumerates monitors through
/// `WmiMonitorID` and answers in a line protocol via an output file.
pub struct DisplayHelper;

impl DisplayHelper {
    pub fn query() -> Result<String, CollectError> {
        bridge::run_file_helper(HELPER_SCRIPT)
    }
}

/// `23.8"` or `23.8` in inches; `Desconhecido` and friends are unknown.
fn parse_inches(value: &str) -> Option<f64> {
    value
        .trim()
        .trim_end_matches('"')
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|inches| *inches > 0.0)
}

fn parse_helper_output(output: &str) -> Vec<DisplayInfo> {
    if output.contains(NO_DISPLAYS_SENTINEL) {
        return Vec::new();
    }

    output
        .split(RECORD_SEPARATOR)
        .filter_map(|record| {
            let mut manufacturer = None;
            let mut model = None;
            let mut size = None;
            let mut seen = false;

            for line in record.lines().map(str::trim) {
                if line.starts_with("MONITOR_") || line.starts_with("QUANTIDADE_MONITORES:") {
                    continue;
                }
                if let Some(value) = line.strip_prefix("FABRICANTE:") {
                    manufacturer = clean_string(Some(value));
                    seen = true;
                } else if let Some(value) = line.strip_prefix("MODELO:") {
                    model = clean_string(Some(value));
                    seen = true;
                } else if let Some(value) = line.strip_prefix("TAMANHO:") {
                    size = parse_inches(value);
                    seen = true;
                }
            }

            seen.then(|| DisplayInfo {
                manufacturer: or_sentinel(manufacturer),
                model: or_sentinel(model),
                diagonal_size_inches: size,
                connection_name: UNAVAILABLE.to_string(),
                resolution: None,
            })
        })
        .collect()
}

fn collect_with_xrandr() -> Result<Vec<DisplayInfo>, CollectError> {
    if !bridge::command_exists("xrandr") {
        return Err(CollectError::unavailable("xrandr", "not found on PATH"));
    }
    let output = bridge::run_command("xrandr", &["--verbose"])?;
    Ok(parse_xrandr(&output))
}

#[derive(Default)]
struct XrandrOutput {
    name: String,
    resolution: Option<String>,
    width_mm: Option<f64>,
    height_mm: Option<f64>,
    has_edid: bool,
}

impl XrandrOutput {
    fn into_display(self) -> DisplayInfo {
        let diagonal = match (self.width_mm, self.height_mm) {
            (Some(w), Some(h)) if w > 0.0 && h > 0.0 => Some(round1((w * w + h * h).sqrt() / 25.4)),
            _ => None,
        };
        let identified = if self.has_edid { DETECTED } else { UNAVAILABLE };

        DisplayInfo {
            manufacturer: identified.to_string(),
            model: identified.to_string(),
            diagonal_size_inches: diagonal,
            connection_name: self.name,
            resolution: self.resolution,
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn parse_mm(token: &str) -> Option<f64> {
    token.strip_suffix("mm").unwrap_or(token).parse::<f64>().ok()
}

/// Physical size from a `connected` header (`... 527mm x 296mm`).
fn header_size(tokens: &[&str]) -> Option<(f64, f64)> {
    tokens.windows(3).find_map(|window| match window {
        [w, "x", h] if w.ends_with("mm") && h.ends_with("mm") => Some((parse_mm(w)?, parse_mm(h)?)),
        _ => None,
    })
}

/// Physical size from a `width <n>mm height <n>mm` line.
fn labelled_size(tokens: &[&str]) -> Option<(f64, f64)> {
    let width_at = tokens.iter().position(|t| *t == "width")?;
    if tokens.get(width_at + 2) != Some(&"height") {
        return None;
    }
    let width = tokens.get(width_at + 1)?;
    let height = tokens.get(width_at + 3)?;
    if !width.ends_with("mm") || !height.ends_with("mm") {
        return None;
    }
    Some((parse_mm(width)?, parse_mm(height)?))
}

fn parse_xrandr(output: &str) -> Vec<DisplayInfo> {
    let mut displays = Vec::new();
    let mut current: Option<XrandrOutput> = None;

    for line in output.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();

        if line.contains(" connected") && !line.starts_with(char::is_whitespace) {
            if let Some(done) = current.take() {
                displays.push(done.into_display());
            }
            let mut entry = XrandrOutput {
                name: tokens.first().map(|n| n.to_string()).unwrap_or_default(),
                ..Default::default()
            };
            if let Some(at) = tokens.iter().position(|t| *t == "primary") {
                entry.resolution = tokens
                    .get(at + 1)
                    .and_then(|geometry| geometry.split('+').next())
                    .filter(|r| r.contains('x'))
                    .map(str::to_string);
            }
            if let Some((w, h)) = header_size(&tokens) {
                entry.width_mm = Some(w);
                entry.height_mm = Some(h);
            }
            current = Some(entry);
            continue;
        }

        // Disconnected outputs end the current block without being listed.
        if !line.starts_with(char::is_whitespace) && line.contains(" disconnected") {
            if let Some(done) = current.take() {
                displays.push(done.into_display());
            }
            continue;
        }

        let Some(entry) = current.as_mut() else {
            continue;
        };
        if line.trim_start().starts_with("EDID:") {
            entry.has_edid = true;
        } else if let Some((w, h)) = labelled_size(&tokens) {
            entry.width_mm = Some(w);
            entry.height_mm = Some(h);
        }
    }

    if let Some(done) = current {
        displays.push(done.into_display());
    }
    displays
}
