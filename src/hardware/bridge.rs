//! Invocation of OS utilities and helper scripts.
//!
//! Every call blocks until the child exits. There is no timeout on child
//! processes.

use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::CollectError;

/// Runs `program` and returns its stdout when it exits successfully.
pub fn run_command(program: &'static str, args: &[&str]) -> Result<String, CollectError> {
    debug!(program, ?args, "running external command");
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| CollectError::unavailable(program, e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CollectError::unavailable(
            program,
            format!("exited with {}: {}", output.status, stderr.trim()),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Like `run_command`, but keeps stdout even for non-zero exits. smartctl
/// encodes warnings in its exit status while still printing everything.
pub fn run_command_lenient(program: &'static str, args: &[&str]) -> Result<String, CollectError> {
    debug!(program, ?args, "running external command");
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| CollectError::unavailable(program, e.to_string()))?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if stdout.trim().is_empty() {
        return Err(CollectError::unavailable(program, "no output"));
    }
    Ok(stdout)
}

pub fn run_powershell(script: &str) -> Result<String, CollectError> {
    let stdout = run_command(
        "powershell",
        &["-NoProfile", "-NonInteractive", "-Command", script],
    )?;
    if stdout.trim().is_empty() {
        return Err(CollectError::unavailable("powershell", "empty output"));
    }
    Ok(stdout)
}

/// Queries a CIM class through PowerShell and deserializes each instance.
pub fn query_cim<T: DeserializeOwned>(class: &str, properties: &[&str]) -> Result<Vec<T>, CollectError> {
    let script = format!(
        "Get-CimInstance -ClassName {} | Select-Object {} | ConvertTo-Json -Compress -Depth 2",
        class,
        properties.join(",")
    );
    let json = run_powershell(&script)?;
    parse_cim_rows(&json)
}

/// `ConvertTo-Json` emits a bare object for one instance and an array for
/// several; both become a list here.
pub fn parse_cim_rows<T: DeserializeOwned>(json: &str) -> Result<Vec<T>, CollectError> {
    let value: Value = serde_json::from_str(json.trim())
        .map_err(|e| CollectError::unavailable("cim", format!("invalid JSON: {}", e)))?;

    let rows = match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    };

    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row)
                .map_err(|e| CollectError::unavailable("cim", format!("unexpected instance shape: {}", e)))
        })
        .collect()
}

/// Runs a PowerShell helper script that writes its answer to the file named
/// by `-OutputFilePath`, and returns that file's contents. Both the script
/// and the output file are temporary and removed when this returns.
pub fn run_file_helper(script: &str) -> Result<String, CollectError> {
    let to_unavailable = |e: std::io::Error| CollectError::unavailable("helper script", e.to_string());

    let mut script_file = tempfile::Builder::new()
        .prefix("inventory-helper-")
        .suffix(".ps1")
        .tempfile()
        .map_err(to_unavailable)?;
    script_file.write_all(script.as_bytes()).map_err(to_unavailable)?;
    let script_path = script_file.into_temp_path();

    let output_path = tempfile::Builder::new()
        .prefix("inventory-helper-out-")
        .suffix(".txt")
        .tempfile()
        .map_err(to_unavailable)?
        .into_temp_path();

    let script_arg = script_path.to_string_lossy().to_string();
    let output_arg = output_path.to_string_lossy().to_string();
    run_command(
        "powershell",
        &[
            "-NoProfile",
            "-ExecutionPolicy",
            "Bypass",
            "-File",
            &script_arg,
            "-OutputFilePath",
            &output_arg,
        ],
    )?;

    let contents = fs::read_to_string(&output_path).map_err(to_unavailable)?;
    Ok(contents.trim_start_matches('\u{feff}').to_string())
}

/// Whether `program` resolves to a file on PATH.
pub fn command_exists(program: &str) -> bool {
    find_in_path(program).is_some()
}

fn find_in_path(program: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    let candidates: Vec<String> = if cfg!(windows) {
        vec![program.to_string(), format!("{}.exe", program)]
    } else {
        vec![program.to_string()]
    };

    env::split_paths(&paths).find_map(|dir| {
        candidates
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| fs::metadata(candidate).map(|m| m.is_file()).unwrap_or(false))
    })
}

/// Accepts CIM numeric properties whether PowerShell rendered them as JSON
/// numbers or as strings (UInt64 values sometimes arrive quoted).
pub fn flexible_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Float(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Float(f)) if f >= 0.0 => Ok(Some(f as u64)),
        Some(Raw::Float(_)) => Err(de::Error::custom("negative number")),
        Some(Raw::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                trimmed.parse().map(Some).map_err(de::Error::custom)
            }
        }
    }
}
