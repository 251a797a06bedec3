use anyhow::{anyhow, Context};
use chrono::Local;
use sysinfo::System;

use crate::cli::RegisterArgs;
use crate::config::AgentConfig;
use crate::error::SubmitError;
use crate::hardware::{assemble, collect_hardware, Platform, UserMetadata};
use crate::output::{
    confirm_action, output_data, print_info, print_success, print_warning, prompt_field,
    prompt_optional,
};
use crate::registry::{DuplicateGate, Registrar};

pub fn handle_register_command(args: &RegisterArgs) -> anyhow::Result<()> {
    let config = AgentConfig::resolve(args.url.as_deref())?;

    let metadata = UserMetadata {
        department: value_or_prompt(args.department.as_deref(), "Department")?,
        sector: value_or_prompt(args.sector.as_deref(), "Sector")?,
        employee_id: value_or_prompt(args.employee_id.as_deref(), "Employee ID")?,
        full_name: value_or_prompt(args.full_name.as_deref(), "Full name")?,
        notes: match args.notes.as_deref() {
            Some(notes) => notes.to_string(),
            None if args.yes => String::new(),
            None => prompt_optional("Notes")?,
        },
    };
    metadata.validate()?;

    print_info("Collecting hardware inventory...");
    let snapshot = collect_hardware(Platform::detect());
    let record = assemble(snapshot, metadata, Local::now());
    output_data(&record, "pretty")?;

    if !args.yes && !confirm_action(&format!("Register this machine with {}?", config.server_url))? {
        print_warning("Registration cancelled");
        return Ok(());
    }

    let registrar = Registrar::new(config.registry());
    match registrar.register(&record) {
        Ok(message) => {
            print_success(&message);
            Ok(())
        }
        Err(SubmitError::Connection(reason)) => {
            Err(SubmitError::Connection(reason)).context("check that the server is online and reachable")
        }
        Err(err) => Err(err.into()),
    }
}

pub fn handle_check_command(employee_id: &str, device: Option<&str>, url: Option<&str>) -> anyhow::Result<()> {
    let config = AgentConfig::resolve(url)?;
    let device = match device {
        Some(device) => device.to_string(),
        None => System::host_name().context("could not determine this machine's host name; pass --device")?,
    };

    let result = DuplicateGate::new(config.registry()).check(&device, employee_id);
    output_data(&result, "pretty")?;

    if result.any_conflict() {
        print_warning(&result.conflict_message());
    } else {
        print_success(&format!("Device {} and employee ID {} are not registered", device, employee_id));
    }
    Ok(())
}

fn value_or_prompt(provided: Option<&str>, label: &str) -> anyhow::Result<String> {
    if let Some(value) = provided.filter(|v| !v.trim().is_empty()) {
        return Ok(value.to_string());
    }
    prompt_field(label)?.ok_or_else(|| anyhow!("{} was not provided", label))
}
