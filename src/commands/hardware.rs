use crate::cli::HardwareCommands;
use crate::hardware::{
    collect_cpu_info, collect_disks, collect_displays, collect_hardware, collect_memory_info, Platform,
};
use crate::output::output_data;

pub fn handle_hardware_command(cmd: &HardwareCommands) -> anyhow::Result<()> {
    let platform = Platform::detect();

    match cmd {
        HardwareCommands::Inventory { format } => {
            let snapshot = collect_hardware(platform);
            output_data(&snapshot, format)?;
        }
        HardwareCommands::Cpu { format } => {
            let cpu_info = collect_cpu_info(platform);
            output_data(&cpu_info, format)?;
        }
        HardwareCommands::Memory { format } => {
            let memory_info = collect_memory_info(platform);
            output_data(&memory_info, format)?;
        }
        HardwareCommands::Storage { format } => {
            let storage_info = collect_disks(platform);
            output_data(&storage_info, format)?;
        }
        HardwareCommands::Displays { format } => {
            let displays = collect_displays(platform);
            output_data(&displays, format)?;
        }
    }
    Ok(())
}
