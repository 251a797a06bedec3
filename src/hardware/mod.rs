// Hardware inventory collection modules
pub mod bridge;
pub mod chain;
pub mod classify;
pub mod collect_cpu;
pub mod collect_displays;
pub mod collect_memory;
pub mod collect_storage;
pub mod collector;
pub mod platform;
pub mod types;

// Re-export main collection functions
pub use collect_cpu::collect_cpu_info;
pub use collect_displays::collect_displays;
pub use collect_memory::collect_memory_info;
pub use collect_storage::collect_disks;
pub use collector::{assemble, collect_hardware, UserMetadata};
pub use platform::Platform;
