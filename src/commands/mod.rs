pub mod hardware;
pub mod register;

pub use hardware::handle_hardware_command;
pub use register::{handle_check_command, handle_register_command};
