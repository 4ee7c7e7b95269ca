pub mod call;
pub mod config;
pub mod utils;

pub use call::{call, CallOptions};
pub use config::{handle_config_command, ConfigCommands};
