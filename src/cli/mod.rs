pub mod commands;
pub mod core;
pub mod help;
pub mod matching;
pub mod output;
pub mod registry;
pub mod shell;
pub mod shell_context;
pub mod system_clock;
pub mod table;

pub use shell::run_cli;
