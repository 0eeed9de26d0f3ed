pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliArgs;

pub use adapters::{HttpProbe, LocalStorage, SystemRunner, TerminalPrompt};
pub use config::SetupConfig;
pub use crate::core::{context::ProvisionContext, provisioner::Provisioner};
pub use utils::error::{Result, SetupError};
