use crate::config::{RebootPolicy, SetupConfig};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "soil-setup")]
#[command(about = "Provision a single-board computer to run the Soil Monitor service")]
pub struct CliArgs {
    /// Path to TOML configuration file (defaults to ./soil-setup.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    /// Detect the host and print the plan and generated files without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Reboot at the end without asking
    #[arg(long, conflicts_with = "no_reboot")]
    pub reboot: bool,

    /// Never reboot at the end
    #[arg(long)]
    pub no_reboot: bool,

    /// Run only these steps (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Skip these steps (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,
}

impl CliArgs {
    /// 將命令列覆蓋設定套用到設定檔
    pub fn apply_overrides(&self, config: &mut SetupConfig) {
        if self.reboot {
            config.reboot.policy = RebootPolicy::Always;
        } else if self.no_reboot {
            config.reboot.policy = RebootPolicy::Never;
        }
    }
}
