use crate::config::RebootPolicy;
use crate::core::context::ProvisionContext;
use crate::core::sequence::ProvisionStep;
use crate::domain::model::{CommandSpec, StepReport};
use crate::utils::error::Result;
use std::time::Duration;

/// 顯示佈署摘要
pub struct SummaryStep;

#[async_trait::async_trait]
impl ProvisionStep for SummaryStep {
    fn name(&self) -> &str {
        "summary"
    }

    fn description(&self) -> &str {
        "Summarising installation"
    }

    async fn execute(&self, context: &mut ProvisionContext) -> Result<StepReport> {
        let text = render_summary(context)?;
        println!("{}", text);
        Ok(StepReport::new(format!(
            "{} steps completed, {} warnings",
            context.previous_results().len(),
            context.warnings().len()
        )))
    }
}

pub fn render_summary(context: &ProvisionContext) -> Result<String> {
    let host = context.host()?;
    let layout = context.layout()?;
    let service = &context.config.target.service_name;

    let mut lines = vec![
        String::new(),
        "📋 Soil Monitor installation summary".to_string(),
        format!("  Execution:   {}", context.execution_id),
        format!("  Finished:    {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S")),
        format!("  User:        {} ({})", host.user, host.home.display()),
        format!("  Python:      {}", host.python),
    ];
    if let Some(board) = &host.facts.board_model {
        lines.push(format!("  Board:       {}", board));
    }
    if let Some(os) = &host.facts.os {
        lines.push(format!("  OS:          {}", os));
    }
    if let Some(profile) = context.profile() {
        lines.push(format!("  Libraries:   {}", profile.packages.join(", ")));
    }

    lines.push(String::new());
    lines.push("📁 Files".to_string());
    lines.push(format!("  Application: {}", layout.app_dir.display()));
    lines.push(format!("  Config:      {}", layout.config_file.display()));
    lines.push(format!("  Environment: {}", layout.venv_dir.display()));
    lines.push(format!("  Launcher:    {}", layout.launcher.display()));
    lines.push(format!("  Log file:    {}", layout.log_file.display()));
    lines.push(format!("  Service:     {}", layout.unit_file.display()));
    lines.push(format!("  Logrotate:   {}", layout.logrotate_file.display()));
    lines.push(format!("  Schedule:    {}", layout.cron_file.display()));

    let warnings = context.warnings();
    if !warnings.is_empty() {
        lines.push(String::new());
        lines.push("⚠️ Warnings".to_string());
        for (step, warning) in warnings {
            lines.push(format!("  [{}] {}", step, warning));
        }
    }

    lines.push(String::new());
    lines.push("🛠️ Useful commands".to_string());
    lines.push(format!("  sudo systemctl status {}", service));
    lines.push(format!("  sudo journalctl -u {} -f", service));
    lines.push(format!("  tail -f {}", layout.log_file.display()));

    Ok(lines.join("\n"))
}

/// 依設定決定是否重新開機
pub struct RebootStep;

#[async_trait::async_trait]
impl ProvisionStep for RebootStep {
    fn name(&self) -> &str {
        "reboot"
    }

    fn description(&self) -> &str {
        "Deciding on reboot"
    }

    async fn execute(&self, context: &mut ProvisionContext) -> Result<StepReport> {
        let reboot = match context.config.reboot.policy {
            RebootPolicy::Never => false,
            RebootPolicy::Always => true,
            RebootPolicy::Ask if !context.prompt.is_interactive() => {
                return Ok(StepReport::new("non-interactive session, reboot skipped")
                    .with_warning("reboot manually so group membership changes take effect"));
            }
            RebootPolicy::Ask => {
                context
                    .prompt
                    .confirm("Reboot now so group membership changes take effect?")
                    .await
            }
        };

        if !reboot {
            return Ok(StepReport::new("reboot skipped"));
        }

        if !countdown(context.config.reboot.countdown_secs).await {
            return Ok(StepReport::new("reboot cancelled"));
        }

        context
            .runner
            .run_checked(&CommandSpec::sudo("reboot"))
            .await?;
        Ok(StepReport::new("reboot requested"))
    }
}

/// 倒數期間按 Ctrl-C 取消；回傳是否繼續
async fn countdown(seconds: u64) -> bool {
    for remaining in (1..=seconds).rev() {
        println!("🔄 Rebooting in {}s (Ctrl-C to cancel)", remaining);
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(1)) => {}
            _ = tokio::signal::ctrl_c() => {
                println!("⏹️ Reboot cancelled");
                return false;
            }
        }
    }
    true
}
