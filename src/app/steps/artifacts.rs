use crate::core::context::ProvisionContext;
use crate::core::sequence::ProvisionStep;
use crate::core::templates;
use crate::domain::model::{CommandSpec, StepReport};
use crate::utils::error::Result;
use std::path::Path;

/// 以 sudo tee 寫入 root 擁有的系統檔案
pub async fn install_system_file(context: &ProvisionContext, path: &Path, content: &str) -> Result<()> {
    let tee = CommandSpec::sudo("tee")
        .arg(path.display().to_string())
        .stdin(content);
    context.runner.run_checked(&tee).await?;

    let chmod = CommandSpec::sudo("chmod").args(["0644".to_string(), path.display().to_string()]);
    context.runner.run_checked(&chmod).await?;

    tracing::debug!("📝 Installed {} ({} bytes)", path.display(), content.len());
    Ok(())
}

/// 產生啟動腳本
pub struct LauncherStep;

#[async_trait::async_trait]
impl ProvisionStep for LauncherStep {
    fn name(&self) -> &str {
        "launcher"
    }

    fn description(&self) -> &str {
        "Writing launcher script"
    }

    async fn execute(&self, context: &mut ProvisionContext) -> Result<StepReport> {
        let layout = context.layout()?.clone();
        let script = templates::render_launcher(&layout, &context.config);

        context.storage.create_dir_all(&layout.log_dir).await?;
        context
            .storage
            .write_file(&layout.launcher, script.as_bytes())
            .await?;
        context.storage.set_mode(&layout.launcher, 0o755).await?;

        Ok(StepReport::new(format!("launcher at {}", layout.launcher.display()))
            .with_artifact(layout.launcher))
    }
}

/// 產生並註冊 systemd 服務
pub struct ServiceUnitStep;

#[async_trait::async_trait]
impl ProvisionStep for ServiceUnitStep {
    fn name(&self) -> &str {
        "service-unit"
    }

    fn description(&self) -> &str {
        "Registering supervised service"
    }

    async fn execute(&self, context: &mut ProvisionContext) -> Result<StepReport> {
        let host = context.host()?.clone();
        let layout = context.layout()?.clone();
        let unit = templates::render_service_unit(&host.user, &host.group, &layout, &context.config);
        let unit_name = format!("{}.service", context.config.target.service_name);

        install_system_file(context, &layout.unit_file, &unit).await?;

        for action in ["daemon-reload", "enable", "restart"] {
            let mut command = CommandSpec::sudo("systemctl").arg(action);
            if action != "daemon-reload" {
                command = command.arg(unit_name.as_str());
            }
            context.runner.run_checked(&command).await?;
        }

        Ok(StepReport::new(format!("{} enabled and started", unit_name)).with_artifact(layout.unit_file))
    }
}

/// 產生 logrotate 規則
pub struct LogRotationStep;

#[async_trait::async_trait]
impl ProvisionStep for LogRotationStep {
    fn name(&self) -> &str {
        "log-rotation"
    }

    fn description(&self) -> &str {
        "Writing log rotation policy"
    }

    async fn execute(&self, context: &mut ProvisionContext) -> Result<StepReport> {
        let host = context.host()?.clone();
        let layout = context.layout()?.clone();
        let rule = templates::render_logrotate(&host.user, &host.group, &layout, &context.config);

        install_system_file(context, &layout.logrotate_file, &rule).await?;

        let mut report = StepReport::new(format!(
            "{} rotated {} (keep {})",
            layout.log_file.display(),
            context.config.logging.frequency,
            context.config.logging.rotate
        ))
        .with_artifact(&layout.logrotate_file);

        // logrotate -d 只做語法檢查，不會真的輪替
        let check = CommandSpec::sudo("logrotate").args(["-d".to_string(), layout.logrotate_file.display().to_string()]);
        let output = context.runner.run(&check).await?;
        if !output.success() {
            report = report.with_warning(format!(
                "logrotate rejected {}: {}",
                layout.logrotate_file.display(),
                output.stderr.trim()
            ));
        }

        Ok(report)
    }
}

/// 註冊健康檢查與清理排程
pub struct ScheduleStep;

#[async_trait::async_trait]
impl ProvisionStep for ScheduleStep {
    fn name(&self) -> &str {
        "schedule"
    }

    fn description(&self) -> &str {
        "Registering health-check and cleanup jobs"
    }

    async fn execute(&self, context: &mut ProvisionContext) -> Result<StepReport> {
        let user = context.host()?.user.clone();
        let layout = context.layout()?.clone();
        let cron = templates::render_cron(&user, &layout, &context.config);

        install_system_file(context, &layout.cron_file, &cron).await?;

        Ok(StepReport::new(format!(
            "health check '{}', cleanup '{}'",
            context.config.schedule.health_check, context.config.schedule.cleanup
        ))
        .with_artifact(layout.cron_file))
    }
}
