use crate::core::context::ProvisionContext;
use crate::core::sequence::ProvisionStep;
use crate::domain::model::{CommandSpec, StepReport};
use crate::utils::error::Result;

fn apt_get(args: &[&str]) -> CommandSpec {
    CommandSpec::sudo("apt-get")
        .args(args.iter().copied())
        .env("DEBIAN_FRONTEND", "noninteractive")
        .streamed()
}

/// 更新套件索引並安裝系統相依套件
pub struct InstallPackagesStep;

#[async_trait::async_trait]
impl ProvisionStep for InstallPackagesStep {
    fn name(&self) -> &str {
        "install-packages"
    }

    fn description(&self) -> &str {
        "Updating package index and installing system packages"
    }

    async fn execute(&self, context: &mut ProvisionContext) -> Result<StepReport> {
        let packages = &context.config.system.packages;

        context.runner.run_checked(&apt_get(&["update"])).await?;

        if packages.is_empty() {
            return Ok(StepReport::new("package index updated, nothing to install"));
        }

        let install = apt_get(&["install", "-y"]).args(packages.iter().cloned());
        context.runner.run_checked(&install).await?;

        Ok(StepReport::new(format!(
            "installed {} packages: {}",
            packages.len(),
            packages.join(" ")
        )))
    }
}

/// 讓使用者可以存取序列埠裝置
pub struct SerialAccessStep;

#[async_trait::async_trait]
impl ProvisionStep for SerialAccessStep {
    fn name(&self) -> &str {
        "serial-access"
    }

    fn description(&self) -> &str {
        "Granting serial device access"
    }

    async fn execute(&self, context: &mut ProvisionContext) -> Result<StepReport> {
        let user = context.host()?.user.clone();
        let group = context.config.system.serial_group.clone();

        let groups = context
            .runner
            .run_checked(&CommandSpec::new("id").args(["-nG", user.as_str()]))
            .await?;
        if groups.stdout.split_whitespace().any(|g| g == group) {
            return Ok(StepReport::new(format!("{} is already in group {}", user, group)));
        }

        context
            .runner
            .run_checked(&CommandSpec::sudo("usermod").args(["-aG", group.as_str(), user.as_str()]))
            .await?;

        Ok(StepReport::new(format!("added {} to group {}", user, group))
            .with_warning(format!("{} must log in again (or reboot) for group {} to apply", user, group)))
    }
}
