use crate::config::PythonProfile;
use crate::core::context::ProvisionContext;
use crate::core::sequence::ProvisionStep;
use crate::domain::model::{CommandSpec, PythonVersion, StepReport};
use crate::utils::error::{Result, SetupError};

/// 取 min_version 不超過偵測版本者中最高的一組
pub fn select_profile<'a>(
    profiles: &'a [PythonProfile],
    version: PythonVersion,
) -> Option<&'a PythonProfile> {
    profiles
        .iter()
        .filter_map(|p| p.min_version.parse::<PythonVersion>().ok().map(|min| (min, p)))
        .filter(|(min, _)| *min <= version)
        .max_by_key(|(min, _)| *min)
        .map(|(_, p)| p)
}

/// 重新建立虛擬環境並安裝固定版本的套件
pub struct PythonEnvStep;

#[async_trait::async_trait]
impl ProvisionStep for PythonEnvStep {
    fn name(&self) -> &str {
        "python-env"
    }

    fn description(&self) -> &str {
        "Creating isolated Python environment"
    }

    async fn execute(&self, context: &mut ProvisionContext) -> Result<StepReport> {
        let version = context.host()?.python;
        let venv_dir = context.layout()?.venv_dir.clone();
        let pip = context.layout()?.venv_pip();

        let profile = select_profile(&context.config.python.profiles, version)
            .cloned()
            .ok_or_else(|| SetupError::UnsupportedInterpreter {
                version: version.to_string(),
                reason: "no package profile matches this interpreter".to_string(),
            })?;
        tracing::info!(
            "🐍 Python {} → profile >= {} ({})",
            version,
            profile.min_version,
            profile.packages.join(", ")
        );

        let mut report = StepReport::new(format!(
            "{} ready with {} packages",
            venv_dir.display(),
            profile.packages.len()
        ))
        .with_artifact(&venv_dir);

        if context.storage.exists(&venv_dir).await {
            tracing::info!("♻️ Replacing existing environment at {}", venv_dir.display());
            context.storage.remove_dir_all(&venv_dir).await?;
            report.summary.push_str(" (replaced)");
        }

        let interpreter = context.config.python.interpreter.clone();
        let venv = venv_dir.display().to_string();
        context
            .runner
            .run_checked(&CommandSpec::new(interpreter).args(["-m", "venv", venv.as_str()]))
            .await?;

        let pip = pip.display().to_string();
        context
            .runner
            .run_checked(
                &CommandSpec::new(pip.as_str())
                    .args(["install", "--upgrade", "pip"])
                    .streamed(),
            )
            .await?;

        if !profile.packages.is_empty() {
            context
                .runner
                .run_checked(
                    &CommandSpec::new(pip.as_str())
                        .arg("install")
                        .args(profile.packages.iter().cloned())
                        .streamed(),
                )
                .await?;
        }

        context.set_profile(profile);
        Ok(report)
    }
}

/// 逐一 import 宣告的模組
pub struct SmokeTestStep;

#[async_trait::async_trait]
impl ProvisionStep for SmokeTestStep {
    fn name(&self) -> &str {
        "smoke-test"
    }

    fn description(&self) -> &str {
        "Running import smoke test"
    }

    async fn execute(&self, context: &mut ProvisionContext) -> Result<StepReport> {
        let python = context.layout()?.venv_python().display().to_string();
        // 只跑 smoke-test 時 python-env 沒有設定 profile，改依直譯器版本挑選
        let modules = match context.profile() {
            Some(profile) => profile.import_modules(),
            None => {
                let version = context.host()?.python;
                select_profile(&context.config.python.profiles, version)
                    .map(|profile| profile.import_modules())
                    .ok_or_else(|| SetupError::UnsupportedInterpreter {
                        version: version.to_string(),
                        reason: "no package profile matches this interpreter".to_string(),
                    })?
            }
        };

        let mut failed = Vec::new();
        for module in &modules {
            let statement = format!("import {}", module);
            let check = CommandSpec::new(python.as_str()).args(["-c", statement.as_str()]);
            let ok = match context.runner.run(&check).await {
                Ok(output) => output.success(),
                Err(SetupError::IoError(e)) => {
                    tracing::debug!("cannot start {}: {}", python, e);
                    false
                }
                Err(e) => return Err(e),
            };

            if ok {
                tracing::info!("  ✅ import {}", module);
            } else {
                tracing::error!("  ❌ import {}", module);
                failed.push(module.clone());
            }
        }

        if failed.is_empty() {
            Ok(StepReport::new(format!("all {} modules importable", modules.len())))
        } else {
            Err(SetupError::SmokeTestFailed { modules: failed })
        }
    }
}
