use crate::core::context::ProvisionContext;
use crate::core::sequence::ProvisionStep;
use crate::domain::model::{CommandSpec, StepReport};
use crate::utils::error::{Result, SetupError};

/// clone 或更新應用程式倉庫，並確認必要檔案存在
pub struct FetchRepositoryStep;

#[async_trait::async_trait]
impl ProvisionStep for FetchRepositoryStep {
    fn name(&self) -> &str {
        "fetch-repository"
    }

    fn description(&self) -> &str {
        "Fetching application repository"
    }

    async fn execute(&self, context: &mut ProvisionContext) -> Result<StepReport> {
        let app_dir = context.layout()?.app_dir.clone();
        let app_dir_arg = app_dir.display().to_string();
        let repo = context.config.repository.clone();
        let config_file = context.config.app.config_file.clone();

        let action = if context.storage.exists(&app_dir.join(".git")).await {
            let config_path = app_dir.join(&config_file);
            let local_config = if context.storage.exists(&config_path).await {
                Some(context.storage.read_to_string(&config_path).await?)
            } else {
                None
            };

            // 本地修改會擋住 pull：先還原，pull 完再寫回
            if local_config.is_some() {
                let restore = CommandSpec::new("git").args([
                    "-C",
                    app_dir_arg.as_str(),
                    "checkout",
                    "--",
                    config_file.as_str(),
                ]);
                let output = context.runner.run(&restore).await?;
                if !output.success() {
                    tracing::debug!("could not restore {}: {}", config_file, output.stderr.trim());
                }
            }

            context
                .runner
                .run_checked(&CommandSpec::new("git").args(["-C", app_dir_arg.as_str(), "pull", "--ff-only"]))
                .await?;

            if let Some(content) = local_config {
                let current = if context.storage.exists(&config_path).await {
                    Some(context.storage.read_to_string(&config_path).await?)
                } else {
                    None
                };
                if current.as_deref() != Some(content.as_str()) {
                    context.storage.write_file(&config_path, content.as_bytes()).await?;
                    tracing::info!("♻️ Kept local edits to {}", config_path.display());
                }
            }
            "updated"
        } else {
            let mut action = "cloned";
            if context.storage.exists(&app_dir).await {
                tracing::warn!(
                    "♻️ {} exists but is not a git checkout, replacing it",
                    app_dir.display()
                );
                context.storage.remove_dir_all(&app_dir).await?;
                action = "re-cloned";
            }

            let mut clone = CommandSpec::new("git").arg("clone");
            if let Some(branch) = &repo.branch {
                clone = clone.args(["--branch", branch.as_str()]);
            }
            clone = clone.args([repo.url.as_str(), app_dir_arg.as_str()]);
            context.runner.run_checked(&clone).await?;
            action
        };

        let mut missing = Vec::new();
        for file in &repo.required_files {
            if !context.storage.exists(&app_dir.join(file)).await {
                missing.push(file.clone());
            }
        }
        if !missing.is_empty() {
            return Err(SetupError::MissingSourceFiles {
                dir: app_dir_arg,
                files: missing,
            });
        }

        Ok(StepReport::new(format!(
            "{} {} into {} ({} required files present)",
            action,
            repo.url,
            app_dir.display(),
            repo.required_files.len()
        ))
        .with_artifact(app_dir))
    }
}
