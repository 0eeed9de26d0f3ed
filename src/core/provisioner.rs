use crate::app::steps::{self, host::detect_host, python::select_profile};
use crate::config::PythonProfile;
use crate::core::context::ProvisionContext;
use crate::core::sequence::{ProvisionSequence, StepResult};
use crate::core::templates;
use crate::domain::app_config::{apply_patch, AppConfigFile, PatchOutcome};
use crate::domain::model::{HostContext, InstallLayout};
use crate::utils::error::Result;
use serde::Serialize;
use std::path::PathBuf;

/// 預計寫入的檔案
#[derive(Debug, Clone, Serialize)]
pub struct PlannedFile {
    pub path: PathBuf,
    pub mode: u32,
    pub content: String,
}

/// dry-run 的輸出
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionPlan {
    pub host: HostContext,
    pub layout: InstallLayout,
    pub profile: Option<PythonProfile>,
    /// (步驟名稱, 是否會執行)
    pub steps: Vec<(String, bool)>,
    pub files: Vec<PlannedFile>,
    /// 倉庫已存在時，設定檔修補的預覽
    pub config_patch: Option<PatchOutcome>,
}

pub struct Provisioner {
    sequence: ProvisionSequence,
}

impl Provisioner {
    pub fn new(sequence: ProvisionSequence) -> Self {
        Self { sequence }
    }

    /// 標準步驟，依 --only / --skip 篩選
    pub fn standard(only: Vec<String>, skip: Vec<String>) -> Self {
        let mut sequence = ProvisionSequence::new().with_filter(only, skip);
        for step in steps::standard_steps() {
            sequence.add_step(step);
        }
        Self::new(sequence)
    }

    pub fn sequence(&self) -> &ProvisionSequence {
        &self.sequence
    }

    pub async fn run(&self, context: &mut ProvisionContext) -> Result<Vec<StepResult>> {
        tracing::info!("🚀 Provisioning run {}", context.execution_id);
        let results = self.sequence.execute_all(context).await?;

        let summary = ProvisionSequence::get_execution_summary(&results);
        tracing::debug!("📊 Execution summary: {}", serde_json::to_string(&summary)?);
        Ok(results)
    }

    /// 只偵測主機並產生檔案內容，不做任何變更
    pub async fn plan(&self, context: &mut ProvisionContext) -> Result<ProvisionPlan> {
        self.sequence.validate_filter()?;

        let host = detect_host(context).await?;
        context.set_host(host.clone());
        let layout = context.layout()?.clone();
        let config = &context.config;

        let profile = select_profile(&config.python.profiles, host.python).cloned();

        let files = vec![
            PlannedFile {
                path: layout.launcher.clone(),
                mode: 0o755,
                content: templates::render_launcher(&layout, config),
            },
            PlannedFile {
                path: layout.unit_file.clone(),
                mode: 0o644,
                content: templates::render_service_unit(&host.user, &host.group, &layout, config),
            },
            PlannedFile {
                path: layout.logrotate_file.clone(),
                mode: 0o644,
                content: templates::render_logrotate(&host.user, &host.group, &layout, config),
            },
            PlannedFile {
                path: layout.cron_file.clone(),
                mode: 0o644,
                content: templates::render_cron(&host.user, &layout, config),
            },
        ];

        let config_patch = if context.storage.exists(&layout.config_file).await {
            let content = context.storage.read_to_string(&layout.config_file).await?;
            let mut file = AppConfigFile::parse(content);
            Some(apply_patch(&mut file, &config.app.serial, &config.app.database))
        } else {
            None
        };

        let steps = self
            .sequence
            .steps()
            .iter()
            .map(|s| (s.name().to_string(), self.sequence.is_selected(s.name())))
            .collect();

        Ok(ProvisionPlan {
            host,
            layout,
            profile,
            steps,
            files,
            config_patch,
        })
    }
}
