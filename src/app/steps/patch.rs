use crate::config::UnrecognizedAction;
use crate::core::context::ProvisionContext;
use crate::core::sequence::ProvisionStep;
use crate::domain::app_config::{apply_patch, AppConfigFile, SerialDecision};
use crate::domain::model::StepReport;
use crate::utils::error::{Result, SetupError};
use std::path::PathBuf;

/// 修補倉庫內設定檔的序列埠（與選用的資料庫欄位）
pub struct PatchConfigStep;

#[async_trait::async_trait]
impl ProvisionStep for PatchConfigStep {
    fn name(&self) -> &str {
        "patch-config"
    }

    fn description(&self) -> &str {
        "Patching application configuration"
    }

    async fn execute(&self, context: &mut ProvisionContext) -> Result<StepReport> {
        let path = context.layout()?.config_file.clone();
        let original = context.storage.read_to_string(&path).await?;

        let mut file = AppConfigFile::parse(original.clone());
        let outcome = apply_patch(
            &mut file,
            &context.config.app.serial,
            &context.config.app.database,
        );

        let mut report = StepReport::new(match &outcome.serial {
            SerialDecision::Replace { from, to } => format!("SERIAL_PORT {} → {}", from, to),
            SerialDecision::Keep(value) => format!("SERIAL_PORT already {}", value),
            SerialDecision::Unrecognized(value) => format!("SERIAL_PORT left as {}", value),
            SerialDecision::Missing => "SERIAL_PORT not found".to_string(),
        });

        match &outcome.serial {
            SerialDecision::Unrecognized(value) => {
                if context.config.app.serial.on_unrecognized == UnrecognizedAction::Fail {
                    return Err(SetupError::UnrecognizedSerialPort {
                        file: path.display().to_string(),
                        value: value.clone(),
                    });
                }
                report = report.with_warning(format!(
                    "SERIAL_PORT is '{}', which is neither the placeholder '{}' nor a known device; left unchanged",
                    value, context.config.app.serial.placeholder
                ));
            }
            SerialDecision::Missing => {
                report = report.with_warning(format!("no SERIAL_PORT assignment in {}", path.display()));
            }
            _ => {}
        }

        for key in &outcome.db_missing {
            report = report.with_warning(format!("DB_CONFIG has no '{}' entry; override ignored", key));
        }
        if !outcome.db_fields.is_empty() {
            report
                .summary
                .push_str(&format!(", DB_CONFIG updated: {}", outcome.db_fields.join(", ")));
        }

        if outcome.changed {
            let backup = backup_path(&path);
            context.storage.write_file(&backup, original.as_bytes()).await?;
            context
                .storage
                .write_file(&path, file.content().as_bytes())
                .await?;
            tracing::info!("💾 Backup written to {}", backup.display());
            report = report.with_artifact(path).with_artifact(backup);
        }

        Ok(report)
    }
}

fn backup_path(path: &std::path::Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}
