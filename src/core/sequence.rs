use crate::core::context::ProvisionContext;
use crate::domain::model::StepReport;
use crate::utils::error::{Result, SetupError};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// 一律執行的步驟（其他步驟依賴其偵測結果）
pub const ALWAYS_RUN: &str = "detect-host";

/// 步驟執行結果
#[derive(Debug, Clone)]
pub struct StepResult {
    pub step_name: String,
    pub report: StepReport,
    pub duration: Duration,
}

/// 單一佈署步驟
#[async_trait::async_trait]
pub trait ProvisionStep: Send + Sync {
    /// 用於標識步驟名稱（--only / --skip 使用）
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// 根據上下文決定是否執行
    fn should_execute(&self, _context: &ProvisionContext) -> bool {
        true
    }

    async fn execute(&self, context: &mut ProvisionContext) -> Result<StepReport>;
}

/// 步驟序列，依序執行，第一個失敗即中止
pub struct ProvisionSequence {
    steps: Vec<Box<dyn ProvisionStep>>,
    only: Vec<String>,
    skip: Vec<String>,
}

impl ProvisionSequence {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            only: Vec::new(),
            skip: Vec::new(),
        }
    }

    /// 限制要執行的步驟；ALWAYS_RUN 不受影響
    pub fn with_filter(mut self, only: Vec<String>, skip: Vec<String>) -> Self {
        self.only = only;
        self.skip = skip;
        self
    }

    pub fn add_step(&mut self, step: Box<dyn ProvisionStep>) {
        self.steps.push(step);
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn steps(&self) -> &[Box<dyn ProvisionStep>] {
        &self.steps
    }

    /// 檢查 --only / --skip 中的名稱是否都存在
    pub fn validate_filter(&self) -> Result<()> {
        let names = self.step_names();
        for requested in self.only.iter().chain(self.skip.iter()) {
            if !names.contains(&requested.as_str()) {
                return Err(SetupError::InvalidConfigValueError {
                    field: "step filter".to_string(),
                    value: requested.clone(),
                    reason: format!("Unknown step. Valid steps: {}", names.join(", ")),
                });
            }
        }
        Ok(())
    }

    pub fn is_selected(&self, name: &str) -> bool {
        if name == ALWAYS_RUN {
            return true;
        }
        if !self.only.is_empty() && !self.only.iter().any(|n| n == name) {
            return false;
        }
        !self.skip.iter().any(|n| n == name)
    }

    /// 執行所有步驟
    pub async fn execute_all(&self, context: &mut ProvisionContext) -> Result<Vec<StepResult>> {
        self.validate_filter()?;

        let total = self.steps.len();
        let mut results = Vec::new();

        for (index, step) in self.steps.iter().enumerate() {
            if !self.is_selected(step.name()) {
                tracing::info!("⏭️ [{}/{}] Skipping {} (filtered)", index + 1, total, step.name());
                continue;
            }
            if !step.should_execute(context) {
                tracing::info!(
                    "⏭️ [{}/{}] Skipping {} (condition not met)",
                    index + 1,
                    total,
                    step.name()
                );
                continue;
            }

            tracing::info!("🔧 [{}/{}] {}", index + 1, total, step.description());
            let start_time = Instant::now();

            match step.execute(context).await {
                Ok(report) => {
                    let result = StepResult {
                        step_name: step.name().to_string(),
                        report,
                        duration: start_time.elapsed(),
                    };

                    for warning in &result.report.warnings {
                        tracing::warn!("⚠️ {}: {}", result.step_name, warning);
                    }
                    tracing::info!(
                        "✅ {} ({:?}): {}",
                        result.step_name,
                        result.duration,
                        result.report.summary
                    );

                    context.add_result(result.clone());
                    results.push(result);
                }
                Err(e) => {
                    tracing::error!("❌ Step {} failed: {}", step.name(), e);
                    return Err(SetupError::StepFailed {
                        step: step.name().to_string(),
                        source: Box::new(e),
                    });
                }
            }
        }

        Ok(results)
    }

    /// 獲取執行摘要
    pub fn get_execution_summary(results: &[StepResult]) -> HashMap<String, serde_json::Value> {
        let mut summary = HashMap::new();

        let total_duration: Duration = results.iter().map(|r| r.duration).sum();
        let artifacts: Vec<serde_json::Value> = results
            .iter()
            .flat_map(|r| r.report.artifacts.iter())
            .map(|p| serde_json::Value::String(p.display().to_string()))
            .collect();
        let warnings: usize = results.iter().map(|r| r.report.warnings.len()).sum();

        summary.insert("total_steps".to_string(), serde_json::Value::Number(results.len().into()));
        summary.insert(
            "total_duration_ms".to_string(),
            serde_json::Value::Number((total_duration.as_millis() as u64).into()),
        );
        summary.insert("warnings".to_string(), serde_json::Value::Number(warnings.into()));
        summary.insert("artifacts".to_string(), serde_json::Value::Array(artifacts));
        summary.insert(
            "executed_steps".to_string(),
            serde_json::Value::Array(
                results
                    .iter()
                    .map(|r| serde_json::Value::String(r.step_name.clone()))
                    .collect(),
            ),
        );

        summary
    }
}

impl Default for ProvisionSequence {
    fn default() -> Self {
        Self::new()
    }
}
