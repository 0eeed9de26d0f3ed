use crate::adapters::TerminalPrompt;
use crate::config::{PythonProfile, SetupConfig};
use crate::core::sequence::StepResult;
use crate::domain::model::{HostContext, InstallLayout};
use crate::domain::ports::{CommandRunner, ConnectivityProbe, Prompt, Storage};
use crate::utils::error::{Result, SetupError};
use std::collections::HashMap;
use std::sync::Arc;

/// 偵測使用者時讀取的環境變數
const ENV_KEYS: [&str; 3] = ["USER", "SUDO_USER", "HOME"];

/// 佈署執行上下文，在步驟間傳遞偵測結果與產出
pub struct ProvisionContext {
    pub config: SetupConfig,
    pub runner: Arc<dyn CommandRunner>,
    pub storage: Arc<dyn Storage>,
    pub probe: Arc<dyn ConnectivityProbe>,
    pub prompt: Arc<dyn Prompt>,
    pub execution_id: String,
    env: HashMap<String, String>,
    host: Option<HostContext>,
    layout: Option<InstallLayout>,
    profile: Option<PythonProfile>,
    previous_results: Vec<StepResult>,
    shared_data: HashMap<String, serde_json::Value>,
}

impl ProvisionContext {
    pub fn new(
        config: SetupConfig,
        runner: Arc<dyn CommandRunner>,
        storage: Arc<dyn Storage>,
        probe: Arc<dyn ConnectivityProbe>,
    ) -> Self {
        let env = ENV_KEYS
            .iter()
            .filter_map(|key| std::env::var(key).ok().map(|v| (key.to_string(), v)))
            .collect();

        Self {
            config,
            runner,
            storage,
            probe,
            prompt: Arc::new(TerminalPrompt),
            execution_id: format!("setup_{}", chrono::Utc::now().format("%Y%m%d_%H%M%S")),
            env,
            host: None,
            layout: None,
            profile: None,
            previous_results: Vec::new(),
            shared_data: HashMap::new(),
        }
    }

    /// 以指定的環境變數取代目前行程的環境
    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn Prompt>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_execution_id(mut self, execution_id: impl Into<String>) -> Self {
        self.execution_id = execution_id.into();
        self
    }

    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// 記錄偵測結果並解析安裝路徑
    pub fn set_host(&mut self, host: HostContext) {
        self.layout = Some(InstallLayout::resolve(&host.home, &self.config));
        self.host = Some(host);
    }

    pub fn host(&self) -> Result<&HostContext> {
        self.host.as_ref().ok_or_else(|| SetupError::ContextError {
            message: "host has not been detected yet".to_string(),
        })
    }

    pub fn layout(&self) -> Result<&InstallLayout> {
        self.layout.as_ref().ok_or_else(|| SetupError::ContextError {
            message: "install layout has not been resolved yet".to_string(),
        })
    }

    pub fn set_profile(&mut self, profile: PythonProfile) {
        self.profile = Some(profile);
    }

    pub fn profile(&self) -> Option<&PythonProfile> {
        self.profile.as_ref()
    }

    /// 獲取指定名稱的步驟結果
    pub fn get_result_by_name(&self, name: &str) -> Option<&StepResult> {
        self.previous_results.iter().find(|r| r.step_name == name)
    }

    pub fn previous_results(&self) -> &[StepResult] {
        &self.previous_results
    }

    /// 所有已完成步驟累積的警告
    pub fn warnings(&self) -> Vec<(String, String)> {
        self.previous_results
            .iter()
            .flat_map(|r| {
                r.report
                    .warnings
                    .iter()
                    .map(move |w| (r.step_name.clone(), w.clone()))
            })
            .collect()
    }

    pub fn add_result(&mut self, result: StepResult) {
        self.previous_results.push(result);
    }

    /// 添加共享數據
    pub fn add_shared_data(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.shared_data.insert(key.into(), value);
    }

    /// 獲取共享數據
    pub fn get_shared_data(&self, key: &str) -> Option<&serde_json::Value> {
        self.shared_data.get(key)
    }
}
