use crate::core::context::ProvisionContext;
use crate::core::sequence::ProvisionStep;
use crate::domain::model::StepReport;
use crate::utils::error::{Result, SetupError};

/// 套件安裝與 git clone 之前先確認網路可用
pub struct CheckNetworkStep;

#[async_trait::async_trait]
impl ProvisionStep for CheckNetworkStep {
    fn name(&self) -> &str {
        "check-network"
    }

    fn description(&self) -> &str {
        "Checking internet connectivity"
    }

    fn should_execute(&self, context: &ProvisionContext) -> bool {
        !context.config.network.test_urls.is_empty()
    }

    async fn execute(&self, context: &mut ProvisionContext) -> Result<StepReport> {
        let urls = &context.config.network.test_urls;

        match context.probe.first_reachable(urls).await {
            Some(url) => Ok(StepReport::new(format!("reachable via {}", url))),
            None if context.config.network.required => Err(SetupError::NetworkUnavailable {
                urls: urls.clone(),
            }),
            None => Ok(StepReport::new("no connectivity")
                .with_warning("none of the test URLs answered; package and repository steps may fail")),
        }
    }
}
