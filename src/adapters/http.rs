use crate::domain::ports::ConnectivityProbe;
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// 以 HTTP GET 探測網路；任何狀態碼的回應都算連線成功
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ConnectivityProbe for HttpProbe {
    async fn first_reachable(&self, urls: &[String]) -> Option<String> {
        for url in urls {
            match self.client.get(url).send().await {
                Ok(response) => {
                    tracing::debug!("🌐 {} answered with {}", url, response.status());
                    return Some(url.clone());
                }
                Err(e) => {
                    tracing::debug!("🌐 {} unreachable: {}", url, e);
                    continue;
                }
            }
        }
        None
    }
}
