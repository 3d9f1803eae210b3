//! Browser-rendered transport for pages that need JavaScript.
//!
//! Drives Chrome over the DevTools protocol via chromiumoxide. Connects to a
//! remote endpoint when one is configured, otherwise launches a local
//! headless Chrome.

use crate::config::FetcherConfig;
use crate::fetcher::{RawPage, Transport, TransportError};
use crate::HarvestError;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::Mutex;

/// Transport that renders each page in a fresh browser tab
pub struct BrowserTransport {
    browser: Mutex<Browser>,
    navigation_timeout: Duration,
}

impl BrowserTransport {
    /// Connects to (or launches) the browser described by `config`
    pub async fn from_config(
        config: &FetcherConfig,
        navigation_timeout: Duration,
    ) -> Result<Self, HarvestError> {
        let (browser, mut handler) = match config.browser_url {
            Some(ref remote) => {
                tracing::info!("Connecting to remote browser at {}", remote);
                Browser::connect(remote.clone())
                    .await
                    .map_err(|e| HarvestError::Browser(e.to_string()))?
            }
            None => {
                tracing::info!("Launching headless browser");
                let mut builder = BrowserConfig::builder()
                    .request_timeout(navigation_timeout)
                    .arg("--disable-blink-features=AutomationControlled")
                    .arg("--disable-dev-shm-usage")
                    .arg("--no-first-run")
                    .arg("--no-sandbox");
                if let Some(ref chrome) = config.chrome_executable {
                    builder = builder.chrome_executable(chrome);
                }
                let browser_config = builder.build().map_err(HarvestError::Browser)?;
                Browser::launch(browser_config)
                    .await
                    .map_err(|e| HarvestError::Browser(e.to_string()))?
            }
        };

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser: Mutex::new(browser),
            navigation_timeout,
        })
    }
}

#[async_trait]
impl Transport for BrowserTransport {
    async fn get(&self, url: &str, user_agent: &str) -> Result<RawPage, TransportError> {
        let page = {
            let browser = self.browser.lock().await;
            browser
                .new_page("about:blank")
                .await
                .map_err(|e| TransportError::Other(e.to_string()))?
        };

        let rendered = tokio::time::timeout(self.navigation_timeout, async {
            page.execute(SetUserAgentOverrideParams::new(user_agent.to_string()))
                .await?;
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            let final_url = page.url().await?.unwrap_or_else(|| url.to_string());
            let body = page.content().await?;
            Ok::<_, chromiumoxide::error::CdpError>((final_url, body))
        })
        .await;

        // Close the tab whatever happened so tabs do not accumulate
        let _ = page.close().await;

        match rendered {
            Ok(Ok((final_url, body))) => Ok(RawPage {
                // CDP does not surface the document status code
                status: 200,
                final_url,
                body,
            }),
            Ok(Err(e)) => Err(TransportError::Other(e.to_string())),
            Err(_) => Err(TransportError::Timeout),
        }
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}
