use std::time::Duration;

use anyhow::{Context, Result};
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use tracing::debug;

/// Class of the "show more" accordion button on product pages.
const DISCLOSURE_SELECTOR: &str = ".cmp-accordion__button";

/// How long to look for the disclosure control before giving up on it.
const DISCLOSURE_WAIT: Duration = Duration::from_secs(2);

/// Fixed pause after triggering disclosure so the nutrition grid can expand.
const EXPAND_DELAY: Duration = Duration::from_secs(1);

/// Anything the pipeline can pull a rendered page out of. `Renderer` is the
/// real implementation; tests substitute a canned one.
pub trait PageSource {
    fn fetch(&self, url: &str) -> impl std::future::Future<Output = Result<String>>;
}

/// One WebDriver session, held exclusively for the duration of a run.
pub struct Renderer {
    client: Client,
}

impl Renderer {
    /// Establish the WebDriver session. Failure here aborts the run.
    pub async fn connect(webdriver_url: &str) -> Result<Self> {
        let client = ClientBuilder::native()
            .connect(webdriver_url)
            .await
            .with_context(|| format!("Failed to connect to webdriver at {}", webdriver_url))?;
        Ok(Self { client })
    }

    /// Navigate to `url`, expand the nutrition accordion if present, and
    /// return the fully rendered page source.
    pub async fn render(&self, url: &str) -> Result<String, CmdError> {
        self.client.goto(url).await?;
        self.expand_details().await;
        tokio::time::sleep(EXPAND_DELAY).await;
        self.client.source().await
    }

    /// Best-effort click on the disclosure control. Not every product page
    /// has one, so absence and interaction failures are both swallowed.
    async fn expand_details(&self) {
        let found = self
            .client
            .wait()
            .at_most(DISCLOSURE_WAIT)
            .for_element(Locator::Css(DISCLOSURE_SELECTOR))
            .await;
        match found {
            Ok(button) => {
                if let Err(e) = button.click().await {
                    debug!("Disclosure click failed: {}", e);
                }
            }
            Err(e) => debug!("No disclosure control: {}", e),
        }
    }

    /// Shut the browser session down. The orchestrator calls this on every
    /// exit path of the run.
    pub async fn close(self) -> Result<(), CmdError> {
        self.client.close().await
    }
}

impl PageSource for Renderer {
    async fn fetch(&self, url: &str) -> Result<String> {
        Ok(self.render(url).await?)
    }
}
