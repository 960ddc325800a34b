use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use pt_core::ports::MetadataFetcherPort;
use pt_core::LinkMetadata;
use reqwest::{Client, Response};
use tracing::{debug, warn};
use url::Url;

use super::html::parse_page;
use super::icon::normalize_icon;

/// Upper bound on bytes read for a page or an icon.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Fetches the page behind a link and pulls title and icon out of it.
pub struct HttpMetadataFetcher {
    client: Client,
    icon_edge: u32,
}

impl HttpMetadataFetcher {
    pub fn new(timeout: Duration, user_agent: &str, icon_edge: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("build metadata http client")?;
        Ok(Self { client, icon_edge })
    }

    /// Returns the final URL after redirects and the page body.
    async fn fetch_page(&self, url: &Url) -> Result<(Url, String)> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("request {url}"))?
            .error_for_status()?;
        let final_url = response.url().clone();
        let (body, truncated) = read_capped(response, MAX_BODY_BYTES)
            .await
            .context("read page body")?;
        if truncated {
            debug!(limit = MAX_BODY_BYTES, "page body truncated");
        }
        Ok((final_url, String::from_utf8_lossy(&body).into_owned()))
    }

    async fn fetch_icon(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("request icon {url}"))?
            .error_for_status()?;
        if let Some(len) = response.content_length().filter(|len| *len > MAX_BODY_BYTES as u64) {
            anyhow::bail!("icon at {url} is too large ({len} bytes)");
        }
        let (bytes, truncated) = read_capped(response, MAX_BODY_BYTES)
            .await
            .context("read icon body")?;
        if truncated {
            anyhow::bail!("icon at {url} is larger than {MAX_BODY_BYTES} bytes");
        }
        normalize_icon(&bytes, self.icon_edge)
    }
}

/// Reads the body chunk by chunk and stops once `limit` bytes are held, so an
/// endless or huge response never sits in memory whole. The flag is set when the
/// body went on past the limit.
async fn read_capped(mut response: Response, limit: usize) -> Result<(Vec<u8>, bool)> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = limit - body.len();
        if chunk.len() > room {
            body.extend_from_slice(&chunk[..room]);
            return Ok((body, true));
        }
        body.extend_from_slice(&chunk);
    }
    Ok((body, false))
}

#[async_trait]
impl MetadataFetcherPort for HttpMetadataFetcher {
    #[tracing::instrument(name = "infra.metadata.fetch", skip(self))]
    async fn fetch(&self, url: &str) -> Option<LinkMetadata> {
        let url = Url::parse(url).ok()?;
        let (base, html) = match self.fetch_page(&url).await {
            Ok(page) => page,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "link metadata unavailable");
                return None;
            }
        };

        let page = parse_page(&html);
        let icon_url = match page.icon_href.as_deref() {
            Some(href) => base.join(href).ok(),
            None => base.join("/favicon.ico").ok(),
        };
        let icon = match icon_url {
            Some(icon_url) => match self.fetch_icon(&icon_url).await {
                Ok(icon) => Some(icon),
                Err(err) => {
                    debug!(error = %format!("{err:#}"), "no usable icon");
                    None
                }
            },
            None => None,
        };

        if page.title.is_none() && icon.is_none() {
            return None;
        }
        Some(LinkMetadata {
            title: page.title,
            icon,
        })
    }
}
