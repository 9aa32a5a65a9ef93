use log::debug;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Desktop browser user agent; several recipe sites reject unknown bots.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Plain HTTP GET with a browser user agent and a hard timeout.
pub struct RequestFetcher {
    client: Client,
}

impl RequestFetcher {
    pub fn new(timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let timeout = timeout.unwrap_or(Duration::from_secs(10));
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()?;

        Ok(Self { client })
    }

    /// Fetches `url` and returns the body as text. Any non-2xx status is an
    /// error.
    pub async fn fetch(&self, url: &str) -> Result<String, String> {
        debug!("Fetching {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("request to {url} failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("{url} returned status {status}"));
        }

        response
            .text()
            .await
            .map_err(|e| format!("reading body of {url} failed: {e}"))
    }

    /// Streams `url` into the file at `target`, returning the byte count.
    pub async fn download(&self, url: &str, target: &Path) -> Result<u64, String> {
        debug!("Downloading {} to {}", url, target.display());
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("request to {url} failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("{url} returned status {status}"));
        }

        let mut file = tokio::fs::File::create(target)
            .await
            .map_err(|e| format!("create {}: {e}", target.display()))?;
        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| format!("reading body of {url} failed: {e}"))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| format!("write {}: {e}", target.display()))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| format!("write {}: {e}", target.display()))?;

        if written == 0 {
            return Err(format!("{url} returned an empty body"));
        }
        Ok(written)
    }
}
