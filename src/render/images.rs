use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::render::markdown::{Document, ImageNode};

const CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Settles image nodes to `Loaded` or `Errored` and fetches them on request.
#[derive(Debug, Clone, Default)]
pub struct ImageChecker {
    client: Client,
}

impl ImageChecker {
    /// Inline `data:image/...` sources count as loaded; anything else must
    /// answer a HEAD request with a success status.
    pub async fn check(&self, node: &mut ImageNode) {
        if node.src.starts_with("data:image/") {
            node.mark_loaded();
            return;
        }

        match self
            .client
            .head(node.src.as_str())
            .timeout(CHECK_TIMEOUT)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => node.mark_loaded(),
            Ok(response) => {
                debug!("Image {} answered {}", node.src, response.status());
                node.mark_failed();
            }
            Err(e) => {
                debug!("Image {} unreachable: {}", node.src, e);
                node.mark_failed();
            }
        }
    }

    pub async fn check_all(&self, doc: &mut Document) {
        for node in doc.images_mut() {
            self.check(node).await;
        }
    }

    /// Downloads `url` into `dest`.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<(), AppError> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        tokio::fs::write(dest, &bytes).await.map_err(|e| {
            warn!("Failed to write {}: {}", dest.display(), e);
            e
        })?;
        Ok(())
    }
}
