use anyhow::Context;
use async_trait::async_trait;
use pt_core::ports::ClipboardTextPort;

/// System clipboard through `arboard`. Each read or write opens a short-lived
/// handle on the blocking pool.
#[derive(Debug, Default)]
pub struct ArboardClipboard;

#[async_trait]
impl ClipboardTextPort for ArboardClipboard {
    async fn read_text(&self) -> anyhow::Result<Option<String>> {
        tokio::task::spawn_blocking(|| {
            let mut clipboard = arboard::Clipboard::new().context("open system clipboard")?;
            match clipboard.get_text() {
                Ok(text) => Ok(Some(text)),
                Err(arboard::Error::ContentNotAvailable) => Ok(None),
                Err(err) => Err(err).context("read clipboard text"),
            }
        })
        .await
        .context("clipboard task failed")?
    }

    async fn write_text(&self, text: &str) -> anyhow::Result<()> {
        let text = text.to_owned();
        tokio::task::spawn_blocking(move || {
            let mut clipboard = arboard::Clipboard::new().context("open system clipboard")?;
            clipboard.set_text(text).context("write clipboard text")
        })
        .await
        .context("clipboard task failed")?
    }
}
