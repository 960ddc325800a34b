use async_trait::async_trait;

#[async_trait]
pub trait ClipboardTextPort: Send + Sync {
    /// Current clipboard text, `None` when the clipboard holds no text.
    async fn read_text(&self) -> anyhow::Result<Option<String>>;

    /// Replaces the clipboard contents with `text`.
    async fn write_text(&self, text: &str) -> anyhow::Result<()>;
}
