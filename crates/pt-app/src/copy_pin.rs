//! Copying a pin's content back onto the clipboard, as the surface's copy button does.

use std::sync::Arc;

use pt_core::ports::ClipboardTextPort;
use tracing::{debug, info};

use crate::pin_lifecycle::PinLifecycleManager;

pub struct CopyPinToClipboard {
    clipboard: Arc<dyn ClipboardTextPort>,
    manager: PinLifecycleManager,
}

impl CopyPinToClipboard {
    pub fn new(clipboard: Arc<dyn ClipboardTextPort>, manager: PinLifecycleManager) -> Self {
        Self { clipboard, manager }
    }

    /// Copies the content of the active pin at `index`.
    ///
    /// Returns the copied text, or `None` when no pin sits at that position. The
    /// pin itself is left untouched.
    #[tracing::instrument(name = "usecase.copy_pin.execute", skip(self))]
    pub async fn execute(&self, index: usize) -> anyhow::Result<Option<String>> {
        let Some(pin) = self.manager.active_pins().into_iter().nth(index) else {
            debug!("no active pin at index");
            return Ok(None);
        };
        self.clipboard.write_text(&pin.content).await?;
        info!(pin_id = %pin.id, "pin content copied to clipboard");
        Ok(Some(pin.content))
    }
}
