//! Entry points that feed outside content into the shared processing path.

use std::sync::Arc;

use pt_core::ports::{ClipboardTextPort, ShareInboxPort};
use pt_core::share::parse_share_link;
use tracing::debug;

use crate::pin_lifecycle::PinLifecycleManager;
use crate::shared_processing::SharedPinProcessingState;

#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    /// The source had nothing to hand over.
    NothingToPin,
    /// Another submission was still loading.
    Ignored,
    Finished(SharedPinProcessingState),
}

impl From<Option<SharedPinProcessingState>> for EntryOutcome {
    fn from(outcome: Option<SharedPinProcessingState>) -> Self {
        match outcome {
            Some(state) => EntryOutcome::Finished(state),
            None => EntryOutcome::Ignored,
        }
    }
}

/// Pins whatever text is on the clipboard.
pub struct PinFromClipboard {
    clipboard: Arc<dyn ClipboardTextPort>,
    manager: PinLifecycleManager,
}

impl PinFromClipboard {
    pub fn new(clipboard: Arc<dyn ClipboardTextPort>, manager: PinLifecycleManager) -> Self {
        Self { clipboard, manager }
    }

    /// An empty clipboard goes through processing and ends as an empty-content error.
    #[tracing::instrument(name = "usecase.pin_from_clipboard.execute", skip(self))]
    pub async fn execute(&self) -> anyhow::Result<EntryOutcome> {
        let text = self.clipboard.read_text().await?.unwrap_or_default();
        Ok(self
            .manager
            .process_and_pin_shared_content(&text)
            .await
            .into())
    }
}

/// Drains the share inbox written by the share extension.
pub struct PinFromShareInbox {
    inbox: Arc<dyn ShareInboxPort>,
    manager: PinLifecycleManager,
}

impl PinFromShareInbox {
    pub fn new(inbox: Arc<dyn ShareInboxPort>, manager: PinLifecycleManager) -> Self {
        Self { inbox, manager }
    }

    #[tracing::instrument(name = "usecase.pin_from_share_inbox.execute", skip(self))]
    pub async fn execute(&self) -> anyhow::Result<EntryOutcome> {
        let Some(shared) = self.inbox.read_and_clear().await? else {
            debug!("share inbox is empty");
            return Ok(EntryOutcome::NothingToPin);
        };
        Ok(self
            .manager
            .process_and_pin_shared_content(&shared.content)
            .await
            .into())
    }
}

/// Handles `postit://share-sheet?content=...` deep links.
pub struct PinFromShareLink {
    manager: PinLifecycleManager,
}

impl PinFromShareLink {
    pub fn new(manager: PinLifecycleManager) -> Self {
        Self { manager }
    }

    #[tracing::instrument(name = "usecase.pin_from_share_link.execute", skip(self))]
    pub async fn execute(&self, link: &str) -> EntryOutcome {
        match parse_share_link(link) {
            Some(content) => self
                .manager
                .process_and_pin_shared_content(&content)
                .await
                .into(),
            None => EntryOutcome::NothingToPin,
        }
    }
}
