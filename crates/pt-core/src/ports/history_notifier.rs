/// "Refresh now" signal raised after any pin moves to history.
pub trait HistoryNotifierPort: Send + Sync {
    fn notify_history_changed(&self);
}
