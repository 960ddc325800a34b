mod file_inbox;

pub use file_inbox::FileShareInbox;
