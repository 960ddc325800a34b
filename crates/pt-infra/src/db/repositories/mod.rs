mod pin_repo;

pub use pin_repo::*;
