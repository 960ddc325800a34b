pub mod pin_row;

pub use pin_row::{NewPinRow, PinRow};
