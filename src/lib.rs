//! # postit
//!
//! Pins text and links onto ephemeral surfaces for eight hours, then keeps them
//! in a browsable history. The layers live in the workspace crates; this crate
//! only assembles them and exposes the command line front end.

pub mod bootstrap;
pub mod cli;
