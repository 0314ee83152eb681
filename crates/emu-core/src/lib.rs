//! Core traits and types shared by the CPU cores.
//!
//! A CPU never owns the memory it runs against. It reaches memory through
//! [`Bus`], and exposes its own state for inspection through [`Observable`].

mod bus;
mod observable;

pub use bus::Bus;
pub use observable::{Observable, Value};
