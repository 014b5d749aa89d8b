#![forbid(unsafe_code)]

//! Domain model and pure progress derivations for the 75-day challenge
//! tracker. No I/O lives here; storage and workflows build on top.

pub mod model;
pub mod progress;
pub mod time;

pub use time::Clock;
