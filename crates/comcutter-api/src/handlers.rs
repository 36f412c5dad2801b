//! Request handlers.

pub mod comskip;
pub mod health;

pub use comskip::*;
pub use health::*;
