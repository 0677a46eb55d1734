//! src/routes/mod.rs

mod health_check;
mod lead;

pub use health_check::*;
pub use lead::*;
