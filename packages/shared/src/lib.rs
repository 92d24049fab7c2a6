//! Utilities shared by the Agora binaries: logging setup and clocks.

pub mod logger;
pub mod time;
