//! The driver crate (C2, C5, C7, §6): session state, the secure pipe,
//! the command processor, and the public entry points that tie them
//! to a concrete [`Transceiver`].

mod config;
pub use config::{AtsLengthConvention, CommandCounterPolicy, SessionConfig};
pub use desfire_commands::commands::LegacyIvSeed;

pub mod error;
pub use error::{Error, Result};

mod transceiver;
pub use transceiver::Transceiver;

mod pipe;
mod processor;

mod session;
pub use session::Session;
