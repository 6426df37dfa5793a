//! The four-kind error taxonomy (§7): `Transport`, `Framing`,
//! `Crypto`, `Protocol`. Every layer below converges on this type;
//! nothing is swallowed (§7 propagation policy).

use desfire_commands::CommandError;
use desfire_core::prelude::DesfireStatus;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transceive call exceeded its deadline")]
    Timeout,
    #[error("no reader/card found on the transport")]
    DeviceNotFound,
    #[error("failed to write the APDU to the transport")]
    WriteFailed,
    #[error("failed to read the response from the transport")]
    ReadFailed,
    #[error("transport reported a bus-level fault")]
    BusError,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Framing(#[from] desfire_wire::Error),
    #[error(transparent)]
    Crypto(#[from] CommandError),
    #[error("card returned {0}")]
    Protocol(DesfireStatus),
}

impl Error {
    /// Maps a non-control status byte (anything other than `0x00`
    /// "OK" or `0xAF` "additional frame") to the mapped `Protocol`
    /// variant the processor returns when the loop can't continue
    /// (§4.7, §8 P7).
    pub fn from_status_byte(byte: u8) -> Self {
        Error::Protocol(DesfireStatus::from(byte))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
