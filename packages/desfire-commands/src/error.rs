//! Errors a command object's `parse_response` can raise on its own
//! account, before the processor ever maps a non-control status byte.
//! These always fold into `desfire-driver::Error::Crypto` (§7).

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("MAC/CMAC or checksum verification failed")]
    IntegrityError,
    #[error("key length does not match the declared key type")]
    BadKeyLength,
    #[error("response body shorter than the command expects")]
    BadResponseSize,
}

pub type Result<T> = std::result::Result<T, CommandError>;
