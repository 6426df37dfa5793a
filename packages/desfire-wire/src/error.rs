#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("frame shorter than the minimum required length")]
    ShortFrame,
    #[error("frame does not start with the expected start-of-frame byte")]
    BadStartOfFrame,
    #[error("declared length does not match the actual frame length")]
    BadLength,
    #[error("frame checksum does not match its contents")]
    BadChecksum,
    #[error("response status byte/SW1 combination is not a recognized shape")]
    UnexpectedStatus,
}

pub type Result<T> = std::result::Result<T, Error>;
