//! The DESFire status-byte → named-error mapping table (§7 "Protocol"
//! kind). `0x00` and `0xAF` are control values, handled by the wire and
//! command-processor layers before a status ever reaches this mapping.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DesfireStatus {
    #[error("no changes done to backup files (0x0C)")]
    NoChanges,
    #[error("insufficient EEPROM memory (0x0E)")]
    OutOfEeprom,
    #[error("command code not supported (0x1C)")]
    IllegalCommand,
    #[error("CRC or MAC does not match data (0x1E)")]
    IntegrityError,
    #[error("invalid key number specified (0x40)")]
    NoSuchKey,
    #[error("length of command string invalid (0x7E)")]
    LengthError,
    #[error("current configuration/status does not allow the requested command (0x9D)")]
    PermissionDenied,
    #[error("value of the parameter(s) invalid (0x9E)")]
    ParameterError,
    #[error("requested AID not present on PICC (0xA0)")]
    ApplicationNotFound,
    #[error("unrecoverable error within application (0xA1)")]
    AppIntegrityError,
    #[error("current authentication status does not allow the requested command (0xAE)")]
    AuthenticationError,
    #[error("out of EEPROM memory boundaries (0xBE)")]
    BoundaryError,
    #[error("unrecoverable error within PICC (0xC1)")]
    PiccIntegrityError,
    #[error("previous command was not fully completed (0xCA)")]
    CommandAborted,
    #[error("PICC was disabled by an unrecoverable error (0xCD)")]
    PiccDisabled,
    #[error("number of applications limit reached (0xCE)")]
    CountError,
    #[error("creation of file/application failed because it already exists (0xDE)")]
    DuplicateError,
    #[error("unrecoverable error within EEPROM (0xEE)")]
    EepromError,
    #[error("specified file does not exist (0xF0)")]
    FileNotFound,
    #[error("unrecoverable error within the file (0xF1)")]
    FileIntegrity,
    #[error("unknown or reserved status byte 0x{0:02X}")]
    Unknown(u8),
}

impl DesfireStatus {
    pub fn status_byte(self) -> u8 {
        match self {
            DesfireStatus::NoChanges => 0x0C,
            DesfireStatus::OutOfEeprom => 0x0E,
            DesfireStatus::IllegalCommand => 0x1C,
            DesfireStatus::IntegrityError => 0x1E,
            DesfireStatus::NoSuchKey => 0x40,
            DesfireStatus::LengthError => 0x7E,
            DesfireStatus::PermissionDenied => 0x9D,
            DesfireStatus::ParameterError => 0x9E,
            DesfireStatus::ApplicationNotFound => 0xA0,
            DesfireStatus::AppIntegrityError => 0xA1,
            DesfireStatus::AuthenticationError => 0xAE,
            DesfireStatus::BoundaryError => 0xBE,
            DesfireStatus::PiccIntegrityError => 0xC1,
            DesfireStatus::CommandAborted => 0xCA,
            DesfireStatus::PiccDisabled => 0xCD,
            DesfireStatus::CountError => 0xCE,
            DesfireStatus::DuplicateError => 0xDE,
            DesfireStatus::EepromError => 0xEE,
            DesfireStatus::FileNotFound => 0xF0,
            DesfireStatus::FileIntegrity => 0xF1,
            DesfireStatus::Unknown(b) => b,
        }
    }
}

/// `0x00` (OK) and `0xAF` (additional frame) are control values, not
/// mapped errors; every other byte maps to a named variant (falling
/// back to `Unknown` for anything not in the table), which is what
/// makes the mapping total (§8 P7).
impl From<u8> for DesfireStatus {
    fn from(byte: u8) -> Self {
        match byte {
            0x0C => DesfireStatus::NoChanges,
            0x0E => DesfireStatus::OutOfEeprom,
            0x1C => DesfireStatus::IllegalCommand,
            0x1E => DesfireStatus::IntegrityError,
            0x40 => DesfireStatus::NoSuchKey,
            0x7E => DesfireStatus::LengthError,
            0x9D => DesfireStatus::PermissionDenied,
            0x9E => DesfireStatus::ParameterError,
            0xA0 => DesfireStatus::ApplicationNotFound,
            0xA1 => DesfireStatus::AppIntegrityError,
            0xAE => DesfireStatus::AuthenticationError,
            0xBE => DesfireStatus::BoundaryError,
            0xC1 => DesfireStatus::PiccIntegrityError,
            0xCA => DesfireStatus::CommandAborted,
            0xCD => DesfireStatus::PiccDisabled,
            0xCE => DesfireStatus::CountError,
            0xDE => DesfireStatus::DuplicateError,
            0xEE => DesfireStatus::EepromError,
            0xF0 => DesfireStatus::FileNotFound,
            0xF1 => DesfireStatus::FileIntegrity,
            other => DesfireStatus::Unknown(other),
        }
    }
}

/// `true` for the two control values that do not represent an error.
pub fn is_control_status(byte: u8) -> bool {
    byte == 0x00 || byte == 0xAF
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_named_status() {
        let bytes = [
            0x0C, 0x0E, 0x1C, 0x1E, 0x40, 0x7E, 0x9D, 0x9E, 0xA0, 0xA1, 0xAE, 0xBE, 0xC1, 0xCA,
            0xCD, 0xCE, 0xDE, 0xEE, 0xF0, 0xF1,
        ];
        for b in bytes {
            let status: DesfireStatus = b.into();
            assert_eq!(status.status_byte(), b);
            assert!(!matches!(status, DesfireStatus::Unknown(_)));
        }
    }

    #[test]
    fn control_values_are_not_errors() {
        assert!(is_control_status(0x00));
        assert!(is_control_status(0xAF));
        assert!(!is_control_status(0x9D));
    }

    #[test]
    fn unmapped_byte_is_total_via_unknown() {
        let status: DesfireStatus = 0x55.into();
        assert_eq!(status, DesfireStatus::Unknown(0x55));
    }
}
