//! Small closed-set enums shared across the wire, commands and driver
//! crates: authentication mode/key-type tags, communication modes, the
//! wire framing selector, and reader capabilities.

/// The three DESFire authentication protocols, tagged by the `AUTH`
/// command byte that starts them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DesfireAuthMode {
    Legacy = 0x0A,
    Iso = 0x1A,
    Aes = 0xAA,
}

/// The key types a DESFire key slot can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DesfireKeyType {
    Aes,
    Des,
    Des3_2K,
    Des3_3K,
    Unknown,
}

impl DesfireKeyType {
    /// Byte length of a key of this type.
    pub fn key_len(self) -> Option<usize> {
        match self {
            DesfireKeyType::Aes => Some(16),
            DesfireKeyType::Des => Some(8),
            DesfireKeyType::Des3_2K => Some(16),
            DesfireKeyType::Des3_3K => Some(24),
            DesfireKeyType::Unknown => None,
        }
    }
}

/// Traffic-protection mode applied to a command's body by the secure
/// pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CommMode {
    #[default]
    Plain,
    Mac,
    Enc,
    /// Body is already the complete pre-encryption plaintext (its own
    /// checksum and padding already applied by the command, e.g.
    /// `ChangeKey`'s key-change cryptogram): the pipe only CBC-encrypts
    /// it and must not append another checksum or pad it again.
    EncRaw,
}

/// Which PDU↔APDU framing a session uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireKind {
    Native,
    Iso,
}

/// Read-only capabilities of the attached reader; the core only
/// consults `max_apdu_size` and `supports_iso14443_4`, the rest are
/// carried for callers that need to branch on reader family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderCapabilities {
    pub max_apdu_size: u16,
    pub supports_iso14443_4: bool,
    pub supports_mifare_classic: bool,
    pub supports_felica: bool,
    pub supports_nfc_dep: bool,
}

impl ReaderCapabilities {
    pub const fn pn532() -> Self {
        Self {
            max_apdu_size: 264,
            supports_iso14443_4: true,
            supports_mifare_classic: true,
            supports_felica: true,
            supports_nfc_dep: true,
        }
    }

    pub const fn rc522() -> Self {
        Self {
            max_apdu_size: 64,
            supports_iso14443_4: true,
            supports_mifare_classic: true,
            supports_felica: false,
            supports_nfc_dep: false,
        }
    }
}
