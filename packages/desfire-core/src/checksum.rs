//! DESFire's two checksum variants, used as the integrity check inside
//! ENC-mode payloads (CRC16 for DES/3DES cards, CRC32 for AES cards).
//!
//! Neither matches a catalogued CRC preset, so both are built from a
//! custom [`crc::Algorithm`] rather than one of the crate's `CRC_*`
//! constants.

use crc::{Algorithm, Crc};

const DESFIRE_CRC16: Algorithm<u16> = Algorithm {
    width: 16,
    poly: 0x1021,
    init: 0x6363,
    refin: true,
    refout: true,
    xorout: 0x0000,
    check: 0x2b44,
    residue: 0x0000,
};

/// The DESFire CRC32 variant coincides with the standard reflected
/// CRC-32 (zlib/ISO-HDLC) used elsewhere in the corpus for APDU
/// secure-messaging checksums.
const DESFIRE_CRC32: Algorithm<u32> = crc::CRC_32_ISO_HDLC;

/// Compute the XOR "checksum" of the given data
pub fn xor_sum(data: &[u8]) -> u8 {
    data.iter().fold(0xff, |acc, x| acc ^ x)
}

/// Computes the DESFire CRC16 checksum of the given data (poly 0x8408,
/// init 0x6363 in direct/reflected form).
pub fn crc16(data: &[u8]) -> u16 {
    Crc::<u16>::new(&DESFIRE_CRC16).checksum(data)
}

/// Computes the DESFire CRC32 checksum of the given data (poly
/// 0xEDB88320, init 0xFFFFFFFF).
pub fn crc32(data: &[u8]) -> u32 {
    Crc::<u32>::new(&DESFIRE_CRC32).checksum(data)
}

pub struct Crc16Incremental(crc::Digest<'static, u16>);

impl Crc16Incremental {
    pub fn update(mut self, data: &[u8]) -> Self {
        self.0.update(data);
        self
    }

    pub fn get(self) -> u16 {
        self.0.finalize()
    }
}

pub fn crc16_incremental() -> Crc16Incremental {
    static CRC: Crc<u16> = Crc::<u16>::new(&DESFIRE_CRC16);
    Crc16Incremental(CRC.digest())
}
