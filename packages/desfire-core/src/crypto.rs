//! Block-cipher primitives shared by the Authenticate state machine and
//! the secure pipe: DES/3DES and AES-128 in ECB and CBC, and the CMAC
//! construction generalized over both cipher families.
//!
//! DESFire sessions pick their cipher at authentication time, so every
//! primitive here is parameterized by key length (for the DES family)
//! or operates on a fixed 16-byte AES key; callers own dispatch on
//! `auth_scheme`.

use aes::cipher::{
    block_padding::NoPadding, BlockDecrypt, BlockDecryptMut, BlockEncrypt, BlockEncryptMut,
    KeyInit, KeyIvInit,
};
use des::{Des, TdesEde2, TdesEde3};

type DesCbcEnc = cbc::Encryptor<Des>;
type DesCbcDec = cbc::Decryptor<Des>;
type TdesEde2CbcEnc = cbc::Encryptor<TdesEde2>;
type TdesEde2CbcDec = cbc::Decryptor<TdesEde2>;
type TdesEde3CbcEnc = cbc::Encryptor<TdesEde3>;
type TdesEde3CbcDec = cbc::Decryptor<TdesEde3>;
type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// Encrypts one 8-byte block with DES, 2-key 3DES-EDE or 3-key 3DES-EDE
/// depending on `key`'s length (8, 16 or 24 bytes).
pub fn des_family_ecb_encrypt_block(block: &[u8; 8], key: &[u8]) -> [u8; 8] {
    let mut buf = *block;
    match key.len() {
        8 => Des::new(key.into()).encrypt_block((&mut buf).into()),
        16 => TdesEde2::new(key.into()).encrypt_block((&mut buf).into()),
        24 => TdesEde3::new(key.into()).encrypt_block((&mut buf).into()),
        n => panic!("unsupported DES-family key length: {n}"),
    }
    buf
}

/// Decrypts one 8-byte block with DES, 2-key 3DES-EDE or 3-key 3DES-EDE.
pub fn des_family_ecb_decrypt_block(block: &[u8; 8], key: &[u8]) -> [u8; 8] {
    let mut buf = *block;
    match key.len() {
        8 => Des::new(key.into()).decrypt_block((&mut buf).into()),
        16 => TdesEde2::new(key.into()).decrypt_block((&mut buf).into()),
        24 => TdesEde3::new(key.into()).decrypt_block((&mut buf).into()),
        n => panic!("unsupported DES-family key length: {n}"),
    }
    buf
}

/// Encrypts one 16-byte block with AES-128.
pub fn aes128_ecb_encrypt_block(block: &[u8; 16], key: &[u8; 16]) -> [u8; 16] {
    let mut buf = *block;
    aes::Aes128::new(key.into()).encrypt_block((&mut buf).into());
    buf
}

/// Decrypts one 16-byte block with AES-128.
pub fn aes128_ecb_decrypt_block(block: &[u8; 16], key: &[u8; 16]) -> [u8; 16] {
    let mut buf = *block;
    aes::Aes128::new(key.into()).decrypt_block((&mut buf).into());
    buf
}

/// CBC-encrypts `data` (which MUST already be a multiple of the
/// cipher's block size; DESFire pads its own plaintext before this
/// call) with a DES-family key whose length selects DES/3DES-EDE2/
/// 3DES-EDE3, same as [`des_family_ecb_encrypt_block`].
pub fn des_family_cbc_encrypt(data: &[u8], key: &[u8], iv: &[u8]) -> Vec<u8> {
    match key.len() {
        8 => DesCbcEnc::new(key.into(), iv.into()).encrypt_padded_vec_mut::<NoPadding>(data),
        16 => TdesEde2CbcEnc::new(key.into(), iv.into()).encrypt_padded_vec_mut::<NoPadding>(data),
        24 => TdesEde3CbcEnc::new(key.into(), iv.into()).encrypt_padded_vec_mut::<NoPadding>(data),
        n => panic!("unsupported DES-family key length: {n}"),
    }
}

pub fn des_family_cbc_decrypt(data: &[u8], key: &[u8], iv: &[u8]) -> Vec<u8> {
    match key.len() {
        8 => DesCbcDec::new(key.into(), iv.into())
            .decrypt_padded_vec_mut::<NoPadding>(data)
            .expect("block-aligned input"),
        16 => TdesEde2CbcDec::new(key.into(), iv.into())
            .decrypt_padded_vec_mut::<NoPadding>(data)
            .expect("block-aligned input"),
        24 => TdesEde3CbcDec::new(key.into(), iv.into())
            .decrypt_padded_vec_mut::<NoPadding>(data)
            .expect("block-aligned input"),
        n => panic!("unsupported DES-family key length: {n}"),
    }
}

pub fn aes128_cbc_encrypt(data: &[u8], key: &[u8; 16], iv: &[u8; 16]) -> Vec<u8> {
    Aes128CbcEnc::new(key.into(), iv.into()).encrypt_padded_vec_mut::<NoPadding>(data)
}

pub fn aes128_cbc_decrypt(data: &[u8], key: &[u8; 16], iv: &[u8; 16]) -> Vec<u8> {
    Aes128CbcDec::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<NoPadding>(data)
        .expect("block-aligned input")
}

/// Fills a freshly allocated buffer with cryptographically secure
/// random bytes, used to generate `RndA` at authentication time.
/// Failure here means the host has no working RNG source, which is an
/// unrecoverable environment fault rather than a protocol error.
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    getrandom::getrandom(&mut buf).unwrap_or_else(|_| panic!("failed to generate random bytes"));
    buf
}

/// Computes the byte-wise XOR of two slices with the same length
pub fn xor_slices(a: &[u8], b: &[u8]) -> Vec<u8> {
    assert!(a.len() == b.len(), "Slices must have the same length");
    a.iter().zip(b.iter()).map(|(x, y)| x ^ y).collect()
}

/// Computes the byte-wise XOR of two slices with the same length, mutating the first slice
pub fn xor_slice_mut(a: &mut [u8], b: &[u8]) {
    assert!(a.len() == b.len(), "Slices must have the same length");
    a.iter_mut().zip(b.iter()).for_each(|(x, y)| *x ^= y);
}

/// Creates a new vec from a slice in MSB ordering by left-shifting it one bit
pub fn left_shift_1(input: &[u8]) -> Vec<u8> {
    if input.is_empty() {
        return vec![];
    }

    let mut ret = vec![0; input.len()];
    for i in 0..input.len() - 1 {
        ret[i] = (input[i] << 1) + if input[i + 1] & 0x80 != 0 { 1 } else { 0 };
    }
    ret[input.len() - 1] = input[input.len() - 1] << 1;

    ret
}

/// Rotates a byte buffer left by one whole byte (`rotL1` in §4.3):
/// `[b0, b1, ..., bn] -> [b1, ..., bn, b0]`. Used to turn the card's
/// `RndB` into the plaintext continuation the host sends back, and to
/// recover the host's own `RndA` from the card's confirmation.
pub fn rotate_left_bytes_1(data: &[u8]) -> Vec<u8> {
    if data.is_empty() {
        return Vec::new();
    }
    let mut rotated = Vec::with_capacity(data.len());
    rotated.extend_from_slice(&data[1..]);
    rotated.push(data[0]);
    rotated
}

/// Increments a multi-byte unsigned integer in big-endian order by 1
pub fn increment_slice_mut(buffer: &mut [u8]) {
    for i in (0..buffer.len()).rev() {
        buffer[i] = buffer[i].wrapping_add(1);
        if buffer[i] != 0x00 {
            break;
        }
    }
}

/// The session cipher selected by a successful `Authenticate`, along
/// with the CMAC parameters (block size, Rb constant) that differ
/// between the DES family and AES per DESFire's CMAC usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCipher {
    /// Single DES or 3DES-EDE, selected by the session key's length (8/16/24).
    DesFamily,
    Aes128,
}

impl SessionCipher {
    pub fn block_size(self) -> usize {
        match self {
            SessionCipher::DesFamily => 8,
            SessionCipher::Aes128 => 16,
        }
    }

    /// NIST SP800-38B Rb constant for this block size.
    fn rb(self) -> u8 {
        match self {
            SessionCipher::DesFamily => 0x1B,
            SessionCipher::Aes128 => 0x87,
        }
    }

    fn encrypt_block(self, block: &[u8], key: &[u8]) -> Vec<u8> {
        match self {
            SessionCipher::DesFamily => {
                let mut b = [0u8; 8];
                b.copy_from_slice(block);
                des_family_ecb_encrypt_block(&b, key).to_vec()
            }
            SessionCipher::Aes128 => {
                let mut b = [0u8; 16];
                b.copy_from_slice(block);
                let mut k = [0u8; 16];
                k.copy_from_slice(key);
                aes128_ecb_encrypt_block(&b, &k).to_vec()
            }
        }
    }

    /// NIST SP 800-38B, chapter 6.1: derive the two CMAC subkeys from
    /// an encryption of the all-zero block under the session key.
    pub fn generate_cmac_subkeys(self, key: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let block_size = self.block_size();
        let zero = vec![0u8; block_size];
        let rb = {
            let mut r = vec![0u8; block_size];
            r[block_size - 1] = self.rb();
            r
        };

        let l = self.encrypt_block(&zero, key);
        let k1 = if l[0] & 0x80 == 0 {
            left_shift_1(&l)
        } else {
            xor_slices(&left_shift_1(&l), &rb)
        };
        let k2 = if k1[0] & 0x80 == 0 {
            left_shift_1(&k1)
        } else {
            xor_slices(&left_shift_1(&k1), &rb)
        };

        (k1, k2)
    }

    /// Standard CMAC construction over the session cipher (NIST
    /// SP800-38B): DES family uses block size 8 / Rb=0x1B, AES uses
    /// block size 16 / Rb=0x87.
    pub fn compute_cmac(self, message: &[u8], key: &[u8]) -> Vec<u8> {
        let block_size = self.block_size();
        let remainder = message.len() % block_size;
        let num_blocks = message.len() / block_size + if remainder == 0 { 0 } else { 1 };

        let last_block_is_complete = !message.is_empty() && remainder == 0;
        let last_block = if num_blocks > 0 {
            &message[(num_blocks - 1) * block_size..]
        } else {
            message
        };
        let last_block = if last_block_is_complete {
            last_block.to_vec()
        } else {
            let mut last_block = last_block.to_vec();
            last_block.push(0x80);
            last_block.resize(block_size, 0);
            last_block
        };

        let mut acc = vec![0u8; block_size];
        if num_blocks > 0 {
            for i in 0..num_blocks - 1 {
                let block = &message[i * block_size..(i + 1) * block_size];
                xor_slice_mut(&mut acc, block);
                acc = self.encrypt_block(&acc, key);
            }
        }

        let (k1, k2) = self.generate_cmac_subkeys(key);
        let subkey = if last_block_is_complete { &k1 } else { &k2 };
        xor_slice_mut(&mut acc, &xor_slices(subkey, &last_block));
        self.encrypt_block(&acc, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_left_shift_1() {
        assert_eq!(left_shift_1(&[0x00]), vec![0x00]);
        assert_eq!(left_shift_1(&[0x01]), vec![0x02]);
        assert_eq!(left_shift_1(&[0x80]), vec![0x00]);
        assert_eq!(left_shift_1(&[0x01, 0x00]), vec![0x02, 0x00]);
        assert_eq!(left_shift_1(&[0x01, 0x80]), vec![0x03, 0x00]);
        assert_eq!(left_shift_1(&[0x01, 0x40]), vec![0x02, 0x80]);
    }

    #[test]
    fn test_rotate_left_bytes_1() {
        assert_eq!(
            rotate_left_bytes_1(&hex::decode("0123456789ABCDEF").unwrap()),
            hex::decode("23456789ABCDEF01").unwrap()
        );
    }

    #[test]
    fn test_des_ecb_known_answer() {
        // Classic DES known-answer test (FIPS 81 validation).
        let key = hex::decode("133457799BBCDFF1").unwrap();
        let plaintext: [u8; 8] = hex::decode("0123456789ABCDEF").unwrap().try_into().unwrap();
        let expected = hex::decode("85E813540F0AB405").unwrap();

        assert_eq!(des_family_ecb_encrypt_block(&plaintext, &key).to_vec(), expected);
        assert_eq!(
            des_family_ecb_decrypt_block(&expected.try_into().unwrap(), &key).to_vec(),
            plaintext
        );
    }

    #[test]
    fn test_aes_ecb_nist_vector() {
        // NIST SP800-38A F.1.1
        let key = hex::decode("2b7e151628aed2a6abf7158809cf4f3c").unwrap();
        let key: [u8; 16] = key.try_into().unwrap();
        let plaintext: [u8; 16] = hex::decode("6bc1bee22e409f96e93d7e117393172a")
            .unwrap()
            .try_into()
            .unwrap();
        let expected = hex::decode("3ad77bb40d7a3660a89ecaf32466ef97").unwrap();

        assert_eq!(aes128_ecb_encrypt_block(&plaintext, &key).to_vec(), expected);
    }

    #[test]
    fn test_aes_cmac_nist_vectors() {
        // NIST AES-CMAC examples (CSRC AES_CMAC.pdf)
        let key = hex::decode("2B7E151628AED2A6ABF7158809CF4F3C").unwrap();

        let m0: &[u8] = &[];
        assert_eq!(
            SessionCipher::Aes128.compute_cmac(m0, &key),
            hex::decode("BB1D6929E95937287FA37D129B756746").unwrap()
        );

        let m1 = hex::decode("6BC1BEE22E409F96E93D7E117393172A").unwrap();
        assert_eq!(
            SessionCipher::Aes128.compute_cmac(&m1, &key),
            hex::decode("070A16B46B4D4144F79BDD9DD04A287C").unwrap()
        );

        let m2 = hex::decode("6BC1BEE22E409F96E93D7E117393172AAE2D8A57").unwrap();
        assert_eq!(
            SessionCipher::Aes128.compute_cmac(&m2, &key),
            hex::decode("7D85449EA6EA19C823A7BF78837DFADE").unwrap()
        );

        let m3 = hex::decode(
            "6BC1BEE22E409F96E93D7E117393172AAE2D8A571E03AC9C9EB76FAC45AF8E5130C81C46A35CE411E5FBC1191A0A52EFF69F2445DF4F9B17AD2B417BE66C3710",
        )
        .unwrap();
        assert_eq!(
            SessionCipher::Aes128.compute_cmac(&m3, &key),
            hex::decode("51F0BEBF7E3B9D92FC49741779363CFE").unwrap()
        );
    }
}
