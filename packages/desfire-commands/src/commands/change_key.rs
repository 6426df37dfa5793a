//! `ChangeKey` (cmd `0xC4`, §4.6, §8 scenario 6): the one command whose
//! ENC body isn't the generic `body ‖ checksum ‖ padding` the pipe
//! builds for everything else — it's the DESFire key-change cryptogram,
//! assembled here and handed to the pipe as [`CommMode::EncRaw`] so the
//! pipe only CBC-encrypts it verbatim.

use crate::command::Command;
use crate::error::Result;
use crate::session_context::SessionContext;
use desfire_core::prelude::{crc16, crc32, CommMode, DesfireAuthMode, DesfireKeyType, Request};

const CMD: u8 = 0xC4;

/// Selects the IV a legacy DES `ChangeKey` continuation frame is
/// encrypted under; both are observed in practice (§9 open question).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LegacyIvSeed {
    #[default]
    Zero,
    /// The last `E_K(RndB)` ciphertext the card sent during the prior
    /// `Authenticate`, used as the IV instead of zero.
    SeededFromAuthenticate,
}

fn is_aes(key_type: DesfireKeyType) -> bool {
    key_type == DesfireKeyType::Aes
}

fn block_size_for(scheme: Option<DesfireAuthMode>, key_type: DesfireKeyType) -> usize {
    match scheme {
        Some(DesfireAuthMode::Aes) => 16,
        Some(_) => 8,
        None => {
            if is_aes(key_type) {
                16
            } else {
                8
            }
        }
    }
}

fn pad_to_block(mut data: Vec<u8>, block_size: usize, aes_style: bool) -> Vec<u8> {
    if aes_style {
        data.push(0x80);
    }
    let remainder = data.len() % block_size;
    if remainder != 0 {
        data.resize(data.len() + (block_size - remainder), 0x00);
    }
    data
}

#[derive(Debug, Clone)]
pub struct ChangeKey {
    key_no: u8,
    new_key_type: DesfireKeyType,
    new_key: Vec<u8>,
    new_key_version: u8,
    /// `None` when changing the currently authenticated slot with the
    /// same key type (single-CRC cryptogram); `Some` otherwise.
    old_key: Option<Vec<u8>>,
    iv_seed: LegacyIvSeed,
    complete: bool,
}

impl ChangeKey {
    pub fn new(
        key_no: u8,
        new_key_type: DesfireKeyType,
        new_key: Vec<u8>,
        new_key_version: u8,
        old_key: Option<Vec<u8>>,
    ) -> Self {
        Self {
            key_no,
            new_key_type,
            new_key,
            new_key_version,
            old_key,
            iv_seed: LegacyIvSeed::default(),
            complete: false,
        }
    }

    /// Selects the IV the legacy DES continuation frame is encrypted
    /// under (§9 open question); ignored for ISO/AES schemes, which
    /// always use the session's current IV.
    pub fn with_legacy_iv_seed(mut self, iv_seed: LegacyIvSeed) -> Self {
        self.iv_seed = iv_seed;
        self
    }

    fn cryptogram(&self, auth_scheme: Option<DesfireAuthMode>) -> Vec<u8> {
        let aes_style = is_aes(self.new_key_type);
        let block_size = block_size_for(auth_scheme, self.new_key_type);

        let mut plain = match &self.old_key {
            None => {
                let mut p = self.new_key.clone();
                if aes_style {
                    p.push(self.new_key_version);
                }
                let mut crc_scope = vec![CMD, self.key_no];
                crc_scope.extend_from_slice(&p);
                if aes_style {
                    p.extend_from_slice(&crc32(&crc_scope).to_le_bytes());
                } else {
                    p.extend_from_slice(&crc16(&crc_scope).to_le_bytes());
                }
                p
            }
            Some(old_key) => {
                let xored: Vec<u8> = self
                    .new_key
                    .iter()
                    .zip(old_key.iter())
                    .map(|(a, b)| a ^ b)
                    .collect();
                let mut p = xored.clone();
                if aes_style {
                    p.push(self.new_key_version);
                }
                if aes_style {
                    p.extend_from_slice(&crc32(&self.new_key).to_le_bytes());
                    p.extend_from_slice(&crc32(&xored).to_le_bytes());
                } else {
                    p.extend_from_slice(&crc16(&self.new_key).to_le_bytes());
                    p.extend_from_slice(&crc16(&xored).to_le_bytes());
                }
                p
            }
        };

        plain = pad_to_block(plain, block_size, aes_style);
        plain
    }
}

impl Command for ChangeKey {
    type Output = ();

    fn name(&self) -> &'static str {
        "ChangeKey"
    }

    fn mode(&self) -> CommMode {
        CommMode::EncRaw
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    /// The leading `keyNo` byte stays in plaintext; only the cryptogram
    /// after it is encrypted (§4.6).
    fn plain_prefix_len(&self) -> usize {
        1
    }

    fn reset(&mut self) {
        self.complete = false;
    }

    /// Only matters for `Legacy` auth: ISO and AES continuation frames
    /// always chain off the session's own IV (§4.6).
    fn iv_override(&self, ctx: &dyn SessionContext) -> Option<Vec<u8>> {
        if self.iv_seed != LegacyIvSeed::SeededFromAuthenticate {
            return None;
        }
        if ctx.auth_scheme() != Some(DesfireAuthMode::Legacy) {
            return None;
        }
        ctx.last_auth_card_cipher().map(|c| c.to_vec())
    }

    fn build_request(&mut self, ctx: &mut dyn SessionContext) -> Request {
        let body = self.cryptogram(ctx.auth_scheme());
        let mut full_body = vec![self.key_no];
        full_body.extend_from_slice(&body);
        Request::new(CMD, full_body)
    }

    fn parse_response(
        &mut self,
        _status: u8,
        _body: &[u8],
        ctx: &mut dyn SessionContext,
    ) -> Result<()> {
        // Changing the currently authenticated slot with the same key
        // type keeps the session alive with the new key (§8 scenario
        // 6); any other change invalidates the session's own key.
        match ctx.key_no() {
            Some(current) if current == self.key_no && self.old_key.is_none() => {
                ctx.set_session_key(self.new_key.clone());
            }
            _ => ctx.reset(),
        }
        self.complete = true;
        Ok(())
    }

    fn into_output(self) -> Self::Output {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeCtx {
        reset_called: bool,
        session_key: Option<Vec<u8>>,
        current_key_no: Option<u8>,
    }

    impl SessionContext for FakeCtx {
        fn reset(&mut self) {
            self.reset_called = true;
        }
        fn apply_authentication(&mut self, _: DesfireAuthMode, key_no: u8, _: Vec<u8>) {
            self.current_key_no = Some(key_no);
        }
        fn set_session_key(&mut self, key: Vec<u8>) {
            self.session_key = Some(key);
        }
        fn set_selected_aid(&mut self, _: [u8; 3]) {}
        fn set_default_comm_mode(&mut self, _: CommMode) {}
        fn auth_scheme(&self) -> Option<DesfireAuthMode> {
            Some(DesfireAuthMode::Iso)
        }
        fn key_no(&self) -> Option<u8> {
            self.current_key_no
        }
    }

    /// §8 scenario 6: same-slot ISO 2K-3DES rekey, single CRC16,
    /// zero-padded to 24 bytes.
    #[test]
    fn same_key_iso_2k_cryptogram_matches_scenario_6() {
        let new_key = vec![0x11u8; 16];
        let cmd = ChangeKey::new(0x00, DesfireKeyType::Des3_2K, new_key.clone(), 0, None);
        let body = cmd.cryptogram(Some(DesfireAuthMode::Iso));

        let mut crc_scope = vec![CMD, 0x00];
        crc_scope.extend_from_slice(&new_key);
        let expected_crc = crc16(&crc_scope).to_le_bytes();

        assert_eq!(body.len(), 24);
        assert_eq!(&body[0..16], new_key.as_slice());
        assert_eq!(&body[16..18], &expected_crc);
        assert!(body[18..].iter().all(|&b| b == 0x00));
    }

    #[test]
    fn different_key_cryptogram_has_two_crcs() {
        let new_key = vec![0xAAu8; 16];
        let old_key = vec![0x55u8; 16];
        let cmd = ChangeKey::new(1, DesfireKeyType::Des3_2K, new_key.clone(), 0, Some(old_key.clone()));
        let body = cmd.cryptogram(Some(DesfireAuthMode::Iso));

        let xored: Vec<u8> = new_key.iter().zip(old_key.iter()).map(|(a, b)| a ^ b).collect();
        assert_eq!(&body[0..16], xored.as_slice());
        assert_eq!(&body[16..18], &crc16(&new_key).to_le_bytes());
        assert_eq!(&body[18..20], &crc16(&xored).to_le_bytes());
    }

    #[test]
    fn rekeying_own_slot_keeps_session_alive_with_new_key() {
        let mut cmd = ChangeKey::new(3, DesfireKeyType::Des3_2K, vec![0x99u8; 16], 0, None);
        let mut ctx = FakeCtx {
            current_key_no: Some(3),
            ..Default::default()
        };
        cmd.build_request(&mut ctx);
        cmd.parse_response(0x00, &[], &mut ctx).unwrap();
        assert!(!ctx.reset_called);
        assert_eq!(ctx.session_key, Some(vec![0x99u8; 16]));
    }

    #[test]
    fn rekeying_a_different_slot_resets_the_session() {
        let mut cmd = ChangeKey::new(5, DesfireKeyType::Des3_2K, vec![0x99u8; 16], 0, None);
        let mut ctx = FakeCtx {
            current_key_no: Some(3),
            ..Default::default()
        };
        cmd.parse_response(0x00, &[], &mut ctx).unwrap();
        assert!(ctx.reset_called);
    }
}
