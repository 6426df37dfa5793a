//! `Authenticate` (C3, §4.3): the two-pass challenge/response shared by
//! Legacy DES, ISO 2K/3K-3DES and AES, modeled as the `Stage` enum the
//! reference implementation's `AuthenticateCommand` uses internally
//! (§9 "Supplemented features").
//!
//! Bypasses the secure pipe entirely (§4.6); the processor must invoke
//! it with `CommMode::Plain` and without MAC/ENC wrapping, which is
//! naturally the case here since this command's `mode()` is `Plain`
//! and the driver dispatches authentication outside the normal pipe.

use crate::command::Command;
use crate::error::{CommandError, Result};
use crate::session_context::SessionContext;
use desfire_core::prelude::{
    des_family_cbc_decrypt, des_family_cbc_encrypt, des_family_ecb_decrypt_block,
    des_family_ecb_encrypt_block, random_bytes, rotate_left_bytes_1, xor_slices, CommMode,
    DesfireAuthMode, Request,
};
use desfire_core::crypto::{aes128_cbc_decrypt, aes128_cbc_encrypt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Initial,
    ResponsePending,
    Complete,
}

/// Clears bit 0 of every byte — the "parity dropped" normalization
/// Legacy/ISO session keys (and Legacy long-term keys) go through;
/// AES keys are never touched (§4.3).
fn clear_parity_bits(data: &[u8]) -> Vec<u8> {
    data.iter().map(|b| b & 0xFE).collect()
}

#[derive(Debug, Clone)]
pub struct Authenticate {
    mode: DesfireAuthMode,
    key_no: u8,
    key: Vec<u8>,
    rnd_size: usize,
    stage: Stage,
    rnd_a: Vec<u8>,
    rnd_b: Vec<u8>,
    card_challenge: Vec<u8>,
    host_response: Vec<u8>,
}

impl Authenticate {
    /// `key` is the long-term key for `key_no`: 8 bytes for Legacy
    /// single-DES, 16/24 bytes for ISO 3DES-EDE2/EDE3, 16 bytes for
    /// AES-128.
    pub fn new(mode: DesfireAuthMode, key_no: u8, key: Vec<u8>) -> Self {
        let key = match mode {
            DesfireAuthMode::Legacy => clear_parity_bits(&key),
            _ => key,
        };
        let rnd_size = match mode {
            DesfireAuthMode::Legacy => 8,
            DesfireAuthMode::Iso => {
                if key.len() == 24 {
                    16
                } else {
                    8
                }
            }
            DesfireAuthMode::Aes => 16,
        };

        Self {
            mode,
            key_no,
            key,
            rnd_size,
            stage: Stage::Initial,
            rnd_a: Vec::new(),
            rnd_b: Vec::new(),
            card_challenge: Vec::new(),
            host_response: Vec::new(),
        }
    }

    fn is_aes(&self) -> bool {
        self.mode == DesfireAuthMode::Aes
    }

    fn decrypt_block(&self, cipher: &[u8], iv: &[u8]) -> Vec<u8> {
        if self.is_aes() {
            let mut iv16 = [0u8; 16];
            iv16.copy_from_slice(iv);
            let mut key16 = [0u8; 16];
            key16.copy_from_slice(&self.key);
            aes128_cbc_decrypt(cipher, &key16, &iv16)
        } else {
            des_family_cbc_decrypt(cipher, &self.key, iv)
        }
    }

    fn encrypt_block(&self, plain: &[u8], iv: &[u8]) -> Vec<u8> {
        if self.is_aes() {
            let mut iv16 = [0u8; 16];
            iv16.copy_from_slice(iv);
            let mut key16 = [0u8; 16];
            key16.copy_from_slice(&self.key);
            aes128_cbc_encrypt(plain, &key16, &iv16)
        } else if self.mode == DesfireAuthMode::Legacy {
            self.legacy_send_mode_encrypt(plain, iv)
        } else {
            des_family_cbc_encrypt(plain, &self.key, iv)
        }
    }

    /// Legacy single-DES "send mode" (§4.3): unlike textbook CBC, the
    /// card recovers each plaintext block as `E_K(Y_i) XOR Y_{i-1}`, so
    /// the host must produce `Y_i = D_K(P_i XOR Y_{i-1})` — a DES
    /// *decrypt* chained off the previous ciphertext block, not the
    /// encrypt `encrypt_block`'s ISO/AES branches use.
    fn legacy_send_mode_encrypt(&self, plain: &[u8], iv: &[u8]) -> Vec<u8> {
        let mut previous = [0u8; 8];
        previous.copy_from_slice(iv);
        let mut out = Vec::with_capacity(plain.len());
        for chunk in plain.chunks(8) {
            let mut block = [0u8; 8];
            block.copy_from_slice(chunk);
            for i in 0..8 {
                block[i] ^= previous[i];
            }
            let cipher = des_family_ecb_decrypt_block(&block, &self.key);
            out.extend_from_slice(&cipher);
            previous = cipher;
        }
        out
    }

    fn zero_iv(&self) -> Vec<u8> {
        vec![0u8; if self.is_aes() { 16 } else { 8 }]
    }

    /// Legacy single-DES verification quirk (§4.3): the card's final
    /// confirmation is checked by re-*encrypting* the received block
    /// (not decrypting it) and comparing against `rotL1(RndA)` XORed
    /// with the previously received card ciphertext. ISO/AES use the
    /// textbook CBC-decrypt-and-compare.
    fn verify_card_response(&self, body: &[u8]) -> bool {
        let rnd_a_rot = rotate_left_bytes_1(&self.rnd_a);
        if self.mode == DesfireAuthMode::Legacy {
            let test = des_family_ecb_encrypt_block(
                &body.try_into().unwrap_or([0u8; 8]),
                &self.key,
            );
            let expected = xor_slices(&rnd_a_rot, &self.card_challenge);
            test.as_slice() == expected.as_slice()
        } else {
            let block_size = if self.is_aes() { 16 } else { 8 };
            let iv = &self.host_response[self.host_response.len() - block_size..];
            let plain = self.decrypt_block(body, iv);
            plain == rnd_a_rot
        }
    }

    /// Assembles the session key from `RndA`/`RndB` per the scheme's
    /// concatenation rule (§4.3), and the block-size-dependent
    /// DES-family cipher selection later picks DES/3DES-EDE2/EDE3 off
    /// the resulting key length.
    fn session_key(&self) -> Vec<u8> {
        let a = &self.rnd_a;
        let b = &self.rnd_b;
        let sk = match self.mode {
            DesfireAuthMode::Legacy => [&a[0..4], &b[0..4]].concat(),
            DesfireAuthMode::Iso if self.rnd_size == 8 => {
                [&a[0..4], &b[0..4], &a[4..8], &b[4..8]].concat()
            }
            DesfireAuthMode::Iso => [
                &a[0..4],
                &b[0..4],
                &a[6..10],
                &b[6..10],
                &a[12..16],
                &b[12..16],
            ]
            .concat(),
            DesfireAuthMode::Aes => [&a[0..4], &b[0..4], &a[12..16], &b[12..16]].concat(),
        };
        if self.mode == DesfireAuthMode::Aes {
            sk
        } else {
            clear_parity_bits(&sk)
        }
    }
}

impl Command for Authenticate {
    type Output = ();

    fn name(&self) -> &'static str {
        "Authenticate"
    }

    fn mode(&self) -> CommMode {
        CommMode::Plain
    }

    fn is_complete(&self) -> bool {
        self.stage == Stage::Complete
    }

    fn bypasses_pipe(&self) -> bool {
        true
    }

    fn reset(&mut self) {
        self.stage = Stage::Initial;
        self.rnd_a.clear();
        self.rnd_b.clear();
        self.card_challenge.clear();
        self.host_response.clear();
    }

    fn build_request(&mut self, _ctx: &mut dyn SessionContext) -> Request {
        match self.stage {
            Stage::Initial => Request::new(self.mode as u8, vec![self.key_no]),
            Stage::ResponsePending | Stage::Complete => {
                Request::new(0xAF, self.host_response.clone())
            }
        }
    }

    fn parse_response(
        &mut self,
        status: u8,
        body: &[u8],
        ctx: &mut dyn SessionContext,
    ) -> Result<()> {
        match self.stage {
            Stage::Initial => {
                if status != 0xAF || body.len() != self.rnd_size {
                    ctx.reset();
                    return Ok(());
                }
                self.card_challenge = body.to_vec();
                self.rnd_b = self.decrypt_block(body, &self.zero_iv());
                self.rnd_a = random_bytes(self.rnd_size);

                let plaintext = [self.rnd_a.clone(), rotate_left_bytes_1(&self.rnd_b)].concat();
                self.host_response = self.encrypt_block(&plaintext, &self.card_challenge);
                self.stage = Stage::ResponsePending;
                Ok(())
            }
            Stage::ResponsePending => {
                if status != 0x00 || body.len() != self.rnd_size {
                    ctx.reset();
                    return Ok(());
                }
                if !self.verify_card_response(body) {
                    ctx.reset();
                    return Err(CommandError::IntegrityError);
                }
                ctx.apply_authentication(self.mode, self.key_no, self.session_key());
                ctx.set_last_auth_card_cipher(self.card_challenge.clone());
                self.stage = Stage::Complete;
                Ok(())
            }
            Stage::Complete => Ok(()),
        }
    }

    fn into_output(self) -> Self::Output {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeCtx {
        reset_called: bool,
        authenticated: Option<(DesfireAuthMode, u8, Vec<u8>)>,
    }

    impl SessionContext for FakeCtx {
        fn reset(&mut self) {
            self.reset_called = true;
        }
        fn apply_authentication(&mut self, mode: DesfireAuthMode, key_no: u8, key: Vec<u8>) {
            self.authenticated = Some((mode, key_no, key));
        }
        fn set_session_key(&mut self, _: Vec<u8>) {}
        fn set_selected_aid(&mut self, _: [u8; 3]) {}
        fn set_default_comm_mode(&mut self, _: CommMode) {}
        fn auth_scheme(&self) -> Option<DesfireAuthMode> {
            None
        }
        fn key_no(&self) -> Option<u8> {
            None
        }
    }

    /// Drives a full, successful ISO 2K-3DES authenticate against a
    /// simulated card that follows the protocol honestly, and checks
    /// the session key matches the documented concatenation rule.
    #[test]
    fn iso_2k_authenticate_round_trip() {
        let key = vec![0u8; 16];
        let mut cmd = Authenticate::new(DesfireAuthMode::Iso, 0, key.clone());
        let mut ctx = FakeCtx::default();

        let req1 = cmd.build_request(&mut ctx);
        assert_eq!(req1.cmd, 0x1A);
        assert_eq!(req1.body.as_ref(), &[0x00]);

        // simulated card: picks RndB, encrypts it with a zero IV
        let rnd_b = vec![0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF];
        let card_challenge = des_family_cbc_encrypt(&rnd_b, &key, &[0u8; 8]);
        cmd.parse_response(0xAF, &card_challenge, &mut ctx).unwrap();
        assert!(!cmd.is_complete());

        let req2 = cmd.build_request(&mut ctx);
        assert_eq!(req2.cmd, 0xAF);

        // card decrypts host response with IV = card_challenge, recovers RndA ‖ rotL1(RndB)
        let plain = des_family_cbc_decrypt(&req2.body, &key, &card_challenge);
        let rnd_a = plain[0..8].to_vec();
        assert_eq!(&plain[8..16], rotate_left_bytes_1(&rnd_b).as_slice());

        // card replies with E(rotL1(RndA)) under IV = host's last ciphertext block
        let rnd_a_rot = rotate_left_bytes_1(&rnd_a);
        let last_block = &req2.body[req2.body.len() - 8..];
        let card_confirmation = des_family_cbc_encrypt(&rnd_a_rot, &key, last_block);

        cmd.parse_response(0x00, &card_confirmation, &mut ctx).unwrap();
        assert!(cmd.is_complete());
        assert!(!ctx.reset_called);

        let (mode, key_no, session_key) = ctx.authenticated.expect("should have authenticated");
        assert_eq!(mode, DesfireAuthMode::Iso);
        assert_eq!(key_no, 0);

        let expected = clear_parity_bits(
            &[&rnd_a[0..4], &rnd_b[0..4], &rnd_a[4..8], &rnd_b[4..8]].concat(),
        );
        assert_eq!(session_key, expected);
    }

    #[test]
    fn legacy_key_is_parity_cleared_at_construction() {
        let key = vec![0xFFu8; 8];
        let cmd = Authenticate::new(DesfireAuthMode::Legacy, 1, key);
        assert!(cmd.key.iter().all(|b| b & 1 == 0));
    }

    #[test]
    fn bad_confirmation_resets_session_and_reports_integrity_error() {
        let key = vec![0u8; 16];
        let mut cmd = Authenticate::new(DesfireAuthMode::Iso, 0, key.clone());
        let mut ctx = FakeCtx::default();
        cmd.build_request(&mut ctx);

        let rnd_b = vec![0xAAu8; 8];
        let card_challenge = des_family_cbc_encrypt(&rnd_b, &key, &[0u8; 8]);
        cmd.parse_response(0xAF, &card_challenge, &mut ctx).unwrap();

        let req2 = cmd.build_request(&mut ctx);
        let garbage = vec![0x00u8; req2.body.len()];
        let err = cmd.parse_response(0x00, &garbage, &mut ctx).unwrap_err();
        assert_eq!(err, CommandError::IntegrityError);
        assert!(ctx.reset_called);
        assert!(!cmd.is_complete());
    }

    #[test]
    fn non_af_status_during_challenge_resets_without_error() {
        let mut cmd = Authenticate::new(DesfireAuthMode::Aes, 2, vec![0u8; 16]);
        let mut ctx = FakeCtx::default();
        cmd.build_request(&mut ctx);
        cmd.parse_response(0xAE, &[], &mut ctx).unwrap();
        assert!(ctx.reset_called);
        assert!(!cmd.is_complete());
    }

    #[test]
    fn des_ecb_decrypt_is_inverse_of_encrypt_used_by_zero_iv_challenge_decode() {
        let key = clear_parity_bits(&[0x11u8; 8]);
        let block = [0x22u8; 8];
        let cipher = des_family_ecb_encrypt_block(&block, &key);
        assert_eq!(des_family_ecb_decrypt_block(&cipher, &key), block);
    }
}
