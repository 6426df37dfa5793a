//! The secure pipe (C5, §4.5): PLAIN / MAC / ENC / ENC-RAW traffic
//! protection applied to one PDU exchange at a time, using the
//! session's current key/IV/CMAC-subkey state. Pure functions over
//! `&mut Session<T>` plus PDU bytes — no back-pointer from the pipe to
//! a command or vice versa (§9 "Raw pointer back-references").
//!
//! Every mode operates on exactly one request/response exchange (one
//! frame): `Command::build_request`/`parse_response` is itself called
//! once per frame, so a multi-frame command's trailing checksum/MAC
//! only ever appears on its last frame, and every other frame's body
//! is passed through this pipe as plain continuation data. IV and
//! CMAC-subkey state carries across frames via the session, which is
//! what keeps a multi-frame exchange cryptographically continuous.

use desfire_commands::{CommandError, SessionContext};
use desfire_core::prelude::{
    aes128_cbc_decrypt, aes128_cbc_encrypt, crc16, crc32, des_family_cbc_decrypt,
    des_family_cbc_encrypt, CommMode, DesfireAuthMode, Request, SessionCipher,
};

use crate::config::CommandCounterPolicy;
use crate::session::Session;
use crate::transceiver::Transceiver;

type Result<T> = std::result::Result<T, CommandError>;

fn zero_pad(mut data: Vec<u8>, block_size: usize) -> Vec<u8> {
    let rem = data.len() % block_size;
    if rem != 0 {
        data.resize(data.len() + (block_size - rem), 0x00);
    }
    data
}

/// ISO/IEC 9797-1 padding method 2: a mandatory `0x80` delimiter then
/// zero bytes to the next block boundary.
fn iso_pad(mut data: Vec<u8>, block_size: usize) -> Vec<u8> {
    data.push(0x80);
    let rem = data.len() % block_size;
    if rem != 0 {
        data.resize(data.len() + (block_size - rem), 0x00);
    }
    data
}

/// Strips a mandatory `0x80 00*` delimiter from the end of `data`.
/// `None` if no such delimiter is found (malformed trailer).
fn iso_unpad(data: &[u8]) -> Option<usize> {
    let mut end = data.len();
    while end > 0 && data[end - 1] == 0x00 {
        end -= 1;
    }
    if end == 0 || data[end - 1] != 0x80 {
        return None;
    }
    Some(end - 1)
}

fn cbc_encrypt(cipher: SessionCipher, key: &[u8], iv: &[u8], data: &[u8]) -> Vec<u8> {
    match cipher {
        SessionCipher::DesFamily => des_family_cbc_encrypt(data, key, iv),
        SessionCipher::Aes128 => {
            let mut k = [0u8; 16];
            k.copy_from_slice(key);
            let mut i = [0u8; 16];
            i.copy_from_slice(iv);
            aes128_cbc_encrypt(data, &k, &i)
        }
    }
}

fn cbc_decrypt(cipher: SessionCipher, key: &[u8], iv: &[u8], data: &[u8]) -> Vec<u8> {
    match cipher {
        SessionCipher::DesFamily => des_family_cbc_decrypt(data, key, iv),
        SessionCipher::Aes128 => {
            let mut k = [0u8; 16];
            k.copy_from_slice(key);
            let mut i = [0u8; 16];
            i.copy_from_slice(iv);
            aes128_cbc_decrypt(data, &k, &i)
        }
    }
}

/// Truncated tag length for `CommMode::Mac` (§4.5): 4 bytes for
/// Legacy DES, 8 for ISO 3DES and AES.
fn mac_tag_len(auth_scheme: DesfireAuthMode) -> usize {
    match auth_scheme {
        DesfireAuthMode::Legacy => 4,
        DesfireAuthMode::Iso | DesfireAuthMode::Aes => 8,
    }
}

/// The full (untruncated) MAC over `data`, which doubles as the value
/// IV progresses to (§4.5 "IV progression"). DES-family chains the
/// session's running IV into its CBC-MAC as the starting vector; AES
/// uses the textbook zero-start CMAC construction (so the NIST test
/// vectors `SessionCipher::compute_cmac` is checked against keep
/// holding) and simply adopts the resulting tag as the next IV.
fn full_mac(cipher: SessionCipher, key: &[u8], iv: &[u8], data: &[u8]) -> Vec<u8> {
    match cipher {
        SessionCipher::DesFamily => {
            let block_size = cipher.block_size();
            let padded = zero_pad(data.to_vec(), block_size);
            let out = des_family_cbc_encrypt(&padded, key, iv);
            out[out.len() - block_size..].to_vec()
        }
        SessionCipher::Aes128 => cipher.compute_cmac(data, key),
    }
}

/// Prepends the 2-byte LE command counter to `scope` and advances it,
/// for AES sessions configured to include it in the CMAC input (§9
/// open question); a no-op (including no counter advance) for every
/// other combination.
fn advance_and_prefix_counter<T: Transceiver>(session: &mut Session<T>, cipher: SessionCipher, scope: &[u8]) -> Vec<u8> {
    if cipher != SessionCipher::Aes128 || session.command_counter_policy() != CommandCounterPolicy::AdvancePerExchange {
        return scope.to_vec();
    }
    let counter = session.advance_command_counter();
    let mut prefixed = counter.to_le_bytes().to_vec();
    prefixed.extend_from_slice(scope);
    prefixed
}

/// Reads back the same counter value `advance_and_prefix_counter` set
/// for this exchange's request, without advancing it again.
fn read_and_prefix_counter<T: Transceiver>(session: &Session<T>, cipher: SessionCipher, scope: &[u8]) -> Vec<u8> {
    if cipher != SessionCipher::Aes128 || session.command_counter_policy() != CommandCounterPolicy::AdvancePerExchange {
        return scope.to_vec();
    }
    let mut prefixed = session.command_counter().to_le_bytes().to_vec();
    prefixed.extend_from_slice(scope);
    prefixed
}

fn enc_checksum(cipher: SessionCipher, scope: &[u8]) -> Vec<u8> {
    match cipher {
        SessionCipher::DesFamily => crc16(scope).to_le_bytes().to_vec(),
        SessionCipher::Aes128 => crc32(scope).to_le_bytes().to_vec(),
    }
}

/// Wraps one request PDU for the wire (§4.5). A no-op (including no
/// IV/CMAC tracking) before the first successful `Authenticate`, since
/// there is no session key yet.
pub(crate) fn wrap_request<T: Transceiver>(
    session: &mut Session<T>,
    mode: CommMode,
    request: &Request,
) -> Request {
    let Some(auth_scheme) = session.auth_scheme() else {
        return request.clone();
    };
    let cipher = session
        .session_cipher()
        .expect("an authenticated session always has a session cipher");
    let key = session.session_key_bytes().to_vec();

    let mut scope = vec![request.cmd];
    scope.extend_from_slice(&request.body);

    match mode {
        CommMode::Plain => {
            let mac_scope = advance_and_prefix_counter(session, cipher, &scope);
            let tag = full_mac(cipher, &key, session.iv(), &mac_scope);
            session.set_iv(tag);
            request.clone()
        }
        CommMode::Mac => {
            let mac_scope = advance_and_prefix_counter(session, cipher, &scope);
            let tag = full_mac(cipher, &key, session.iv(), &mac_scope);
            session.set_iv(tag.clone());
            let mut body = request.body.to_vec();
            body.extend_from_slice(&tag[..mac_tag_len(auth_scheme)]);
            Request::new(request.cmd, body)
        }
        CommMode::Enc => {
            let checksum = enc_checksum(cipher, &scope);
            let mut plain = request.body.to_vec();
            plain.extend_from_slice(&checksum);
            let padded = match cipher {
                SessionCipher::DesFamily => zero_pad(plain, cipher.block_size()),
                SessionCipher::Aes128 => iso_pad(plain, cipher.block_size()),
            };
            let ciphertext = cbc_encrypt(cipher, &key, session.iv(), &padded);
            session.set_iv(last_block(&ciphertext, cipher));
            Request::new(request.cmd, ciphertext)
        }
        CommMode::EncRaw => {
            let ciphertext = cbc_encrypt(cipher, &key, session.iv(), &request.body);
            session.set_iv(last_block(&ciphertext, cipher));
            Request::new(request.cmd, ciphertext)
        }
    }
}

/// CBC-encrypts an already block-aligned plaintext verbatim, with no
/// checksum or padding of its own — the command built both already
/// (`ChangeKey`'s cryptogram, §4.6). Used by the processor for the
/// encrypted suffix of an `EncRaw` body once it has split off the
/// plaintext prefix.
pub(crate) fn encrypt_raw<T: Transceiver>(session: &mut Session<T>, plaintext: &[u8]) -> Vec<u8> {
    let cipher = session
        .session_cipher()
        .expect("EncRaw only runs on an authenticated session");
    let key = session.session_key_bytes().to_vec();
    let ciphertext = cbc_encrypt(cipher, &key, session.iv(), plaintext);
    session.set_iv(last_block(&ciphertext, cipher));
    ciphertext
}

fn last_block(ciphertext: &[u8], cipher: SessionCipher) -> Vec<u8> {
    let block_size = cipher.block_size();
    ciphertext[ciphertext.len() - block_size..].to_vec()
}

/// Unwraps one response PDU from the wire (§4.5). `enc_response_len`
/// is [`desfire_commands::Command::enc_response_data_len`], consulted
/// only for a DES-family `Enc` final frame.
pub(crate) fn unwrap_response<T: Transceiver>(
    session: &mut Session<T>,
    mode: CommMode,
    status: u8,
    body: &[u8],
    enc_response_len: Option<usize>,
) -> Result<Vec<u8>> {
    let Some(auth_scheme) = session.auth_scheme() else {
        return Ok(body.to_vec());
    };
    let cipher = session
        .session_cipher()
        .expect("an authenticated session always has a session cipher");
    let key = session.session_key_bytes().to_vec();

    match mode {
        CommMode::Plain => {
            let mut scope = vec![status];
            scope.extend_from_slice(body);
            let mac_scope = read_and_prefix_counter(session, cipher, &scope);
            let tag = full_mac(cipher, &key, session.iv(), &mac_scope);
            session.set_iv(tag);
            Ok(body.to_vec())
        }
        CommMode::Mac => {
            let tag_len = mac_tag_len(auth_scheme);
            if body.len() < tag_len {
                return Err(CommandError::BadResponseSize);
            }
            let (data, received_tag) = body.split_at(body.len() - tag_len);
            let mut scope = vec![status];
            scope.extend_from_slice(data);
            let mac_scope = read_and_prefix_counter(session, cipher, &scope);
            let tag = full_mac(cipher, &key, session.iv(), &mac_scope);
            session.set_iv(tag.clone());
            if &tag[..tag_len] != received_tag {
                return Err(CommandError::IntegrityError);
            }
            Ok(data.to_vec())
        }
        CommMode::Enc | CommMode::EncRaw => {
            if body.is_empty() {
                // e.g. ChangeKey's reply carries only a status byte.
                return Ok(Vec::new());
            }
            let block_size = cipher.block_size();
            if body.len() % block_size != 0 {
                return Err(CommandError::BadResponseSize);
            }
            let plain = cbc_decrypt(cipher, &key, session.iv(), body);
            session.set_iv(last_block(body, cipher));

            if mode == CommMode::EncRaw {
                // The command owns its own cryptogram verification, if any.
                return Ok(plain);
            }
            // Intermediate (`0xAF`) frames of a chunked read carry pure
            // continuation ciphertext; only the final frame's plaintext
            // ends in a checksum and padding.
            if status != 0x00 {
                return Ok(plain);
            }
            strip_enc_trailer(cipher, status, &plain, enc_response_len)
        }
    }
}

fn strip_enc_trailer(
    cipher: SessionCipher,
    status: u8,
    plain: &[u8],
    enc_response_len: Option<usize>,
) -> Result<Vec<u8>> {
    match cipher {
        SessionCipher::DesFamily => {
            let data_len = enc_response_len.unwrap_or(plain.len().saturating_sub(2));
            if plain.len() < data_len + 2 {
                return Err(CommandError::BadResponseSize);
            }
            let (data, rest) = plain.split_at(data_len);
            let checksum = &rest[..2];
            let mut scope = vec![status];
            scope.extend_from_slice(data);
            if checksum != crc16(&scope).to_le_bytes().as_slice() {
                return Err(CommandError::IntegrityError);
            }
            Ok(data.to_vec())
        }
        SessionCipher::Aes128 => {
            let end = iso_unpad(plain).ok_or(CommandError::BadResponseSize)?;
            if end < 4 {
                return Err(CommandError::BadResponseSize);
            }
            let data_len = end - 4;
            let data = &plain[..data_len];
            let checksum = &plain[data_len..end];
            let mut scope = vec![status];
            scope.extend_from_slice(data);
            if checksum != crc32(&scope).to_le_bytes().as_slice() {
                return Err(CommandError::IntegrityError);
            }
            Ok(data.to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::error::TransportError;
    use desfire_core::prelude::{DesfireAuthMode, ReaderCapabilities, WireKind};
    use desfire_logging::{NoopLogger, SessionLogger};

    struct DummyTransceiver;
    impl Transceiver for DummyTransceiver {
        fn transceive(&mut self, _apdu: &[u8], _deadline_ms: u64) -> std::result::Result<Vec<u8>, TransportError> {
            Err(TransportError::DeviceNotFound)
        }
    }

    fn authenticated_session(mode: DesfireAuthMode, session_key: Vec<u8>) -> Session<DummyTransceiver> {
        use desfire_commands::SessionContext;
        let mut s = Session::new(
            DummyTransceiver,
            WireKind::Native,
            ReaderCapabilities::pn532(),
            SessionConfig::default(),
            SessionLogger::new(Box::new(NoopLogger::default())),
        );
        s.apply_authentication(mode, 0, session_key);
        s
    }

    #[test]
    fn unauthenticated_wrap_is_a_no_op() {
        let mut session = Session::new(
            DummyTransceiver,
            WireKind::Native,
            ReaderCapabilities::pn532(),
            SessionConfig::default(),
            SessionLogger::new(Box::new(NoopLogger::default())),
        );
        let request = Request::new(0x5A, vec![0x00, 0x00, 0x00]);
        let wrapped = wrap_request(&mut session, CommMode::Plain, &request);
        assert_eq!(wrapped, request);
    }

    #[test]
    fn mac_mode_appends_truncated_tag_and_verifies_on_response() {
        let mut session = authenticated_session(DesfireAuthMode::Aes, vec![0u8; 16]);
        let request = Request::new(0xCA, vec![0x01, 0x02, 0x03, 0x0F, 0x81]);
        let wrapped = wrap_request(&mut session, CommMode::Mac, &request);
        assert_eq!(wrapped.body.len(), request.body.len() + 8);

        // Simulate a card response with no data, protected the same way.
        let iv_before = session.iv().to_vec();
        let tag = full_mac(SessionCipher::Aes128, &vec![0u8; 16], &iv_before, &[0x00]);
        let response_body = &tag[..8];
        let unwrapped = unwrap_response(&mut session, CommMode::Mac, 0x00, response_body, None).unwrap();
        assert!(unwrapped.is_empty());
    }

    #[test]
    fn mac_mode_rejects_tampered_tag() {
        let mut session = authenticated_session(DesfireAuthMode::Iso, vec![0u8; 16]);
        let bad_tag = [0xFFu8; 8];
        let err = unwrap_response(&mut session, CommMode::Mac, 0x00, &bad_tag, None).unwrap_err();
        assert_eq!(err, CommandError::IntegrityError);
    }

    #[test]
    fn enc_round_trips_des_family_request_and_checks_block_alignment() {
        let mut session = authenticated_session(DesfireAuthMode::Legacy, vec![0u8; 8]);
        let request = Request::new(0x5C, vec![0x09]);
        let wrapped = wrap_request(&mut session, CommMode::Enc, &request);
        assert_eq!(wrapped.body.len() % 8, 0);
    }

    #[test]
    fn enc_response_strips_checksum_and_padding_for_aes() {
        let mut session = authenticated_session(DesfireAuthMode::Aes, vec![0u8; 16]);
        let data = vec![0xAAu8; 5];
        let mut scope = vec![0x00u8];
        scope.extend_from_slice(&data);
        let checksum = crc32(&scope).to_le_bytes();
        let mut plain = data.clone();
        plain.extend_from_slice(&checksum);
        let padded = iso_pad(plain, 16);
        let iv = session.iv().to_vec();
        let key = session.session_key_bytes().to_vec();
        let ciphertext = cbc_encrypt(SessionCipher::Aes128, &key, &iv, &padded);

        let unwrapped = unwrap_response(&mut session, CommMode::Enc, 0x00, &ciphertext, None).unwrap();
        assert_eq!(unwrapped, data);
    }

    #[test]
    fn enc_raw_decrypts_verbatim_without_checksum_checks() {
        let mut session = authenticated_session(DesfireAuthMode::Iso, vec![0u8; 16]);
        let plaintext = vec![0x11u8; 24];
        let wrapped = wrap_request(&mut session, CommMode::EncRaw, &Request::new(0xC4, plaintext.clone()));
        assert_eq!(wrapped.body.len(), 24);

        let mut session2 = authenticated_session(DesfireAuthMode::Iso, vec![0u8; 16]);
        let unwrapped = unwrap_response(&mut session2, CommMode::EncRaw, 0x00, &wrapped.body, None).unwrap();
        assert_eq!(unwrapped.len(), 24);
    }

    #[test]
    fn enc_raw_empty_response_is_a_clean_no_op() {
        let mut session = authenticated_session(DesfireAuthMode::Iso, vec![0u8; 16]);
        let unwrapped = unwrap_response(&mut session, CommMode::EncRaw, 0x00, &[], None).unwrap();
        assert!(unwrapped.is_empty());
    }
}
