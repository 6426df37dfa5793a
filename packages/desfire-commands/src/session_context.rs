//! The narrow slice of [`desfire_driver::Session`] a command object is
//! allowed to touch. Command objects never hold a back-pointer to the
//! session (§9 "Raw pointer back-references" redesign flag); the
//! processor passes one in on every `build_request`/`parse_response`
//! call instead.

use desfire_core::prelude::{CommMode, DesfireAuthMode};

/// Implemented by `desfire_driver::Session`. Defined here (rather than
/// in `desfire-driver`) so command objects can depend on the narrow
/// interface without the command crate depending on the driver crate.
pub trait SessionContext {
    /// Resets all authentication state (§3: `SelectApplication` and a
    /// failed `Authenticate` both trigger this).
    fn reset(&mut self);

    /// Installs the session key derived by a successful `Authenticate`
    /// and zeroes the IV (§4.3).
    fn apply_authentication(&mut self, mode: DesfireAuthMode, key_no: u8, session_key: Vec<u8>);

    /// Replaces the session key in place, keeping the current
    /// authentication scheme/key slot and IV (ChangeKey on the
    /// currently authenticated slot, §8 scenario 6).
    fn set_session_key(&mut self, session_key: Vec<u8>);

    fn set_selected_aid(&mut self, aid: [u8; 3]);

    fn set_default_comm_mode(&mut self, mode: CommMode);

    fn auth_scheme(&self) -> Option<DesfireAuthMode>;

    fn key_no(&self) -> Option<u8>;

    /// The card's last `E_K(RndB)` ciphertext from the most recent
    /// successful `Authenticate`, consulted only by `ChangeKey`'s
    /// legacy DES continuation-framing IV-seed selector (§4.6, §9
    /// open question). `None` for any context that doesn't track it.
    fn last_auth_card_cipher(&self) -> Option<&[u8]> {
        None
    }

    /// Records the card's last `E_K(RndB)` ciphertext. A no-op by
    /// default; `Session` is the only implementer that needs it.
    fn set_last_auth_card_cipher(&mut self, _cipher: Vec<u8>) {}
}
