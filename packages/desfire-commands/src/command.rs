//! The command-object contract (C6, §4.6, §9 "Multi-stage commands").
//!
//! Every DESFire command is a finite-state iterator over PDUs: the
//! processor (C7) drives it by repeatedly calling `build_request` /
//! `parse_response` until `is_complete` reports true, feeding each
//! call the narrow [`SessionContext`] view rather than a typed
//! `Session` so this crate never depends on `desfire-driver`.

use crate::error::Result;
use crate::session_context::SessionContext;
use desfire_core::prelude::{CommMode, Request};

pub trait Command {
    /// The typed result produced once the command completes.
    type Output;

    fn name(&self) -> &'static str;

    /// The secure-pipe traffic mode this command's body is protected
    /// with. Fixed per command per §4.5's policy table; authentication
    /// itself reports `Plain` but the processor bypasses the pipe for
    /// it entirely (§4.3).
    fn mode(&self) -> CommMode;

    fn is_complete(&self) -> bool;

    /// `true` only for `Authenticate`: it runs under `CommMode::Plain`
    /// but, unlike every other command, the processor must not run it
    /// through the pipe at all — not even the "track IV/CMAC silently"
    /// behavior PLAIN otherwise gets once authenticated (§4.3).
    fn bypasses_pipe(&self) -> bool {
        false
    }

    /// Number of leading bytes of `build_request`'s body the pipe must
    /// leave in plaintext before encrypting the rest, for
    /// `CommMode::EncRaw` commands whose wire body mixes a plain
    /// selector byte with an encrypted cryptogram (`ChangeKey`'s key
    /// number, §4.6). Irrelevant outside `EncRaw`; default `0`.
    fn plain_prefix_len(&self) -> usize {
        0
    }

    /// Number of real data bytes the command expects in the response
    /// it is about to parse, when that response is encrypted under
    /// `CommMode::Enc` and the cipher family's padding isn't otherwise
    /// self-delimiting (§4.5: DES-family zero-padding needs this; AES's
    /// ISO/IEC 9797-1 padding doesn't). `None` is correct for any
    /// command never run under `CommMode::Enc`.
    fn enc_response_data_len(&self) -> Option<usize> {
        None
    }

    /// Overrides the secure pipe's starting IV for this command's
    /// `CommMode::EncRaw` encryption instead of the session's current
    /// IV. Only `ChangeKey`'s legacy DES continuation framing uses
    /// this (§4.6, §9 open question: both a zero and a seeded IV are
    /// observed in practice); every other command keeps the default.
    fn iv_override(&self, _ctx: &dyn SessionContext) -> Option<Vec<u8>> {
        None
    }

    /// Re-arms a command object for a fresh run (e.g. the ChangeKey
    /// legacy-fallback retry, §7).
    fn reset(&mut self);

    fn build_request(&mut self, ctx: &mut dyn SessionContext) -> Request;

    /// Consumes one unwrapped, pipe-verified response PDU. On success
    /// may mutate `ctx` (e.g. `SelectApplication` resetting auth
    /// state, `Authenticate` installing a session key).
    fn parse_response(&mut self, status: u8, body: &[u8], ctx: &mut dyn SessionContext)
        -> Result<()>;

    /// Consumes the command once `is_complete()` is true.
    fn into_output(self) -> Self::Output;
}
