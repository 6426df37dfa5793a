//! The command processor (C7, §4.7): drives one [`Command`] to
//! completion over however many PDU exchanges it takes, threading each
//! request through the secure pipe, the wire framer, and the
//! transceiver, and feeding each unwrapped response back to the
//! command until it reports done.

use desfire_commands::Command;
use desfire_core::prelude::{is_control_status, CommMode, Response};

use crate::error::{Error, Result};
use crate::pipe;
use crate::session::Session;
use crate::transceiver::Transceiver;
use desfire_logging::prelude::Direction;

/// Runs `command` to completion against `session` and returns its
/// typed output. Each loop iteration is exactly one PDU exchange
/// (§4.7's `while !command.is_complete()` pseudocode):
///
/// 1. `command.build_request` — may itself be a continuation frame
///    (`0xAF`) for a chunked command.
/// 2. secure pipe wraps the request, unless `command.bypasses_pipe()`
///    (only `Authenticate`, §4.3).
/// 3. wire framer turns the `Request` into an APDU and back.
/// 4. `transceiver.transceive` does the actual I/O, under
///    `session.config.command_timeout_ms`.
/// 5. secure pipe unwraps the response, unless bypassed; a non-control
///    status short-circuits here with the mapped protocol error,
///    except for bypass-pipe commands, which see every status byte
///    themselves (`Authenticate`'s own retry/abort logic, §4.3).
/// 6. `command.parse_response` consumes the unwrapped body and may
///    mutate the session (new key, selected AID, reset).
pub fn execute<T: Transceiver, C: Command>(session: &mut Session<T>, mut command: C) -> Result<C::Output> {
    command.reset();

    loop {
        let request = command.build_request(session);

        let iv_before_tx = session.iv().to_vec();
        let wire_request = if command.bypasses_pipe() {
            request
        } else if command.mode() == CommMode::EncRaw {
            if let Some(iv) = command.iv_override(&*session) {
                session.set_iv(iv);
            }
            let prefix_len = command.plain_prefix_len();
            let (plain, encrypted) = request.body.split_at(prefix_len);
            let ciphertext = pipe::encrypt_raw(session, encrypted);
            let mut body = plain.to_vec();
            body.extend_from_slice(&ciphertext);
            desfire_core::prelude::Request::new(request.cmd, body)
        } else {
            pipe::wrap_request(session, command.mode(), &request)
        };
        let iv_changed_tx = session.iv() != iv_before_tx.as_slice();

        session.logger.pdu(
            command.name(),
            Direction::Tx,
            wire_request.cmd,
            wire_request.body.len(),
            iv_changed_tx,
        );

        let apdu = desfire_wire::frame::wrap_request(session.wire_kind, &wire_request)?;
        let raw_response = session
            .transceiver
            .transceive(&apdu, session.config.command_timeout_ms)?;
        let Response { status, body } = desfire_wire::frame::unwrap_response(session.wire_kind, &raw_response)?;

        let iv_before_rx = session.iv().to_vec();

        if command.bypasses_pipe() {
            session
                .logger
                .pdu(command.name(), Direction::Rx, status, body.len(), false);
            command.parse_response(status, &body, session)?;
        } else {
            if !is_control_status(status) {
                session
                    .logger
                    .pdu(command.name(), Direction::Rx, status, body.len(), false);
                return Err(Error::from_status_byte(status));
            }
            let data = pipe::unwrap_response(
                session,
                command.mode(),
                status,
                &body,
                command.enc_response_data_len(),
            )?;
            let iv_changed_rx = session.iv() != iv_before_rx.as_slice();
            session
                .logger
                .pdu(command.name(), Direction::Rx, status, body.len(), iv_changed_rx);
            command.parse_response(status, &data, session)?;
        }

        if command.is_complete() {
            return Ok(command.into_output());
        }
    }
}
