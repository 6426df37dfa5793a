//! PDU↔APDU framing (§4.4): *native* DESFire framing and *ISO 7816-4*
//! framing. Both normalize onto the same `[STATUS, data...]` shape on
//! the way back in, so the rest of the stack never branches on
//! `wire_kind` again after this layer.

use crate::error::{Error, Result};
use bytes::Bytes;
use desfire_core::prelude::{Request, Response, WireKind};

pub fn wrap_request(kind: WireKind, request: &Request) -> Result<Bytes> {
    match kind {
        WireKind::Native => Ok(native::wrap(request)),
        WireKind::Iso => iso::wrap(request),
    }
}

pub fn unwrap_response(kind: WireKind, apdu: &[u8]) -> Result<Response> {
    match kind {
        WireKind::Native => native::unwrap(apdu),
        WireKind::Iso => iso::unwrap(apdu),
    }
}

/// Native framing: `APDU = [CMD, body...]`, response is already
/// `[STATUS, data...]`.
mod native {
    use super::*;

    pub fn wrap(request: &Request) -> Bytes {
        let mut apdu = Vec::with_capacity(1 + request.body.len());
        apdu.push(request.cmd);
        apdu.extend_from_slice(&request.body);
        apdu.into()
    }

    pub fn unwrap(apdu: &[u8]) -> Result<Response> {
        let (status, body) = apdu.split_first().ok_or(Error::ShortFrame)?;
        Ok(Response::new(*status, body.to_vec()))
    }
}

/// ISO 7816-4 framing: request is a standard wrapped APDU with
/// `CLA=0x90`; response carries the status in `SW1/SW2` which this
/// layer translates back to a leading status byte.
mod iso {
    use super::*;

    const CLA: u8 = 0x90;
    const SW1_DESFIRE: u8 = 0x91;

    pub fn wrap(request: &Request) -> Result<Bytes> {
        if request.body.len() > u8::MAX as usize {
            return Err(Error::BadLength);
        }
        let mut apdu = Vec::with_capacity(5 + request.body.len() + 1);
        apdu.push(CLA);
        apdu.push(request.cmd);
        apdu.push(0x00); // P1
        apdu.push(0x00); // P2
        apdu.push(request.body.len() as u8); // Lc
        apdu.extend_from_slice(&request.body);
        apdu.push(0x00); // Le: up to 256 bytes
        Ok(apdu.into())
    }

    pub fn unwrap(apdu: &[u8]) -> Result<Response> {
        if apdu.len() < 2 {
            return Err(Error::ShortFrame);
        }
        let (data, sw) = apdu.split_at(apdu.len() - 2);
        if sw[0] != SW1_DESFIRE {
            return Err(Error::UnexpectedStatus);
        }
        Ok(Response::new(sw[1], data.to_vec()))
    }
}
