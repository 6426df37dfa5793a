//! The normalized shapes every layer above the wire agrees on. Wire
//! framing (native or ISO 7816-4) only changes how these are
//! represented on the APDU; it never changes their meaning.

use bytes::Bytes;

/// A request PDU: command byte plus body, independent of framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub cmd: u8,
    pub body: Bytes,
}

impl Request {
    pub fn new(cmd: u8, body: impl Into<Bytes>) -> Self {
        Self {
            cmd,
            body: body.into(),
        }
    }
}

/// A response PDU: status byte plus body, independent of framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u8,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u8, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// `0x00` (OK) or `0xAF` (additional frame), as opposed to a
    /// mapped protocol error.
    pub fn is_control_status(&self) -> bool {
        crate::status::is_control_status(self.status)
    }
}
