//! The one external collaborator the core consumes to talk to a card
//! (§6). Framing and crypto never interpret `apdu` contents; this is
//! the only operation that may block (§5).

use crate::error::TransportError;

pub trait Transceiver {
    /// Exchanges one already-wrapped APDU with the card and returns the
    /// raw response bytes, respecting `deadline_ms`. Must preserve byte
    /// order and must not interpret the APDU.
    fn transceive(&mut self, apdu: &[u8], deadline_ms: u64) -> Result<Vec<u8>, TransportError>;
}
