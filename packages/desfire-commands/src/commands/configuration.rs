//! `SetConfiguration` (cmd `0x5C`, §4.6): PICC-level flag/key/ATS
//! configuration, always ENC. Whether the ATS payload's length
//! includes its own TL byte is ambiguous across references (§9 open
//! question); exposed here as `include_tl_byte`, defaulting to
//! included per the spec's stated default.

use crate::command::Command;
use crate::error::Result;
use crate::session_context::SessionContext;
use desfire_core::prelude::{CommMode, Request};

const CMD: u8 = 0x5C;

/// Selects the ATS-update variant of `SetConfiguration`; other
/// selectors (PICC config byte, default key/version) pass `data`
/// through unchanged regardless of `include_tl_byte`.
pub const SELECTOR_ATS: u8 = 0x02;

#[derive(Debug, Clone)]
pub struct SetConfiguration {
    selector: u8,
    data: Vec<u8>,
    include_tl_byte: bool,
    complete: bool,
}

impl SetConfiguration {
    pub fn new(selector: u8, data: Vec<u8>) -> Self {
        Self {
            selector,
            data,
            include_tl_byte: true,
            complete: false,
        }
    }

    /// Builds the ATS-update variant with the TL-byte-inclusion policy
    /// selected explicitly (§9 open question).
    pub fn ats(ats: Vec<u8>, include_tl_byte: bool) -> Self {
        Self {
            selector: SELECTOR_ATS,
            data: ats,
            include_tl_byte,
            complete: false,
        }
    }

    fn payload(&self) -> &[u8] {
        if self.selector == SELECTOR_ATS && !self.include_tl_byte && !self.data.is_empty() {
            &self.data[1..]
        } else {
            &self.data
        }
    }
}

impl Command for SetConfiguration {
    type Output = ();

    fn name(&self) -> &'static str {
        "SetConfiguration"
    }

    fn mode(&self) -> CommMode {
        CommMode::Enc
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn reset(&mut self) {
        self.complete = false;
    }

    fn build_request(&mut self, _ctx: &mut dyn SessionContext) -> Request {
        let mut body = vec![self.selector];
        body.extend_from_slice(self.payload());
        Request::new(CMD, body)
    }

    fn parse_response(
        &mut self,
        _status: u8,
        _body: &[u8],
        _ctx: &mut dyn SessionContext,
    ) -> Result<()> {
        self.complete = true;
        Ok(())
    }

    fn into_output(self) -> Self::Output {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use desfire_core::prelude::DesfireAuthMode;

    #[derive(Default)]
    struct FakeCtx;
    impl SessionContext for FakeCtx {
        fn reset(&mut self) {}
        fn apply_authentication(&mut self, _: DesfireAuthMode, _: u8, _: Vec<u8>) {}
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

    #[test]
    fn ats_with_tl_included_keeps_full_payload() {
        let ats = vec![0x06, 0x75, 0x77, 0x81, 0x02, 0x80];
        let mut cmd = SetConfiguration::ats(ats.clone(), true);
        let mut ctx = FakeCtx;
        let req = cmd.build_request(&mut ctx);
        assert_eq!(req.cmd, CMD);
        assert_eq!(&req.body[1..], ats.as_slice());
    }

    #[test]
    fn ats_with_tl_excluded_drops_leading_length_byte() {
        let ats = vec![0x06, 0x75, 0x77, 0x81, 0x02, 0x80];
        let mut cmd = SetConfiguration::ats(ats.clone(), false);
        let mut ctx = FakeCtx;
        let req = cmd.build_request(&mut ctx);
        assert_eq!(&req.body[1..], &ats[1..]);
    }

    #[test]
    fn non_ats_selector_passes_data_through() {
        let mut cmd = SetConfiguration::new(0x00, vec![0x09]);
        let mut ctx = FakeCtx;
        let req = cmd.build_request(&mut ctx);
        assert_eq!(req.body.as_ref(), &[0x00, 0x09]);
    }
}
