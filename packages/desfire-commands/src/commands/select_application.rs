//! `SelectApplication` (cmd `0x5A`): PLAIN, single frame, resets the
//! session on success (§4.6, §8 scenario 3).

use crate::command::Command;
use crate::error::Result;
use crate::session_context::SessionContext;
use desfire_core::prelude::{CommMode, Request};

const CMD: u8 = 0x5A;

#[derive(Debug, Clone)]
pub struct SelectApplication {
    aid: [u8; 3],
    complete: bool,
}

impl SelectApplication {
    pub fn new(aid: [u8; 3]) -> Self {
        Self {
            aid,
            complete: false,
        }
    }
}

impl Command for SelectApplication {
    type Output = ();

    fn name(&self) -> &'static str {
        "SelectApplication"
    }

    fn mode(&self) -> CommMode {
        CommMode::Plain
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn reset(&mut self) {
        self.complete = false;
    }

    fn build_request(&mut self, _ctx: &mut dyn SessionContext) -> Request {
        Request::new(CMD, self.aid.to_vec())
    }

    fn parse_response(
        &mut self,
        _status: u8,
        _body: &[u8],
        ctx: &mut dyn SessionContext,
    ) -> Result<()> {
        // A card that rejects the AID leaves the processor to surface
        // the mapped status; either way the session must forget any
        // prior authentication (§3 invariant).
        ctx.reset();
        ctx.set_selected_aid(self.aid);
        ctx.set_default_comm_mode(CommMode::Plain);
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
    struct FakeCtx {
        reset_called: bool,
        aid: [u8; 3],
        mode: CommMode,
    }

    impl SessionContext for FakeCtx {
        fn reset(&mut self) {
            self.reset_called = true;
        }
        fn apply_authentication(&mut self, _: DesfireAuthMode, _: u8, _: Vec<u8>) {}
        fn set_session_key(&mut self, _: Vec<u8>) {}
        fn set_selected_aid(&mut self, aid: [u8; 3]) {
            self.aid = aid;
        }
        fn set_default_comm_mode(&mut self, mode: CommMode) {
            self.mode = mode;
        }
        fn auth_scheme(&self) -> Option<DesfireAuthMode> {
            None
        }
        fn key_no(&self) -> Option<u8> {
            None
        }
    }

    #[test]
    fn builds_iso_vector_from_spec_scenario_3() {
        let mut cmd = SelectApplication::new([0x00, 0x00, 0x00]);
        let mut ctx = FakeCtx::default();
        let request = cmd.build_request(&mut ctx);
        assert_eq!(request.cmd, 0x5A);
        assert_eq!(request.body.as_ref(), &[0x00, 0x00, 0x00]);
    }

    #[test]
    fn resets_session_and_completes_in_one_frame() {
        let mut cmd = SelectApplication::new([0x01, 0x02, 0x03]);
        let mut ctx = FakeCtx::default();
        cmd.parse_response(0x00, &[], &mut ctx).unwrap();
        assert!(cmd.is_complete());
        assert!(ctx.reset_called);
        assert_eq!(ctx.aid, [0x01, 0x02, 0x03]);
        assert_eq!(ctx.mode, CommMode::Plain);
    }
}
