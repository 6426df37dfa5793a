//! `CommitTransaction` / `AbortTransaction` (cmd `0xC7`/`0xA7`, §4.6):
//! empty-body, MAC-protected. A `NoChanges (0x0C)` status is not an
//! error at this layer — the processor's status table (§7) maps it,
//! this command only needs to recognize `0x00` as success.

use crate::command::Command;
use crate::error::Result;
use crate::session_context::SessionContext;
use desfire_core::prelude::{CommMode, Request};

const CMD_COMMIT: u8 = 0xC7;
const CMD_ABORT: u8 = 0xA7;

#[derive(Debug, Clone)]
pub struct CommitTransaction {
    complete: bool,
}

impl CommitTransaction {
    pub fn new() -> Self {
        Self { complete: false }
    }
}

impl Default for CommitTransaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Command for CommitTransaction {
    type Output = ();

    fn name(&self) -> &'static str {
        "CommitTransaction"
    }

    fn mode(&self) -> CommMode {
        CommMode::Mac
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn reset(&mut self) {
        self.complete = false;
    }

    fn build_request(&mut self, _ctx: &mut dyn SessionContext) -> Request {
        Request::new(CMD_COMMIT, Vec::new())
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

#[derive(Debug, Clone)]
pub struct AbortTransaction {
    complete: bool,
}

impl AbortTransaction {
    pub fn new() -> Self {
        Self { complete: false }
    }
}

impl Default for AbortTransaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Command for AbortTransaction {
    type Output = ();

    fn name(&self) -> &'static str {
        "AbortTransaction"
    }

    fn mode(&self) -> CommMode {
        CommMode::Mac
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn reset(&mut self) {
        self.complete = false;
    }

    fn build_request(&mut self, _ctx: &mut dyn SessionContext) -> Request {
        Request::new(CMD_ABORT, Vec::new())
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
    fn commit_transaction_has_empty_body() {
        let mut cmd = CommitTransaction::new();
        let mut ctx = FakeCtx;
        let req = cmd.build_request(&mut ctx);
        assert_eq!(req.cmd, CMD_COMMIT);
        assert!(req.body.is_empty());
        cmd.parse_response(0x00, &[], &mut ctx).unwrap();
        assert!(cmd.is_complete());
    }

    #[test]
    fn abort_transaction_has_empty_body() {
        let mut cmd = AbortTransaction::new();
        let mut ctx = FakeCtx;
        let req = cmd.build_request(&mut ctx);
        assert_eq!(req.cmd, CMD_ABORT);
        assert!(req.body.is_empty());
    }
}
