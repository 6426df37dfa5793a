//! `CreateApplication` / `DeleteApplication` (§4.6): PICC-level
//! application management, body is PLAIN and only MAC-protected once
//! authenticated — never encrypted.

use crate::command::Command;
use crate::error::Result;
use crate::session_context::SessionContext;
use desfire_core::prelude::{CommMode, DesfireAuthMode, Request};

const CMD_CREATE: u8 = 0xCA;
const CMD_DELETE: u8 = 0xDA;

#[derive(Debug, Clone)]
pub struct CreateApplication {
    aid: [u8; 3],
    key_settings: u8,
    num_keys_and_type: u8,
    complete: bool,
}

impl CreateApplication {
    pub fn new(aid: [u8; 3], key_settings: u8, num_keys_and_type: u8) -> Self {
        Self {
            aid,
            key_settings,
            num_keys_and_type,
            complete: false,
        }
    }
}

impl Command for CreateApplication {
    type Output = ();

    fn name(&self) -> &'static str {
        "CreateApplication"
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
        let mut body = self.aid.to_vec();
        body.push(self.key_settings);
        body.push(self.num_keys_and_type);
        Request::new(CMD_CREATE, body)
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
pub struct DeleteApplication {
    aid: [u8; 3],
    complete: bool,
}

impl DeleteApplication {
    pub fn new(aid: [u8; 3]) -> Self {
        Self {
            aid,
            complete: false,
        }
    }
}

impl Command for DeleteApplication {
    type Output = ();

    fn name(&self) -> &'static str {
        "DeleteApplication"
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
        Request::new(CMD_DELETE, self.aid.to_vec())
    }

    fn parse_response(
        &mut self,
        _status: u8,
        _body: &[u8],
        ctx: &mut dyn SessionContext,
    ) -> Result<()> {
        // Deleting the currently selected application leaves the card
        // on PICC with no current app-level authentication (§3).
        if ctx.auth_scheme().is_some() {
            ctx.reset();
        }
        self.complete = true;
        Ok(())
    }

    fn into_output(self) -> Self::Output {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeCtx {
        reset_called: bool,
        scheme: Option<DesfireAuthMode>,
    }
    impl SessionContext for FakeCtx {
        fn reset(&mut self) {
            self.reset_called = true;
        }
        fn apply_authentication(&mut self, _: DesfireAuthMode, _: u8, _: Vec<u8>) {}
        fn set_session_key(&mut self, _: Vec<u8>) {}
        fn set_selected_aid(&mut self, _: [u8; 3]) {}
        fn set_default_comm_mode(&mut self, _: CommMode) {}
        fn auth_scheme(&self) -> Option<DesfireAuthMode> {
            self.scheme
        }
        fn key_no(&self) -> Option<u8> {
            None
        }
    }

    #[test]
    fn create_application_builds_five_byte_body() {
        let mut cmd = CreateApplication::new([0x01, 0x02, 0x03], 0x0F, 0x81);
        let mut ctx = FakeCtx::default();
        let req = cmd.build_request(&mut ctx);
        assert_eq!(req.cmd, CMD_CREATE);
        assert_eq!(req.body.as_ref(), &[0x01, 0x02, 0x03, 0x0F, 0x81]);
    }

    #[test]
    fn delete_application_resets_only_if_authenticated() {
        let mut cmd = DeleteApplication::new([0x01, 0x02, 0x03]);
        let mut ctx = FakeCtx {
            scheme: Some(DesfireAuthMode::Aes),
            ..Default::default()
        };
        cmd.parse_response(0x00, &[], &mut ctx).unwrap();
        assert!(ctx.reset_called);
    }

    #[test]
    fn delete_application_is_noop_reset_when_unauthenticated() {
        let mut cmd = DeleteApplication::new([0x01, 0x02, 0x03]);
        let mut ctx = FakeCtx::default();
        cmd.parse_response(0x00, &[], &mut ctx).unwrap();
        assert!(!ctx.reset_called);
    }
}
