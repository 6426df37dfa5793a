//! `GetKeySettings` / `ChangeKeySettings` (§4.6): plain request, the
//! response/request is protected by whatever mode the session's pipe
//! applies once authenticated — `GetKeySettings` is read-only so it
//! rides under MAC, `ChangeKeySettings` carries a settings byte the
//! card must trust so it goes under ENC.

use crate::command::Command;
use crate::error::Result;
use crate::session_context::SessionContext;
use desfire_core::prelude::{CommMode, Request};

const CMD_GET: u8 = 0x45;
const CMD_CHANGE: u8 = 0x54;

/// Response payload of `GetKeySettings`: the application's key-settings
/// byte plus the packed max-key-count/key-type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySettingsInfo {
    pub settings: u8,
    pub max_keys_and_type: u8,
}

#[derive(Debug, Clone, Default)]
pub struct GetKeySettings {
    complete: bool,
    result: Option<KeySettingsInfo>,
}

impl GetKeySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Command for GetKeySettings {
    type Output = KeySettingsInfo;

    fn name(&self) -> &'static str {
        "GetKeySettings"
    }

    fn mode(&self) -> CommMode {
        CommMode::Mac
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn reset(&mut self) {
        self.complete = false;
        self.result = None;
    }

    fn build_request(&mut self, _ctx: &mut dyn SessionContext) -> Request {
        Request::new(CMD_GET, Vec::new())
    }

    fn parse_response(
        &mut self,
        _status: u8,
        body: &[u8],
        _ctx: &mut dyn SessionContext,
    ) -> Result<()> {
        self.result = Some(KeySettingsInfo {
            settings: body[0],
            max_keys_and_type: body[1],
        });
        self.complete = true;
        Ok(())
    }

    fn into_output(self) -> Self::Output {
        self.result.expect("parse_response runs before is_complete")
    }
}

#[derive(Debug, Clone)]
pub struct ChangeKeySettings {
    new_settings: u8,
    complete: bool,
}

impl ChangeKeySettings {
    pub fn new(new_settings: u8) -> Self {
        Self {
            new_settings,
            complete: false,
        }
    }
}

impl Command for ChangeKeySettings {
    type Output = ();

    fn name(&self) -> &'static str {
        "ChangeKeySettings"
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
        Request::new(CMD_CHANGE, vec![self.new_settings])
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
    fn get_key_settings_parses_both_bytes() {
        let mut cmd = GetKeySettings::new();
        let mut ctx = FakeCtx;
        let req = cmd.build_request(&mut ctx);
        assert_eq!(req.cmd, CMD_GET);
        cmd.parse_response(0x00, &[0x0F, 0x21], &mut ctx).unwrap();
        assert!(cmd.is_complete());
        assert_eq!(
            cmd.into_output(),
            KeySettingsInfo {
                settings: 0x0F,
                max_keys_and_type: 0x21,
            }
        );
    }

    #[test]
    fn change_key_settings_sends_new_byte() {
        let mut cmd = ChangeKeySettings::new(0x09);
        let mut ctx = FakeCtx;
        let req = cmd.build_request(&mut ctx);
        assert_eq!(req.cmd, CMD_CHANGE);
        assert_eq!(req.body.as_ref(), &[0x09]);
    }
}
