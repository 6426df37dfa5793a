//! `GetValue` / `Credit` / `Debit` / `LimitedCredit` (§4.6, §6): single-
//! frame value-file operations, signed 32-bit little-endian payloads.

use crate::command::Command;
use crate::error::{CommandError, Result};
use crate::session_context::SessionContext;
use desfire_core::prelude::{CommMode, Request};

const CMD_GET_VALUE: u8 = 0x6C;
const CMD_CREDIT: u8 = 0x0C;
const CMD_DEBIT: u8 = 0xDC;
const CMD_LIMITED_CREDIT: u8 = 0x1C;

#[derive(Debug, Clone)]
pub struct GetValue {
    file_no: u8,
    mode: CommMode,
    complete: bool,
    result: Option<i32>,
}

impl GetValue {
    pub fn new(file_no: u8, mode: CommMode) -> Self {
        Self {
            file_no,
            mode,
            complete: false,
            result: None,
        }
    }
}

impl Command for GetValue {
    type Output = i32;

    fn name(&self) -> &'static str {
        "GetValue"
    }

    fn mode(&self) -> CommMode {
        self.mode
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn reset(&mut self) {
        self.complete = false;
        self.result = None;
    }

    /// The response is always a 4-byte signed value (§4.5).
    fn enc_response_data_len(&self) -> Option<usize> {
        Some(4)
    }

    fn build_request(&mut self, _ctx: &mut dyn SessionContext) -> Request {
        Request::new(CMD_GET_VALUE, vec![self.file_no])
    }

    fn parse_response(
        &mut self,
        _status: u8,
        body: &[u8],
        _ctx: &mut dyn SessionContext,
    ) -> Result<()> {
        if body.len() < 4 {
            return Err(CommandError::BadResponseSize);
        }
        let value = i32::from_le_bytes(body[0..4].try_into().unwrap());
        self.result = Some(value);
        self.complete = true;
        Ok(())
    }

    fn into_output(self) -> Self::Output {
        self.result.expect("parse_response runs before is_complete")
    }
}

/// Shared shape of `Credit` / `Debit` / `LimitedCredit`: `fileNo ‖
/// amount(4, signed LE)`.
#[derive(Debug, Clone)]
pub struct ValueTransfer {
    cmd: u8,
    label: &'static str,
    file_no: u8,
    amount: i32,
    mode: CommMode,
    complete: bool,
}

impl ValueTransfer {
    pub fn credit(file_no: u8, amount: i32, mode: CommMode) -> Self {
        Self {
            cmd: CMD_CREDIT,
            label: "Credit",
            file_no,
            amount,
            mode,
            complete: false,
        }
    }

    pub fn debit(file_no: u8, amount: i32, mode: CommMode) -> Self {
        Self {
            cmd: CMD_DEBIT,
            label: "Debit",
            file_no,
            amount,
            mode,
            complete: false,
        }
    }

    pub fn limited_credit(file_no: u8, amount: i32, mode: CommMode) -> Self {
        Self {
            cmd: CMD_LIMITED_CREDIT,
            label: "LimitedCredit",
            file_no,
            amount,
            mode,
            complete: false,
        }
    }
}

impl Command for ValueTransfer {
    type Output = ();

    fn name(&self) -> &'static str {
        self.label
    }

    fn mode(&self) -> CommMode {
        self.mode
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn reset(&mut self) {
        self.complete = false;
    }

    fn build_request(&mut self, _ctx: &mut dyn SessionContext) -> Request {
        let mut body = vec![self.file_no];
        body.extend_from_slice(&self.amount.to_le_bytes());
        Request::new(self.cmd, body)
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
    fn get_value_parses_signed_little_endian() {
        let mut cmd = GetValue::new(1, CommMode::Mac);
        let mut ctx = FakeCtx;
        cmd.parse_response(0x00, &(-42i32).to_le_bytes(), &mut ctx).unwrap();
        assert_eq!(cmd.into_output(), -42);
    }

    #[test]
    fn credit_builds_file_no_plus_amount() {
        let mut cmd = ValueTransfer::credit(3, 500, CommMode::Mac);
        let mut ctx = FakeCtx;
        let req = cmd.build_request(&mut ctx);
        assert_eq!(req.cmd, CMD_CREDIT);
        assert_eq!(req.body[0], 3);
        assert_eq!(&req.body[1..5], &500i32.to_le_bytes());
    }
}
