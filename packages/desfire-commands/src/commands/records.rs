//! `ReadRecords` / `WriteRecord` (cmd `0xBB`/`0x3B`, §4.6): the same
//! chunking pattern as [`crate::commands::data`], record-aligned
//! instead of byte-offset-aligned.

use crate::chunking::{next_chunk_len, ADDITIONAL_FRAME};
use crate::command::Command;
use crate::error::{CommandError, Result};
use crate::session_context::SessionContext;
use desfire_core::prelude::{CommMode, Request};

const CMD_READ_RECORDS: u8 = 0xBB;
const CMD_WRITE_RECORD: u8 = 0x3B;

fn u24_le(v: u32) -> [u8; 3] {
    let b = v.to_le_bytes();
    [b[0], b[1], b[2]]
}

#[derive(Debug, Clone)]
pub struct ReadRecords {
    file_no: u8,
    record_offset: u32,
    record_count: u32,
    mode: CommMode,
    started: bool,
    complete: bool,
    buffer: Vec<u8>,
}

impl ReadRecords {
    pub fn new(file_no: u8, record_offset: u32, record_count: u32, mode: CommMode) -> Self {
        Self {
            file_no,
            record_offset,
            record_count,
            mode,
            started: false,
            complete: false,
            buffer: Vec::new(),
        }
    }
}

impl Command for ReadRecords {
    type Output = Vec<u8>;

    fn name(&self) -> &'static str {
        "ReadRecords"
    }

    fn mode(&self) -> CommMode {
        self.mode
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn reset(&mut self) {
        self.started = false;
        self.complete = false;
        self.buffer.clear();
    }

    fn build_request(&mut self, _ctx: &mut dyn SessionContext) -> Request {
        if !self.started {
            self.started = true;
            let mut body = vec![self.file_no];
            body.extend_from_slice(&u24_le(self.record_offset));
            body.extend_from_slice(&u24_le(self.record_count));
            Request::new(CMD_READ_RECORDS, body)
        } else {
            Request::new(ADDITIONAL_FRAME, Vec::new())
        }
    }

    fn parse_response(
        &mut self,
        status: u8,
        body: &[u8],
        _ctx: &mut dyn SessionContext,
    ) -> Result<()> {
        self.buffer.extend_from_slice(body);
        if status == 0x00 {
            self.complete = true;
        }
        Ok(())
    }

    fn into_output(self) -> Self::Output {
        self.buffer
    }
}

#[derive(Debug, Clone)]
pub struct WriteRecord {
    file_no: u8,
    offset: u32,
    data: Vec<u8>,
    frame_capacity: usize,
    mode: CommMode,
    sent: usize,
    started: bool,
    complete: bool,
}

impl WriteRecord {
    pub fn new(file_no: u8, offset: u32, data: Vec<u8>, frame_capacity: usize, mode: CommMode) -> Self {
        assert!(frame_capacity > 0, "frame_capacity must be positive");
        Self {
            file_no,
            offset,
            data,
            frame_capacity,
            mode,
            sent: 0,
            started: false,
            complete: false,
        }
    }

    fn header_capacity(&self) -> usize {
        self.frame_capacity.saturating_sub(7).max(1)
    }
}

impl Command for WriteRecord {
    type Output = ();

    fn name(&self) -> &'static str {
        "WriteRecord"
    }

    fn mode(&self) -> CommMode {
        self.mode
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn reset(&mut self) {
        self.sent = 0;
        self.started = false;
        self.complete = false;
    }

    fn build_request(&mut self, _ctx: &mut dyn SessionContext) -> Request {
        if !self.started {
            self.started = true;
            let mut body = vec![self.file_no];
            body.extend_from_slice(&u24_le(self.offset));
            body.extend_from_slice(&u24_le(self.data.len() as u32));
            let chunk_len = next_chunk_len(self.data.len(), 0, self.header_capacity());
            body.extend_from_slice(&self.data[0..chunk_len]);
            self.sent = chunk_len;
            Request::new(CMD_WRITE_RECORD, body)
        } else {
            let chunk_len = next_chunk_len(self.data.len(), self.sent, self.frame_capacity);
            let chunk = self.data[self.sent..self.sent + chunk_len].to_vec();
            self.sent += chunk_len;
            Request::new(ADDITIONAL_FRAME, chunk)
        }
    }

    fn parse_response(
        &mut self,
        status: u8,
        _body: &[u8],
        _ctx: &mut dyn SessionContext,
    ) -> Result<()> {
        match status {
            0x00 if self.sent >= self.data.len() => {
                self.complete = true;
                Ok(())
            }
            0xAF if self.sent < self.data.len() => Ok(()),
            0x00 => Err(CommandError::BadResponseSize),
            _ => Ok(()),
        }
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
    fn read_records_builds_header_and_accumulates() {
        let mut cmd = ReadRecords::new(2, 0, 3, CommMode::Mac);
        let mut ctx = FakeCtx;
        let req = cmd.build_request(&mut ctx);
        assert_eq!(req.cmd, CMD_READ_RECORDS);
        assert_eq!(req.body.as_ref(), &[0x02, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00]);
        cmd.parse_response(0x00, &[0xAAu8; 48], &mut ctx).unwrap();
        assert!(cmd.is_complete());
        assert_eq!(cmd.into_output().len(), 48);
    }

    #[test]
    fn write_record_single_frame_when_it_fits() {
        let mut cmd = WriteRecord::new(2, 0, vec![0x01u8; 16], 52, CommMode::Mac);
        let mut ctx = FakeCtx;
        let req = cmd.build_request(&mut ctx);
        assert_eq!(req.cmd, CMD_WRITE_RECORD);
        assert_eq!(req.body.len(), 7 + 16);
        cmd.parse_response(0x00, &[], &mut ctx).unwrap();
        assert!(cmd.is_complete());
    }
}
