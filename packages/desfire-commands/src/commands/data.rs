//! `ReadData` / `WriteData` (cmd `0xBD`/`0x3D`, §4.6, §8 scenarios 4-5):
//! chunked binary file I/O. Read accumulates across `0xAF` response
//! frames; write splits its payload into `frame_capacity`-sized
//! request frames, sending `0xAF` continuations itself.

use crate::chunking::{frame_count, next_chunk_len, ADDITIONAL_FRAME};
use crate::command::Command;
use crate::error::{CommandError, Result};
use crate::session_context::SessionContext;
use desfire_core::prelude::{CommMode, Request};

const CMD_READ: u8 = 0xBD;
const CMD_WRITE: u8 = 0x3D;

fn u24_le(v: u32) -> [u8; 3] {
    let b = v.to_le_bytes();
    [b[0], b[1], b[2]]
}

#[derive(Debug, Clone)]
pub struct ReadData {
    file_no: u8,
    offset: u32,
    length: u32,
    mode: CommMode,
    started: bool,
    complete: bool,
    buffer: Vec<u8>,
}

impl ReadData {
    pub fn new(file_no: u8, offset: u32, length: u32, mode: CommMode) -> Self {
        Self {
            file_no,
            offset,
            length,
            mode,
            started: false,
            complete: false,
            buffer: Vec::new(),
        }
    }
}

impl Command for ReadData {
    type Output = Vec<u8>;

    fn name(&self) -> &'static str {
        "ReadData"
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

    /// Remaining target bytes not yet accumulated; only consulted by
    /// the pipe on the final (`0x00`) response frame, where it locates
    /// the DES-family checksum/padding trailer (§4.5).
    fn enc_response_data_len(&self) -> Option<usize> {
        Some((self.length as usize).saturating_sub(self.buffer.len()))
    }

    fn build_request(&mut self, _ctx: &mut dyn SessionContext) -> Request {
        if !self.started {
            self.started = true;
            let mut body = vec![self.file_no];
            body.extend_from_slice(&u24_le(self.offset));
            body.extend_from_slice(&u24_le(self.length));
            Request::new(CMD_READ, body)
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
pub struct WriteData {
    file_no: u8,
    offset: u32,
    data: Vec<u8>,
    frame_capacity: usize,
    mode: CommMode,
    sent: usize,
    started: bool,
    complete: bool,
}

impl WriteData {
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

    /// Number of request frames this write will take (§8 P5).
    pub fn expected_frame_count(&self) -> usize {
        frame_count(self.data.len(), self.header_capacity())
    }

    fn header_capacity(&self) -> usize {
        // first frame also carries the 7-byte fileNo/offset/length header
        self.frame_capacity.saturating_sub(7).max(1)
    }
}

impl Command for WriteData {
    type Output = ();

    fn name(&self) -> &'static str {
        "WriteData"
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
            Request::new(CMD_WRITE, body)
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

    /// §8 scenario 4: 32 bytes at capacity 52 -> single frame.
    #[test]
    fn read_data_single_frame_for_small_length() {
        let mut cmd = ReadData::new(1, 0, 32, CommMode::Plain);
        let mut ctx = FakeCtx;
        let req = cmd.build_request(&mut ctx);
        assert_eq!(req.cmd, CMD_READ);
        cmd.parse_response(0x00, &[0xAAu8; 32], &mut ctx).unwrap();
        assert!(cmd.is_complete());
        assert_eq!(cmd.into_output().len(), 32);
    }

    /// §8 scenario 5: 200 bytes, cap 52 -> AF, AF, AF, 00 (4 frames).
    #[test]
    fn read_data_accumulates_across_additional_frames() {
        let mut cmd = ReadData::new(1, 0, 200, CommMode::Plain);
        let mut ctx = FakeCtx;
        cmd.build_request(&mut ctx);
        cmd.parse_response(0xAF, &[0u8; 52], &mut ctx).unwrap();
        assert!(!cmd.is_complete());
        cmd.build_request(&mut ctx);
        cmd.parse_response(0xAF, &[0u8; 52], &mut ctx).unwrap();
        cmd.build_request(&mut ctx);
        cmd.parse_response(0xAF, &[0u8; 52], &mut ctx).unwrap();
        cmd.build_request(&mut ctx);
        cmd.parse_response(0x00, &[0u8; 44], &mut ctx).unwrap();
        assert!(cmd.is_complete());
        assert_eq!(cmd.into_output().len(), 200);
    }

    #[test]
    fn write_data_chunks_and_completes_when_all_bytes_sent() {
        let data = vec![0x42u8; 100];
        let mut cmd = WriteData::new(1, 0, data.clone(), 52, CommMode::Plain);
        let mut ctx = FakeCtx;

        let first = cmd.build_request(&mut ctx);
        assert_eq!(first.cmd, CMD_WRITE);
        assert_eq!(first.body.len(), 7 + 45); // 52 - 7 header bytes
        cmd.parse_response(0xAF, &[], &mut ctx).unwrap();
        assert!(!cmd.is_complete());

        let second = cmd.build_request(&mut ctx);
        assert_eq!(second.cmd, ADDITIONAL_FRAME);
        assert_eq!(second.body.len(), 52); // 45 sent, 55 left, capped at 52
        cmd.parse_response(0xAF, &[], &mut ctx).unwrap();
        assert!(!cmd.is_complete());

        let third = cmd.build_request(&mut ctx);
        assert_eq!(third.body.len(), 3); // 97 sent, 3 left
        cmd.parse_response(0x00, &[], &mut ctx).unwrap();
        assert!(cmd.is_complete());
    }
}
