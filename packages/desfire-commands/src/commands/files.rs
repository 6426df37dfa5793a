//! File-creation/management commands (§4.6, §6): standard/backup data
//! files, value files, linear/cyclic record files, plus the shared
//! `GetFileSettings` / `ChangeFileSettings` / `DeleteFile` header
//! commands. Access rights are packed with [`crate::access_rights`];
//! 24-bit record-file fields use [`u24_le`].

use crate::access_rights::pack_access_rights;
use crate::command::Command;
use crate::error::Result;
use crate::session_context::SessionContext;
use desfire_core::prelude::{CommMode, Request};

const CMD_CREATE_STD_DATA_FILE: u8 = 0xCD;
const CMD_CREATE_BACKUP_DATA_FILE: u8 = 0xCB;
const CMD_CREATE_VALUE_FILE: u8 = 0xCC;
const CMD_CREATE_LINEAR_RECORD_FILE: u8 = 0xC1;
const CMD_CREATE_CYCLIC_RECORD_FILE: u8 = 0xC0;
const CMD_GET_FILE_SETTINGS: u8 = 0xF5;
const CMD_CHANGE_FILE_SETTINGS: u8 = 0x5F;
const CMD_DELETE_FILE: u8 = 0xDF;

/// Unsigned 24-bit little-endian encoding (§6: "...followed by a zero
/// byte to fit the 3-byte field" — the fourth, most-significant byte of
/// a `u32` is dropped, not appended).
fn u24_le(v: u32) -> [u8; 3] {
    let b = v.to_le_bytes();
    [b[0], b[1], b[2]]
}

/// The shared header every file-creation command starts with:
/// `fileNo ‖ commSettings ‖ accessRights(2, LE)`.
fn file_header(file_no: u8, comm_settings: u8, access_rights: (u8, u8, u8, u8)) -> Vec<u8> {
    let (rw, car, r, w) = access_rights;
    let mut header = vec![file_no, comm_settings];
    header.extend_from_slice(&pack_access_rights(rw, car, r, w));
    header
}

macro_rules! simple_command {
    ($name:ident, $label:literal) => {
        #[derive(Debug, Clone)]
        pub struct $name {
            body: Vec<u8>,
            complete: bool,
        }

        impl $name {
            fn from_body(body: Vec<u8>) -> Self {
                Self {
                    body,
                    complete: false,
                }
            }
        }

        impl Command for $name {
            type Output = ();

            fn name(&self) -> &'static str {
                $label
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
                Request::new(Self::CMD, self.body.clone())
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
    };
}

simple_command!(CreateStdDataFile, "CreateStdDataFile");
impl CreateStdDataFile {
    const CMD: u8 = CMD_CREATE_STD_DATA_FILE;

    pub fn new(file_no: u8, comm_settings: u8, access_rights: (u8, u8, u8, u8), file_size: u32) -> Self {
        let mut body = file_header(file_no, comm_settings, access_rights);
        body.extend_from_slice(&u24_le(file_size));
        Self::from_body(body)
    }
}

simple_command!(CreateBackupDataFile, "CreateBackupDataFile");
impl CreateBackupDataFile {
    const CMD: u8 = CMD_CREATE_BACKUP_DATA_FILE;

    pub fn new(file_no: u8, comm_settings: u8, access_rights: (u8, u8, u8, u8), file_size: u32) -> Self {
        let mut body = file_header(file_no, comm_settings, access_rights);
        body.extend_from_slice(&u24_le(file_size));
        Self::from_body(body)
    }
}

simple_command!(CreateValueFile, "CreateValueFile");
impl CreateValueFile {
    const CMD: u8 = CMD_CREATE_VALUE_FILE;

    pub fn new(
        file_no: u8,
        comm_settings: u8,
        access_rights: (u8, u8, u8, u8),
        lower_limit: i32,
        upper_limit: i32,
        initial_value: i32,
        limited_credit_enabled: bool,
    ) -> Self {
        let mut body = file_header(file_no, comm_settings, access_rights);
        body.extend_from_slice(&lower_limit.to_le_bytes());
        body.extend_from_slice(&upper_limit.to_le_bytes());
        body.extend_from_slice(&initial_value.to_le_bytes());
        body.push(limited_credit_enabled as u8);
        Self::from_body(body)
    }
}

simple_command!(CreateLinearRecordFile, "CreateLinearRecordFile");
impl CreateLinearRecordFile {
    const CMD: u8 = CMD_CREATE_LINEAR_RECORD_FILE;

    pub fn new(
        file_no: u8,
        comm_settings: u8,
        access_rights: (u8, u8, u8, u8),
        record_size: u32,
        max_records: u32,
    ) -> Self {
        let mut body = file_header(file_no, comm_settings, access_rights);
        body.extend_from_slice(&u24_le(record_size));
        body.extend_from_slice(&u24_le(max_records));
        Self::from_body(body)
    }
}

simple_command!(CreateCyclicRecordFile, "CreateCyclicRecordFile");
impl CreateCyclicRecordFile {
    const CMD: u8 = CMD_CREATE_CYCLIC_RECORD_FILE;

    pub fn new(
        file_no: u8,
        comm_settings: u8,
        access_rights: (u8, u8, u8, u8),
        record_size: u32,
        max_records: u32,
    ) -> Self {
        let mut body = file_header(file_no, comm_settings, access_rights);
        body.extend_from_slice(&u24_le(record_size));
        body.extend_from_slice(&u24_le(max_records));
        Self::from_body(body)
    }
}

simple_command!(DeleteFile, "DeleteFile");
impl DeleteFile {
    const CMD: u8 = CMD_DELETE_FILE;

    pub fn new(file_no: u8) -> Self {
        Self::from_body(vec![file_no])
    }
}

simple_command!(ChangeFileSettings, "ChangeFileSettings");
impl ChangeFileSettings {
    const CMD: u8 = CMD_CHANGE_FILE_SETTINGS;

    pub fn new(file_no: u8, comm_settings: u8, access_rights: (u8, u8, u8, u8)) -> Self {
        Self::from_body(file_header(file_no, comm_settings, access_rights))
    }
}

/// Parsed `GetFileSettings` response: file type plus the common header
/// fields every file type shares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSettings {
    pub file_type: u8,
    pub comm_settings: u8,
    pub access_rights: (u8, u8, u8, u8),
    pub type_specific: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct GetFileSettings {
    file_no: u8,
    complete: bool,
    result: Option<FileSettings>,
}

impl GetFileSettings {
    pub fn new(file_no: u8) -> Self {
        Self {
            file_no,
            complete: false,
            result: None,
        }
    }
}

impl Command for GetFileSettings {
    type Output = FileSettings;

    fn name(&self) -> &'static str {
        "GetFileSettings"
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
        Request::new(CMD_GET_FILE_SETTINGS, vec![self.file_no])
    }

    fn parse_response(
        &mut self,
        _status: u8,
        body: &[u8],
        _ctx: &mut dyn SessionContext,
    ) -> Result<()> {
        use crate::access_rights::unpack_access_rights;
        use crate::error::CommandError;

        if body.len() < 4 {
            return Err(CommandError::BadResponseSize);
        }
        let access_rights = unpack_access_rights([body[2], body[3]]);
        self.result = Some(FileSettings {
            file_type: body[0],
            comm_settings: body[1],
            access_rights,
            type_specific: body[4..].to_vec(),
        });
        self.complete = true;
        Ok(())
    }

    fn into_output(self) -> Self::Output {
        self.result.expect("parse_response runs before is_complete")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeCtx;
    impl SessionContext for FakeCtx {
        fn reset(&mut self) {}
        fn apply_authentication(&mut self, _: desfire_core::prelude::DesfireAuthMode, _: u8, _: Vec<u8>) {}
        fn set_session_key(&mut self, _: Vec<u8>) {}
        fn set_selected_aid(&mut self, _: [u8; 3]) {}
        fn set_default_comm_mode(&mut self, _: CommMode) {}
        fn auth_scheme(&self) -> Option<desfire_core::prelude::DesfireAuthMode> {
            None
        }
        fn key_no(&self) -> Option<u8> {
            None
        }
    }

    #[test]
    fn create_std_data_file_body_layout() {
        let mut cmd = CreateStdDataFile::new(1, 0x00, (0xE, 0xE, 0xE, 0xE), 256);
        let mut ctx = FakeCtx;
        let req = cmd.build_request(&mut ctx);
        assert_eq!(req.cmd, CMD_CREATE_STD_DATA_FILE);
        assert_eq!(req.body.as_ref(), &[0x01, 0x00, 0xEE, 0xEE, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn create_value_file_uses_signed_le_fields() {
        let mut cmd = CreateValueFile::new(2, 0x00, (0x0, 0x0, 0x0, 0x0), -100, 1000, 0, false);
        let mut ctx = FakeCtx;
        let req = cmd.build_request(&mut ctx);
        assert_eq!(req.body.len(), 4 + 4 + 4 + 4 + 1);
        assert_eq!(&req.body[4..8], &(-100i32).to_le_bytes());
        assert_eq!(&req.body[8..12], &1000i32.to_le_bytes());
    }

    #[test]
    fn create_linear_record_file_uses_24_bit_fields() {
        let mut cmd = CreateLinearRecordFile::new(3, 0x00, (0x0, 0x0, 0x0, 0x0), 16, 10);
        let mut ctx = FakeCtx;
        let req = cmd.build_request(&mut ctx);
        assert_eq!(&req.body[4..7], &u24_le(16));
        assert_eq!(&req.body[7..10], &u24_le(10));
    }

    #[test]
    fn get_file_settings_parses_header_and_keeps_tail() {
        let mut cmd = GetFileSettings::new(1);
        let mut ctx = FakeCtx;
        cmd.parse_response(0x00, &[0x00, 0x03, 0xEE, 0xEE, 0xAB], &mut ctx).unwrap();
        let settings = cmd.into_output();
        assert_eq!(settings.file_type, 0x00);
        assert_eq!(settings.comm_settings, 0x03);
        assert_eq!(settings.access_rights, (0xE, 0xE, 0xE, 0xE));
        assert_eq!(settings.type_specific, vec![0xAB]);
    }
}
