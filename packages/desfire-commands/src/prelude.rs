pub use crate::access_rights::{pack_access_rights, unpack_access_rights};
pub use crate::chunking::{frame_count, next_chunk_len, ADDITIONAL_FRAME};
pub use crate::command::Command;
pub use crate::commands::{
    AbortTransaction, Authenticate, ChangeFileSettings, ChangeKey, ChangeKeySettings,
    CommitTransaction, CreateApplication, CreateBackupDataFile, CreateCyclicRecordFile,
    CreateLinearRecordFile, CreateStdDataFile, CreateValueFile, DeleteApplication, DeleteFile,
    FileSettings, GetFileSettings, GetKeySettings, GetValue, KeySettingsInfo, LegacyIvSeed,
    ReadData, ReadRecords, SelectApplication, SetConfiguration, ValueTransfer, WriteData,
    WriteRecord, SELECTOR_ATS,
};
pub use crate::error::{CommandError, Result};
pub use crate::session_context::SessionContext;
