//! One module per DESFire command object (§4.6), each a finite-state
//! [`crate::command::Command`] implementation.

mod application;
mod authenticate;
mod change_key;
mod configuration;
mod data;
mod files;
mod key_settings;
mod records;
mod select_application;
mod transaction;
mod value;

pub use application::{CreateApplication, DeleteApplication};
pub use authenticate::Authenticate;
pub use change_key::{ChangeKey, LegacyIvSeed};
pub use configuration::{SetConfiguration, SELECTOR_ATS};
pub use data::{ReadData, WriteData};
pub use files::{
    ChangeFileSettings, CreateBackupDataFile, CreateCyclicRecordFile, CreateLinearRecordFile,
    CreateStdDataFile, CreateValueFile, DeleteFile, FileSettings, GetFileSettings,
};
pub use key_settings::{ChangeKeySettings, GetKeySettings, KeySettingsInfo};
pub use records::{ReadRecords, WriteRecord};
pub use select_application::SelectApplication;
pub use transaction::{AbortTransaction, CommitTransaction};
pub use value::{GetValue, ValueTransfer};
