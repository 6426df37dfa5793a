//! Session context (C2, §3, §4.2): the mutable state one active card
//! session carries. Mutated only by the Authenticate state machine (on
//! success) and the secure pipe (IV/CMAC progression on every
//! authenticated exchange); read everywhere else.

use desfire_commands::commands::{
    AbortTransaction, Authenticate, ChangeFileSettings, ChangeKey, ChangeKeySettings,
    CommitTransaction, CreateApplication, CreateBackupDataFile, CreateCyclicRecordFile,
    CreateLinearRecordFile, CreateStdDataFile, CreateValueFile, DeleteApplication, DeleteFile,
    FileSettings, GetFileSettings, GetKeySettings, GetValue, KeySettingsInfo, ReadData,
    ReadRecords, SelectApplication, SetConfiguration, ValueTransfer, WriteData, WriteRecord,
    SELECTOR_ATS,
};
use desfire_commands::SessionContext;
use desfire_core::prelude::{
    CommMode, DesfireAuthMode, DesfireKeyType, ReaderCapabilities, SessionCipher, WireKind,
    WrappingCounter,
};
use desfire_logging::SessionLogger;

use crate::config::{AtsLengthConvention, CommandCounterPolicy, SessionConfig};
use crate::error::Result;
use crate::processor;
use crate::transceiver::Transceiver;

pub struct Session<T: Transceiver> {
    pub(crate) transceiver: T,
    pub(crate) wire_kind: WireKind,
    pub(crate) reader_caps: ReaderCapabilities,
    pub(crate) config: SessionConfig,
    pub(crate) logger: SessionLogger,

    auth_scheme: Option<DesfireAuthMode>,
    key_no: Option<u8>,
    session_key: Vec<u8>,
    iv: Vec<u8>,
    cmac_subkeys: Option<(Vec<u8>, Vec<u8>)>,
    selected_aid: [u8; 3],
    comm_mode: CommMode,
    command_counter: WrappingCounter<u16>,
    last_auth_card_cipher: Option<Vec<u8>>,
}

impl<T: Transceiver> Session<T> {
    pub fn new(
        transceiver: T,
        wire_kind: WireKind,
        reader_caps: ReaderCapabilities,
        config: SessionConfig,
        logger: SessionLogger,
    ) -> Self {
        Self {
            transceiver,
            wire_kind,
            reader_caps,
            config,
            logger,
            auth_scheme: None,
            key_no: None,
            session_key: Vec::new(),
            iv: Vec::new(),
            cmac_subkeys: None,
            selected_aid: [0x00, 0x00, 0x00],
            comm_mode: CommMode::Plain,
            command_counter: WrappingCounter::new(),
            last_auth_card_cipher: None,
        }
    }

    pub fn selected_aid(&self) -> [u8; 3] {
        self.selected_aid
    }

    pub fn default_comm_mode(&self) -> CommMode {
        self.comm_mode
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_scheme.is_some()
    }

    pub(crate) fn session_cipher(&self) -> Option<SessionCipher> {
        match self.auth_scheme {
            Some(DesfireAuthMode::Aes) => Some(SessionCipher::Aes128),
            Some(_) => Some(SessionCipher::DesFamily),
            None => None,
        }
    }

    pub(crate) fn iv(&self) -> &[u8] {
        &self.iv
    }

    pub(crate) fn set_iv(&mut self, iv: Vec<u8>) {
        self.iv = iv;
    }

    pub(crate) fn session_key_bytes(&self) -> &[u8] {
        &self.session_key
    }

    pub(crate) fn cmac_subkeys(&self) -> Option<&(Vec<u8>, Vec<u8>)> {
        self.cmac_subkeys.as_ref()
    }

    pub(crate) fn command_counter(&self) -> u16 {
        self.command_counter.value()
    }

    pub(crate) fn advance_command_counter(&mut self) -> u16 {
        self.command_counter.increment()
    }

    pub(crate) fn command_counter_policy(&self) -> CommandCounterPolicy {
        self.config.command_counter_policy
    }

    fn regenerate_cmac_subkeys(&mut self) {
        self.cmac_subkeys = self
            .session_cipher()
            .map(|cipher| cipher.generate_cmac_subkeys(&self.session_key));
    }
}

/// The public, typed command surface (§6): one method per DESFire
/// command object, each just building the command and handing it to
/// [`processor::execute`]. `comm_mode` parameters default to
/// `session.default_comm_mode()` when omitted by picking `None`, so
/// callers can rely on the mode `SelectApplication`/`Authenticate` left
/// behind instead of repeating it at every call site.
impl<T: Transceiver> Session<T> {
    fn mode_or_default(&self, mode: Option<CommMode>) -> CommMode {
        mode.unwrap_or_else(|| self.default_comm_mode())
    }

    pub fn select_application(&mut self, aid: [u8; 3]) -> Result<()> {
        processor::execute(self, SelectApplication::new(aid))
    }

    pub fn authenticate(&mut self, scheme: DesfireAuthMode, key_no: u8, key: Vec<u8>) -> Result<()> {
        processor::execute(self, Authenticate::new(scheme, key_no, key))
    }

    pub fn create_application(&mut self, aid: [u8; 3], key_settings: u8, num_keys_and_type: u8) -> Result<()> {
        processor::execute(self, CreateApplication::new(aid, key_settings, num_keys_and_type))
    }

    pub fn delete_application(&mut self, aid: [u8; 3]) -> Result<()> {
        processor::execute(self, DeleteApplication::new(aid))
    }

    pub fn get_key_settings(&mut self) -> Result<KeySettingsInfo> {
        processor::execute(self, GetKeySettings::new())
    }

    pub fn change_key_settings(&mut self, new_settings: u8) -> Result<()> {
        processor::execute(self, ChangeKeySettings::new(new_settings))
    }

    pub fn change_key(
        &mut self,
        key_no: u8,
        new_key_type: DesfireKeyType,
        new_key: Vec<u8>,
        new_key_version: u8,
        old_key: Option<Vec<u8>>,
    ) -> Result<()> {
        let iv_seed = self.config.legacy_change_key_iv_seed;
        processor::execute(
            self,
            ChangeKey::new(key_no, new_key_type, new_key, new_key_version, old_key)
                .with_legacy_iv_seed(iv_seed),
        )
    }

    /// `selector == SELECTOR_ATS` is routed through [`SetConfiguration::ats`]
    /// so the configured TL-byte-inclusion convention (§9 open question)
    /// applies; every other selector passes `data` through unchanged.
    pub fn set_configuration(&mut self, selector: u8, data: Vec<u8>) -> Result<()> {
        if selector == SELECTOR_ATS {
            let include_tl_byte = self.config.ats_length_convention == AtsLengthConvention::TlIncluded;
            return processor::execute(self, SetConfiguration::ats(data, include_tl_byte));
        }
        processor::execute(self, SetConfiguration::new(selector, data))
    }

    pub fn create_std_data_file(
        &mut self,
        file_no: u8,
        comm_settings: u8,
        access_rights: (u8, u8, u8, u8),
        file_size: u32,
    ) -> Result<()> {
        processor::execute(self, CreateStdDataFile::new(file_no, comm_settings, access_rights, file_size))
    }

    pub fn create_backup_data_file(
        &mut self,
        file_no: u8,
        comm_settings: u8,
        access_rights: (u8, u8, u8, u8),
        file_size: u32,
    ) -> Result<()> {
        processor::execute(self, CreateBackupDataFile::new(file_no, comm_settings, access_rights, file_size))
    }

    pub fn create_value_file(
        &mut self,
        file_no: u8,
        comm_settings: u8,
        access_rights: (u8, u8, u8, u8),
        lower_limit: i32,
        upper_limit: i32,
        initial_value: i32,
        limited_credit_enabled: bool,
    ) -> Result<()> {
        processor::execute(
            self,
            CreateValueFile::new(
                file_no,
                comm_settings,
                access_rights,
                lower_limit,
                upper_limit,
                initial_value,
                limited_credit_enabled,
            ),
        )
    }

    pub fn create_linear_record_file(
        &mut self,
        file_no: u8,
        comm_settings: u8,
        access_rights: (u8, u8, u8, u8),
        record_size: u32,
        max_records: u32,
    ) -> Result<()> {
        processor::execute(
            self,
            CreateLinearRecordFile::new(file_no, comm_settings, access_rights, record_size, max_records),
        )
    }

    pub fn create_cyclic_record_file(
        &mut self,
        file_no: u8,
        comm_settings: u8,
        access_rights: (u8, u8, u8, u8),
        record_size: u32,
        max_records: u32,
    ) -> Result<()> {
        processor::execute(
            self,
            CreateCyclicRecordFile::new(file_no, comm_settings, access_rights, record_size, max_records),
        )
    }

    pub fn delete_file(&mut self, file_no: u8) -> Result<()> {
        processor::execute(self, DeleteFile::new(file_no))
    }

    pub fn change_file_settings(
        &mut self,
        file_no: u8,
        comm_settings: u8,
        access_rights: (u8, u8, u8, u8),
    ) -> Result<()> {
        processor::execute(self, ChangeFileSettings::new(file_no, comm_settings, access_rights))
    }

    pub fn get_file_settings(&mut self, file_no: u8) -> Result<FileSettings> {
        processor::execute(self, GetFileSettings::new(file_no))
    }

    pub fn read_data(&mut self, file_no: u8, offset: u32, length: u32, mode: Option<CommMode>) -> Result<Vec<u8>> {
        let mode = self.mode_or_default(mode);
        processor::execute(self, ReadData::new(file_no, offset, length, mode))
    }

    pub fn write_data(
        &mut self,
        file_no: u8,
        offset: u32,
        data: Vec<u8>,
        mode: Option<CommMode>,
    ) -> Result<()> {
        let mode = self.mode_or_default(mode);
        let frame_capacity = self.reader_caps.max_apdu_size as usize;
        processor::execute(self, WriteData::new(file_no, offset, data, frame_capacity, mode))
    }

    pub fn read_records(
        &mut self,
        file_no: u8,
        record_offset: u32,
        record_count: u32,
        mode: Option<CommMode>,
    ) -> Result<Vec<u8>> {
        let mode = self.mode_or_default(mode);
        processor::execute(self, ReadRecords::new(file_no, record_offset, record_count, mode))
    }

    pub fn write_record(
        &mut self,
        file_no: u8,
        offset: u32,
        data: Vec<u8>,
        mode: Option<CommMode>,
    ) -> Result<()> {
        let mode = self.mode_or_default(mode);
        let frame_capacity = self.reader_caps.max_apdu_size as usize;
        processor::execute(self, WriteRecord::new(file_no, offset, data, frame_capacity, mode))
    }

    pub fn get_value(&mut self, file_no: u8, mode: Option<CommMode>) -> Result<i32> {
        let mode = self.mode_or_default(mode);
        processor::execute(self, GetValue::new(file_no, mode))
    }

    pub fn credit(&mut self, file_no: u8, amount: i32, mode: Option<CommMode>) -> Result<()> {
        let mode = self.mode_or_default(mode);
        processor::execute(self, ValueTransfer::credit(file_no, amount, mode))
    }

    pub fn debit(&mut self, file_no: u8, amount: i32, mode: Option<CommMode>) -> Result<()> {
        let mode = self.mode_or_default(mode);
        processor::execute(self, ValueTransfer::debit(file_no, amount, mode))
    }

    pub fn limited_credit(&mut self, file_no: u8, amount: i32, mode: Option<CommMode>) -> Result<()> {
        let mode = self.mode_or_default(mode);
        processor::execute(self, ValueTransfer::limited_credit(file_no, amount, mode))
    }

    pub fn commit_transaction(&mut self) -> Result<()> {
        processor::execute(self, CommitTransaction::new())
    }

    pub fn abort_transaction(&mut self) -> Result<()> {
        processor::execute(self, AbortTransaction::new())
    }
}

impl<T: Transceiver> SessionContext for Session<T> {
    fn reset(&mut self) {
        self.auth_scheme = None;
        self.key_no = None;
        self.session_key.clear();
        self.iv.clear();
        self.cmac_subkeys = None;
        self.command_counter.reset();
        self.last_auth_card_cipher = None;
    }

    fn apply_authentication(&mut self, mode: DesfireAuthMode, key_no: u8, session_key: Vec<u8>) {
        self.auth_scheme = Some(mode);
        self.key_no = Some(key_no);
        self.session_key = session_key;
        let block_size = self.session_cipher().expect("scheme just set above").block_size();
        self.iv = vec![0u8; block_size];
        self.command_counter.reset();
        self.regenerate_cmac_subkeys();
    }

    fn set_session_key(&mut self, session_key: Vec<u8>) {
        self.session_key = session_key;
        self.regenerate_cmac_subkeys();
    }

    fn set_selected_aid(&mut self, aid: [u8; 3]) {
        self.selected_aid = aid;
    }

    fn set_default_comm_mode(&mut self, mode: CommMode) {
        self.comm_mode = mode;
    }

    fn auth_scheme(&self) -> Option<DesfireAuthMode> {
        self.auth_scheme
    }

    fn key_no(&self) -> Option<u8> {
        self.key_no
    }

    fn last_auth_card_cipher(&self) -> Option<&[u8]> {
        self.last_auth_card_cipher.as_deref()
    }

    fn set_last_auth_card_cipher(&mut self, cipher: Vec<u8>) {
        self.last_auth_card_cipher = Some(cipher);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;

    struct DummyTransceiver;
    impl Transceiver for DummyTransceiver {
        fn transceive(&mut self, _apdu: &[u8], _deadline_ms: u64) -> Result<Vec<u8>, TransportError> {
            Err(TransportError::DeviceNotFound)
        }
    }

    fn session() -> Session<DummyTransceiver> {
        Session::new(
            DummyTransceiver,
            WireKind::Native,
            ReaderCapabilities::pn532(),
            SessionConfig::default(),
            SessionLogger::new(Box::new(desfire_logging::NoopLogger::default())),
        )
    }

    #[test]
    fn starts_unauthenticated_with_empty_material() {
        let s = session();
        assert!(!s.is_authenticated());
        assert!(s.iv().is_empty());
        assert!(s.cmac_subkeys().is_none());
    }

    #[test]
    fn apply_authentication_zeroes_iv_to_block_size() {
        let mut s = session();
        s.apply_authentication(DesfireAuthMode::Aes, 0, vec![0u8; 16]);
        assert!(s.is_authenticated());
        assert_eq!(s.iv(), &[0u8; 16]);
        assert!(s.cmac_subkeys().is_some());
    }

    #[test]
    fn reset_clears_all_authentication_material() {
        let mut s = session();
        s.apply_authentication(DesfireAuthMode::Legacy, 2, vec![0u8; 8]);
        s.reset();
        assert!(!s.is_authenticated());
        assert!(s.iv().is_empty());
        assert!(s.session_key_bytes().is_empty());
        assert!(s.cmac_subkeys().is_none());
    }

    #[test]
    fn set_session_key_regenerates_subkeys_for_same_scheme() {
        let mut s = session();
        s.apply_authentication(DesfireAuthMode::Iso, 0, vec![0u8; 16]);
        let first = s.cmac_subkeys().cloned();
        s.set_session_key(vec![0xFFu8; 16]);
        assert_ne!(s.cmac_subkeys().cloned(), first);
    }
}
