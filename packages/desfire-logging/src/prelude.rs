pub use crate::definitions::{
    Direction, FormattedString, LogFormatter, LogInfo, Logger, Loglevel, WithColor,
};
pub use crate::formatters::DefaultFormatter;
pub use crate::loggers::{BaseLogger, NoopLogger, SessionLogger};
