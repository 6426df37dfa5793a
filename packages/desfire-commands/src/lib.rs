//! Command objects (C6): one per DESFire command, each a finite-state
//! iterator over `build_request`/`parse_response` driven by the
//! processor in `desfire-driver`. Depends only on `desfire-core` for
//! crypto/PDU/definitions, never on `desfire-driver`, so the concrete
//! `Session` type can implement [`SessionContext`] without a cycle.

pub mod access_rights;
pub mod chunking;
pub mod command;
pub mod commands;
pub mod error;
pub mod session_context;

pub mod prelude;

pub use command::Command;
pub use error::{CommandError, Result};
pub use session_context::SessionContext;
