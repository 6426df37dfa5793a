pub use crate::error::{Error, Result};
pub use crate::frame::{unwrap_response, wrap_request};
