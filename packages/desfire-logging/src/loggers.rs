mod base;
pub use base::*;

mod session;
pub use session::*;
