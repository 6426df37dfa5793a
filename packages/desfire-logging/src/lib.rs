pub mod definitions;
pub use definitions::*;

pub mod formatters;
pub mod loggers;
pub use loggers::*;

pub mod prelude;
