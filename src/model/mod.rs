pub mod common;
pub mod filter;
pub mod record;

pub use common::*;
pub use filter::*;
pub use record::*;
