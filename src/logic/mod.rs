pub mod hooks;
pub mod kind;
pub mod observer;
pub mod relation_list;

pub use hooks::*;
pub use kind::*;
pub use observer::*;
pub use relation_list::*;
