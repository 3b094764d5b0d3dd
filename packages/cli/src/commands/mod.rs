pub mod convert;
pub mod init;
pub mod replay;

pub use convert::{convert, ConvertArgs};
pub use init::{init, InitArgs};
pub use replay::{replay, ReplayArgs};
