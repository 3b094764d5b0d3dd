pub mod emitter;
pub mod priority;

pub use emitter::*;
pub use priority::*;
