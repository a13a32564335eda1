pub mod autosave;
pub mod storage;
pub mod types;

pub use autosave::*;
pub use types::*;
