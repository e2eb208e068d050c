mod storage;
mod user_directory;

pub use storage::*;
pub use user_directory::*;
