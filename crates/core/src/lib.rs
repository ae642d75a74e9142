// crates/core/src/lib.rs
pub mod engine;
pub mod error;
pub mod job;
pub mod manager;
pub mod progress;
pub mod storage;
pub mod store;

pub use engine::*;
pub use error::*;
pub use job::*;
pub use manager::*;
pub use progress::*;
pub use storage::*;
pub use store::*;
