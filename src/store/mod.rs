pub mod json_store;
pub mod progress;

pub use json_store::JsonFileBackend;
pub use progress::{ProgressBackend, ProgressRecord, ProgressStore};
