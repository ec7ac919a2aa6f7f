pub mod store;
pub mod types;

pub use store::{FileStore, KeyValueStore, MemoryStore, TaskStore, TASKS_KEY};
pub use types::Task;
