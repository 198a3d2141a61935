pub mod task;

pub use task::{Task, TaskDocument, TaskId, TaskInput};
