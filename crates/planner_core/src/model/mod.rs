pub mod schedule;
mod task;

pub use task::{Category, Task, TaskPatch, new_id, now_millis};
