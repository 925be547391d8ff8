use crate::error::AppError;
use crate::model::Task;
use std::cell::RefCell;

pub mod json_store;

pub use json_store::JsonStore;

/// Load/save boundary for the task collection.
pub trait TaskStore {
    fn load(&self) -> Result<Vec<Task>, AppError>;

    fn save(&self, tasks: &[Task]) -> Result<(), AppError>;
}

/// Store kept in memory, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tasks: RefCell<Vec<Task>>,
    saves: RefCell<usize>,
}

impl MemoryStore {
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: RefCell::new(tasks),
            saves: RefCell::new(0),
        }
    }

    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.borrow().clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.borrow()
    }
}

impl TaskStore for MemoryStore {
    fn load(&self) -> Result<Vec<Task>, AppError> {
        Ok(self.snapshot())
    }

    fn save(&self, tasks: &[Task]) -> Result<(), AppError> {
        *self.tasks.borrow_mut() = tasks.to_vec();
        *self.saves.borrow_mut() += 1;
        Ok(())
    }
}
