pub mod config;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod recurrence;
pub mod scope;
pub mod storage;
pub mod task_api;
pub mod view;
