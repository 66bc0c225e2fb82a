//! API route handlers

pub mod case_execution;
pub mod case_instance;
pub mod execution;
pub mod health;
pub mod message;
pub mod process_instance;
pub mod task;
