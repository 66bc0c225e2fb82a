//! Engine collaborator interfaces
//!
//! The process/case engine itself lives outside this service. Everything the
//! facade needs from it is expressed as traits here: fresh query sinks per
//! request, a modification builder, message correlation and task variable
//! writes. The in-memory engine backs the binary and the end-to-end tests.

pub mod memory;
pub mod message;
pub mod modification;
pub mod query;

pub use memory::MemoryEngine;
pub use message::{CorrelationResult, CorrelationResultType, MessageCorrelation};
pub use modification::{Batch, ModificationBuilder};
pub use query::{
    CaseExecutionQuery, CaseInstanceQuery, ExecutionQuery, ProcessInstanceQuery,
};

use crate::query::value::TypedValue;

/// Failure reported by the engine collaborator. Messages pass through to the
/// wire unmodified.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("{message}")]
    ProcessEngine { message: String, code: Option<i32> },
    #[error("{0}")]
    Authorization(String),
    #[error("{0}")]
    NotFound(String),
}

/// A running process instance as reported by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessInstance {
    pub id: String,
    pub definition_id: String,
    pub definition_key: String,
    pub business_key: Option<String>,
    pub case_instance_id: Option<String>,
    pub ended: bool,
    pub suspended: bool,
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Execution {
    pub id: String,
    pub process_instance_id: String,
    pub ended: bool,
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseInstance {
    pub id: String,
    pub case_definition_id: String,
    pub business_key: Option<String>,
    pub active: bool,
    pub completed: bool,
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseExecution {
    pub id: String,
    pub case_instance_id: String,
    pub case_definition_id: String,
    pub activity_id: Option<String>,
    pub active: bool,
    pub enabled: bool,
    pub disabled: bool,
    pub tenant_id: Option<String>,
}

/// The engine collaborator. One sink is obtained fresh per request; no
/// pooling or caching happens in this layer.
pub trait ProcessEngine: Send + Sync {
    fn create_process_instance_query(&self) -> Box<dyn ProcessInstanceQuery>;
    fn create_execution_query(&self) -> Box<dyn ExecutionQuery>;
    fn create_case_instance_query(&self) -> Box<dyn CaseInstanceQuery>;
    fn create_case_execution_query(&self) -> Box<dyn CaseExecutionQuery>;

    fn create_modification(&self, process_instance_id: &str) -> Box<dyn ModificationBuilder>;

    fn correlate_message(
        &self,
        correlation: &MessageCorrelation,
    ) -> Result<Vec<CorrelationResult>, EngineError>;

    fn set_task_variable(
        &self,
        task_id: &str,
        name: &str,
        value: TypedValue,
    ) -> Result<(), EngineError>;
}
