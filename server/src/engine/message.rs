//! Message correlation configuration
//!
//! The correlation request is an immutable configuration struct handed to the
//! engine in one call; this layer does not chase intermediate builder state.

use crate::query::value::TypedValue;

use super::EngineError;

/// Fully converted correlation request. Key and variable lists keep wire
/// order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageCorrelation {
    pub message_name: String,
    pub business_key: Option<String>,
    pub tenant_id: Option<String>,
    pub without_tenant_id: bool,
    pub process_instance_id: Option<String>,
    pub correlation_keys: Vec<(String, TypedValue)>,
    pub local_correlation_keys: Vec<(String, TypedValue)>,
    pub process_variables: Vec<(String, TypedValue)>,
    pub process_variables_local: Vec<(String, TypedValue)>,
    pub process_variables_to_triggered_scope: Vec<(String, TypedValue)>,
    /// Correlate to all matching subscriptions instead of exactly one.
    pub all: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationResultType {
    Execution,
    ProcessDefinition,
}

impl CorrelationResultType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Execution => "Execution",
            Self::ProcessDefinition => "ProcessDefinition",
        }
    }
}

/// Outcome of one correlation, relayed to the caller as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationResult {
    pub result_type: CorrelationResultType,
    pub execution_id: Option<String>,
    pub process_instance_id: Option<String>,
}

/// Convenience constructor for the common single-correlation failure.
pub fn no_matching_subscription(message_name: &str) -> EngineError {
    EngineError::ProcessEngine {
        message: format!("No process instances or executions subscribe to message '{message_name}'"),
        code: None,
    }
}
