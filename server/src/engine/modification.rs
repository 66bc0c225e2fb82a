//! Process instance modification builder
//!
//! One builder per modification request. Instruction calls arrive in the
//! order the wire listed them, followed by exactly one terminal `execute` or
//! `execute_async` call. Variable calls for a start instruction follow that
//! instruction's builder call.

use crate::query::value::TypedValue;

use super::EngineError;

/// Opaque handle for asynchronously executed modifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub id: String,
    pub batch_type: String,
}

pub trait ModificationBuilder {
    fn cancel_all_for_activity(&mut self, activity_id: &str);
    /// Variant used when the wire sets `cancelCurrentActiveActivityInstances`.
    fn cancel_all_for_activity_canceling_current(&mut self, activity_id: &str);

    fn start_before_activity(&mut self, activity_id: &str);
    fn start_before_activity_with_ancestor(
        &mut self,
        activity_id: &str,
        ancestor_activity_instance_id: &str,
    );
    fn start_after_activity(&mut self, activity_id: &str);
    fn start_after_activity_with_ancestor(
        &mut self,
        activity_id: &str,
        ancestor_activity_instance_id: &str,
    );
    fn start_transition(&mut self, transition_id: &str);
    fn start_transition_with_ancestor(
        &mut self,
        transition_id: &str,
        ancestor_activity_instance_id: &str,
    );

    fn set_variable(&mut self, name: &str, value: TypedValue);
    fn set_variable_local(&mut self, name: &str, value: TypedValue);

    fn execute(
        &mut self,
        skip_custom_listeners: bool,
        skip_io_mappings: bool,
    ) -> Result<(), EngineError>;
    fn execute_async(
        &mut self,
        skip_custom_listeners: bool,
        skip_io_mappings: bool,
    ) -> Result<Batch, EngineError>;
}
