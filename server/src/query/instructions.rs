//! Modification instruction grammar
//!
//! A modification request is an ordered list of instructions, each a tagged
//! object with a `type` discriminator and type-specific required fields.
//! Validation runs over the whole list before any builder call; a valid list
//! replays onto a [`ModificationBuilder`] one call per instruction, with
//! start-instruction variables following their start call.

use serde::Deserialize;
use serde_json::Value;

use crate::engine::modification::ModificationBuilder;

use super::ParamError;
use super::value::{TypedValue, ValueInfo};

const TYPE_CANCEL: &str = "cancel";
const TYPE_START_BEFORE: &str = "startBeforeActivity";
const TYPE_START_AFTER: &str = "startAfterActivity";
const TYPE_START_TRANSITION: &str = "startTransition";

/// One wire-level modification instruction.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModificationInstructionDto {
    #[serde(rename = "type")]
    pub instruction_type: String,
    #[serde(default)]
    pub activity_id: Option<String>,
    #[serde(default)]
    pub transition_id: Option<String>,
    #[serde(default)]
    pub ancestor_activity_instance_id: Option<String>,
    #[serde(default)]
    pub cancel_current_active_activity_instances: Option<bool>,
    #[serde(default)]
    pub variables: Option<serde_json::Map<String, Value>>,
}

/// Typed value entry of a start instruction's variables map. The `local`
/// flag selects the local-scope builder call.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstructionVariableDto {
    #[serde(default)]
    value: Value,
    #[serde(rename = "type", default)]
    value_type: Option<String>,
    #[serde(default)]
    value_info: Option<ValueInfo>,
    #[serde(default)]
    local: bool,
}

/// A validated instruction, ready to replay.
#[derive(Debug, Clone, PartialEq)]
pub enum ModificationInstruction {
    Cancel {
        activity_id: String,
        cancel_current_active_activity_instances: bool,
    },
    StartBeforeActivity {
        activity_id: String,
        ancestor_activity_instance_id: Option<String>,
        variables: Vec<InstructionVariable>,
    },
    StartAfterActivity {
        activity_id: String,
        ancestor_activity_instance_id: Option<String>,
        variables: Vec<InstructionVariable>,
    },
    StartTransition {
        transition_id: String,
        ancestor_activity_instance_id: Option<String>,
        variables: Vec<InstructionVariable>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstructionVariable {
    pub name: String,
    pub value: TypedValue,
    pub local: bool,
}

impl ModificationInstructionDto {
    /// Validate the instruction and convert its variables. Field errors use
    /// the fixed template `For instruction type '<t>': '<field>' must be set`.
    pub fn validate(self) -> Result<ModificationInstruction, ParamError> {
        match self.instruction_type.as_str() {
            TYPE_CANCEL => Ok(ModificationInstruction::Cancel {
                activity_id: require(TYPE_CANCEL, "activityId", self.activity_id)?,
                cancel_current_active_activity_instances: self
                    .cancel_current_active_activity_instances
                    .unwrap_or(false),
            }),
            TYPE_START_BEFORE => Ok(ModificationInstruction::StartBeforeActivity {
                activity_id: require(TYPE_START_BEFORE, "activityId", self.activity_id)?,
                ancestor_activity_instance_id: self.ancestor_activity_instance_id,
                variables: convert_variables(self.variables)?,
            }),
            TYPE_START_AFTER => Ok(ModificationInstruction::StartAfterActivity {
                activity_id: require(TYPE_START_AFTER, "activityId", self.activity_id)?,
                ancestor_activity_instance_id: self.ancestor_activity_instance_id,
                variables: convert_variables(self.variables)?,
            }),
            TYPE_START_TRANSITION => Ok(ModificationInstruction::StartTransition {
                transition_id: require(TYPE_START_TRANSITION, "transitionId", self.transition_id)?,
                ancestor_activity_instance_id: self.ancestor_activity_instance_id,
                variables: convert_variables(self.variables)?,
            }),
            other => Err(ParamError::new(format!(
                "Instruction type '{other}' is not supported"
            ))),
        }
    }
}

fn require(
    instruction_type: &str,
    field: &str,
    value: Option<String>,
) -> Result<String, ParamError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ParamError::new(format!(
            "For instruction type '{instruction_type}': '{field}' must be set"
        ))),
    }
}

fn convert_variables(
    variables: Option<serde_json::Map<String, Value>>,
) -> Result<Vec<InstructionVariable>, ParamError> {
    let Some(variables) = variables else {
        return Ok(Vec::new());
    };
    variables
        .into_iter()
        .map(|(name, raw)| {
            let dto: InstructionVariableDto =
                serde_json::from_value(raw).map_err(|e| ParamError::new(e.to_string()))?;
            let value =
                TypedValue::convert(&dto.value, dto.value_type.as_deref(), dto.value_info.as_ref())
                    .map_err(|e| e.context("Cannot modify process instance"))?;
            Ok(InstructionVariable { name, value, local: dto.local })
        })
        .collect()
}

/// Validate a whole instruction list. Everything converts or nothing does.
pub fn validate_instructions(
    instructions: Vec<ModificationInstructionDto>,
) -> Result<Vec<ModificationInstruction>, ParamError> {
    instructions.into_iter().map(ModificationInstructionDto::validate).collect()
}

/// Replay validated instructions onto a builder in list order.
pub fn apply_instructions(
    builder: &mut dyn ModificationBuilder,
    instructions: &[ModificationInstruction],
) {
    for instruction in instructions {
        match instruction {
            ModificationInstruction::Cancel {
                activity_id,
                cancel_current_active_activity_instances,
            } => {
                if *cancel_current_active_activity_instances {
                    builder.cancel_all_for_activity_canceling_current(activity_id);
                } else {
                    builder.cancel_all_for_activity(activity_id);
                }
            }
            ModificationInstruction::StartBeforeActivity {
                activity_id,
                ancestor_activity_instance_id,
                variables,
            } => {
                match ancestor_activity_instance_id {
                    Some(ancestor) => {
                        builder.start_before_activity_with_ancestor(activity_id, ancestor);
                    }
                    None => builder.start_before_activity(activity_id),
                }
                apply_variables(builder, variables);
            }
            ModificationInstruction::StartAfterActivity {
                activity_id,
                ancestor_activity_instance_id,
                variables,
            } => {
                match ancestor_activity_instance_id {
                    Some(ancestor) => {
                        builder.start_after_activity_with_ancestor(activity_id, ancestor);
                    }
                    None => builder.start_after_activity(activity_id),
                }
                apply_variables(builder, variables);
            }
            ModificationInstruction::StartTransition {
                transition_id,
                ancestor_activity_instance_id,
                variables,
            } => {
                match ancestor_activity_instance_id {
                    Some(ancestor) => {
                        builder.start_transition_with_ancestor(transition_id, ancestor);
                    }
                    None => builder.start_transition(transition_id),
                }
                apply_variables(builder, variables);
            }
        }
    }
}

fn apply_variables(builder: &mut dyn ModificationBuilder, variables: &[InstructionVariable]) {
    for variable in variables {
        if variable.local {
            builder.set_variable_local(&variable.name, variable.value.clone());
        } else {
            builder.set_variable(&variable.name, variable.value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::modification::Batch;
    use crate::engine::EngineError;
    use serde_json::json;

    fn dto(raw: Value) -> ModificationInstructionDto {
        serde_json::from_value(raw).unwrap()
    }

    #[derive(Default)]
    struct RecordingBuilder {
        calls: Vec<String>,
    }

    impl ModificationBuilder for RecordingBuilder {
        fn cancel_all_for_activity(&mut self, activity_id: &str) {
            self.calls.push(format!("cancelAllForActivity({activity_id})"));
        }
        fn cancel_all_for_activity_canceling_current(&mut self, activity_id: &str) {
            self.calls.push(format!("cancelAllForActivityCancelingCurrent({activity_id})"));
        }
        fn start_before_activity(&mut self, activity_id: &str) {
            self.calls.push(format!("startBeforeActivity({activity_id})"));
        }
        fn start_before_activity_with_ancestor(
            &mut self,
            activity_id: &str,
            ancestor_activity_instance_id: &str,
        ) {
            self.calls.push(format!(
                "startBeforeActivity({activity_id}, {ancestor_activity_instance_id})"
            ));
        }
        fn start_after_activity(&mut self, activity_id: &str) {
            self.calls.push(format!("startAfterActivity({activity_id})"));
        }
        fn start_after_activity_with_ancestor(
            &mut self,
            activity_id: &str,
            ancestor_activity_instance_id: &str,
        ) {
            self.calls.push(format!(
                "startAfterActivity({activity_id}, {ancestor_activity_instance_id})"
            ));
        }
        fn start_transition(&mut self, transition_id: &str) {
            self.calls.push(format!("startTransition({transition_id})"));
        }
        fn start_transition_with_ancestor(
            &mut self,
            transition_id: &str,
            ancestor_activity_instance_id: &str,
        ) {
            self.calls.push(format!(
                "startTransition({transition_id}, {ancestor_activity_instance_id})"
            ));
        }
        fn set_variable(&mut self, name: &str, value: TypedValue) {
            self.calls.push(format!("setVariable({name}, {})", value.as_text()));
        }
        fn set_variable_local(&mut self, name: &str, value: TypedValue) {
            self.calls.push(format!("setVariableLocal({name}, {})", value.as_text()));
        }
        fn execute(&mut self, _: bool, _: bool) -> Result<(), EngineError> {
            self.calls.push("execute".to_string());
            Ok(())
        }
        fn execute_async(&mut self, _: bool, _: bool) -> Result<Batch, EngineError> {
            self.calls.push("executeAsync".to_string());
            Ok(Batch { id: "batch-1".to_string(), batch_type: "instance-modification".to_string() })
        }
    }

    #[test]
    fn missing_required_field_names_type_and_field() {
        let err = dto(json!({"type": "startAfterActivity"})).validate().unwrap_err();
        assert_eq!(err.0, "For instruction type 'startAfterActivity': 'activityId' must be set");

        let err = dto(json!({"type": "startTransition"})).validate().unwrap_err();
        assert_eq!(err.0, "For instruction type 'startTransition': 'transitionId' must be set");

        let err = dto(json!({"type": "cancel"})).validate().unwrap_err();
        assert_eq!(err.0, "For instruction type 'cancel': 'activityId' must be set");
    }

    #[test]
    fn unsupported_type_is_rejected() {
        let err = dto(json!({"type": "acquireLock"})).validate().unwrap_err();
        assert_eq!(err.0, "Instruction type 'acquireLock' is not supported");
    }

    #[test]
    fn instructions_replay_in_list_order() {
        let instructions = validate_instructions(vec![
            dto(json!({"type": "startBeforeActivity", "activityId": "a1"})),
            dto(json!({"type": "cancel", "activityId": "a2"})),
            dto(json!({
                "type": "startTransition",
                "transitionId": "flow3",
                "ancestorActivityInstanceId": "inst9",
            })),
        ])
        .unwrap();

        let mut builder = RecordingBuilder::default();
        apply_instructions(&mut builder, &instructions);
        assert_eq!(
            builder.calls,
            vec![
                "startBeforeActivity(a1)",
                "cancelAllForActivity(a2)",
                "startTransition(flow3, inst9)",
            ]
        );
    }

    #[test]
    fn cancel_flag_selects_the_canceling_current_call() {
        let instructions = validate_instructions(vec![dto(json!({
            "type": "cancel",
            "activityId": "a1",
            "cancelCurrentActiveActivityInstances": true,
        }))])
        .unwrap();

        let mut builder = RecordingBuilder::default();
        apply_instructions(&mut builder, &instructions);
        assert_eq!(builder.calls, vec!["cancelAllForActivityCancelingCurrent(a1)"]);
    }

    #[test]
    fn start_variables_follow_their_start_call() {
        let instructions = validate_instructions(vec![dto(json!({
            "type": "startBeforeActivity",
            "activityId": "a1",
            "variables": {
                "amount": {"value": 5, "type": "Integer"},
                "note": {"value": "hi", "local": true},
            },
        }))])
        .unwrap();

        let mut builder = RecordingBuilder::default();
        apply_instructions(&mut builder, &instructions);
        assert_eq!(
            builder.calls,
            vec![
                "startBeforeActivity(a1)",
                "setVariable(amount, 5)",
                "setVariableLocal(note, hi)",
            ]
        );
    }

    #[test]
    fn bad_variable_value_fails_the_whole_list() {
        let err = validate_instructions(vec![dto(json!({
            "type": "startBeforeActivity",
            "activityId": "a1",
            "variables": {"amount": {"value": "x", "type": "Integer"}},
        }))])
        .unwrap_err();
        assert_eq!(
            err.0,
            "Cannot modify process instance: \"x\" is not a valid integer value"
        );
    }
}
