//! Query sink capability traits
//!
//! Each entity query object is a stateful query-under-construction: predicate
//! methods narrow it, `order_by`/`asc`/`desc` order it, and exactly one
//! terminal call (`list`, `list_page`, `count`) executes it. Entity traits
//! compose the capability traits they actually support; an execution query
//! carries process-variable predicates, a case execution query carries
//! case-instance-variable predicates, and so on.
//!
//! Replay order is part of the contract: case-sensitivity flags must be set
//! before the variable predicates they affect, ordering before the terminal
//! call.

use super::{CaseExecution, CaseInstance, EngineError, Execution, ProcessInstance};
use crate::query::value::TypedValue;

/// Variable predicates over the entity's own variable scope.
pub trait VariablePredicates {
    fn match_variable_names_ignore_case(&mut self);
    fn match_variable_values_ignore_case(&mut self);
    fn variable_value_equals(&mut self, name: &str, value: TypedValue);
    fn variable_value_not_equals(&mut self, name: &str, value: TypedValue);
    fn variable_value_greater_than(&mut self, name: &str, value: TypedValue);
    fn variable_value_greater_than_or_equal(&mut self, name: &str, value: TypedValue);
    fn variable_value_less_than(&mut self, name: &str, value: TypedValue);
    fn variable_value_less_than_or_equal(&mut self, name: &str, value: TypedValue);
    fn variable_value_like(&mut self, name: &str, value: String);
}

/// Process-variable predicates available on execution queries. The engine
/// only supports equality comparisons in this family.
pub trait ProcessVariablePredicates {
    fn process_variable_value_equals(&mut self, name: &str, value: TypedValue);
    fn process_variable_value_not_equals(&mut self, name: &str, value: TypedValue);
}

/// Case-instance-variable predicates available on case execution queries.
pub trait CaseInstanceVariablePredicates {
    fn case_instance_variable_value_equals(&mut self, name: &str, value: TypedValue);
    fn case_instance_variable_value_not_equals(&mut self, name: &str, value: TypedValue);
    fn case_instance_variable_value_greater_than(&mut self, name: &str, value: TypedValue);
    fn case_instance_variable_value_greater_than_or_equal(&mut self, name: &str, value: TypedValue);
    fn case_instance_variable_value_less_than(&mut self, name: &str, value: TypedValue);
    fn case_instance_variable_value_less_than_or_equal(&mut self, name: &str, value: TypedValue);
    fn case_instance_variable_value_like(&mut self, name: &str, value: String);
}

/// Ordering capability; `order_by` selects a field, the following
/// `asc`/`desc` call fixes its direction.
pub trait SortSink {
    type Field;
    fn order_by(&mut self, field: Self::Field);
    fn asc(&mut self);
    fn desc(&mut self);
}

/// Terminal execution capability.
pub trait ExecutableQuery {
    type Item;
    fn list(&mut self) -> Result<Vec<Self::Item>, EngineError>;
    fn list_page(&mut self, first: i32, max: i32) -> Result<Vec<Self::Item>, EngineError>;
    fn count(&mut self) -> Result<u64, EngineError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessInstanceSortField {
    InstanceId,
    DefinitionKey,
    DefinitionId,
    TenantId,
    BusinessKey,
}

impl ProcessInstanceSortField {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "instanceId" => Some(Self::InstanceId),
            "definitionKey" => Some(Self::DefinitionKey),
            "definitionId" => Some(Self::DefinitionId),
            "tenantId" => Some(Self::TenantId),
            "businessKey" => Some(Self::BusinessKey),
            _ => None,
        }
    }
}

pub trait ProcessInstanceQuery:
    VariablePredicates + SortSink<Field = ProcessInstanceSortField> + ExecutableQuery<Item = ProcessInstance>
{
    fn process_instance_ids(&mut self, ids: Vec<String>);
    fn process_definition_key(&mut self, key: &str);
    fn process_definition_id(&mut self, id: &str);
    fn deployment_id(&mut self, id: &str);
    fn business_key(&mut self, key: &str);
    fn business_key_like(&mut self, key: &str);
    fn case_instance_id(&mut self, id: &str);
    fn super_process_instance_id(&mut self, id: &str);
    fn sub_process_instance_id(&mut self, id: &str);
    fn active(&mut self);
    fn suspended(&mut self);
    fn with_incident(&mut self);
    fn tenant_id_in(&mut self, tenant_ids: Vec<String>);
    fn without_tenant_id(&mut self);
    fn activity_id_in(&mut self, activity_ids: Vec<String>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionSortField {
    InstanceId,
    DefinitionKey,
    DefinitionId,
    TenantId,
}

impl ExecutionSortField {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "instanceId" => Some(Self::InstanceId),
            "definitionKey" => Some(Self::DefinitionKey),
            "definitionId" => Some(Self::DefinitionId),
            "tenantId" => Some(Self::TenantId),
            _ => None,
        }
    }
}

pub trait ExecutionQuery:
    VariablePredicates
    + ProcessVariablePredicates
    + SortSink<Field = ExecutionSortField>
    + ExecutableQuery<Item = Execution>
{
    fn process_definition_key(&mut self, key: &str);
    fn process_definition_id(&mut self, id: &str);
    fn process_instance_id(&mut self, id: &str);
    fn activity_id(&mut self, id: &str);
    fn business_key(&mut self, key: &str);
    fn active(&mut self);
    fn suspended(&mut self);
    fn tenant_id_in(&mut self, tenant_ids: Vec<String>);
    fn without_tenant_id(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseInstanceSortField {
    CaseInstanceId,
    CaseDefinitionId,
    TenantId,
}

impl CaseInstanceSortField {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "caseInstanceId" => Some(Self::CaseInstanceId),
            "caseDefinitionId" => Some(Self::CaseDefinitionId),
            "tenantId" => Some(Self::TenantId),
            _ => None,
        }
    }
}

pub trait CaseInstanceQuery:
    VariablePredicates + SortSink<Field = CaseInstanceSortField> + ExecutableQuery<Item = CaseInstance>
{
    fn case_instance_id(&mut self, id: &str);
    fn case_definition_key(&mut self, key: &str);
    fn case_definition_id(&mut self, id: &str);
    fn business_key(&mut self, key: &str);
    fn active(&mut self);
    fn completed(&mut self);
    fn tenant_id_in(&mut self, tenant_ids: Vec<String>);
    fn without_tenant_id(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseExecutionSortField {
    CaseExecutionId,
    CaseDefinitionKey,
    CaseDefinitionId,
    TenantId,
}

impl CaseExecutionSortField {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "caseExecutionId" => Some(Self::CaseExecutionId),
            "caseDefinitionKey" => Some(Self::CaseDefinitionKey),
            "caseDefinitionId" => Some(Self::CaseDefinitionId),
            "tenantId" => Some(Self::TenantId),
            _ => None,
        }
    }
}

pub trait CaseExecutionQuery:
    VariablePredicates
    + CaseInstanceVariablePredicates
    + SortSink<Field = CaseExecutionSortField>
    + ExecutableQuery<Item = CaseExecution>
{
    fn case_execution_id(&mut self, id: &str);
    fn case_instance_id(&mut self, id: &str);
    fn case_definition_key(&mut self, key: &str);
    fn case_definition_id(&mut self, id: &str);
    fn activity_id(&mut self, id: &str);
    fn active(&mut self);
    fn enabled(&mut self);
    fn disabled(&mut self);
    fn tenant_id_in(&mut self, tenant_ids: Vec<String>);
    fn without_tenant_id(&mut self);
}
