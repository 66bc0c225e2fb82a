//! In-memory reference engine
//!
//! Backs the binary and the end-to-end tests with a small vector-based store.
//! Query sinks collect criteria exactly as they are replayed and evaluate
//! them lazily at the terminal call. Typed comparisons work within a value
//! family (all numerics compare as numbers, strings as strings, dates as
//! instants); `like` supports `%` wildcards; the case-insensitivity flags
//! affect string matching only. This is a demo collaborator, not a
//! persistence layer.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use crate::query::filter::Operator;
use crate::query::sorting::SortDirection;
use crate::query::value::TypedValue;

use super::message::{CorrelationResult, CorrelationResultType, MessageCorrelation};
use super::modification::{Batch, ModificationBuilder};
use super::query::{
    CaseExecutionQuery, CaseExecutionSortField, CaseInstanceQuery, CaseInstanceSortField,
    CaseInstanceVariablePredicates, ExecutableQuery, ExecutionQuery, ExecutionSortField,
    ProcessInstanceQuery, ProcessInstanceSortField, ProcessVariablePredicates, SortSink,
    VariablePredicates,
};
use super::{
    CaseExecution, CaseInstance, EngineError, Execution, ProcessEngine, ProcessInstance,
};

#[derive(Debug, Clone, Default)]
pub struct ProcessInstanceRecord {
    pub info: ProcessInstance,
    pub deployment_id: Option<String>,
    pub super_process_instance_id: Option<String>,
    pub with_incident: bool,
    pub activity_ids: Vec<String>,
    pub variables: Vec<(String, TypedValue)>,
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionRecord {
    pub info: Execution,
    pub process_definition_key: String,
    pub process_definition_id: String,
    pub activity_id: Option<String>,
    pub business_key: Option<String>,
    pub suspended: bool,
    pub variables: Vec<(String, TypedValue)>,
}

#[derive(Debug, Clone, Default)]
pub struct CaseInstanceRecord {
    pub info: CaseInstance,
    pub case_definition_key: String,
    pub variables: Vec<(String, TypedValue)>,
}

#[derive(Debug, Clone, Default)]
pub struct CaseExecutionRecord {
    pub info: CaseExecution,
    pub case_definition_key: String,
    pub variables: Vec<(String, TypedValue)>,
}

/// A message-event subscription held by one execution.
#[derive(Debug, Clone, Default)]
pub struct MessageSubscription {
    pub message_name: String,
    pub execution_id: String,
    pub process_instance_id: String,
    pub tenant_id: Option<String>,
}

#[derive(Default)]
struct Store {
    process_instances: Vec<ProcessInstanceRecord>,
    executions: Vec<ExecutionRecord>,
    case_instances: Vec<CaseInstanceRecord>,
    case_executions: Vec<CaseExecutionRecord>,
    subscriptions: Vec<MessageSubscription>,
    tasks: HashMap<String, Vec<(String, TypedValue)>>,
}

#[derive(Clone, Default)]
pub struct MemoryEngine {
    store: Arc<Mutex<Store>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_process_instance(&self, record: ProcessInstanceRecord) {
        lock(&self.store).process_instances.push(record);
    }

    pub fn add_execution(&self, record: ExecutionRecord) {
        lock(&self.store).executions.push(record);
    }

    pub fn add_case_instance(&self, record: CaseInstanceRecord) {
        lock(&self.store).case_instances.push(record);
    }

    pub fn add_case_execution(&self, record: CaseExecutionRecord) {
        lock(&self.store).case_executions.push(record);
    }

    pub fn add_subscription(&self, subscription: MessageSubscription) {
        lock(&self.store).subscriptions.push(subscription);
    }

    pub fn add_task(&self, task_id: &str) {
        lock(&self.store).tasks.insert(task_id.to_string(), Vec::new());
    }

    /// Current variables of a task, for inspection in tests.
    pub fn task_variables(&self, task_id: &str) -> Vec<(String, TypedValue)> {
        lock(&self.store).tasks.get(task_id).cloned().unwrap_or_default()
    }

    /// Current variables of a process instance, for inspection in tests.
    pub fn process_instance_variables(&self, id: &str) -> Vec<(String, TypedValue)> {
        lock(&self.store)
            .process_instances
            .iter()
            .find(|r| r.info.id == id)
            .map(|r| r.variables.clone())
            .unwrap_or_default()
    }

    /// Current activity ids of a process instance, for inspection in tests.
    pub fn process_instance_activities(&self, id: &str) -> Vec<String> {
        lock(&self.store)
            .process_instances
            .iter()
            .find(|r| r.info.id == id)
            .map(|r| r.activity_ids.clone())
            .unwrap_or_default()
    }
}

fn lock(store: &Arc<Mutex<Store>>) -> MutexGuard<'_, Store> {
    store.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// value matching

fn text_eq(a: &str, b: &str, ignore_case: bool) -> bool {
    if ignore_case { a.eq_ignore_ascii_case(b) } else { a == b }
}

/// Compare two values within the same family. Cross-family comparisons have
/// no defined ordering and match nothing.
fn compare_values(a: &TypedValue, b: &TypedValue, ignore_case: bool) -> Option<Ordering> {
    // A textual mini-language value carries no type; it adopts the family of
    // the typed operand. Unparseable text stays a cross-family mismatch.
    if let TypedValue::Untyped(serde_json::Value::String(raw)) = a {
        if let Some(coerced) = coerce_untyped_text(raw, b) {
            return compare_values(&coerced, b, ignore_case);
        }
    }
    if let TypedValue::Untyped(serde_json::Value::String(raw)) = b {
        if let Some(coerced) = coerce_untyped_text(raw, a) {
            return compare_values(a, &coerced, ignore_case);
        }
    }
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (TypedValue::String(x), TypedValue::String(y)) => {
            if ignore_case {
                Some(x.to_ascii_lowercase().cmp(&y.to_ascii_lowercase()))
            } else {
                Some(x.cmp(y))
            }
        }
        (TypedValue::Boolean(x), TypedValue::Boolean(y)) => Some(x.cmp(y)),
        (TypedValue::Date(x), TypedValue::Date(y)) => Some(x.cmp(y)),
        (TypedValue::Null, TypedValue::Null) => Some(Ordering::Equal),
        (TypedValue::Untyped(x), TypedValue::Untyped(y)) => {
            if x == y { Some(Ordering::Equal) } else { None }
        }
        (TypedValue::Untyped(serde_json::Value::String(x)), TypedValue::String(y))
        | (TypedValue::String(y), TypedValue::Untyped(serde_json::Value::String(x))) => {
            if ignore_case {
                Some(x.to_ascii_lowercase().cmp(&y.to_ascii_lowercase()))
            } else {
                Some(x.as_str().cmp(y.as_str()))
            }
        }
        _ => None,
    }
}

fn coerce_untyped_text(raw: &str, other: &TypedValue) -> Option<TypedValue> {
    let tag = match other {
        TypedValue::Integer(_)
        | TypedValue::Short(_)
        | TypedValue::Long(_)
        | TypedValue::Double(_) => "Double",
        TypedValue::Boolean(_) => "Boolean",
        TypedValue::Date(_) => "Date",
        _ => return None,
    };
    TypedValue::convert(&serde_json::Value::String(raw.to_string()), Some(tag), None).ok()
}

fn as_number(value: &TypedValue) -> Option<f64> {
    match value {
        TypedValue::Integer(v) => Some(f64::from(*v)),
        TypedValue::Short(v) => Some(f64::from(*v)),
        TypedValue::Long(v) => Some(*v as f64),
        TypedValue::Double(v) => Some(*v),
        TypedValue::Untyped(serde_json::Value::Number(n)) => n.as_f64(),
        _ => None,
    }
}

/// `%` matches any run of characters, everything else is literal.
fn like_match(text: &str, pattern: &str, ignore_case: bool) -> bool {
    let (text, pattern) = if ignore_case {
        (text.to_ascii_lowercase(), pattern.to_ascii_lowercase())
    } else {
        (text.to_string(), pattern.to_string())
    };
    let segments: Vec<&str> = pattern.split('%').collect();
    let last = segments.len() - 1;
    let mut rest = text.as_str();
    for (i, segment) in segments.iter().enumerate() {
        if i == 0 {
            let Some(stripped) = rest.strip_prefix(segment) else {
                return false;
            };
            rest = stripped;
        } else if i == last {
            if !rest.ends_with(segment) {
                return false;
            }
        } else {
            let Some(pos) = rest.find(segment) else {
                return false;
            };
            rest = &rest[pos + segment.len()..];
        }
    }
    // A pattern without any `%` must consume the whole text.
    segments.len() > 1 || rest.is_empty()
}

#[derive(Debug, Clone)]
struct VarPredicate {
    name: String,
    operator: Operator,
    value: TypedValue,
}

fn variables_satisfy(
    variables: &[(String, TypedValue)],
    predicates: &[VarPredicate],
    names_ignore_case: bool,
    values_ignore_case: bool,
) -> bool {
    predicates.iter().all(|p| {
        variables
            .iter()
            .filter(|(name, _)| text_eq(name, &p.name, names_ignore_case))
            .any(|(_, value)| match p.operator {
                Operator::Eq => {
                    compare_values(value, &p.value, values_ignore_case) == Some(Ordering::Equal)
                }
                Operator::Neq => {
                    compare_values(value, &p.value, values_ignore_case)
                        .is_some_and(|o| o != Ordering::Equal)
                }
                Operator::Gt => {
                    compare_values(value, &p.value, values_ignore_case) == Some(Ordering::Greater)
                }
                Operator::Gteq => compare_values(value, &p.value, values_ignore_case)
                    .is_some_and(|o| o != Ordering::Less),
                Operator::Lt => {
                    compare_values(value, &p.value, values_ignore_case) == Some(Ordering::Less)
                }
                Operator::Lteq => compare_values(value, &p.value, values_ignore_case)
                    .is_some_and(|o| o != Ordering::Greater),
                Operator::Like => like_match(&value.as_text(), &p.value.as_text(), values_ignore_case),
            })
    })
}

fn matches_tenant(
    tenant_id: Option<&String>,
    tenant_ids: Option<&Vec<String>>,
    without_tenant: bool,
) -> bool {
    if without_tenant {
        return tenant_id.is_none();
    }
    match tenant_ids {
        Some(ids) => tenant_id.is_some_and(|t| ids.contains(t)),
        None => true,
    }
}

fn page<T>(items: Vec<T>, first: i32, max: i32) -> Vec<T> {
    items
        .into_iter()
        .skip(usize::try_from(first.max(0)).unwrap_or(0))
        .take(usize::try_from(max.max(0)).unwrap_or(0))
        .collect()
}

fn apply_sort<T, F: Copy>(
    items: &mut [T],
    sorting: &[(F, SortDirection)],
    key: impl Fn(&T, F) -> Option<String>,
) {
    items.sort_by(|a, b| {
        for (field, direction) in sorting {
            let ord = key(a, *field).cmp(&key(b, *field));
            let ord = match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

/// `order_by` opens an instruction with an ascending default, the following
/// direction call overrides it.
fn push_order<F>(sorting: &mut Vec<(F, SortDirection)>, field: F) {
    sorting.push((field, SortDirection::Asc));
}

fn set_last_direction<F>(sorting: &mut [(F, SortDirection)], direction: SortDirection) {
    if let Some(last) = sorting.last_mut() {
        last.1 = direction;
    }
}

// ---------------------------------------------------------------------------
// process instance query

#[derive(Default)]
struct MemoryProcessInstanceQuery {
    store: Arc<Mutex<Store>>,
    ids: Option<Vec<String>>,
    definition_key: Option<String>,
    definition_id: Option<String>,
    deployment_id: Option<String>,
    business_key: Option<String>,
    business_key_like: Option<String>,
    case_instance_id: Option<String>,
    super_process_instance_id: Option<String>,
    sub_process_instance_id: Option<String>,
    active: bool,
    suspended: bool,
    with_incident: bool,
    tenant_ids: Option<Vec<String>>,
    without_tenant: bool,
    activity_ids: Option<Vec<String>>,
    names_ignore_case: bool,
    values_ignore_case: bool,
    predicates: Vec<VarPredicate>,
    sorting: Vec<(ProcessInstanceSortField, SortDirection)>,
}

impl MemoryProcessInstanceQuery {
    fn fetch(&self) -> Vec<ProcessInstance> {
        let store = lock(&self.store);
        // sub_process_instance_id(x) selects the instance that is x's parent.
        let parent_of_sub = self.sub_process_instance_id.as_ref().and_then(|sub| {
            store
                .process_instances
                .iter()
                .find(|r| r.info.id == *sub)
                .and_then(|r| r.super_process_instance_id.clone())
        });
        let mut records: Vec<&ProcessInstanceRecord> = store
            .process_instances
            .iter()
            .filter(|r| self.matches(r, parent_of_sub.as_deref()))
            .collect();
        apply_sort(&mut records, &self.sorting, |r, field| match field {
            ProcessInstanceSortField::InstanceId => Some(r.info.id.clone()),
            ProcessInstanceSortField::DefinitionKey => Some(r.info.definition_key.clone()),
            ProcessInstanceSortField::DefinitionId => Some(r.info.definition_id.clone()),
            ProcessInstanceSortField::TenantId => r.info.tenant_id.clone(),
            ProcessInstanceSortField::BusinessKey => r.info.business_key.clone(),
        });
        records.into_iter().map(|r| r.info.clone()).collect()
    }

    fn matches(&self, r: &ProcessInstanceRecord, parent_of_sub: Option<&str>) -> bool {
        if let Some(ids) = &self.ids
            && !ids.contains(&r.info.id)
        {
            return false;
        }
        if let Some(key) = &self.definition_key
            && r.info.definition_key != *key
        {
            return false;
        }
        if let Some(id) = &self.definition_id
            && r.info.definition_id != *id
        {
            return false;
        }
        if let Some(id) = &self.deployment_id
            && r.deployment_id.as_ref() != Some(id)
        {
            return false;
        }
        if let Some(key) = &self.business_key
            && r.info.business_key.as_ref() != Some(key)
        {
            return false;
        }
        if let Some(pattern) = &self.business_key_like
            && !r
                .info
                .business_key
                .as_ref()
                .is_some_and(|k| like_match(k, pattern, false))
        {
            return false;
        }
        if let Some(id) = &self.case_instance_id
            && r.info.case_instance_id.as_ref() != Some(id)
        {
            return false;
        }
        if let Some(id) = &self.super_process_instance_id
            && r.super_process_instance_id.as_ref() != Some(id)
        {
            return false;
        }
        if self.sub_process_instance_id.is_some() && parent_of_sub != Some(r.info.id.as_str()) {
            return false;
        }
        if self.active && (r.info.suspended || r.info.ended) {
            return false;
        }
        if self.suspended && !r.info.suspended {
            return false;
        }
        if self.with_incident && !r.with_incident {
            return false;
        }
        if !matches_tenant(r.info.tenant_id.as_ref(), self.tenant_ids.as_ref(), self.without_tenant)
        {
            return false;
        }
        if let Some(activity_ids) = &self.activity_ids
            && !activity_ids.iter().any(|a| r.activity_ids.contains(a))
        {
            return false;
        }
        variables_satisfy(
            &r.variables,
            &self.predicates,
            self.names_ignore_case,
            self.values_ignore_case,
        )
    }
}

impl VariablePredicates for MemoryProcessInstanceQuery {
    fn match_variable_names_ignore_case(&mut self) {
        self.names_ignore_case = true;
    }
    fn match_variable_values_ignore_case(&mut self) {
        self.values_ignore_case = true;
    }
    fn variable_value_equals(&mut self, name: &str, value: TypedValue) {
        self.predicates.push(VarPredicate { name: name.to_string(), operator: Operator::Eq, value });
    }
    fn variable_value_not_equals(&mut self, name: &str, value: TypedValue) {
        self.predicates.push(VarPredicate { name: name.to_string(), operator: Operator::Neq, value });
    }
    fn variable_value_greater_than(&mut self, name: &str, value: TypedValue) {
        self.predicates.push(VarPredicate { name: name.to_string(), operator: Operator::Gt, value });
    }
    fn variable_value_greater_than_or_equal(&mut self, name: &str, value: TypedValue) {
        self.predicates.push(VarPredicate { name: name.to_string(), operator: Operator::Gteq, value });
    }
    fn variable_value_less_than(&mut self, name: &str, value: TypedValue) {
        self.predicates.push(VarPredicate { name: name.to_string(), operator: Operator::Lt, value });
    }
    fn variable_value_less_than_or_equal(&mut self, name: &str, value: TypedValue) {
        self.predicates.push(VarPredicate { name: name.to_string(), operator: Operator::Lteq, value });
    }
    fn variable_value_like(&mut self, name: &str, value: String) {
        self.predicates.push(VarPredicate {
            name: name.to_string(),
            operator: Operator::Like,
            value: TypedValue::String(value),
        });
    }
}

impl SortSink for MemoryProcessInstanceQuery {
    type Field = ProcessInstanceSortField;
    fn order_by(&mut self, field: Self::Field) {
        push_order(&mut self.sorting, field);
    }
    fn asc(&mut self) {
        set_last_direction(&mut self.sorting, SortDirection::Asc);
    }
    fn desc(&mut self) {
        set_last_direction(&mut self.sorting, SortDirection::Desc);
    }
}

impl ExecutableQuery for MemoryProcessInstanceQuery {
    type Item = ProcessInstance;
    fn list(&mut self) -> Result<Vec<ProcessInstance>, EngineError> {
        Ok(self.fetch())
    }
    fn list_page(&mut self, first: i32, max: i32) -> Result<Vec<ProcessInstance>, EngineError> {
        Ok(page(self.fetch(), first, max))
    }
    fn count(&mut self) -> Result<u64, EngineError> {
        Ok(self.fetch().len() as u64)
    }
}

impl ProcessInstanceQuery for MemoryProcessInstanceQuery {
    fn process_instance_ids(&mut self, ids: Vec<String>) {
        self.ids = Some(ids);
    }
    fn process_definition_key(&mut self, key: &str) {
        self.definition_key = Some(key.to_string());
    }
    fn process_definition_id(&mut self, id: &str) {
        self.definition_id = Some(id.to_string());
    }
    fn deployment_id(&mut self, id: &str) {
        self.deployment_id = Some(id.to_string());
    }
    fn business_key(&mut self, key: &str) {
        self.business_key = Some(key.to_string());
    }
    fn business_key_like(&mut self, key: &str) {
        self.business_key_like = Some(key.to_string());
    }
    fn case_instance_id(&mut self, id: &str) {
        self.case_instance_id = Some(id.to_string());
    }
    fn super_process_instance_id(&mut self, id: &str) {
        self.super_process_instance_id = Some(id.to_string());
    }
    fn sub_process_instance_id(&mut self, id: &str) {
        self.sub_process_instance_id = Some(id.to_string());
    }
    fn active(&mut self) {
        self.active = true;
    }
    fn suspended(&mut self) {
        self.suspended = true;
    }
    fn with_incident(&mut self) {
        self.with_incident = true;
    }
    fn tenant_id_in(&mut self, tenant_ids: Vec<String>) {
        self.tenant_ids = Some(tenant_ids);
    }
    fn without_tenant_id(&mut self) {
        self.without_tenant = true;
    }
    fn activity_id_in(&mut self, activity_ids: Vec<String>) {
        self.activity_ids = Some(activity_ids);
    }
}

// ---------------------------------------------------------------------------
// execution query

#[derive(Default)]
struct MemoryExecutionQuery {
    store: Arc<Mutex<Store>>,
    definition_key: Option<String>,
    definition_id: Option<String>,
    process_instance_id: Option<String>,
    activity_id: Option<String>,
    business_key: Option<String>,
    active: bool,
    suspended: bool,
    tenant_ids: Option<Vec<String>>,
    without_tenant: bool,
    names_ignore_case: bool,
    values_ignore_case: bool,
    predicates: Vec<VarPredicate>,
    process_predicates: Vec<VarPredicate>,
    sorting: Vec<(ExecutionSortField, SortDirection)>,
}

impl MemoryExecutionQuery {
    fn fetch(&self) -> Vec<Execution> {
        let store = lock(&self.store);
        let mut records: Vec<&ExecutionRecord> = store
            .executions
            .iter()
            .filter(|r| self.matches(r, &store))
            .collect();
        apply_sort(&mut records, &self.sorting, |r, field| match field {
            ExecutionSortField::InstanceId => Some(r.info.process_instance_id.clone()),
            ExecutionSortField::DefinitionKey => Some(r.process_definition_key.clone()),
            ExecutionSortField::DefinitionId => Some(r.process_definition_id.clone()),
            ExecutionSortField::TenantId => r.info.tenant_id.clone(),
        });
        records.into_iter().map(|r| r.info.clone()).collect()
    }

    fn matches(&self, r: &ExecutionRecord, store: &Store) -> bool {
        if let Some(key) = &self.definition_key
            && r.process_definition_key != *key
        {
            return false;
        }
        if let Some(id) = &self.definition_id
            && r.process_definition_id != *id
        {
            return false;
        }
        if let Some(id) = &self.process_instance_id
            && r.info.process_instance_id != *id
        {
            return false;
        }
        if let Some(id) = &self.activity_id
            && r.activity_id.as_ref() != Some(id)
        {
            return false;
        }
        if let Some(key) = &self.business_key
            && r.business_key.as_ref() != Some(key)
        {
            return false;
        }
        if self.active && (r.suspended || r.info.ended) {
            return false;
        }
        if self.suspended && !r.suspended {
            return false;
        }
        if !matches_tenant(r.info.tenant_id.as_ref(), self.tenant_ids.as_ref(), self.without_tenant)
        {
            return false;
        }
        if !variables_satisfy(
            &r.variables,
            &self.predicates,
            self.names_ignore_case,
            self.values_ignore_case,
        ) {
            return false;
        }
        // Process-variable predicates run against the owning instance's scope.
        let instance_variables = store
            .process_instances
            .iter()
            .find(|p| p.info.id == r.info.process_instance_id)
            .map(|p| p.variables.as_slice())
            .unwrap_or_default();
        variables_satisfy(
            instance_variables,
            &self.process_predicates,
            self.names_ignore_case,
            self.values_ignore_case,
        )
    }
}

impl VariablePredicates for MemoryExecutionQuery {
    fn match_variable_names_ignore_case(&mut self) {
        self.names_ignore_case = true;
    }
    fn match_variable_values_ignore_case(&mut self) {
        self.values_ignore_case = true;
    }
    fn variable_value_equals(&mut self, name: &str, value: TypedValue) {
        self.predicates.push(VarPredicate { name: name.to_string(), operator: Operator::Eq, value });
    }
    fn variable_value_not_equals(&mut self, name: &str, value: TypedValue) {
        self.predicates.push(VarPredicate { name: name.to_string(), operator: Operator::Neq, value });
    }
    fn variable_value_greater_than(&mut self, name: &str, value: TypedValue) {
        self.predicates.push(VarPredicate { name: name.to_string(), operator: Operator::Gt, value });
    }
    fn variable_value_greater_than_or_equal(&mut self, name: &str, value: TypedValue) {
        self.predicates.push(VarPredicate { name: name.to_string(), operator: Operator::Gteq, value });
    }
    fn variable_value_less_than(&mut self, name: &str, value: TypedValue) {
        self.predicates.push(VarPredicate { name: name.to_string(), operator: Operator::Lt, value });
    }
    fn variable_value_less_than_or_equal(&mut self, name: &str, value: TypedValue) {
        self.predicates.push(VarPredicate { name: name.to_string(), operator: Operator::Lteq, value });
    }
    fn variable_value_like(&mut self, name: &str, value: String) {
        self.predicates.push(VarPredicate {
            name: name.to_string(),
            operator: Operator::Like,
            value: TypedValue::String(value),
        });
    }
}

impl ProcessVariablePredicates for MemoryExecutionQuery {
    fn process_variable_value_equals(&mut self, name: &str, value: TypedValue) {
        self.process_predicates
            .push(VarPredicate { name: name.to_string(), operator: Operator::Eq, value });
    }
    fn process_variable_value_not_equals(&mut self, name: &str, value: TypedValue) {
        self.process_predicates
            .push(VarPredicate { name: name.to_string(), operator: Operator::Neq, value });
    }
}

impl SortSink for MemoryExecutionQuery {
    type Field = ExecutionSortField;
    fn order_by(&mut self, field: Self::Field) {
        push_order(&mut self.sorting, field);
    }
    fn asc(&mut self) {
        set_last_direction(&mut self.sorting, SortDirection::Asc);
    }
    fn desc(&mut self) {
        set_last_direction(&mut self.sorting, SortDirection::Desc);
    }
}

impl ExecutableQuery for MemoryExecutionQuery {
    type Item = Execution;
    fn list(&mut self) -> Result<Vec<Execution>, EngineError> {
        Ok(self.fetch())
    }
    fn list_page(&mut self, first: i32, max: i32) -> Result<Vec<Execution>, EngineError> {
        Ok(page(self.fetch(), first, max))
    }
    fn count(&mut self) -> Result<u64, EngineError> {
        Ok(self.fetch().len() as u64)
    }
}

impl ExecutionQuery for MemoryExecutionQuery {
    fn process_definition_key(&mut self, key: &str) {
        self.definition_key = Some(key.to_string());
    }
    fn process_definition_id(&mut self, id: &str) {
        self.definition_id = Some(id.to_string());
    }
    fn process_instance_id(&mut self, id: &str) {
        self.process_instance_id = Some(id.to_string());
    }
    fn activity_id(&mut self, id: &str) {
        self.activity_id = Some(id.to_string());
    }
    fn business_key(&mut self, key: &str) {
        self.business_key = Some(key.to_string());
    }
    fn active(&mut self) {
        self.active = true;
    }
    fn suspended(&mut self) {
        self.suspended = true;
    }
    fn tenant_id_in(&mut self, tenant_ids: Vec<String>) {
        self.tenant_ids = Some(tenant_ids);
    }
    fn without_tenant_id(&mut self) {
        self.without_tenant = true;
    }
}

// ---------------------------------------------------------------------------
// case instance query

#[derive(Default)]
struct MemoryCaseInstanceQuery {
    store: Arc<Mutex<Store>>,
    case_instance_id: Option<String>,
    definition_key: Option<String>,
    definition_id: Option<String>,
    business_key: Option<String>,
    active: bool,
    completed: bool,
    tenant_ids: Option<Vec<String>>,
    without_tenant: bool,
    names_ignore_case: bool,
    values_ignore_case: bool,
    predicates: Vec<VarPredicate>,
    sorting: Vec<(CaseInstanceSortField, SortDirection)>,
}

impl MemoryCaseInstanceQuery {
    fn fetch(&self) -> Vec<CaseInstance> {
        let store = lock(&self.store);
        let mut records: Vec<&CaseInstanceRecord> =
            store.case_instances.iter().filter(|r| self.matches(r)).collect();
        apply_sort(&mut records, &self.sorting, |r, field| match field {
            CaseInstanceSortField::CaseInstanceId => Some(r.info.id.clone()),
            CaseInstanceSortField::CaseDefinitionId => Some(r.info.case_definition_id.clone()),
            CaseInstanceSortField::TenantId => r.info.tenant_id.clone(),
        });
        records.into_iter().map(|r| r.info.clone()).collect()
    }

    fn matches(&self, r: &CaseInstanceRecord) -> bool {
        if let Some(id) = &self.case_instance_id
            && r.info.id != *id
        {
            return false;
        }
        if let Some(key) = &self.definition_key
            && r.case_definition_key != *key
        {
            return false;
        }
        if let Some(id) = &self.definition_id
            && r.info.case_definition_id != *id
        {
            return false;
        }
        if let Some(key) = &self.business_key
            && r.info.business_key.as_ref() != Some(key)
        {
            return false;
        }
        if self.active && !r.info.active {
            return false;
        }
        if self.completed && !r.info.completed {
            return false;
        }
        if !matches_tenant(r.info.tenant_id.as_ref(), self.tenant_ids.as_ref(), self.without_tenant)
        {
            return false;
        }
        variables_satisfy(
            &r.variables,
            &self.predicates,
            self.names_ignore_case,
            self.values_ignore_case,
        )
    }
}

impl VariablePredicates for MemoryCaseInstanceQuery {
    fn match_variable_names_ignore_case(&mut self) {
        self.names_ignore_case = true;
    }
    fn match_variable_values_ignore_case(&mut self) {
        self.values_ignore_case = true;
    }
    fn variable_value_equals(&mut self, name: &str, value: TypedValue) {
        self.predicates.push(VarPredicate { name: name.to_string(), operator: Operator::Eq, value });
    }
    fn variable_value_not_equals(&mut self, name: &str, value: TypedValue) {
        self.predicates.push(VarPredicate { name: name.to_string(), operator: Operator::Neq, value });
    }
    fn variable_value_greater_than(&mut self, name: &str, value: TypedValue) {
        self.predicates.push(VarPredicate { name: name.to_string(), operator: Operator::Gt, value });
    }
    fn variable_value_greater_than_or_equal(&mut self, name: &str, value: TypedValue) {
        self.predicates.push(VarPredicate { name: name.to_string(), operator: Operator::Gteq, value });
    }
    fn variable_value_less_than(&mut self, name: &str, value: TypedValue) {
        self.predicates.push(VarPredicate { name: name.to_string(), operator: Operator::Lt, value });
    }
    fn variable_value_less_than_or_equal(&mut self, name: &str, value: TypedValue) {
        self.predicates.push(VarPredicate { name: name.to_string(), operator: Operator::Lteq, value });
    }
    fn variable_value_like(&mut self, name: &str, value: String) {
        self.predicates.push(VarPredicate {
            name: name.to_string(),
            operator: Operator::Like,
            value: TypedValue::String(value),
        });
    }
}

impl SortSink for MemoryCaseInstanceQuery {
    type Field = CaseInstanceSortField;
    fn order_by(&mut self, field: Self::Field) {
        push_order(&mut self.sorting, field);
    }
    fn asc(&mut self) {
        set_last_direction(&mut self.sorting, SortDirection::Asc);
    }
    fn desc(&mut self) {
        set_last_direction(&mut self.sorting, SortDirection::Desc);
    }
}

impl ExecutableQuery for MemoryCaseInstanceQuery {
    type Item = CaseInstance;
    fn list(&mut self) -> Result<Vec<CaseInstance>, EngineError> {
        Ok(self.fetch())
    }
    fn list_page(&mut self, first: i32, max: i32) -> Result<Vec<CaseInstance>, EngineError> {
        Ok(page(self.fetch(), first, max))
    }
    fn count(&mut self) -> Result<u64, EngineError> {
        Ok(self.fetch().len() as u64)
    }
}

impl CaseInstanceQuery for MemoryCaseInstanceQuery {
    fn case_instance_id(&mut self, id: &str) {
        self.case_instance_id = Some(id.to_string());
    }
    fn case_definition_key(&mut self, key: &str) {
        self.definition_key = Some(key.to_string());
    }
    fn case_definition_id(&mut self, id: &str) {
        self.definition_id = Some(id.to_string());
    }
    fn business_key(&mut self, key: &str) {
        self.business_key = Some(key.to_string());
    }
    fn active(&mut self) {
        self.active = true;
    }
    fn completed(&mut self) {
        self.completed = true;
    }
    fn tenant_id_in(&mut self, tenant_ids: Vec<String>) {
        self.tenant_ids = Some(tenant_ids);
    }
    fn without_tenant_id(&mut self) {
        self.without_tenant = true;
    }
}

// ---------------------------------------------------------------------------
// case execution query

#[derive(Default)]
struct MemoryCaseExecutionQuery {
    store: Arc<Mutex<Store>>,
    case_execution_id: Option<String>,
    case_instance_id: Option<String>,
    definition_key: Option<String>,
    definition_id: Option<String>,
    activity_id: Option<String>,
    active: bool,
    enabled: bool,
    disabled: bool,
    tenant_ids: Option<Vec<String>>,
    without_tenant: bool,
    names_ignore_case: bool,
    values_ignore_case: bool,
    predicates: Vec<VarPredicate>,
    case_predicates: Vec<VarPredicate>,
    sorting: Vec<(CaseExecutionSortField, SortDirection)>,
}

impl MemoryCaseExecutionQuery {
    fn fetch(&self) -> Vec<CaseExecution> {
        let store = lock(&self.store);
        let mut records: Vec<&CaseExecutionRecord> = store
            .case_executions
            .iter()
            .filter(|r| self.matches(r, &store))
            .collect();
        apply_sort(&mut records, &self.sorting, |r, field| match field {
            CaseExecutionSortField::CaseExecutionId => Some(r.info.id.clone()),
            CaseExecutionSortField::CaseDefinitionKey => Some(r.case_definition_key.clone()),
            CaseExecutionSortField::CaseDefinitionId => Some(r.info.case_definition_id.clone()),
            CaseExecutionSortField::TenantId => r.info.tenant_id.clone(),
        });
        records.into_iter().map(|r| r.info.clone()).collect()
    }

    fn matches(&self, r: &CaseExecutionRecord, store: &Store) -> bool {
        if let Some(id) = &self.case_execution_id
            && r.info.id != *id
        {
            return false;
        }
        if let Some(id) = &self.case_instance_id
            && r.info.case_instance_id != *id
        {
            return false;
        }
        if let Some(key) = &self.definition_key
            && r.case_definition_key != *key
        {
            return false;
        }
        if let Some(id) = &self.definition_id
            && r.info.case_definition_id != *id
        {
            return false;
        }
        if let Some(id) = &self.activity_id
            && r.info.activity_id.as_ref() != Some(id)
        {
            return false;
        }
        if self.active && !r.info.active {
            return false;
        }
        if self.enabled && !r.info.enabled {
            return false;
        }
        if self.disabled && !r.info.disabled {
            return false;
        }
        if !matches_tenant(r.info.tenant_id.as_ref(), self.tenant_ids.as_ref(), self.without_tenant)
        {
            return false;
        }
        if !variables_satisfy(
            &r.variables,
            &self.predicates,
            self.names_ignore_case,
            self.values_ignore_case,
        ) {
            return false;
        }
        // Case-instance-variable predicates run against the owning case
        // instance's scope.
        let case_variables = store
            .case_instances
            .iter()
            .find(|c| c.info.id == r.info.case_instance_id)
            .map(|c| c.variables.as_slice())
            .unwrap_or_default();
        variables_satisfy(
            case_variables,
            &self.case_predicates,
            self.names_ignore_case,
            self.values_ignore_case,
        )
    }
}

impl VariablePredicates for MemoryCaseExecutionQuery {
    fn match_variable_names_ignore_case(&mut self) {
        self.names_ignore_case = true;
    }
    fn match_variable_values_ignore_case(&mut self) {
        self.values_ignore_case = true;
    }
    fn variable_value_equals(&mut self, name: &str, value: TypedValue) {
        self.predicates.push(VarPredicate { name: name.to_string(), operator: Operator::Eq, value });
    }
    fn variable_value_not_equals(&mut self, name: &str, value: TypedValue) {
        self.predicates.push(VarPredicate { name: name.to_string(), operator: Operator::Neq, value });
    }
    fn variable_value_greater_than(&mut self, name: &str, value: TypedValue) {
        self.predicates.push(VarPredicate { name: name.to_string(), operator: Operator::Gt, value });
    }
    fn variable_value_greater_than_or_equal(&mut self, name: &str, value: TypedValue) {
        self.predicates.push(VarPredicate { name: name.to_string(), operator: Operator::Gteq, value });
    }
    fn variable_value_less_than(&mut self, name: &str, value: TypedValue) {
        self.predicates.push(VarPredicate { name: name.to_string(), operator: Operator::Lt, value });
    }
    fn variable_value_less_than_or_equal(&mut self, name: &str, value: TypedValue) {
        self.predicates.push(VarPredicate { name: name.to_string(), operator: Operator::Lteq, value });
    }
    fn variable_value_like(&mut self, name: &str, value: String) {
        self.predicates.push(VarPredicate {
            name: name.to_string(),
            operator: Operator::Like,
            value: TypedValue::String(value),
        });
    }
}

impl CaseInstanceVariablePredicates for MemoryCaseExecutionQuery {
    fn case_instance_variable_value_equals(&mut self, name: &str, value: TypedValue) {
        self.case_predicates
            .push(VarPredicate { name: name.to_string(), operator: Operator::Eq, value });
    }
    fn case_instance_variable_value_not_equals(&mut self, name: &str, value: TypedValue) {
        self.case_predicates
            .push(VarPredicate { name: name.to_string(), operator: Operator::Neq, value });
    }
    fn case_instance_variable_value_greater_than(&mut self, name: &str, value: TypedValue) {
        self.case_predicates
            .push(VarPredicate { name: name.to_string(), operator: Operator::Gt, value });
    }
    fn case_instance_variable_value_greater_than_or_equal(&mut self, name: &str, value: TypedValue) {
        self.case_predicates
            .push(VarPredicate { name: name.to_string(), operator: Operator::Gteq, value });
    }
    fn case_instance_variable_value_less_than(&mut self, name: &str, value: TypedValue) {
        self.case_predicates
            .push(VarPredicate { name: name.to_string(), operator: Operator::Lt, value });
    }
    fn case_instance_variable_value_less_than_or_equal(&mut self, name: &str, value: TypedValue) {
        self.case_predicates
            .push(VarPredicate { name: name.to_string(), operator: Operator::Lteq, value });
    }
    fn case_instance_variable_value_like(&mut self, name: &str, value: String) {
        self.case_predicates.push(VarPredicate {
            name: name.to_string(),
            operator: Operator::Like,
            value: TypedValue::String(value),
        });
    }
}

impl SortSink for MemoryCaseExecutionQuery {
    type Field = CaseExecutionSortField;
    fn order_by(&mut self, field: Self::Field) {
        push_order(&mut self.sorting, field);
    }
    fn asc(&mut self) {
        set_last_direction(&mut self.sorting, SortDirection::Asc);
    }
    fn desc(&mut self) {
        set_last_direction(&mut self.sorting, SortDirection::Desc);
    }
}

impl ExecutableQuery for MemoryCaseExecutionQuery {
    type Item = CaseExecution;
    fn list(&mut self) -> Result<Vec<CaseExecution>, EngineError> {
        Ok(self.fetch())
    }
    fn list_page(&mut self, first: i32, max: i32) -> Result<Vec<CaseExecution>, EngineError> {
        Ok(page(self.fetch(), first, max))
    }
    fn count(&mut self) -> Result<u64, EngineError> {
        Ok(self.fetch().len() as u64)
    }
}

impl CaseExecutionQuery for MemoryCaseExecutionQuery {
    fn case_execution_id(&mut self, id: &str) {
        self.case_execution_id = Some(id.to_string());
    }
    fn case_instance_id(&mut self, id: &str) {
        self.case_instance_id = Some(id.to_string());
    }
    fn case_definition_key(&mut self, key: &str) {
        self.definition_key = Some(key.to_string());
    }
    fn case_definition_id(&mut self, id: &str) {
        self.definition_id = Some(id.to_string());
    }
    fn activity_id(&mut self, id: &str) {
        self.activity_id = Some(id.to_string());
    }
    fn active(&mut self) {
        self.active = true;
    }
    fn enabled(&mut self) {
        self.enabled = true;
    }
    fn disabled(&mut self) {
        self.disabled = true;
    }
    fn tenant_id_in(&mut self, tenant_ids: Vec<String>) {
        self.tenant_ids = Some(tenant_ids);
    }
    fn without_tenant_id(&mut self) {
        self.without_tenant = true;
    }
}

// ---------------------------------------------------------------------------
// modification builder

enum ModificationAction {
    CancelActivity(String),
    StartActivity(String),
    SetVariable { name: String, value: TypedValue },
}

struct MemoryModificationBuilder {
    store: Arc<Mutex<Store>>,
    process_instance_id: String,
    actions: Vec<ModificationAction>,
}

impl MemoryModificationBuilder {
    fn apply(&mut self) -> Result<(), EngineError> {
        let mut store = lock(&self.store);
        let record = store
            .process_instances
            .iter_mut()
            .find(|r| r.info.id == self.process_instance_id)
            .ok_or_else(|| {
                EngineError::NotFound(format!(
                    "Process instance '{}' does not exist",
                    self.process_instance_id
                ))
            })?;
        for action in self.actions.drain(..) {
            match action {
                ModificationAction::CancelActivity(activity_id) => {
                    record.activity_ids.retain(|a| *a != activity_id);
                }
                ModificationAction::StartActivity(activity_id) => {
                    record.activity_ids.push(activity_id);
                }
                ModificationAction::SetVariable { name, value } => {
                    set_variable(&mut record.variables, name, value);
                }
            }
        }
        Ok(())
    }
}

fn set_variable(variables: &mut Vec<(String, TypedValue)>, name: String, value: TypedValue) {
    match variables.iter_mut().find(|(n, _)| *n == name) {
        Some(entry) => entry.1 = value,
        None => variables.push((name, value)),
    }
}

impl ModificationBuilder for MemoryModificationBuilder {
    fn cancel_all_for_activity(&mut self, activity_id: &str) {
        self.actions.push(ModificationAction::CancelActivity(activity_id.to_string()));
    }
    fn cancel_all_for_activity_canceling_current(&mut self, activity_id: &str) {
        self.actions.push(ModificationAction::CancelActivity(activity_id.to_string()));
    }
    fn start_before_activity(&mut self, activity_id: &str) {
        self.actions.push(ModificationAction::StartActivity(activity_id.to_string()));
    }
    fn start_before_activity_with_ancestor(&mut self, activity_id: &str, _ancestor: &str) {
        self.actions.push(ModificationAction::StartActivity(activity_id.to_string()));
    }
    fn start_after_activity(&mut self, activity_id: &str) {
        self.actions.push(ModificationAction::StartActivity(activity_id.to_string()));
    }
    fn start_after_activity_with_ancestor(&mut self, activity_id: &str, _ancestor: &str) {
        self.actions.push(ModificationAction::StartActivity(activity_id.to_string()));
    }
    fn start_transition(&mut self, transition_id: &str) {
        self.actions.push(ModificationAction::StartActivity(transition_id.to_string()));
    }
    fn start_transition_with_ancestor(&mut self, transition_id: &str, _ancestor: &str) {
        self.actions.push(ModificationAction::StartActivity(transition_id.to_string()));
    }
    fn set_variable(&mut self, name: &str, value: TypedValue) {
        self.actions
            .push(ModificationAction::SetVariable { name: name.to_string(), value });
    }
    fn set_variable_local(&mut self, name: &str, value: TypedValue) {
        self.actions
            .push(ModificationAction::SetVariable { name: name.to_string(), value });
    }
    fn execute(&mut self, _skip_listeners: bool, _skip_io: bool) -> Result<(), EngineError> {
        self.apply()
    }
    fn execute_async(&mut self, _skip_listeners: bool, _skip_io: bool) -> Result<Batch, EngineError> {
        self.apply()?;
        Ok(Batch {
            id: Uuid::new_v4().to_string(),
            batch_type: "instance-modification".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// engine facade

impl ProcessEngine for MemoryEngine {
    fn create_process_instance_query(&self) -> Box<dyn ProcessInstanceQuery> {
        Box::new(MemoryProcessInstanceQuery {
            store: Arc::clone(&self.store),
            ..Default::default()
        })
    }

    fn create_execution_query(&self) -> Box<dyn ExecutionQuery> {
        Box::new(MemoryExecutionQuery { store: Arc::clone(&self.store), ..Default::default() })
    }

    fn create_case_instance_query(&self) -> Box<dyn CaseInstanceQuery> {
        Box::new(MemoryCaseInstanceQuery { store: Arc::clone(&self.store), ..Default::default() })
    }

    fn create_case_execution_query(&self) -> Box<dyn CaseExecutionQuery> {
        Box::new(MemoryCaseExecutionQuery { store: Arc::clone(&self.store), ..Default::default() })
    }

    fn create_modification(&self, process_instance_id: &str) -> Box<dyn ModificationBuilder> {
        Box::new(MemoryModificationBuilder {
            store: Arc::clone(&self.store),
            process_instance_id: process_instance_id.to_string(),
            actions: Vec::new(),
        })
    }

    fn correlate_message(
        &self,
        correlation: &MessageCorrelation,
    ) -> Result<Vec<CorrelationResult>, EngineError> {
        let mut store = lock(&self.store);
        let matches: Vec<MessageSubscription> = store
            .subscriptions
            .iter()
            .filter(|s| subscription_matches(s, correlation, &store))
            .cloned()
            .collect();

        if matches.is_empty() {
            return Err(super::message::no_matching_subscription(&correlation.message_name));
        }
        if !correlation.all && matches.len() > 1 {
            return Err(EngineError::ProcessEngine {
                message: format!(
                    "{} executions subscribe to message '{}'",
                    matches.len(),
                    correlation.message_name
                ),
                code: None,
            });
        }

        for subscription in &matches {
            if let Some(record) = store
                .process_instances
                .iter_mut()
                .find(|r| r.info.id == subscription.process_instance_id)
            {
                for (name, value) in &correlation.process_variables {
                    set_variable(&mut record.variables, name.clone(), value.clone());
                }
            }
            if let Some(record) = store
                .executions
                .iter_mut()
                .find(|r| r.info.id == subscription.execution_id)
            {
                for (name, value) in correlation
                    .process_variables_local
                    .iter()
                    .chain(&correlation.process_variables_to_triggered_scope)
                {
                    set_variable(&mut record.variables, name.clone(), value.clone());
                }
            }
        }

        Ok(matches
            .into_iter()
            .map(|s| CorrelationResult {
                result_type: CorrelationResultType::Execution,
                execution_id: Some(s.execution_id),
                process_instance_id: Some(s.process_instance_id),
            })
            .collect())
    }

    fn set_task_variable(
        &self,
        task_id: &str,
        name: &str,
        value: TypedValue,
    ) -> Result<(), EngineError> {
        let mut store = lock(&self.store);
        let variables = store
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| EngineError::NotFound(format!("task {task_id} doesn't exist")))?;
        set_variable(variables, name.to_string(), value);
        Ok(())
    }
}

fn subscription_matches(
    subscription: &MessageSubscription,
    correlation: &MessageCorrelation,
    store: &Store,
) -> bool {
    if subscription.message_name != correlation.message_name {
        return false;
    }
    if correlation.without_tenant_id && subscription.tenant_id.is_some() {
        return false;
    }
    if let Some(tenant) = &correlation.tenant_id
        && subscription.tenant_id.as_ref() != Some(tenant)
    {
        return false;
    }
    if let Some(id) = &correlation.process_instance_id
        && subscription.process_instance_id != *id
    {
        return false;
    }
    let instance_variables = store
        .process_instances
        .iter()
        .find(|r| r.info.id == subscription.process_instance_id)
        .map(|r| r.variables.as_slice())
        .unwrap_or_default();
    for (name, value) in &correlation.correlation_keys {
        let matched = instance_variables.iter().any(|(n, v)| {
            n == name && compare_values(v, value, false) == Some(Ordering::Equal)
        });
        if !matched {
            return false;
        }
    }
    if correlation.local_correlation_keys.is_empty() {
        return true;
    }
    let execution_variables = store
        .executions
        .iter()
        .find(|r| r.info.id == subscription.execution_id)
        .map(|r| r.variables.as_slice())
        .unwrap_or_default();
    correlation.local_correlation_keys.iter().all(|(name, value)| {
        execution_variables.iter().any(|(n, v)| {
            n == name && compare_values(v, value, false) == Some(Ordering::Equal)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::message::MessageCorrelation;
    use serde_json::json;

    fn instance(id: &str, key: &str, variables: Vec<(String, TypedValue)>) -> ProcessInstanceRecord {
        ProcessInstanceRecord {
            info: ProcessInstance {
                id: id.to_string(),
                definition_id: format!("{key}:1"),
                definition_key: key.to_string(),
                ..Default::default()
            },
            variables,
            ..Default::default()
        }
    }

    fn seeded() -> MemoryEngine {
        let engine = MemoryEngine::new();
        engine.add_process_instance(instance(
            "pi-1",
            "invoice",
            vec![
                ("amount".to_string(), TypedValue::Integer(10)),
                ("customer".to_string(), TypedValue::String("Kermit".to_string())),
            ],
        ));
        engine.add_process_instance(instance(
            "pi-2",
            "invoice",
            vec![("amount".to_string(), TypedValue::Integer(25))],
        ));
        engine.add_process_instance(instance("pi-3", "order", Vec::new()));
        engine
    }

    #[test]
    fn variable_predicates_filter_instances() {
        let engine = seeded();
        let mut query = engine.create_process_instance_query();
        query.variable_value_greater_than("amount", TypedValue::Integer(15));
        let result = query.list().unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "pi-2");
    }

    #[test]
    fn numeric_comparison_spans_integer_widths() {
        let engine = seeded();
        let mut query = engine.create_process_instance_query();
        query.variable_value_equals("amount", TypedValue::Long(10));
        assert_eq!(query.count().unwrap(), 1);
    }

    #[test]
    fn textual_filter_values_adopt_the_numeric_family() {
        use crate::query::criteria;
        use crate::query::filter::{FilterFamily, parse_expression_string};

        let engine = seeded();
        let mut query = engine.create_process_instance_query();
        let exprs = parse_expression_string(FilterFamily::Variables, "amount_gt_15").unwrap();
        criteria::apply_variable_filters(query.as_mut(), &exprs);
        let result = query.list().unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "pi-2");
    }

    #[test]
    fn textual_filter_values_adopt_boolean_and_date_families() {
        let approved = TypedValue::Boolean(true);
        let due = TypedValue::convert(&json!("2026-01-10T00:00:00.000+0000"), Some("Date"), None)
            .unwrap();
        let engine = MemoryEngine::new();
        engine.add_process_instance(instance(
            "pi-1",
            "invoice",
            vec![("approved".to_string(), approved), ("due".to_string(), due)],
        ));

        let mut query = engine.create_process_instance_query();
        query.variable_value_equals(
            "approved",
            TypedValue::Untyped(serde_json::Value::String("true".to_string())),
        );
        assert_eq!(query.count().unwrap(), 1);

        let mut query = engine.create_process_instance_query();
        query.variable_value_less_than(
            "due",
            TypedValue::Untyped(serde_json::Value::String(
                "2026-02-01T00:00:00.000+0000".to_string(),
            )),
        );
        assert_eq!(query.count().unwrap(), 1);

        // Text that fits no family still matches nothing.
        let mut query = engine.create_process_instance_query();
        query.variable_value_equals(
            "approved",
            TypedValue::Untyped(serde_json::Value::String("yes".to_string())),
        );
        assert_eq!(query.count().unwrap(), 0);
    }

    #[test]
    fn like_uses_percent_wildcards() {
        let engine = seeded();
        let mut query = engine.create_process_instance_query();
        query.variable_value_like("customer", "%ermi%".to_string());
        let result = query.list().unwrap();
        assert_eq!(result[0].id, "pi-1");

        let mut query = engine.create_process_instance_query();
        query.variable_value_like("customer", "Kermi".to_string());
        assert_eq!(query.count().unwrap(), 0);
    }

    #[test]
    fn ignore_case_flags_relax_string_matching() {
        let engine = seeded();
        let mut query = engine.create_process_instance_query();
        query.variable_value_equals("customer", TypedValue::String("KERMIT".to_string()));
        assert_eq!(query.count().unwrap(), 0);

        let mut query = engine.create_process_instance_query();
        query.match_variable_values_ignore_case();
        query.variable_value_equals("customer", TypedValue::String("KERMIT".to_string()));
        assert_eq!(query.count().unwrap(), 1);

        let mut query = engine.create_process_instance_query();
        query.match_variable_names_ignore_case();
        query.variable_value_equals("CUSTOMER", TypedValue::String("Kermit".to_string()));
        assert_eq!(query.count().unwrap(), 1);
    }

    #[test]
    fn cross_family_comparisons_match_nothing() {
        let engine = seeded();
        let mut query = engine.create_process_instance_query();
        query.variable_value_equals("amount", TypedValue::String("10".to_string()));
        assert_eq!(query.count().unwrap(), 0);
    }

    #[test]
    fn sorting_applies_in_instruction_order() {
        let engine = seeded();
        let mut query = engine.create_process_instance_query();
        query.order_by(ProcessInstanceSortField::DefinitionKey);
        query.asc();
        query.order_by(ProcessInstanceSortField::InstanceId);
        query.desc();
        let ids: Vec<String> = query.list().unwrap().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["pi-2", "pi-1", "pi-3"]);
    }

    #[test]
    fn paging_skips_and_limits() {
        let engine = seeded();
        let mut query = engine.create_process_instance_query();
        query.order_by(ProcessInstanceSortField::InstanceId);
        query.asc();
        let result = query.list_page(1, 1).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "pi-2");
    }

    #[test]
    fn untyped_values_compare_against_typed_numbers() {
        let engine = MemoryEngine::new();
        engine.add_process_instance(instance(
            "pi-1",
            "invoice",
            vec![("amount".to_string(), TypedValue::Untyped(json!(10)))],
        ));
        let mut query = engine.create_process_instance_query();
        query.variable_value_equals("amount", TypedValue::Integer(10));
        assert_eq!(query.count().unwrap(), 1);
    }

    #[test]
    fn correlation_requires_a_matching_subscription() {
        let engine = seeded();
        engine.add_subscription(MessageSubscription {
            message_name: "orderReceived".to_string(),
            execution_id: "ex-1".to_string(),
            process_instance_id: "pi-1".to_string(),
            tenant_id: None,
        });

        let correlation = MessageCorrelation {
            message_name: "orderReceived".to_string(),
            correlation_keys: vec![("amount".to_string(), TypedValue::Integer(10))],
            process_variables: vec![("handled".to_string(), TypedValue::Boolean(true))],
            ..Default::default()
        };
        let results = engine.correlate_message(&correlation).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].execution_id.as_deref(), Some("ex-1"));
        assert!(engine
            .process_instance_variables("pi-1")
            .contains(&("handled".to_string(), TypedValue::Boolean(true))));

        let correlation = MessageCorrelation {
            message_name: "unknownMessage".to_string(),
            ..Default::default()
        };
        let err = engine.correlate_message(&correlation).unwrap_err();
        assert!(err.to_string().contains("unknownMessage"));
    }

    #[test]
    fn modification_applies_in_call_order() {
        let engine = MemoryEngine::new();
        let mut record = instance("pi-1", "invoice", Vec::new());
        record.activity_ids = vec!["reviewInvoice".to_string()];
        engine.add_process_instance(record);

        let mut builder = engine.create_modification("pi-1");
        builder.start_before_activity("approveInvoice");
        builder.set_variable("priority", TypedValue::Integer(3));
        builder.cancel_all_for_activity("reviewInvoice");
        builder.execute(false, false).unwrap();

        assert_eq!(engine.process_instance_activities("pi-1"), vec!["approveInvoice"]);
        assert_eq!(
            engine.process_instance_variables("pi-1"),
            vec![("priority".to_string(), TypedValue::Integer(3))]
        );
    }

    #[test]
    fn modification_of_unknown_instance_is_not_found() {
        let engine = MemoryEngine::new();
        let mut builder = engine.create_modification("missing");
        builder.start_before_activity("a");
        let err = builder.execute(false, false).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn task_variables_are_written_in_place() {
        let engine = MemoryEngine::new();
        engine.add_task("task-1");
        engine
            .set_task_variable("task-1", "reviewer", TypedValue::String("fozzie".to_string()))
            .unwrap();
        assert_eq!(
            engine.task_variables("task-1"),
            vec![("reviewer".to_string(), TypedValue::String("fozzie".to_string()))]
        );

        let err = engine
            .set_task_variable("task-2", "reviewer", TypedValue::Null)
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }
}
