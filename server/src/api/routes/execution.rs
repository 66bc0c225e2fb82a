//! Execution query endpoints
//!
//! Executions carry two variable filter families: `variables` matches the
//! execution's own scope with the full operator set, `processVariables`
//! matches the owning process instance's scope and supports equality
//! operators only.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::types::{CountResultDto, PaginationDto, RestError};
use crate::engine::query::{ExecutionQuery, ExecutionSortField};
use crate::engine::{Execution, ProcessEngine};
use crate::query::ParamError;
use crate::query::criteria;
use crate::query::filter::{FilterExpression, FilterFamily};
use crate::query::params::{StringListParam, VariableListParam};
use crate::query::sorting::{SortInstruction, SortingDto, resolve_sorting};

#[derive(Clone)]
pub struct ExecutionApiState {
    pub engine: Arc<dyn ProcessEngine>,
}

pub fn routes(engine: Arc<dyn ProcessEngine>) -> Router<()> {
    let state = ExecutionApiState { engine };

    Router::new()
        .route("/", get(query_get).post(query_post))
        .route("/count", get(count_get).post(count_post))
        .with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionDto {
    pub id: String,
    pub process_instance_id: String,
    pub ended: bool,
    pub tenant_id: Option<String>,
}

impl From<Execution> for ExecutionDto {
    fn from(e: Execution) -> Self {
        Self {
            id: e.id,
            process_instance_id: e.process_instance_id,
            ended: e.ended,
            tenant_id: e.tenant_id,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutionQueryDto {
    pub business_key: Option<String>,
    pub process_definition_key: Option<String>,
    pub process_definition_id: Option<String>,
    pub process_instance_id: Option<String>,
    pub activity_id: Option<String>,
    pub active: Option<bool>,
    pub suspended: Option<bool>,
    pub tenant_id_in: Option<StringListParam>,
    pub without_tenant_id: Option<bool>,
    pub variables: Option<VariableListParam>,
    pub process_variables: Option<VariableListParam>,
    pub variable_names_ignore_case: Option<bool>,
    pub variable_values_ignore_case: Option<bool>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub sorting: Option<Vec<SortingDto>>,
}

struct ResolvedCriteria {
    expressions: Vec<FilterExpression>,
    process_expressions: Vec<FilterExpression>,
    sorting: Vec<SortInstruction<ExecutionSortField>>,
}

impl ExecutionQueryDto {
    fn resolve(&self) -> Result<ResolvedCriteria, ParamError> {
        let expressions = match &self.variables {
            Some(variables) => variables.resolve(FilterFamily::Variables)?,
            None => Vec::new(),
        };
        let process_expressions = match &self.process_variables {
            Some(variables) => variables.resolve(FilterFamily::ProcessVariables)?,
            None => Vec::new(),
        };
        let sorting = resolve_sorting(
            self.sort_by.as_deref(),
            self.sort_order.as_deref(),
            self.sorting.as_deref(),
            ExecutionSortField::parse,
        )?;
        Ok(ResolvedCriteria { expressions, process_expressions, sorting })
    }

    fn apply(
        &self,
        criteria_set: &ResolvedCriteria,
        query: &mut dyn ExecutionQuery,
    ) -> Result<(), ParamError> {
        if let Some(key) = &self.process_definition_key {
            query.process_definition_key(key);
        }
        if let Some(id) = &self.process_definition_id {
            query.process_definition_id(id);
        }
        if let Some(id) = &self.process_instance_id {
            query.process_instance_id(id);
        }
        if let Some(id) = &self.activity_id {
            query.activity_id(id);
        }
        if let Some(key) = &self.business_key {
            query.business_key(key);
        }
        if self.active == Some(true) {
            query.active();
        }
        if self.suspended == Some(true) {
            query.suspended();
        }
        if let Some(tenant_ids) = &self.tenant_id_in {
            query.tenant_id_in(tenant_ids.values());
        }
        if self.without_tenant_id == Some(true) {
            query.without_tenant_id();
        }
        criteria::apply_ignore_case_flags(
            query,
            self.variable_names_ignore_case == Some(true),
            self.variable_values_ignore_case == Some(true),
        );
        criteria::apply_variable_filters(query, &criteria_set.expressions);
        criteria::apply_process_variable_filters(query, &criteria_set.process_expressions)?;
        criteria::apply_sorting(query, &criteria_set.sorting);
        Ok(())
    }
}

fn run_query(
    state: &ExecutionApiState,
    dto: &ExecutionQueryDto,
    pagination: PaginationDto,
) -> Result<Vec<ExecutionDto>, RestError> {
    let resolved = dto.resolve()?;
    let mut query = state.engine.create_execution_query();
    dto.apply(&resolved, query.as_mut())?;
    let items = criteria::execute_window(query.as_mut(), pagination.window())?;
    Ok(items.into_iter().map(ExecutionDto::from).collect())
}

fn run_count(state: &ExecutionApiState, dto: &ExecutionQueryDto) -> Result<CountResultDto, RestError> {
    let resolved = dto.resolve()?;
    let mut query = state.engine.create_execution_query();
    dto.apply(&resolved, query.as_mut())?;
    Ok(CountResultDto { count: query.count()? })
}

pub async fn query_get(
    State(state): State<ExecutionApiState>,
    Query(pagination): Query<PaginationDto>,
    Query(dto): Query<ExecutionQueryDto>,
) -> Result<Json<Vec<ExecutionDto>>, RestError> {
    Ok(Json(run_query(&state, &dto, pagination)?))
}

pub async fn query_post(
    State(state): State<ExecutionApiState>,
    Query(pagination): Query<PaginationDto>,
    Json(dto): Json<ExecutionQueryDto>,
) -> Result<Json<Vec<ExecutionDto>>, RestError> {
    Ok(Json(run_query(&state, &dto, pagination)?))
}

pub async fn count_get(
    State(state): State<ExecutionApiState>,
    Query(dto): Query<ExecutionQueryDto>,
) -> Result<Json<CountResultDto>, RestError> {
    Ok(Json(run_count(&state, &dto)?))
}

pub async fn count_post(
    State(state): State<ExecutionApiState>,
    Json(dto): Json<ExecutionQueryDto>,
) -> Result<Json<CountResultDto>, RestError> {
    Ok(Json(run_count(&state, &dto)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::{ExecutionRecord, MemoryEngine, ProcessInstanceRecord};
    use crate::engine::ProcessInstance;
    use crate::query::value::TypedValue;
    use axum::http::Uri;
    use serde_json::json;

    fn seeded_engine() -> MemoryEngine {
        let engine = MemoryEngine::new();
        engine.add_process_instance(ProcessInstanceRecord {
            info: ProcessInstance {
                id: "pi-1".to_string(),
                definition_id: "invoice:1".to_string(),
                definition_key: "invoice".to_string(),
                ..Default::default()
            },
            variables: vec![("amount".to_string(), TypedValue::Integer(10))],
            ..Default::default()
        });
        engine.add_execution(ExecutionRecord {
            info: Execution { id: "ex-1".to_string(), process_instance_id: "pi-1".to_string(), ..Default::default() },
            process_definition_key: "invoice".to_string(),
            process_definition_id: "invoice:1".to_string(),
            activity_id: Some("reviewInvoice".to_string()),
            variables: vec![("localCounter".to_string(), TypedValue::Integer(1))],
            ..Default::default()
        });
        engine.add_execution(ExecutionRecord {
            info: Execution { id: "ex-2".to_string(), process_instance_id: "pi-2".to_string(), ..Default::default() },
            process_definition_key: "order".to_string(),
            process_definition_id: "order:1".to_string(),
            ..Default::default()
        });
        engine
    }

    fn state(engine: MemoryEngine) -> ExecutionApiState {
        ExecutionApiState { engine: Arc::new(engine) }
    }

    fn get_dto(uri: &str) -> (PaginationDto, ExecutionQueryDto) {
        let uri: Uri = uri.parse().unwrap();
        let Query(pagination) = Query::try_from_uri(&uri).unwrap();
        let Query(dto) = Query::try_from_uri(&uri).unwrap();
        (pagination, dto)
    }

    #[tokio::test]
    async fn process_variables_match_the_owning_instance_scope() {
        let (pagination, dto) = get_dto("/execution?processVariables=amount_eq_10");
        let result = query_get(State(state(seeded_engine())), Query(pagination), Query(dto))
            .await
            .unwrap();
        assert_eq!(result.0.len(), 1);
        assert_eq!(result.0[0].id, "ex-1");
    }

    #[tokio::test]
    async fn process_variables_reject_ordering_comparators() {
        let (pagination, dto) = get_dto("/execution?processVariables=amount_gt_5");
        let err = query_get(State(state(seeded_engine())), Query(pagination), Query(dto))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RestError::bad_request("Invalid process variable comparator specified: gt")
        );
    }

    #[tokio::test]
    async fn own_scope_variables_keep_the_full_operator_set() {
        let (pagination, dto) = get_dto("/execution?variables=localCounter_gteq_1");
        let result = query_get(State(state(seeded_engine())), Query(pagination), Query(dto))
            .await
            .unwrap();
        assert_eq!(result.0.len(), 1);
        assert_eq!(result.0[0].id, "ex-1");
    }

    #[tokio::test]
    async fn post_count_with_structured_process_variables() {
        let dto: ExecutionQueryDto = serde_json::from_value(json!({
            "processVariables": [{"name": "amount", "operator": "neq", "value": 99}],
        }))
        .unwrap();
        let result = count_post(State(state(seeded_engine())), Json(dto)).await.unwrap();
        // ex-2 has no owning instance record, so only ex-1's scope matches.
        assert_eq!(result.0.count, 1);
    }

    #[tokio::test]
    async fn unknown_sort_field_is_rejected() {
        let (pagination, dto) = get_dto("/execution?sortBy=businessKey&sortOrder=asc");
        let err = query_get(State(state(seeded_engine())), Query(pagination), Query(dto))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RestError::bad_request("sortBy parameter has invalid value: businessKey")
        );
    }
}
