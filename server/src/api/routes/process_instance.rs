//! Process instance query and modification endpoints
//!
//! `GET /process-instance` and `POST /process-instance` accept the same
//! criteria in two encodings: query-string parameters (with the textual
//! variable mini-language and comma-separated lists) and a JSON body (with
//! structured filter and sorting arrays). Pagination always travels in the
//! query string. Everything is parsed and validated before the first engine
//! call, then replayed onto a fresh query sink in a fixed order: identity
//! filters, membership lists, case-sensitivity flags, variable predicates,
//! ordering, terminal call.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::types::{CountResultDto, PaginationDto, RestError};
use crate::engine::query::{ProcessInstanceQuery, ProcessInstanceSortField};
use crate::engine::{ProcessEngine, ProcessInstance};
use crate::query::ParamError;
use crate::query::criteria;
use crate::query::filter::{FilterExpression, FilterFamily};
use crate::query::instructions::{
    ModificationInstruction, ModificationInstructionDto, apply_instructions,
    validate_instructions,
};
use crate::query::params::{StringListParam, VariableListParam};
use crate::query::sorting::{SortInstruction, SortingDto, resolve_sorting};

#[derive(Clone)]
pub struct ProcessInstanceApiState {
    pub engine: Arc<dyn ProcessEngine>,
}

pub fn routes(engine: Arc<dyn ProcessEngine>) -> Router<()> {
    let state = ProcessInstanceApiState { engine };

    Router::new()
        .route("/", get(query_get).post(query_post))
        .route("/count", get(count_get).post(count_post))
        .route("/{id}/modification", post(modify))
        .route("/{id}/modification-async", post(modify_async))
        .with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInstanceDto {
    pub id: String,
    pub definition_id: String,
    pub definition_key: String,
    pub business_key: Option<String>,
    pub case_instance_id: Option<String>,
    pub ended: bool,
    pub suspended: bool,
    pub tenant_id: Option<String>,
}

impl From<ProcessInstance> for ProcessInstanceDto {
    fn from(i: ProcessInstance) -> Self {
        Self {
            id: i.id,
            definition_id: i.definition_id,
            definition_key: i.definition_key,
            business_key: i.business_key,
            case_instance_id: i.case_instance_id,
            ended: i.ended,
            suspended: i.suspended,
            tenant_id: i.tenant_id,
        }
    }
}

/// Criteria in either wire encoding.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessInstanceQueryDto {
    pub process_instance_ids: Option<StringListParam>,
    pub business_key: Option<String>,
    pub business_key_like: Option<String>,
    pub case_instance_id: Option<String>,
    pub process_definition_key: Option<String>,
    pub process_definition_id: Option<String>,
    pub deployment_id: Option<String>,
    pub super_process_instance: Option<String>,
    pub sub_process_instance: Option<String>,
    pub active: Option<bool>,
    pub suspended: Option<bool>,
    pub with_incident: Option<bool>,
    pub tenant_id_in: Option<StringListParam>,
    pub without_tenant_id: Option<bool>,
    pub activity_id_in: Option<StringListParam>,
    pub variables: Option<VariableListParam>,
    pub variable_names_ignore_case: Option<bool>,
    pub variable_values_ignore_case: Option<bool>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub sorting: Option<Vec<SortingDto>>,
}

/// Fully validated criteria. Construction either succeeds as a whole or the
/// request fails with 400; nothing is applied to a sink until then.
struct ResolvedCriteria {
    expressions: Vec<FilterExpression>,
    sorting: Vec<SortInstruction<ProcessInstanceSortField>>,
}

impl ProcessInstanceQueryDto {
    fn resolve(&self) -> Result<ResolvedCriteria, ParamError> {
        let expressions = match &self.variables {
            Some(variables) => variables.resolve(FilterFamily::Variables)?,
            None => Vec::new(),
        };
        let sorting = resolve_sorting(
            self.sort_by.as_deref(),
            self.sort_order.as_deref(),
            self.sorting.as_deref(),
            ProcessInstanceSortField::parse,
        )?;
        Ok(ResolvedCriteria { expressions, sorting })
    }

    fn apply(
        &self,
        criteria_set: &ResolvedCriteria,
        query: &mut dyn ProcessInstanceQuery,
    ) {
        if let Some(ids) = &self.process_instance_ids {
            query.process_instance_ids(ids.values());
        }
        if let Some(key) = &self.process_definition_key {
            query.process_definition_key(key);
        }
        if let Some(id) = &self.process_definition_id {
            query.process_definition_id(id);
        }
        if let Some(id) = &self.deployment_id {
            query.deployment_id(id);
        }
        if let Some(key) = &self.business_key {
            query.business_key(key);
        }
        if let Some(pattern) = &self.business_key_like {
            query.business_key_like(pattern);
        }
        if let Some(id) = &self.case_instance_id {
            query.case_instance_id(id);
        }
        if let Some(id) = &self.super_process_instance {
            query.super_process_instance_id(id);
        }
        if let Some(id) = &self.sub_process_instance {
            query.sub_process_instance_id(id);
        }
        if self.active == Some(true) {
            query.active();
        }
        if self.suspended == Some(true) {
            query.suspended();
        }
        if self.with_incident == Some(true) {
            query.with_incident();
        }
        if let Some(tenant_ids) = &self.tenant_id_in {
            query.tenant_id_in(tenant_ids.values());
        }
        if self.without_tenant_id == Some(true) {
            query.without_tenant_id();
        }
        if let Some(activity_ids) = &self.activity_id_in {
            query.activity_id_in(activity_ids.values());
        }
        criteria::apply_ignore_case_flags(
            query,
            self.variable_names_ignore_case == Some(true),
            self.variable_values_ignore_case == Some(true),
        );
        criteria::apply_variable_filters(query, &criteria_set.expressions);
        criteria::apply_sorting(query, &criteria_set.sorting);
    }
}

fn run_query(
    state: &ProcessInstanceApiState,
    dto: &ProcessInstanceQueryDto,
    pagination: PaginationDto,
) -> Result<Vec<ProcessInstanceDto>, RestError> {
    let resolved = dto.resolve()?;
    let mut query = state.engine.create_process_instance_query();
    dto.apply(&resolved, query.as_mut());
    let items = criteria::execute_window(query.as_mut(), pagination.window())?;
    Ok(items.into_iter().map(ProcessInstanceDto::from).collect())
}

fn run_count(
    state: &ProcessInstanceApiState,
    dto: &ProcessInstanceQueryDto,
) -> Result<CountResultDto, RestError> {
    let resolved = dto.resolve()?;
    let mut query = state.engine.create_process_instance_query();
    dto.apply(&resolved, query.as_mut());
    Ok(CountResultDto { count: query.count()? })
}

pub async fn query_get(
    State(state): State<ProcessInstanceApiState>,
    Query(pagination): Query<PaginationDto>,
    Query(dto): Query<ProcessInstanceQueryDto>,
) -> Result<Json<Vec<ProcessInstanceDto>>, RestError> {
    Ok(Json(run_query(&state, &dto, pagination)?))
}

pub async fn query_post(
    State(state): State<ProcessInstanceApiState>,
    Query(pagination): Query<PaginationDto>,
    Json(dto): Json<ProcessInstanceQueryDto>,
) -> Result<Json<Vec<ProcessInstanceDto>>, RestError> {
    Ok(Json(run_query(&state, &dto, pagination)?))
}

pub async fn count_get(
    State(state): State<ProcessInstanceApiState>,
    Query(dto): Query<ProcessInstanceQueryDto>,
) -> Result<Json<CountResultDto>, RestError> {
    Ok(Json(run_count(&state, &dto)?))
}

pub async fn count_post(
    State(state): State<ProcessInstanceApiState>,
    Json(dto): Json<ProcessInstanceQueryDto>,
) -> Result<Json<CountResultDto>, RestError> {
    Ok(Json(run_count(&state, &dto)?))
}

/// Modification request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModificationDto {
    pub skip_custom_listeners: bool,
    pub skip_io_mappings: bool,
    pub instructions: Vec<ModificationInstructionDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDto {
    pub id: String,
    #[serde(rename = "type")]
    pub batch_type: String,
}

fn validate_modification(
    dto: ModificationDto,
) -> Result<(Vec<ModificationInstruction>, bool, bool), RestError> {
    if dto.instructions.is_empty() {
        return Err(RestError::bad_request(
            "Process instance modification must contain at least one instruction",
        ));
    }
    let instructions = validate_instructions(dto.instructions)?;
    Ok((instructions, dto.skip_custom_listeners, dto.skip_io_mappings))
}

pub async fn modify(
    State(state): State<ProcessInstanceApiState>,
    Path(id): Path<String>,
    Json(dto): Json<ModificationDto>,
) -> Result<StatusCode, RestError> {
    let (instructions, skip_listeners, skip_io) = validate_modification(dto)?;
    let mut builder = state.engine.create_modification(&id);
    apply_instructions(builder.as_mut(), &instructions);
    builder.execute(skip_listeners, skip_io)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn modify_async(
    State(state): State<ProcessInstanceApiState>,
    Path(id): Path<String>,
    Json(dto): Json<ModificationDto>,
) -> Result<Json<BatchDto>, RestError> {
    let (instructions, skip_listeners, skip_io) = validate_modification(dto)?;
    let mut builder = state.engine.create_modification(&id);
    apply_instructions(builder.as_mut(), &instructions);
    let batch = builder.execute_async(skip_listeners, skip_io)?;
    Ok(Json(BatchDto { id: batch.id, batch_type: batch.batch_type }))
}
