//! Case execution query endpoints
//!
//! Like executions, case executions see two scopes: their own `variables`
//! and the owning case instance's `caseInstanceVariables`. Both families
//! support the full operator set here.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::types::{CountResultDto, PaginationDto, RestError};
use crate::engine::query::{CaseExecutionQuery, CaseExecutionSortField};
use crate::engine::{CaseExecution, ProcessEngine};
use crate::query::ParamError;
use crate::query::criteria;
use crate::query::filter::{FilterExpression, FilterFamily};
use crate::query::params::{StringListParam, VariableListParam};
use crate::query::sorting::{SortInstruction, SortingDto, resolve_sorting};

#[derive(Clone)]
pub struct CaseExecutionApiState {
    pub engine: Arc<dyn ProcessEngine>,
}

pub fn routes(engine: Arc<dyn ProcessEngine>) -> Router<()> {
    let state = CaseExecutionApiState { engine };

    Router::new()
        .route("/", get(query_get).post(query_post))
        .route("/count", get(count_get).post(count_post))
        .with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseExecutionDto {
    pub id: String,
    pub case_instance_id: String,
    pub case_definition_id: String,
    pub activity_id: Option<String>,
    pub active: bool,
    pub enabled: bool,
    pub disabled: bool,
    pub tenant_id: Option<String>,
}

impl From<CaseExecution> for CaseExecutionDto {
    fn from(e: CaseExecution) -> Self {
        Self {
            id: e.id,
            case_instance_id: e.case_instance_id,
            case_definition_id: e.case_definition_id,
            activity_id: e.activity_id,
            active: e.active,
            enabled: e.enabled,
            disabled: e.disabled,
            tenant_id: e.tenant_id,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaseExecutionQueryDto {
    pub case_execution_id: Option<String>,
    pub case_instance_id: Option<String>,
    pub case_definition_key: Option<String>,
    pub case_definition_id: Option<String>,
    pub activity_id: Option<String>,
    pub active: Option<bool>,
    pub enabled: Option<bool>,
    pub disabled: Option<bool>,
    pub tenant_id_in: Option<StringListParam>,
    pub without_tenant_id: Option<bool>,
    pub variables: Option<VariableListParam>,
    pub case_instance_variables: Option<VariableListParam>,
    pub variable_names_ignore_case: Option<bool>,
    pub variable_values_ignore_case: Option<bool>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub sorting: Option<Vec<SortingDto>>,
}

struct ResolvedCriteria {
    expressions: Vec<FilterExpression>,
    case_expressions: Vec<FilterExpression>,
    sorting: Vec<SortInstruction<CaseExecutionSortField>>,
}

impl CaseExecutionQueryDto {
    fn resolve(&self) -> Result<ResolvedCriteria, ParamError> {
        let expressions = match &self.variables {
            Some(variables) => variables.resolve(FilterFamily::Variables)?,
            None => Vec::new(),
        };
        let case_expressions = match &self.case_instance_variables {
            Some(variables) => variables.resolve(FilterFamily::CaseInstanceVariables)?,
            None => Vec::new(),
        };
        let sorting = resolve_sorting(
            self.sort_by.as_deref(),
            self.sort_order.as_deref(),
            self.sorting.as_deref(),
            CaseExecutionSortField::parse,
        )?;
        Ok(ResolvedCriteria { expressions, case_expressions, sorting })
    }

    fn apply(&self, criteria_set: &ResolvedCriteria, query: &mut dyn CaseExecutionQuery) {
        if let Some(id) = &self.case_execution_id {
            query.case_execution_id(id);
        }
        if let Some(id) = &self.case_instance_id {
            query.case_instance_id(id);
        }
        if let Some(key) = &self.case_definition_key {
            query.case_definition_key(key);
        }
        if let Some(id) = &self.case_definition_id {
            query.case_definition_id(id);
        }
        if let Some(id) = &self.activity_id {
            query.activity_id(id);
        }
        if self.active == Some(true) {
            query.active();
        }
        if self.enabled == Some(true) {
            query.enabled();
        }
        if self.disabled == Some(true) {
            query.disabled();
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
        criteria::apply_case_instance_variable_filters(query, &criteria_set.case_expressions);
        criteria::apply_sorting(query, &criteria_set.sorting);
    }
}

fn run_query(
    state: &CaseExecutionApiState,
    dto: &CaseExecutionQueryDto,
    pagination: PaginationDto,
) -> Result<Vec<CaseExecutionDto>, RestError> {
    let resolved = dto.resolve()?;
    let mut query = state.engine.create_case_execution_query();
    dto.apply(&resolved, query.as_mut());
    let items = criteria::execute_window(query.as_mut(), pagination.window())?;
    Ok(items.into_iter().map(CaseExecutionDto::from).collect())
}

fn run_count(
    state: &CaseExecutionApiState,
    dto: &CaseExecutionQueryDto,
) -> Result<CountResultDto, RestError> {
    let resolved = dto.resolve()?;
    let mut query = state.engine.create_case_execution_query();
    dto.apply(&resolved, query.as_mut());
    Ok(CountResultDto { count: query.count()? })
}

pub async fn query_get(
    State(state): State<CaseExecutionApiState>,
    Query(pagination): Query<PaginationDto>,
    Query(dto): Query<CaseExecutionQueryDto>,
) -> Result<Json<Vec<CaseExecutionDto>>, RestError> {
    Ok(Json(run_query(&state, &dto, pagination)?))
}

pub async fn query_post(
    State(state): State<CaseExecutionApiState>,
    Query(pagination): Query<PaginationDto>,
    Json(dto): Json<CaseExecutionQueryDto>,
) -> Result<Json<Vec<CaseExecutionDto>>, RestError> {
    Ok(Json(run_query(&state, &dto, pagination)?))
}

pub async fn count_get(
    State(state): State<CaseExecutionApiState>,
    Query(dto): Query<CaseExecutionQueryDto>,
) -> Result<Json<CountResultDto>, RestError> {
    Ok(Json(run_count(&state, &dto)?))
}

pub async fn count_post(
    State(state): State<CaseExecutionApiState>,
    Json(dto): Json<CaseExecutionQueryDto>,
) -> Result<Json<CountResultDto>, RestError> {
    Ok(Json(run_count(&state, &dto)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::{CaseExecutionRecord, CaseInstanceRecord, MemoryEngine};
    use crate::engine::CaseInstance;
    use crate::query::value::TypedValue;
    use axum::http::Uri;
    use serde_json::json;

    fn seeded_engine() -> MemoryEngine {
        let engine = MemoryEngine::new();
        engine.add_case_instance(CaseInstanceRecord {
            info: CaseInstance {
                id: "ci-1".to_string(),
                case_definition_id: "loanCase:1".to_string(),
                ..Default::default()
            },
            case_definition_key: "loanCase".to_string(),
            variables: vec![("limit".to_string(), TypedValue::Long(5000))],
        });
        engine.add_case_execution(CaseExecutionRecord {
            info: CaseExecution {
                id: "ce-1".to_string(),
                case_instance_id: "ci-1".to_string(),
                case_definition_id: "loanCase:1".to_string(),
                activity_id: Some("checkCredit".to_string()),
                active: true,
                ..Default::default()
            },
            case_definition_key: "loanCase".to_string(),
            variables: Vec::new(),
        });
        engine.add_case_execution(CaseExecutionRecord {
            info: CaseExecution {
                id: "ce-2".to_string(),
                case_instance_id: "ci-other".to_string(),
                case_definition_id: "loanCase:1".to_string(),
                enabled: true,
                ..Default::default()
            },
            case_definition_key: "loanCase".to_string(),
            variables: Vec::new(),
        });
        engine
    }

    fn state(engine: MemoryEngine) -> CaseExecutionApiState {
        CaseExecutionApiState { engine: Arc::new(engine) }
    }

    fn get_dto(uri: &str) -> (PaginationDto, CaseExecutionQueryDto) {
        let uri: Uri = uri.parse().unwrap();
        let Query(pagination) = Query::try_from_uri(&uri).unwrap();
        let Query(dto) = Query::try_from_uri(&uri).unwrap();
        (pagination, dto)
    }

    #[tokio::test]
    async fn case_instance_variables_match_the_owning_case_scope() {
        let (pagination, dto) = get_dto("/case-execution?caseInstanceVariables=limit_gteq_1000");
        let result = query_get(State(state(seeded_engine())), Query(pagination), Query(dto))
            .await
            .unwrap();
        assert_eq!(result.0.len(), 1);
        assert_eq!(result.0[0].id, "ce-1");
    }

    #[tokio::test]
    async fn case_instance_variables_comparator_errors_use_the_case_label() {
        let (pagination, dto) = get_dto("/case-execution?caseInstanceVariables=limit_between_1");
        let err = query_get(State(state(seeded_engine())), Query(pagination), Query(dto))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RestError::bad_request("Invalid case variable comparator specified: between")
        );
    }

    #[tokio::test]
    async fn post_query_with_structured_sorting() {
        let dto: CaseExecutionQueryDto = serde_json::from_value(json!({
            "sorting": [{"sortBy": "caseExecutionId", "sortOrder": "desc"}],
        }))
        .unwrap();
        let result = query_post(
            State(state(seeded_engine())),
            Query(PaginationDto::default()),
            Json(dto),
        )
        .await
        .unwrap();
        let ids: Vec<&str> = result.0.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["ce-2", "ce-1"]);
    }

    #[tokio::test]
    async fn enabled_flag_filters() {
        let (_, dto) = get_dto("/case-execution/count?enabled=true");
        let result = count_get(State(state(seeded_engine())), Query(dto)).await.unwrap();
        assert_eq!(result.0.count, 1);
    }
}
