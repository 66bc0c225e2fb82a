//! Case instance query endpoints

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::types::{CountResultDto, PaginationDto, RestError};
use crate::engine::query::{CaseInstanceQuery, CaseInstanceSortField};
use crate::engine::{CaseInstance, ProcessEngine};
use crate::query::ParamError;
use crate::query::criteria;
use crate::query::filter::{FilterExpression, FilterFamily};
use crate::query::params::{StringListParam, VariableListParam};
use crate::query::sorting::{SortInstruction, SortingDto, resolve_sorting};

#[derive(Clone)]
pub struct CaseInstanceApiState {
    pub engine: Arc<dyn ProcessEngine>,
}

pub fn routes(engine: Arc<dyn ProcessEngine>) -> Router<()> {
    let state = CaseInstanceApiState { engine };

    Router::new()
        .route("/", get(query_get).post(query_post))
        .route("/count", get(count_get).post(count_post))
        .with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseInstanceDto {
    pub id: String,
    pub case_definition_id: String,
    pub business_key: Option<String>,
    pub active: bool,
    pub completed: bool,
    pub tenant_id: Option<String>,
}

impl From<CaseInstance> for CaseInstanceDto {
    fn from(i: CaseInstance) -> Self {
        Self {
            id: i.id,
            case_definition_id: i.case_definition_id,
            business_key: i.business_key,
            active: i.active,
            completed: i.completed,
            tenant_id: i.tenant_id,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaseInstanceQueryDto {
    pub case_instance_id: Option<String>,
    pub business_key: Option<String>,
    pub case_definition_key: Option<String>,
    pub case_definition_id: Option<String>,
    pub active: Option<bool>,
    pub completed: Option<bool>,
    pub tenant_id_in: Option<StringListParam>,
    pub without_tenant_id: Option<bool>,
    pub variables: Option<VariableListParam>,
    pub variable_names_ignore_case: Option<bool>,
    pub variable_values_ignore_case: Option<bool>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub sorting: Option<Vec<SortingDto>>,
}

struct ResolvedCriteria {
    expressions: Vec<FilterExpression>,
    sorting: Vec<SortInstruction<CaseInstanceSortField>>,
}

impl CaseInstanceQueryDto {
    fn resolve(&self) -> Result<ResolvedCriteria, ParamError> {
        let expressions = match &self.variables {
            Some(variables) => variables.resolve(FilterFamily::Variables)?,
            None => Vec::new(),
        };
        let sorting = resolve_sorting(
            self.sort_by.as_deref(),
            self.sort_order.as_deref(),
            self.sorting.as_deref(),
            CaseInstanceSortField::parse,
        )?;
        Ok(ResolvedCriteria { expressions, sorting })
    }

    fn apply(&self, criteria_set: &ResolvedCriteria, query: &mut dyn CaseInstanceQuery) {
        if let Some(id) = &self.case_instance_id {
            query.case_instance_id(id);
        }
        if let Some(key) = &self.case_definition_key {
            query.case_definition_key(key);
        }
        if let Some(id) = &self.case_definition_id {
            query.case_definition_id(id);
        }
        if let Some(key) = &self.business_key {
            query.business_key(key);
        }
        if self.active == Some(true) {
            query.active();
        }
        if self.completed == Some(true) {
            query.completed();
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
        criteria::apply_sorting(query, &criteria_set.sorting);
    }
}

fn run_query(
    state: &CaseInstanceApiState,
    dto: &CaseInstanceQueryDto,
    pagination: PaginationDto,
) -> Result<Vec<CaseInstanceDto>, RestError> {
    let resolved = dto.resolve()?;
    let mut query = state.engine.create_case_instance_query();
    dto.apply(&resolved, query.as_mut());
    let items = criteria::execute_window(query.as_mut(), pagination.window())?;
    Ok(items.into_iter().map(CaseInstanceDto::from).collect())
}

fn run_count(
    state: &CaseInstanceApiState,
    dto: &CaseInstanceQueryDto,
) -> Result<CountResultDto, RestError> {
    let resolved = dto.resolve()?;
    let mut query = state.engine.create_case_instance_query();
    dto.apply(&resolved, query.as_mut());
    Ok(CountResultDto { count: query.count()? })
}

pub async fn query_get(
    State(state): State<CaseInstanceApiState>,
    Query(pagination): Query<PaginationDto>,
    Query(dto): Query<CaseInstanceQueryDto>,
) -> Result<Json<Vec<CaseInstanceDto>>, RestError> {
    Ok(Json(run_query(&state, &dto, pagination)?))
}

pub async fn query_post(
    State(state): State<CaseInstanceApiState>,
    Query(pagination): Query<PaginationDto>,
    Json(dto): Json<CaseInstanceQueryDto>,
) -> Result<Json<Vec<CaseInstanceDto>>, RestError> {
    Ok(Json(run_query(&state, &dto, pagination)?))
}

pub async fn count_get(
    State(state): State<CaseInstanceApiState>,
    Query(dto): Query<CaseInstanceQueryDto>,
) -> Result<Json<CountResultDto>, RestError> {
    Ok(Json(run_count(&state, &dto)?))
}

pub async fn count_post(
    State(state): State<CaseInstanceApiState>,
    Json(dto): Json<CaseInstanceQueryDto>,
) -> Result<Json<CountResultDto>, RestError> {
    Ok(Json(run_count(&state, &dto)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::{CaseInstanceRecord, MemoryEngine};
    use crate::query::value::TypedValue;
    use axum::http::Uri;

    fn seeded_engine() -> MemoryEngine {
        let engine = MemoryEngine::new();
        engine.add_case_instance(CaseInstanceRecord {
            info: CaseInstance {
                id: "ci-1".to_string(),
                case_definition_id: "loanCase:1".to_string(),
                active: true,
                ..Default::default()
            },
            case_definition_key: "loanCase".to_string(),
            variables: vec![("applicant".to_string(), TypedValue::String("Gonzo".to_string()))],
        });
        engine.add_case_instance(CaseInstanceRecord {
            info: CaseInstance {
                id: "ci-2".to_string(),
                case_definition_id: "loanCase:1".to_string(),
                completed: true,
                ..Default::default()
            },
            case_definition_key: "loanCase".to_string(),
            variables: Vec::new(),
        });
        engine
    }

    fn state(engine: MemoryEngine) -> CaseInstanceApiState {
        CaseInstanceApiState { engine: Arc::new(engine) }
    }

    fn get_dto(uri: &str) -> (PaginationDto, CaseInstanceQueryDto) {
        let uri: Uri = uri.parse().unwrap();
        let Query(pagination) = Query::try_from_uri(&uri).unwrap();
        let Query(dto) = Query::try_from_uri(&uri).unwrap();
        (pagination, dto)
    }

    #[tokio::test]
    async fn variable_like_filter_selects_matching_cases() {
        let (pagination, dto) = get_dto("/case-instance?variables=applicant_like_%onz%");
        let result = query_get(State(state(seeded_engine())), Query(pagination), Query(dto))
            .await
            .unwrap();
        assert_eq!(result.0.len(), 1);
        assert_eq!(result.0[0].id, "ci-1");
    }

    #[tokio::test]
    async fn state_flags_filter() {
        let (_, dto) = get_dto("/case-instance/count?completed=true");
        let result = count_get(State(state(seeded_engine())), Query(dto)).await.unwrap();
        assert_eq!(result.0.count, 1);
    }

    #[tokio::test]
    async fn case_variable_comparator_errors_use_the_case_label() {
        let (pagination, dto) = get_dto("/case-instance?variables=a_badOp_1");
        let err = query_get(State(state(seeded_engine())), Query(pagination), Query(dto))
            .await
            .unwrap_err();
        assert_eq!(err, RestError::bad_request("Invalid variable comparator specified: badOp"));
    }
}
