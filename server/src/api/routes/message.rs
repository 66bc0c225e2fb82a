//! Message correlation endpoint
//!
//! The whole request body is converted into an immutable correlation
//! configuration before the engine is called; any typed-value conversion
//! failure aborts with the `Cannot deliver message: ` prefix and nothing is
//! delivered. `resultEnabled` selects between a 204 and a 200 carrying the
//! correlation results.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::types::RestError;
use crate::engine::message::{CorrelationResult, MessageCorrelation};
use crate::engine::ProcessEngine;
use crate::query::ParamError;
use crate::query::value::{TypedValue, convert_value_map};

const CONTEXT: &str = "Cannot deliver message";

#[derive(Clone)]
pub struct MessageApiState {
    pub engine: Arc<dyn ProcessEngine>,
}

pub fn routes(engine: Arc<dyn ProcessEngine>) -> Router<()> {
    let state = MessageApiState { engine };

    Router::new().route("/", post(correlate)).with_state(state)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CorrelationMessageDto {
    pub message_name: Option<String>,
    pub business_key: Option<String>,
    pub tenant_id: Option<String>,
    pub without_tenant_id: bool,
    pub process_instance_id: Option<String>,
    pub correlation_keys: Option<Map<String, Value>>,
    pub local_correlation_keys: Option<Map<String, Value>>,
    pub process_variables: Option<Map<String, Value>>,
    pub process_variables_local: Option<Map<String, Value>>,
    pub process_variables_to_triggered_scope: Option<Map<String, Value>>,
    pub all: bool,
    pub result_enabled: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageCorrelationResultDto {
    pub result_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_instance_id: Option<String>,
}

impl From<CorrelationResult> for MessageCorrelationResultDto {
    fn from(r: CorrelationResult) -> Self {
        Self {
            result_type: r.result_type.as_str(),
            execution_id: r.execution_id,
            process_instance_id: r.process_instance_id,
        }
    }
}

fn convert_map(map: Option<Map<String, Value>>) -> Result<Vec<(String, TypedValue)>, ParamError> {
    match map {
        Some(map) => convert_value_map(map).map_err(|e| e.context(CONTEXT)),
        None => Ok(Vec::new()),
    }
}

impl CorrelationMessageDto {
    fn into_correlation(self) -> Result<(MessageCorrelation, bool), RestError> {
        let Some(message_name) = self.message_name.filter(|n| !n.is_empty()) else {
            return Err(RestError::bad_request("No message name supplied"));
        };
        if self.tenant_id.is_some() && self.without_tenant_id {
            return Err(RestError::bad_request(
                "Parameter 'tenantId' cannot be used together with parameter 'withoutTenantId'.",
            ));
        }
        let correlation = MessageCorrelation {
            message_name,
            business_key: self.business_key,
            tenant_id: self.tenant_id,
            without_tenant_id: self.without_tenant_id,
            process_instance_id: self.process_instance_id,
            correlation_keys: convert_map(self.correlation_keys)?,
            local_correlation_keys: convert_map(self.local_correlation_keys)?,
            process_variables: convert_map(self.process_variables)?,
            process_variables_local: convert_map(self.process_variables_local)?,
            process_variables_to_triggered_scope: convert_map(
                self.process_variables_to_triggered_scope,
            )?,
            all: self.all,
        };
        Ok((correlation, self.result_enabled))
    }
}

pub async fn correlate(
    State(state): State<MessageApiState>,
    Json(dto): Json<CorrelationMessageDto>,
) -> Result<Response, RestError> {
    let (correlation, result_enabled) = dto.into_correlation()?;
    let results = state.engine.correlate_message(&correlation)?;
    if result_enabled {
        let results: Vec<MessageCorrelationResultDto> =
            results.into_iter().map(MessageCorrelationResultDto::from).collect();
        Ok((StatusCode::OK, Json(results)).into_response())
    } else {
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
