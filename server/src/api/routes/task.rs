//! Task variable endpoints
//!
//! `PUT /task/{id}/variables/{name}` writes one typed value from a JSON
//! body. `POST /task/{id}/variables/{name}/data` is the binary input path:
//! a multipart upload whose `data` part becomes a Bytes value without any
//! base64 round-trip. Conversion failures carry the
//! `Cannot put task variable <name>: ` prefix.

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{post, put};
use axum::{Json, Router};
use serde::Deserialize;

use crate::api::types::RestError;
use crate::engine::ProcessEngine;
use crate::query::value::{TypeTag, TypedValue, VariableValueDto};

#[derive(Clone)]
pub struct TaskApiState {
    pub engine: Arc<dyn ProcessEngine>,
}

pub fn routes(engine: Arc<dyn ProcessEngine>) -> Router<()> {
    let state = TaskApiState { engine };

    Router::new()
        .route("/{id}/variables/{name}", put(put_variable))
        .route("/{id}/variables/{name}/data", post(post_variable_data))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct TaskVariablePath {
    pub id: String,
    pub name: String,
}

pub async fn put_variable(
    State(state): State<TaskApiState>,
    Path(path): Path<TaskVariablePath>,
    Json(dto): Json<VariableValueDto>,
) -> Result<StatusCode, RestError> {
    let value = dto
        .into_typed_value()
        .map_err(|e| e.context(&format!("Cannot put task variable {}", path.name)))?;
    state.engine.set_task_variable(&path.id, &path.name, value)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn post_variable_data(
    State(state): State<TaskApiState>,
    Path(path): Path<TaskVariablePath>,
    mut multipart: Multipart,
) -> Result<StatusCode, RestError> {
    let mut data: Option<Vec<u8>> = None;
    let mut value_type: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RestError::bad_request(e.to_string()))?
    {
        match field.name() {
            Some("data") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| RestError::bad_request(e.to_string()))?;
                data = Some(bytes.to_vec());
            }
            Some("valueType") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| RestError::bad_request(e.to_string()))?;
                value_type = Some(text);
            }
            _ => {}
        }
    }

    let Some(data) = data else {
        return Err(RestError::bad_request(format!(
            "Cannot put task variable {}: no data part supplied",
            path.name
        )));
    };
    // Only the Bytes type accepts a raw binary payload.
    if let Some(tag) = value_type.as_deref() {
        let tag = TypeTag::parse(tag)
            .map_err(|e| e.context(&format!("Cannot put task variable {}", path.name)))?;
        if tag != TypeTag::Bytes {
            return Err(RestError::bad_request(format!(
                "Cannot put task variable {}: unsupported binary value type '{}'",
                path.name,
                tag.error_name()
            )));
        }
    }

    state
        .engine
        .set_task_variable(&path.id, &path.name, TypedValue::Bytes(data))?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::MemoryEngine;
    use serde_json::json;

    fn state(engine: MemoryEngine) -> TaskApiState {
        TaskApiState { engine: Arc::new(engine) }
    }

    fn path() -> Path<TaskVariablePath> {
        Path(TaskVariablePath { id: "task-1".to_string(), name: "reviewer".to_string() })
    }

    #[tokio::test]
    async fn put_writes_a_converted_value() {
        let engine = MemoryEngine::new();
        engine.add_task("task-1");
        let dto: VariableValueDto =
            serde_json::from_value(json!({"value": "42", "type": "Integer"})).unwrap();
        let status = put_variable(State(state(engine.clone())), path(), Json(dto))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(
            engine.task_variables("task-1"),
            vec![("reviewer".to_string(), TypedValue::Integer(42))]
        );
    }

    #[tokio::test]
    async fn put_conversion_errors_name_the_variable() {
        let engine = MemoryEngine::new();
        engine.add_task("task-1");
        let dto: VariableValueDto =
            serde_json::from_value(json!({"value": "1abc", "type": "Integer"})).unwrap();
        let err = put_variable(State(state(engine)), path(), Json(dto)).await.unwrap_err();
        assert_eq!(
            err,
            RestError::bad_request(
                "Cannot put task variable reviewer: \"1abc\" is not a valid integer value"
            )
        );
    }

    #[tokio::test]
    async fn put_on_unknown_task_is_not_found() {
        let dto: VariableValueDto = serde_json::from_value(json!({"value": 1})).unwrap();
        let err = put_variable(State(state(MemoryEngine::new())), path(), Json(dto))
            .await
            .unwrap_err();
        assert_eq!(err, RestError::not_found("task task-1 doesn't exist"));
    }
}
