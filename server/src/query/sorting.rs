//! Sort parameter validation
//!
//! A single `sortBy`/`sortOrder` pair (query string) or a structured
//! `sorting` array (JSON body) resolve to an ordered instruction list. Each
//! entry needs both halves and an allowed field; the first instruction is the
//! primary ordering, later ones are tie-breakers in declaration order.

use serde::Deserialize;

use super::ParamError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Structured wire form of one sorting entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortingDto {
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<String>,
}

/// A validated `(field, direction)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortInstruction<F> {
    pub field: F,
    pub direction: SortDirection,
}

const PAIRING_MESSAGE: &str =
    "Only a single sorting parameter specified. sortBy and sortOrder required";

/// Resolve the single pair and the structured list into one instruction
/// sequence. `parse_field` is the entity's allowed-field lookup.
pub fn resolve_sorting<F>(
    sort_by: Option<&str>,
    sort_order: Option<&str>,
    sorting: Option<&[SortingDto]>,
    parse_field: impl Fn(&str) -> Option<F>,
) -> Result<Vec<SortInstruction<F>>, ParamError> {
    let mut instructions = Vec::new();

    match (sort_by, sort_order) {
        (None, None) => {}
        (Some(by), Some(order)) => {
            instructions.push(validate_pair(by, order, &parse_field)?);
        }
        _ => return Err(ParamError::new(PAIRING_MESSAGE)),
    }

    for dto in sorting.unwrap_or_default() {
        match (dto.sort_by.as_deref(), dto.sort_order.as_deref()) {
            (Some(by), Some(order)) => {
                instructions.push(validate_pair(by, order, &parse_field)?);
            }
            _ => return Err(ParamError::new(PAIRING_MESSAGE)),
        }
    }

    Ok(instructions)
}

fn validate_pair<F>(
    sort_by: &str,
    sort_order: &str,
    parse_field: &impl Fn(&str) -> Option<F>,
) -> Result<SortInstruction<F>, ParamError> {
    let field = parse_field(sort_by).ok_or_else(|| {
        ParamError::new(format!("sortBy parameter has invalid value: {sort_by}"))
    })?;
    let direction = match sort_order {
        "asc" => SortDirection::Asc,
        "desc" => SortDirection::Desc,
        other => {
            return Err(ParamError::new(format!(
                "sortOrder parameter has invalid value: {other}"
            )));
        }
    };
    Ok(SortInstruction { field, direction })
}
