//! Filter expression parsing
//!
//! Two equivalent wire encodings produce the same expression list: the
//! textual mini-language `name_OPERATOR_value` (comma separated, GET query
//! strings) and a structured JSON array of `{name, operator, value, type?}`
//! objects (POST bodies). Operators are a closed set; anything else is a 400
//! before the engine is touched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ParamError;
use super::value::TypedValue;

/// Comparison operators of the filter mini-language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Gteq,
    Lt,
    Lteq,
    Like,
}

impl Operator {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "eq" => Some(Self::Eq),
            "neq" => Some(Self::Neq),
            "gt" => Some(Self::Gt),
            "gteq" => Some(Self::Gteq),
            "lt" => Some(Self::Lt),
            "lteq" => Some(Self::Lteq),
            "like" => Some(Self::Like),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Gteq => "gteq",
            Self::Lt => "lt",
            Self::Lteq => "lteq",
            Self::Like => "like",
        }
    }
}

/// The independent variable-filter namespaces. Families coexisting in one
/// request are parsed and applied separately; they never interact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterFamily {
    Variables,
    ProcessVariables,
    CaseInstanceVariables,
}

impl FilterFamily {
    /// Label used in comparator error messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Variables => "variable",
            Self::ProcessVariables => "process variable",
            Self::CaseInstanceVariables => "case variable",
        }
    }
}

/// One parsed filter predicate. The value is already converted, so a
/// constructed expression list implies every declared type was valid.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpression {
    pub name: String,
    pub operator: Operator,
    pub value: TypedValue,
}

/// Structured wire form of a single filter.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableQueryParamDto {
    pub name: String,
    pub operator: String,
    #[serde(default)]
    pub value: Value,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
}

const FORMAT_MESSAGE: &str = "variable query parameter has to have format KEY_OPERATOR_VALUE";

/// Parse the comma-separated textual form for one filter family.
pub fn parse_expression_string(
    family: FilterFamily,
    raw: &str,
) -> Result<Vec<FilterExpression>, ParamError> {
    raw.split(',')
        .map(|token| parse_expression_token(family, token))
        .collect()
}

fn parse_expression_token(
    family: FilterFamily,
    token: &str,
) -> Result<FilterExpression, ParamError> {
    // Operator keywords are underscore-delimited, so the name may not contain
    // an underscore while the value may.
    let mut parts = token.splitn(3, '_');
    let (Some(name), Some(op), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ParamError::new(FORMAT_MESSAGE));
    };
    let operator = Operator::parse(op).ok_or_else(|| {
        ParamError::new(format!(
            "Invalid {} comparator specified: {op}",
            family.label()
        ))
    })?;
    Ok(FilterExpression {
        name: name.to_string(),
        operator,
        value: TypedValue::Untyped(Value::String(value.to_string())),
    })
}

/// Resolve the structured form for one filter family, converting every
/// declared type before any expression becomes visible to callers.
pub fn parse_structured(
    family: FilterFamily,
    dtos: &[VariableQueryParamDto],
) -> Result<Vec<FilterExpression>, ParamError> {
    dtos.iter()
        .map(|dto| {
            let operator = Operator::parse(&dto.operator).ok_or_else(|| {
                ParamError::new(format!(
                    "Invalid {} comparator specified: {}",
                    family.label(),
                    dto.operator
                ))
            })?;
            let value = TypedValue::convert(&dto.value, dto.value_type.as_deref(), None)?;
            Ok(FilterExpression {
                name: dto.name.clone(),
                operator,
                value,
            })
        })
        .collect()
}

/// Re-encode an expression list as the structured wire form.
pub fn to_structured(expressions: &[FilterExpression]) -> Vec<VariableQueryParamDto> {
    expressions
        .iter()
        .map(|e| VariableQueryParamDto {
            name: e.name.clone(),
            operator: e.operator.as_str().to_string(),
            value: e.value.to_json(),
            value_type: e.value.type_tag().map(|t| t.as_str().to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn untyped(s: &str) -> TypedValue {
        TypedValue::Untyped(Value::String(s.to_string()))
    }

    #[test]
    fn parses_every_operator() {
        for (token, op) in [
            ("eq", Operator::Eq),
            ("neq", Operator::Neq),
            ("gt", Operator::Gt),
            ("gteq", Operator::Gteq),
            ("lt", Operator::Lt),
            ("lteq", Operator::Lteq),
            ("like", Operator::Like),
        ] {
            let exprs =
                parse_expression_string(FilterFamily::Variables, &format!("var_{token}_x"))
                    .unwrap();
            assert_eq!(exprs.len(), 1);
            assert_eq!(exprs[0].name, "var");
            assert_eq!(exprs[0].operator, op);
            assert_eq!(exprs[0].value, untyped("x"));
        }
    }

    #[test]
    fn parses_comma_separated_list_in_order() {
        let exprs =
            parse_expression_string(FilterFamily::Variables, "a_eq_1,b_neq_2").unwrap();
        assert_eq!(exprs.len(), 2);
        assert_eq!((exprs[0].name.as_str(), exprs[0].operator), ("a", Operator::Eq));
        assert_eq!((exprs[1].name.as_str(), exprs[1].operator), ("b", Operator::Neq));
    }

    #[test]
    fn value_may_contain_underscores() {
        let exprs =
            parse_expression_string(FilterFamily::Variables, "var_eq_some_value").unwrap();
        assert_eq!(exprs[0].value, untyped("some_value"));
    }

    #[test]
    fn token_without_operator_is_a_format_error() {
        let err = parse_expression_string(FilterFamily::Variables, "invalidFormattedVariableQuery")
            .unwrap_err();
        assert_eq!(err.0, "variable query parameter has to have format KEY_OPERATOR_VALUE");
    }

    #[test]
    fn unknown_comparator_names_the_family() {
        let err = parse_expression_string(FilterFamily::Variables, "var_anInvalidComparator_x")
            .unwrap_err();
        assert_eq!(err.0, "Invalid variable comparator specified: anInvalidComparator");

        let err =
            parse_expression_string(FilterFamily::ProcessVariables, "var_anInvalidComparator_x")
                .unwrap_err();
        assert_eq!(
            err.0,
            "Invalid process variable comparator specified: anInvalidComparator"
        );

        let err = parse_expression_string(
            FilterFamily::CaseInstanceVariables,
            "var_anInvalidComparator_x",
        )
        .unwrap_err();
        assert_eq!(err.0, "Invalid case variable comparator specified: anInvalidComparator");
    }

    #[test]
    fn structured_form_with_declared_type_converts() {
        let dtos = vec![VariableQueryParamDto {
            name: "amount".to_string(),
            operator: "gt".to_string(),
            value: json!("5"),
            value_type: Some("Integer".to_string()),
        }];
        let exprs = parse_structured(FilterFamily::Variables, &dtos).unwrap();
        assert_eq!(exprs[0].value, TypedValue::Integer(5));
    }

    #[test]
    fn structured_form_conversion_failure_aborts_the_list() {
        let dtos = vec![
            VariableQueryParamDto {
                name: "ok".to_string(),
                operator: "eq".to_string(),
                value: json!(1),
                value_type: None,
            },
            VariableQueryParamDto {
                name: "bad".to_string(),
                operator: "eq".to_string(),
                value: json!("1abc"),
                value_type: Some("Long".to_string()),
            },
        ];
        let err = parse_structured(FilterFamily::Variables, &dtos).unwrap_err();
        assert_eq!(err.0, "\"1abc\" is not a valid long value");
    }

    #[test]
    fn structured_form_rejects_unknown_operator() {
        let dtos = vec![VariableQueryParamDto {
            name: "var".to_string(),
            operator: "equals".to_string(),
            value: json!("x"),
            value_type: None,
        }];
        let err = parse_structured(FilterFamily::ProcessVariables, &dtos).unwrap_err();
        assert_eq!(err.0, "Invalid process variable comparator specified: equals");
    }

    #[test]
    fn structured_encoding_keeps_declared_types() {
        let original = vec![FilterExpression {
            name: "amount".to_string(),
            operator: Operator::Gt,
            value: TypedValue::Integer(5),
        }];
        let encoded = to_structured(&original);
        assert_eq!(encoded[0].value_type.as_deref(), Some("Integer"));
        let reparsed = parse_structured(FilterFamily::Variables, &encoded).unwrap();
        assert_eq!(original, reparsed);
    }

    #[test]
    fn structured_round_trip_preserves_triples() {
        let original = parse_expression_string(
            FilterFamily::Variables,
            "a_eq_1,b_like_%x%,c_gteq_10",
        )
        .unwrap();
        let encoded = to_structured(&original);
        let reparsed = parse_structured(FilterFamily::Variables, &encoded).unwrap();
        assert_eq!(original, reparsed);
    }
}
