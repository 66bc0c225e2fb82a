//! Dual-shape wire parameters
//!
//! GET query strings and POST JSON bodies are alternate encodings of the same
//! criteria, so a handful of parameters accept either a compact string or a
//! structured array under the same key. The custom `Deserialize` impls below
//! make one DTO type serve both encodings.

use std::fmt;

use serde::de::value::SeqAccessDeserializer;
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::Deserialize;

use super::ParamError;
use super::filter::{
    self, FilterExpression, FilterFamily, VariableQueryParamDto, parse_expression_string,
};

/// A variable filter parameter: textual mini-language or structured array.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableListParam {
    Expression(String),
    Structured(Vec<VariableQueryParamDto>),
}

impl VariableListParam {
    /// Parse into an expression list for the given filter family.
    pub fn resolve(&self, family: FilterFamily) -> Result<Vec<FilterExpression>, ParamError> {
        match self {
            Self::Expression(raw) => parse_expression_string(family, raw),
            Self::Structured(dtos) => filter::parse_structured(family, dtos),
        }
    }
}

impl<'de> Deserialize<'de> for VariableListParam {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ParamVisitor;

        impl<'de> Visitor<'de> for ParamVisitor {
            type Value = VariableListParam;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a KEY_OPERATOR_VALUE string or an array of filter objects")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(VariableListParam::Expression(v.to_string()))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<Self::Value, A::Error> {
                let dtos = Vec::deserialize(SeqAccessDeserializer::new(seq))?;
                Ok(VariableListParam::Structured(dtos))
            }
        }

        deserializer.deserialize_any(ParamVisitor)
    }
}

/// A string-list parameter: comma-separated (GET) or JSON array (POST).
#[derive(Debug, Clone, PartialEq)]
pub enum StringListParam {
    Csv(String),
    List(Vec<String>),
}

impl StringListParam {
    /// Individual values in wire order.
    pub fn values(&self) -> Vec<String> {
        match self {
            Self::Csv(raw) => raw.split(',').map(str::to_string).collect(),
            Self::List(values) => values.clone(),
        }
    }
}

impl<'de> Deserialize<'de> for StringListParam {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ParamVisitor;

        impl<'de> Visitor<'de> for ParamVisitor {
            type Value = StringListParam;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a comma-separated string or an array of strings")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(StringListParam::Csv(v.to_string()))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<Self::Value, A::Error> {
                let values = Vec::deserialize(SeqAccessDeserializer::new(seq))?;
                Ok(StringListParam::List(values))
            }
        }

        deserializer.deserialize_any(ParamVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::filter::Operator;
    use crate::query::value::TypedValue;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Holder {
        #[serde(default)]
        variables: Option<VariableListParam>,
        #[serde(default)]
        tenant_id_in: Option<StringListParam>,
    }

    #[test]
    fn json_string_decodes_as_textual_form() {
        let h: Holder =
            serde_json::from_value(json!({"variables": "a_eq_1"})).unwrap();
        let exprs = h
            .variables
            .unwrap()
            .resolve(FilterFamily::Variables)
            .unwrap();
        assert_eq!(exprs[0].operator, Operator::Eq);
    }

    #[test]
    fn json_array_decodes_as_structured_form() {
        let h: Holder = serde_json::from_value(json!({
            "variables": [{"name": "a", "operator": "lt", "value": 9}]
        }))
        .unwrap();
        let exprs = h
            .variables
            .unwrap()
            .resolve(FilterFamily::Variables)
            .unwrap();
        assert_eq!(exprs[0].operator, Operator::Lt);
        assert_eq!(exprs[0].value, TypedValue::Untyped(json!(9)));
    }

    #[test]
    fn string_list_splits_csv_in_order() {
        let h: Holder =
            serde_json::from_value(json!({"tenant_id_in": "tenant1,tenant2"})).unwrap();
        assert_eq!(h.tenant_id_in.unwrap().values(), vec!["tenant1", "tenant2"]);
    }

    #[test]
    fn string_list_accepts_json_array() {
        let h: Holder =
            serde_json::from_value(json!({"tenant_id_in": ["tenant1", "tenant2"]})).unwrap();
        assert_eq!(h.tenant_id_in.unwrap().values(), vec!["tenant1", "tenant2"]);
    }
}
