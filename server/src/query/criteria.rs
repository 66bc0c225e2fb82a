//! Criteria application
//!
//! Replays parsed expressions, sort instructions and the pagination window
//! onto a query sink. The operator-to-method mapping is a closed-enum match
//! per filter family; families that support only a subset of operators reject
//! the rest here, before any predicate call is made for the offending
//! expression's family.

use super::ParamError;
use super::filter::{FilterExpression, Operator};
use super::pagination::Window;
use super::sorting::{SortDirection, SortInstruction};
use crate::engine::EngineError;
use crate::engine::query::{
    CaseInstanceVariablePredicates, ExecutableQuery, ProcessVariablePredicates, SortSink,
    VariablePredicates,
};

/// Apply `variables` family expressions. All seven operators are supported.
pub fn apply_variable_filters<Q>(query: &mut Q, expressions: &[FilterExpression])
where
    Q: VariablePredicates + ?Sized,
{
    for e in expressions {
        match e.operator {
            Operator::Eq => query.variable_value_equals(&e.name, e.value.clone()),
            Operator::Neq => query.variable_value_not_equals(&e.name, e.value.clone()),
            Operator::Gt => query.variable_value_greater_than(&e.name, e.value.clone()),
            Operator::Gteq => {
                query.variable_value_greater_than_or_equal(&e.name, e.value.clone());
            }
            Operator::Lt => query.variable_value_less_than(&e.name, e.value.clone()),
            Operator::Lteq => query.variable_value_less_than_or_equal(&e.name, e.value.clone()),
            Operator::Like => query.variable_value_like(&e.name, e.value.as_text()),
        }
    }
}

/// Apply `processVariables` family expressions. The engine supports equality
/// comparisons only in this family.
pub fn apply_process_variable_filters<Q>(
    query: &mut Q,
    expressions: &[FilterExpression],
) -> Result<(), ParamError>
where
    Q: ProcessVariablePredicates + ?Sized,
{
    for e in expressions {
        match e.operator {
            Operator::Eq => query.process_variable_value_equals(&e.name, e.value.clone()),
            Operator::Neq => query.process_variable_value_not_equals(&e.name, e.value.clone()),
            other => {
                return Err(ParamError::new(format!(
                    "Invalid process variable comparator specified: {}",
                    other.as_str()
                )));
            }
        }
    }
    Ok(())
}

/// Apply `caseInstanceVariables` family expressions.
pub fn apply_case_instance_variable_filters<Q>(query: &mut Q, expressions: &[FilterExpression])
where
    Q: CaseInstanceVariablePredicates + ?Sized,
{
    for e in expressions {
        match e.operator {
            Operator::Eq => query.case_instance_variable_value_equals(&e.name, e.value.clone()),
            Operator::Neq => {
                query.case_instance_variable_value_not_equals(&e.name, e.value.clone());
            }
            Operator::Gt => {
                query.case_instance_variable_value_greater_than(&e.name, e.value.clone());
            }
            Operator::Gteq => {
                query.case_instance_variable_value_greater_than_or_equal(&e.name, e.value.clone());
            }
            Operator::Lt => query.case_instance_variable_value_less_than(&e.name, e.value.clone()),
            Operator::Lteq => {
                query.case_instance_variable_value_less_than_or_equal(&e.name, e.value.clone());
            }
            Operator::Like => {
                query.case_instance_variable_value_like(&e.name, e.value.as_text());
            }
        }
    }
}

/// Request-scoped case-sensitivity flags, applied once before the variable
/// predicates they affect.
pub fn apply_ignore_case_flags<Q>(query: &mut Q, names_ignore_case: bool, values_ignore_case: bool)
where
    Q: VariablePredicates + ?Sized,
{
    if names_ignore_case {
        query.match_variable_names_ignore_case();
    }
    if values_ignore_case {
        query.match_variable_values_ignore_case();
    }
}

/// Replay sort instructions in declaration order: one `order_by` call
/// followed by one direction call per instruction.
pub fn apply_sorting<Q>(query: &mut Q, instructions: &[SortInstruction<Q::Field>])
where
    Q: SortSink + ?Sized,
    Q::Field: Copy,
{
    for instruction in instructions {
        query.order_by(instruction.field);
        match instruction.direction {
            SortDirection::Asc => query.asc(),
            SortDirection::Desc => query.desc(),
        }
    }
}

/// Issue the terminal call for the resolved pagination window.
pub fn execute_window<Q>(query: &mut Q, window: Window) -> Result<Vec<Q::Item>, EngineError>
where
    Q: ExecutableQuery + ?Sized,
{
    match window {
        Window::All => query.list(),
        Window::Page { first, max } => query.list_page(first, max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::filter::{FilterFamily, parse_expression_string};
    use crate::query::value::TypedValue;

    #[derive(Default)]
    struct RecordingSink {
        calls: Vec<String>,
    }

    impl VariablePredicates for RecordingSink {
        fn match_variable_names_ignore_case(&mut self) {
            self.calls.push("matchVariableNamesIgnoreCase".to_string());
        }
        fn match_variable_values_ignore_case(&mut self) {
            self.calls.push("matchVariableValuesIgnoreCase".to_string());
        }
        fn variable_value_equals(&mut self, name: &str, value: TypedValue) {
            self.calls.push(format!("variableValueEquals({name}, {})", value.as_text()));
        }
        fn variable_value_not_equals(&mut self, name: &str, value: TypedValue) {
            self.calls.push(format!("variableValueNotEquals({name}, {})", value.as_text()));
        }
        fn variable_value_greater_than(&mut self, name: &str, value: TypedValue) {
            self.calls.push(format!("variableValueGreaterThan({name}, {})", value.as_text()));
        }
        fn variable_value_greater_than_or_equal(&mut self, name: &str, value: TypedValue) {
            self.calls
                .push(format!("variableValueGreaterThanOrEqual({name}, {})", value.as_text()));
        }
        fn variable_value_less_than(&mut self, name: &str, value: TypedValue) {
            self.calls.push(format!("variableValueLessThan({name}, {})", value.as_text()));
        }
        fn variable_value_less_than_or_equal(&mut self, name: &str, value: TypedValue) {
            self.calls
                .push(format!("variableValueLessThanOrEqual({name}, {})", value.as_text()));
        }
        fn variable_value_like(&mut self, name: &str, value: String) {
            self.calls.push(format!("variableValueLike({name}, {value})"));
        }
    }

    impl ProcessVariablePredicates for RecordingSink {
        fn process_variable_value_equals(&mut self, name: &str, value: TypedValue) {
            self.calls
                .push(format!("processVariableValueEquals({name}, {})", value.as_text()));
        }
        fn process_variable_value_not_equals(&mut self, name: &str, value: TypedValue) {
            self.calls
                .push(format!("processVariableValueNotEquals({name}, {})", value.as_text()));
        }
    }

    #[test]
    fn every_operator_dispatches_to_its_method() {
        let exprs = parse_expression_string(
            FilterFamily::Variables,
            "a_eq_1,b_neq_2,c_gt_3,d_gteq_4,e_lt_5,f_lteq_6,g_like_%7%",
        )
        .unwrap();
        let mut sink = RecordingSink::default();
        apply_variable_filters(&mut sink, &exprs);
        assert_eq!(
            sink.calls,
            vec![
                "variableValueEquals(a, 1)",
                "variableValueNotEquals(b, 2)",
                "variableValueGreaterThan(c, 3)",
                "variableValueGreaterThanOrEqual(d, 4)",
                "variableValueLessThan(e, 5)",
                "variableValueLessThanOrEqual(f, 6)",
                "variableValueLike(g, %7%)",
            ]
        );
    }

    #[test]
    fn ignore_case_flags_precede_variable_predicates() {
        let exprs =
            parse_expression_string(FilterFamily::Variables, "a_eq_1").unwrap();
        let mut sink = RecordingSink::default();
        apply_ignore_case_flags(&mut sink, true, true);
        apply_variable_filters(&mut sink, &exprs);
        assert_eq!(
            sink.calls,
            vec![
                "matchVariableNamesIgnoreCase",
                "matchVariableValuesIgnoreCase",
                "variableValueEquals(a, 1)",
            ]
        );
    }

    #[test]
    fn process_variable_family_supports_equality_only() {
        let exprs =
            parse_expression_string(FilterFamily::ProcessVariables, "a_eq_1,b_neq_2").unwrap();
        let mut sink = RecordingSink::default();
        apply_process_variable_filters(&mut sink, &exprs).unwrap();
        assert_eq!(
            sink.calls,
            vec![
                "processVariableValueEquals(a, 1)",
                "processVariableValueNotEquals(b, 2)",
            ]
        );

        let exprs =
            parse_expression_string(FilterFamily::ProcessVariables, "a_gt_1").unwrap();
        let err = apply_process_variable_filters(&mut RecordingSink::default(), &exprs)
            .unwrap_err();
        assert_eq!(err.0, "Invalid process variable comparator specified: gt");
    }
}
