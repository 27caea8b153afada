//! Signal evaluation engine.
//!
//! Evaluates rule groups against pre-computed indicator series.
//!
//! # Evaluation Semantics
//!
//! - A condition is `false` when either operand is missing from the series or
//!   undefined (`None`) at the bar. Evaluation never fails.
//! - `CROSS_ABOVE`/`CROSS_BELOW`: require `index >= 1` and both operands
//!   defined at `index - 1`
//! - Conditions in a group fold strictly left to right with their paired
//!   logic operator; there is no AND-over-OR precedence
//! - Groups of the same rule type combine with OR

use crate::domain::indicator::IndicatorSeries;
use crate::domain::rule::{Condition, LogicOperator, Operator, RuleGroup, RuleType};

/// Entry and exit signal arrays, one flag per bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signals {
    pub entry: Vec<bool>,
    pub exit: Vec<bool>,
}

fn value_at(series: &IndicatorSeries, name: &str, index: usize) -> Option<f64> {
    series.get(name)?.get(index).copied().flatten()
}

pub fn evaluate_condition(condition: &Condition, series: &IndicatorSeries, index: usize) -> bool {
    let (Some(left), Some(right)) = (
        value_at(series, &condition.left_param, index),
        value_at(series, &condition.right_param, index),
    ) else {
        return false;
    };

    match condition.operator {
        Operator::Gt => left > right,
        Operator::Gte => left >= right,
        Operator::Lt => left < right,
        Operator::Lte => left <= right,
        Operator::CrossAbove | Operator::CrossBelow => {
            if index == 0 {
                return false;
            }
            let (Some(left_prev), Some(right_prev)) = (
                value_at(series, &condition.left_param, index - 1),
                value_at(series, &condition.right_param, index - 1),
            ) else {
                return false;
            };

            if condition.operator == Operator::CrossAbove {
                left_prev <= right_prev && left > right
            } else {
                left_prev >= right_prev && left < right
            }
        }
    }
}

pub fn evaluate_rule_group(group: &RuleGroup, series: &IndicatorSeries, index: usize) -> bool {
    let Some((first, rest)) = group.conditions.split_first() else {
        return false;
    };

    let mut result = evaluate_condition(first, series, index);
    for (i, condition) in rest.iter().enumerate() {
        let current = evaluate_condition(condition, series, index);
        result = match group.logic_operators.get(i).copied().unwrap_or_default() {
            LogicOperator::And => result && current,
            LogicOperator::Or => result || current,
        };
    }
    result
}

/// Produce entry/exit signal arrays of length `n`.
///
/// Groups of the same rule type are OR-ed: the per-type signal is set as soon
/// as one group holds at that bar.
pub fn generate_signals(groups: &[RuleGroup], series: &IndicatorSeries, n: usize) -> Signals {
    let entry_groups: Vec<&RuleGroup> = groups
        .iter()
        .filter(|g| g.rule_type == RuleType::Entry)
        .collect();
    let exit_groups: Vec<&RuleGroup> = groups
        .iter()
        .filter(|g| g.rule_type == RuleType::Exit)
        .collect();

    let any_holds = |selected: &[&RuleGroup], index: usize| {
        selected
            .iter()
            .any(|g| evaluate_rule_group(g, series, index))
    };

    Signals {
        entry: (0..n).map(|i| any_holds(&entry_groups[..], i)).collect(),
        exit: (0..n).map(|i| any_holds(&exit_groups[..], i)).collect(),
    }
}
