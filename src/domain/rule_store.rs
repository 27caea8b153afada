//! In-memory rule-group store.
//!
//! The store is an owned value rather than global state. Its map sits behind
//! an `RwLock` so a shared handle (`Arc<RuleStore>`) can serve concurrent
//! readers while edits are serialized. A backtest run reads its rule groups
//! through [`RuleStore::snapshot`], so later edits never leak into a run that
//! is already in flight.

use crate::domain::error::BacktestError;
use crate::domain::indicator::{CLOSE, LOWER_BAND, MIDDLE_BAND, UPPER_BAND};
use crate::domain::rule::{Condition, IndicatorType, LogicOperator, Operator, RuleGroup, RuleType};
use rand::Rng;
use std::collections::HashSet;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

const MA_PARAMS: &[&str] = &["MA5", "MA10", "MA20", "MA60", "MA120", "MA240", CLOSE];
const RSI_PARAMS: &[&str] = &["RSI6", "RSI12", "RSI24", "50", "70", "30", "80", "20"];
const MACD_PARAMS: &[&str] = &["DIF", "MACD", "OSC", "0"];
const KD_PARAMS: &[&str] = &["K", "D", "20", "50", "80"];
const BOLLINGER_PARAMS: &[&str] = &[UPPER_BAND, MIDDLE_BAND, LOWER_BAND, CLOSE];

/// Operands offered for conditions of the given indicator type.
pub fn indicator_params(indicator_type: IndicatorType) -> &'static [&'static str] {
    match indicator_type {
        IndicatorType::Ma => MA_PARAMS,
        IndicatorType::Rsi => RSI_PARAMS,
        IndicatorType::Macd => MACD_PARAMS,
        IndicatorType::Kd => KD_PARAMS,
        IndicatorType::Bollinger => BOLLINGER_PARAMS,
    }
}

#[derive(Debug, Default)]
pub struct RuleStore {
    groups: RwLock<Vec<RuleGroup>>,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<RuleGroup>> {
        self.groups.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<RuleGroup>> {
        self.groups.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create_group(
        &self,
        name: &str,
        rule_type: RuleType,
    ) -> Result<RuleGroup, BacktestError> {
        self.insert_group(RuleGroup::new(name, rule_type))
    }

    /// Store a fully built group (e.g. from the condition parser), assigning
    /// fresh ids to the group and each of its conditions.
    pub fn insert_group(&self, mut group: RuleGroup) -> Result<RuleGroup, BacktestError> {
        if group.name.trim().is_empty() {
            return Err(BacktestError::RuleInvalid {
                reason: "rule group name must not be empty".to_string(),
            });
        }
        let expected = group.conditions.len().saturating_sub(1);
        if group.logic_operators.len() != expected {
            return Err(BacktestError::RuleInvalid {
                reason: format!(
                    "rule group '{}' has {} conditions but {} logic operators",
                    group.name,
                    group.conditions.len(),
                    group.logic_operators.len()
                ),
            });
        }

        let mut groups = self.write();
        let mut taken = used_ids(&groups);
        group.id = fresh_id(&mut taken);
        for condition in &mut group.conditions {
            condition.id = fresh_id(&mut taken);
        }

        debug!(id = %group.id, name = %group.name, rule_type = %group.rule_type, "rule group created");
        groups.push(group.clone());
        Ok(group)
    }

    /// Append a condition to a group. `logic` pairs the new condition with the
    /// previous one and is ignored for a group's first condition.
    pub fn add_condition(
        &self,
        group_id: &str,
        indicator_type: IndicatorType,
        left_param: &str,
        operator: Operator,
        right_param: &str,
        logic: LogicOperator,
    ) -> Result<Condition, BacktestError> {
        let mut groups = self.write();
        let mut taken = used_ids(&groups);
        let group = find_mut(&mut groups, group_id)?;

        let mut condition = Condition::new(indicator_type, left_param, operator, right_param);
        condition.id = fresh_id(&mut taken);
        group.push(condition.clone(), logic);
        Ok(condition)
    }

    /// Remove a condition along with the logic operator that paired it: the
    /// one before it, or the first one when removing the head condition.
    pub fn remove_condition(&self, group_id: &str, condition_id: &str) -> Result<(), BacktestError> {
        let mut groups = self.write();
        let group = find_mut(&mut groups, group_id)?;

        let Some(index) = group.conditions.iter().position(|c| c.id == condition_id) else {
            return Err(BacktestError::ConditionNotFound {
                group_id: group_id.to_string(),
                condition_id: condition_id.to_string(),
            });
        };

        group.conditions.remove(index);
        if !group.logic_operators.is_empty() {
            group.logic_operators.remove(index.saturating_sub(1));
        }
        Ok(())
    }

    pub fn remove_group(&self, group_id: &str) -> Result<RuleGroup, BacktestError> {
        let mut groups = self.write();
        let index = groups
            .iter()
            .position(|g| g.id == group_id)
            .ok_or_else(|| BacktestError::RuleGroupNotFound {
                id: group_id.to_string(),
            })?;
        Ok(groups.remove(index))
    }

    pub fn get_group(&self, group_id: &str) -> Result<RuleGroup, BacktestError> {
        self.read()
            .iter()
            .find(|g| g.id == group_id)
            .cloned()
            .ok_or_else(|| BacktestError::RuleGroupNotFound {
                id: group_id.to_string(),
            })
    }

    /// Consistent copy of every group, in insertion order.
    pub fn snapshot(&self) -> Vec<RuleGroup> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    /// Golden-cross entry (MA5 crosses above MA20 while RSI12 < 70) and
    /// death-cross exit (MA5 crosses below MA20).
    pub fn load_default_rules(&self) -> Result<(), BacktestError> {
        let entry = self.create_group("均線黃金交叉進場", RuleType::Entry)?;
        self.add_condition(
            &entry.id,
            IndicatorType::Ma,
            "MA5",
            Operator::CrossAbove,
            "MA20",
            LogicOperator::And,
        )?;
        self.add_condition(
            &entry.id,
            IndicatorType::Rsi,
            "RSI12",
            Operator::Lt,
            "70",
            LogicOperator::And,
        )?;

        let exit = self.create_group("均線死亡交叉出場", RuleType::Exit)?;
        self.add_condition(
            &exit.id,
            IndicatorType::Ma,
            "MA5",
            Operator::CrossBelow,
            "MA20",
            LogicOperator::And,
        )?;
        Ok(())
    }
}

fn find_mut<'g>(groups: &'g mut [RuleGroup], group_id: &str) -> Result<&'g mut RuleGroup, BacktestError> {
    groups
        .iter_mut()
        .find(|g| g.id == group_id)
        .ok_or_else(|| BacktestError::RuleGroupNotFound {
            id: group_id.to_string(),
        })
}

fn used_ids(groups: &[RuleGroup]) -> HashSet<String> {
    groups
        .iter()
        .flat_map(|g| std::iter::once(g.id.clone()).chain(g.conditions.iter().map(|c| c.id.clone())))
        .collect()
}

/// Eight lowercase hex characters, unique among `taken`.
fn fresh_id(taken: &mut HashSet<String>) -> String {
    let mut rng = rand::thread_rng();
    loop {
        let id = format!("{:08x}", rng.r#gen::<u32>());
        if taken.insert(id.clone()) {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn store_with_group(conditions: usize) -> (RuleStore, RuleGroup, Vec<Condition>) {
        let store = RuleStore::new();
        let group = store.create_group("test", RuleType::Entry).unwrap();
        let added = (0..conditions)
            .map(|i| {
                store
                    .add_condition(
                        &group.id,
                        IndicatorType::Ma,
                        &format!("MA{}", 5 * (i + 1)),
                        Operator::Gt,
                        "MA20",
                        if i % 2 == 0 { LogicOperator::And } else { LogicOperator::Or },
                    )
                    .unwrap()
            })
            .collect();
        (store, group, added)
    }

    #[test]
    fn create_assigns_hex_id() {
        let store = RuleStore::new();
        let group = store.create_group("均線", RuleType::Entry).unwrap();
        assert_eq!(group.id.len(), 8);
        assert!(group.id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn create_rejects_empty_name() {
        let store = RuleStore::new();
        assert!(matches!(
            store.create_group("  ", RuleType::Exit),
            Err(BacktestError::RuleInvalid { .. })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn add_condition_pairs_logic_after_first() {
        let (store, group, _) = store_with_group(3);
        let stored = store.get_group(&group.id).unwrap();
        assert_eq!(stored.conditions.len(), 3);
        // first condition's logic is dropped; second was OR, third AND
        assert_eq!(
            stored.logic_operators,
            vec![LogicOperator::Or, LogicOperator::And]
        );
    }

    #[test]
    fn add_condition_unknown_group() {
        let store = RuleStore::new();
        let err = store
            .add_condition("missing", IndicatorType::Ma, "MA5", Operator::Gt, "MA20", LogicOperator::And)
            .unwrap_err();
        assert!(matches!(err, BacktestError::RuleGroupNotFound { .. }));
    }

    #[test]
    fn remove_head_condition_drops_first_logic() {
        let (store, group, added) = store_with_group(3);
        store.remove_condition(&group.id, &added[0].id).unwrap();
        let stored = store.get_group(&group.id).unwrap();
        assert_eq!(stored.conditions.len(), 2);
        assert_eq!(stored.logic_operators, vec![LogicOperator::And]);
    }

    #[test]
    fn remove_middle_condition_drops_its_pairing() {
        let (store, group, added) = store_with_group(3);
        store.remove_condition(&group.id, &added[1].id).unwrap();
        let stored = store.get_group(&group.id).unwrap();
        assert_eq!(stored.conditions[0].id, added[0].id);
        assert_eq!(stored.conditions[1].id, added[2].id);
        assert_eq!(stored.logic_operators, vec![LogicOperator::And]);
    }

    #[test]
    fn remove_keeps_logic_length_invariant() {
        let (store, group, added) = store_with_group(4);
        for condition in &added {
            store.remove_condition(&group.id, &condition.id).unwrap();
            let stored = store.get_group(&group.id).unwrap();
            assert_eq!(
                stored.logic_operators.len(),
                stored.conditions.len().saturating_sub(1)
            );
        }
    }

    #[test]
    fn remove_unknown_condition() {
        let (store, group, _) = store_with_group(1);
        let err = store.remove_condition(&group.id, "nope").unwrap_err();
        assert!(matches!(err, BacktestError::ConditionNotFound { .. }));
    }

    #[test]
    fn remove_group() {
        let (store, group, _) = store_with_group(1);
        let removed = store.remove_group(&group.id).unwrap();
        assert_eq!(removed.id, group.id);
        assert!(store.is_empty());
        assert!(matches!(
            store.get_group(&group.id),
            Err(BacktestError::RuleGroupNotFound { .. })
        ));
    }

    #[test]
    fn insert_group_assigns_condition_ids() {
        let store = RuleStore::new();
        let mut group = RuleGroup::new("parsed", RuleType::Exit);
        group.push(
            Condition::new(IndicatorType::Kd, "K", Operator::CrossBelow, "D"),
            LogicOperator::And,
        );
        group.push(
            Condition::new(IndicatorType::Kd, "K", Operator::Gt, "80"),
            LogicOperator::Or,
        );
        let stored = store.insert_group(group).unwrap();
        assert_ne!(stored.conditions[0].id, stored.conditions[1].id);
        assert!(stored.conditions.iter().all(|c| c.id.len() == 8));
    }

    #[test]
    fn insert_group_rejects_mismatched_logic() {
        let store = RuleStore::new();
        let mut group = RuleGroup::new("bad", RuleType::Entry);
        group.logic_operators.push(LogicOperator::Or);
        assert!(matches!(
            store.insert_group(group),
            Err(BacktestError::RuleInvalid { .. })
        ));
    }

    #[test]
    fn snapshot_is_detached_from_later_edits() {
        let (store, group, _) = store_with_group(1);
        let snapshot = store.snapshot();
        store
            .add_condition(&group.id, IndicatorType::Rsi, "RSI6", Operator::Lt, "30", LogicOperator::Or)
            .unwrap();
        assert_eq!(snapshot[0].conditions.len(), 1);
        assert_eq!(store.get_group(&group.id).unwrap().conditions.len(), 2);
    }

    #[test]
    fn default_rules() {
        let store = RuleStore::new();
        store.load_default_rules().unwrap();
        let groups = store.snapshot();
        assert_eq!(groups.len(), 2);

        assert_eq!(groups[0].rule_type, RuleType::Entry);
        assert_eq!(groups[0].to_string(), "MA5 CROSS_ABOVE MA20 AND RSI12 LT 70");
        assert_eq!(groups[1].rule_type, RuleType::Exit);
        assert_eq!(groups[1].to_string(), "MA5 CROSS_BELOW MA20");
    }

    #[test]
    fn clear_empties_store() {
        let store = RuleStore::new();
        store.load_default_rules().unwrap();
        store.clear();
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn shared_handle_across_threads() {
        let store = Arc::new(RuleStore::new());
        let group = store.create_group("shared", RuleType::Entry).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = Arc::clone(&store);
                let id = group.id.clone();
                std::thread::spawn(move || {
                    store
                        .add_condition(&id, IndicatorType::Ma, &format!("MA{}", i), Operator::Gt, "0", LogicOperator::And)
                        .unwrap();
                    store.snapshot().len()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 1);
        }
        let stored = store.get_group(&group.id).unwrap();
        assert_eq!(stored.conditions.len(), 4);
        assert_eq!(stored.logic_operators.len(), 3);
    }

    #[test]
    fn params_per_indicator() {
        assert!(indicator_params(IndicatorType::Ma).contains(&"收盤價"));
        assert_eq!(indicator_params(IndicatorType::Macd), &["DIF", "MACD", "OSC", "0"]);
        assert!(indicator_params(IndicatorType::Bollinger).contains(&"中軌"));
        assert_eq!(indicator_params(IndicatorType::Rsi).len(), 8);
    }
}
