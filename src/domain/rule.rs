//! Rule data structures.
//!
//! - `IndicatorType`: indicator family a condition belongs to
//! - `Operator`: comparison applied between two series at one bar
//! - `LogicOperator`: how a condition folds into the running group result
//! - `Condition`: one comparison between two named series
//! - `RuleGroup`: ordered conditions with their pairing logic operators
//!
//! Condition operands are plain series names (`MA5`, `RSI12`, `70`, ...),
//! looked up in the indicator series at evaluation time.

use crate::domain::error::BacktestError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IndicatorType {
    Ma,
    Rsi,
    Macd,
    Kd,
    Bollinger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    Gt,
    Gte,
    Lt,
    Lte,
    CrossAbove,
    CrossBelow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicOperator {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    Entry,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Condition {
    pub id: String,
    pub indicator_type: IndicatorType,
    pub left_param: String,
    pub operator: Operator,
    pub right_param: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleGroup {
    pub id: String,
    pub name: String,
    pub rule_type: RuleType,
    pub conditions: Vec<Condition>,
    pub logic_operators: Vec<LogicOperator>,
}

impl Condition {
    pub fn new(
        indicator_type: IndicatorType,
        left_param: impl Into<String>,
        operator: Operator,
        right_param: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            indicator_type,
            left_param: left_param.into(),
            operator,
            right_param: right_param.into(),
        }
    }
}

impl RuleGroup {
    pub fn new(name: impl Into<String>, rule_type: RuleType) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            rule_type,
            conditions: Vec::new(),
            logic_operators: Vec::new(),
        }
    }

    /// Append a condition, pairing it with `logic` unless it is the first.
    pub fn push(&mut self, condition: Condition, logic: LogicOperator) {
        if !self.conditions.is_empty() {
            self.logic_operators.push(logic);
        }
        self.conditions.push(condition);
    }

    /// Every series name referenced by any condition, in order of appearance.
    pub fn referenced_params(&self) -> impl Iterator<Item = &str> {
        self.conditions
            .iter()
            .flat_map(|c| [c.left_param.as_str(), c.right_param.as_str()])
    }
}

impl IndicatorType {
    pub const ALL: [IndicatorType; 5] = [
        IndicatorType::Ma,
        IndicatorType::Rsi,
        IndicatorType::Macd,
        IndicatorType::Kd,
        IndicatorType::Bollinger,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorType::Ma => "MA",
            IndicatorType::Rsi => "RSI",
            IndicatorType::Macd => "MACD",
            IndicatorType::Kd => "KD",
            IndicatorType::Bollinger => "BOLLINGER",
        }
    }
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Gt => "GT",
            Operator::Gte => "GTE",
            Operator::Lt => "LT",
            Operator::Lte => "LTE",
            Operator::CrossAbove => "CROSS_ABOVE",
            Operator::CrossBelow => "CROSS_BELOW",
        }
    }

    /// Symbol shown to users: `>`, `>=`, `<`, `<=`, `上穿`, `下穿`.
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::CrossAbove => "上穿",
            Operator::CrossBelow => "下穿",
        }
    }

    pub fn is_cross(&self) -> bool {
        matches!(self, Operator::CrossAbove | Operator::CrossBelow)
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for LogicOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicOperator::And => write!(f, "AND"),
            LogicOperator::Or => write!(f, "OR"),
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleType::Entry => write!(f, "entry"),
            RuleType::Exit => write!(f, "exit"),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left_param, self.operator, self.right_param)
    }
}

impl fmt::Display for RuleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cond) in self.conditions.iter().enumerate() {
            if i > 0 {
                let logic = self.logic_operators.get(i - 1).copied().unwrap_or_default();
                write!(f, " {} ", logic)?;
            }
            write!(f, "{}", cond)?;
        }
        Ok(())
    }
}

impl FromStr for IndicatorType {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MA" => Ok(IndicatorType::Ma),
            "RSI" => Ok(IndicatorType::Rsi),
            "MACD" => Ok(IndicatorType::Macd),
            "KD" => Ok(IndicatorType::Kd),
            "BOLLINGER" => Ok(IndicatorType::Bollinger),
            other => Err(BacktestError::RuleInvalid {
                reason: format!("unknown indicator type '{}'", other),
            }),
        }
    }
}

impl FromStr for Operator {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "GT" | ">" => Ok(Operator::Gt),
            "GTE" | ">=" => Ok(Operator::Gte),
            "LT" | "<" => Ok(Operator::Lt),
            "LTE" | "<=" => Ok(Operator::Lte),
            "CROSS_ABOVE" | "上穿" => Ok(Operator::CrossAbove),
            "CROSS_BELOW" | "下穿" => Ok(Operator::CrossBelow),
            other => Err(BacktestError::RuleInvalid {
                reason: format!("unknown operator '{}'", other),
            }),
        }
    }
}

impl FromStr for LogicOperator {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "AND" => Ok(LogicOperator::And),
            "OR" => Ok(LogicOperator::Or),
            other => Err(BacktestError::RuleInvalid {
                reason: format!("unknown logic operator '{}'", other),
            }),
        }
    }
}

impl FromStr for RuleType {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "entry" => Ok(RuleType::Entry),
            "exit" => Ok(RuleType::Exit),
            other => Err(BacktestError::RuleInvalid {
                reason: format!("rule type must be entry or exit, got '{}'", other),
            }),
        }
    }
}
