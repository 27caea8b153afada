//! Condition DSL parser.
//!
//! Grammar (tokens separated by whitespace):
//!
//! ```text
//! group     := condition ( logic condition )*
//! condition := operand operator operand
//! logic     := AND | OR
//! operator  := GT | > | GTE | >= | LT | < | LTE | <= | CROSS_ABOVE | 上穿 | CROSS_BELOW | 下穿
//! operand   := any token that is not an operator or logic keyword
//! ```
//!
//! Errors carry the character offset of the offending token.

use crate::domain::error::ParseError;
use crate::domain::indicator;
use crate::domain::rule::{Condition, IndicatorType, LogicOperator, Operator, RuleGroup, RuleType};

#[derive(Debug, Clone, PartialEq)]
struct Token<'a> {
    text: &'a str,
    /// Character (not byte) offset into the input.
    position: usize,
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    end: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            tokens: tokenize(input),
            pos: 0,
            end: input.chars().count(),
        }
    }

    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn error_here(&self, message: String) -> ParseError {
        ParseError {
            message,
            position: self.peek().map(|t| t.position).unwrap_or(self.end),
        }
    }

    fn parse_operand(&mut self) -> Result<&'a str, ParseError> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.error_here("expected operand, found end of input".to_string()));
        };
        if parse_operator(token.text).is_some() || parse_logic(token.text).is_some() {
            return Err(self.error_here(format!("expected operand, found '{}'", token.text)));
        }
        self.pos += 1;
        Ok(token.text)
    }

    fn parse_operator(&mut self) -> Result<Operator, ParseError> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.error_here("expected operator, found end of input".to_string()));
        };
        match parse_operator(token.text) {
            Some(op) => {
                self.pos += 1;
                Ok(op)
            }
            None => Err(self.error_here(format!(
                "expected operator (GT, GTE, LT, LTE, CROSS_ABOVE, CROSS_BELOW), found '{}'",
                token.text
            ))),
        }
    }

    fn parse_condition(&mut self) -> Result<Condition, ParseError> {
        let left = self.parse_operand()?;
        let operator = self.parse_operator()?;
        let right = self.parse_operand()?;
        Ok(Condition::new(
            infer_indicator_type(left, right),
            left,
            operator,
            right,
        ))
    }

    fn parse_group(&mut self, group: &mut RuleGroup) -> Result<(), ParseError> {
        let first = self.parse_condition()?;
        group.push(first, LogicOperator::And);

        while let Some(token) = self.peek().cloned() {
            let Some(logic) = parse_logic(token.text) else {
                return Err(self.error_here(format!("expected AND or OR, found '{}'", token.text)));
            };
            self.pos += 1;
            let condition = self.parse_condition()?;
            group.push(condition, logic);
        }
        Ok(())
    }
}

fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start: Option<(usize, usize)> = None;

    for (char_idx, (byte_idx, ch)) in input.char_indices().enumerate() {
        if ch.is_whitespace() {
            if let Some((byte_start, char_start)) = start.take() {
                tokens.push(Token {
                    text: &input[byte_start..byte_idx],
                    position: char_start,
                });
            }
        } else if start.is_none() {
            start = Some((byte_idx, char_idx));
        }
    }
    if let Some((byte_start, char_start)) = start {
        tokens.push(Token {
            text: &input[byte_start..],
            position: char_start,
        });
    }
    tokens
}

fn parse_operator(text: &str) -> Option<Operator> {
    text.parse().ok()
}

fn parse_logic(text: &str) -> Option<LogicOperator> {
    text.parse().ok()
}

/// Indicator family implied by a series name, if any.
///
/// Close price and constant lines belong to no single family.
pub fn indicator_type_of(name: &str) -> Option<IndicatorType> {
    let suffix_is_period = |prefix: &str| {
        name.strip_prefix(prefix)
            .map(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(false)
    };

    if suffix_is_period("MA") {
        Some(IndicatorType::Ma)
    } else if suffix_is_period("RSI") {
        Some(IndicatorType::Rsi)
    } else if indicator::MACD_FAMILY.contains(&name) {
        Some(IndicatorType::Macd)
    } else if indicator::KD_FAMILY.contains(&name) {
        Some(IndicatorType::Kd)
    } else if indicator::BOLLINGER_FAMILY.contains(&name) {
        Some(IndicatorType::Bollinger)
    } else {
        None
    }
}

/// The left operand decides; the right one is consulted when the left is the
/// close price or a constant. Falls back to MA when neither side names a
/// family (e.g. `收盤價 > 50`).
pub fn infer_indicator_type(left: &str, right: &str) -> IndicatorType {
    indicator_type_of(left)
        .or_else(|| indicator_type_of(right))
        .unwrap_or(IndicatorType::Ma)
}

/// Parse `input` into a rule group named `name`.
///
/// The returned group and its conditions carry empty ids; the rule store
/// assigns them on insertion.
pub fn parse_group(name: &str, rule_type: RuleType, input: &str) -> Result<RuleGroup, ParseError> {
    let mut parser = Parser::new(input);
    let mut group = RuleGroup::new(name, rule_type);
    parser.parse_group(&mut group)?;
    Ok(group)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_single_condition() {
        let group = parse_group("g", RuleType::Entry, "MA5 CROSS_ABOVE MA20").unwrap();
        assert_eq!(group.conditions.len(), 1);
        assert!(group.logic_operators.is_empty());
        let c = &group.conditions[0];
        assert_eq!(c.left_param, "MA5");
        assert_eq!(c.operator, Operator::CrossAbove);
        assert_eq!(c.right_param, "MA20");
        assert_eq!(c.indicator_type, IndicatorType::Ma);
    }

    #[test]
    fn parse_chain_with_symbols() {
        let group = parse_group(
            "g",
            RuleType::Entry,
            "MA5 上穿 MA20 AND RSI12 < 70 OR K >= 80",
        )
        .unwrap();
        assert_eq!(group.conditions.len(), 3);
        assert_eq!(
            group.logic_operators,
            vec![LogicOperator::And, LogicOperator::Or]
        );
        assert_eq!(group.conditions[1].indicator_type, IndicatorType::Rsi);
        assert_eq!(group.conditions[2].operator, Operator::Gte);
        assert_eq!(group.conditions[2].indicator_type, IndicatorType::Kd);
    }

    #[test]
    fn infer_from_right_when_left_is_close() {
        let group = parse_group("g", RuleType::Exit, "收盤價 下穿 下軌").unwrap();
        assert_eq!(group.conditions[0].indicator_type, IndicatorType::Bollinger);
        assert_eq!(group.conditions[0].left_param, "收盤價");
    }

    #[test]
    fn infer_macd_family() {
        assert_eq!(infer_indicator_type("DIF", "MACD"), IndicatorType::Macd);
        assert_eq!(infer_indicator_type("OSC", "0"), IndicatorType::Macd);
        assert_eq!(infer_indicator_type("收盤價", "50"), IndicatorType::Ma);
        assert_eq!(indicator_type_of("MA"), None);
        assert_eq!(indicator_type_of("MAX5"), None);
    }

    #[test]
    fn error_on_unknown_operator_points_at_token() {
        let err = parse_group("g", RuleType::Entry, "MA5 ABOVE MA20").unwrap_err();
        assert_eq!(err.position, 4);
        assert!(err.message.contains("ABOVE"));
    }

    #[test]
    fn error_position_counts_characters() {
        // "MA5 上穿 MA20 XOR" -> XOR starts at char 12
        let err = parse_group("g", RuleType::Entry, "MA5 上穿 MA20 XOR").unwrap_err();
        assert_eq!(err.position, 12);
        assert!(err.message.contains("AND or OR"));
    }

    #[test]
    fn error_on_trailing_logic() {
        let input = "MA5 > MA20 AND";
        let err = parse_group("g", RuleType::Entry, input).unwrap_err();
        assert_eq!(err.position, input.chars().count());
        assert!(err.message.contains("end of input"));
    }

    #[test]
    fn error_on_empty_input() {
        let err = parse_group("g", RuleType::Entry, "   ").unwrap_err();
        assert!(err.message.contains("expected operand"));
    }

    #[test]
    fn error_on_operator_as_operand() {
        let err = parse_group("g", RuleType::Entry, "> MA5 MA20").unwrap_err();
        assert_eq!(err.position, 0);
    }

    #[test]
    fn tokenize_tracks_char_offsets() {
        let tokens = tokenize("  收盤價  >\t上軌");
        let positions: Vec<usize> = tokens.iter().map(|t| t.position).collect();
        let texts: Vec<&str> = tokens.iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["收盤價", ">", "上軌"]);
        assert_eq!(positions, vec![2, 7, 9]);
    }
}
