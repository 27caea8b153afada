//! Domain error types.

/// A parse error with position information for condition parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    ///
    /// `position` is a character offset, so the caret lines up under
    /// multi-byte operands such as `上穿`.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for twbacktest.
#[derive(Debug, thiserror::Error)]
pub enum BacktestError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    RuleParse(#[from] ParseError),

    #[error("invalid rule: {reason}")]
    RuleInvalid { reason: String },

    #[error("rule group not found: {id}")]
    RuleGroupNotFound { id: String },

    #[error("condition {condition_id} not found in rule group {group_id}")]
    ConditionNotFound {
        group_id: String,
        condition_id: String,
    },

    #[error("data source error: {reason}")]
    Data { reason: String },

    #[error("no data for {code} on {market}")]
    NoData { code: String, market: String },

    #[error("report serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&BacktestError> for std::process::ExitCode {
    fn from(err: &BacktestError) -> Self {
        let code: u8 = match err {
            BacktestError::Io(_) | BacktestError::Serialize(_) => 1,
            BacktestError::ConfigParse { .. }
            | BacktestError::ConfigMissing { .. }
            | BacktestError::ConfigInvalid { .. } => 2,
            BacktestError::Data { .. } => 3,
            BacktestError::RuleParse(_)
            | BacktestError::RuleInvalid { .. }
            | BacktestError::RuleGroupNotFound { .. }
            | BacktestError::ConditionNotFound { .. } => 4,
            BacktestError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
