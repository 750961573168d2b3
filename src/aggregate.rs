//! Result aggregation for mutating events.
//!
//! Merges the optional results of all handlers subscribed to a mutating
//! event into the single effective mutation the agent loop applies. The
//! aggregator is event-type-aware: per event it knows which fields are
//! mergeable and by what rule, and it drops anything outside that closed
//! contract with an attributable warning instead of propagating it.

use serde_json::Value;

use crate::bus::HandlerOutput;

/// Field carrying a system-prompt append in a `before_agent_start` result.
pub const SYSTEM_PROMPT_APPEND: &str = "systemPromptAppend";

/// Boundary inserted between append contributions from different handlers.
pub const APPEND_SEPARATOR: &str = "\n";

/// The merged mutation applied before an agent run.
///
/// A field absent from every handler's result stays `None`; merge never
/// invents a default. `Some("")` means an extension contributed an empty
/// string, which is an opinion, not an absence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentStartMutation {
    pub system_prompt_append: Option<String>,
}

impl AgentStartMutation {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.system_prompt_append.is_none()
    }
}

/// A handler result (or part of one) the aggregator refused to propagate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregationWarning {
    /// The handler returned a field outside the event's merge contract.
    UnknownField { extension: String, field: String },
    /// A recognized field carried a value of the wrong type.
    InvalidField { extension: String, field: String },
    /// The handler returned something other than a JSON object.
    NonObject { extension: String },
}

impl std::fmt::Display for AggregationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownField { extension, field } => write!(
                f,
                "Extension {extension}: dropped unknown result field '{field}'"
            ),
            Self::InvalidField { extension, field } => write!(
                f,
                "Extension {extension}: dropped result field '{field}' with unexpected type"
            ),
            Self::NonObject { extension } => write!(
                f,
                "Extension {extension}: dropped non-object handler result"
            ),
        }
    }
}

/// Merge `before_agent_start` handler results in invocation order.
///
/// `systemPromptAppend` values are concatenated in order, separated by
/// [`APPEND_SEPARATOR`]; no present value is dropped, no absent value
/// contributes.
#[must_use]
pub fn aggregate_before_agent_start(
    outputs: &[HandlerOutput],
) -> (AgentStartMutation, Vec<AggregationWarning>) {
    let mut appends: Vec<String> = Vec::new();
    let mut warnings = Vec::new();

    for output in outputs {
        let Some(value) = &output.value else {
            continue; // no opinion
        };

        let Value::Object(fields) = value else {
            warnings.push(AggregationWarning::NonObject {
                extension: output.extension.clone(),
            });
            continue;
        };

        for (field, field_value) in fields {
            if field == SYSTEM_PROMPT_APPEND {
                match field_value {
                    Value::String(text) => appends.push(text.clone()),
                    // null means the handler explicitly had no opinion
                    Value::Null => {}
                    _ => warnings.push(AggregationWarning::InvalidField {
                        extension: output.extension.clone(),
                        field: field.clone(),
                    }),
                }
            } else {
                warnings.push(AggregationWarning::UnknownField {
                    extension: output.extension.clone(),
                    field: field.clone(),
                });
            }
        }
    }

    let mutation = AgentStartMutation {
        system_prompt_append: if appends.is_empty() {
            None
        } else {
            Some(appends.join(APPEND_SEPARATOR))
        },
    };
    (mutation, warnings)
}
