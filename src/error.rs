//! Construction-time errors.
//!
//! Every variant aborts binder construction. Runtime value retrieval never
//! fails: it degrades to an empty value instead (see `expression`).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BinderError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BinderError {
    // ═══════════════════════════════════════════════════════════════════════════
    // TEMPLATE (BND-001 to BND-002)
    // ═══════════════════════════════════════════════════════════════════════════
    #[error("BND-001: Invalid template: {reason}")]
    InvalidTemplate { reason: String },

    #[error("BND-002: Invalid binding specification: {reason}")]
    InvalidSpec { reason: String },

    // ═══════════════════════════════════════════════════════════════════════════
    // SELECTORS (BND-010 to BND-013)
    // ═══════════════════════════════════════════════════════════════════════════
    #[error("BND-010: Binding selector '{selector}' does not locate node in template")]
    UnresolvedSelector { selector: String },

    #[error("BND-011: Binding selector '{selector}' is not a valid selector: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("BND-012: Binding selector '{selector}' contains multiple attribute/event tokens")]
    MultipleAttributeTokens { selector: String },

    #[error("BND-013: Binding selector '{selector}' contains multiple '.' sub-instructions")]
    MultipleSubInstructions { selector: String },

    // ═══════════════════════════════════════════════════════════════════════════
    // SUB-INSTRUCTIONS (BND-020 to BND-023)
    // ═══════════════════════════════════════════════════════════════════════════
    #[error("BND-020: Binding selector '{selector}' is invalid - @class can only have sub-instructions '.add' or '.remove'")]
    InvalidClassInstruction { selector: String },

    #[error("BND-021: Binding selector '{selector}' is invalid - only @class, @event, @dataset, @style and @property attributes can have sub-instructions other than '.remove'")]
    InvalidAttributeInstruction { selector: String },

    #[error("BND-022: Event binding instruction for selector '{selector}' must be a handler function")]
    EventNotFunction { selector: String },

    #[error("BND-023: Binding instruction for selector '{selector}' #append must be a function")]
    AppendNotFunction { selector: String },

    #[error("BND-024: Only one 'bound' event can be specified (selector '{selector}')")]
    DuplicateBoundEvent { selector: String },

    // ═══════════════════════════════════════════════════════════════════════════
    // INSTRUCTIONS (BND-030 to BND-033)
    // ═══════════════════════════════════════════════════════════════════════════
    #[error("BND-030: Binding instruction for selector '{selector}' - the method '{name}' does not exist in the binding scope")]
    UnknownScopeMethod { selector: String, name: String },

    #[error("BND-031: Binding instruction for selector '{selector}' - the property '{name}' does not exist in the binding scope")]
    UnknownScopeProperty { selector: String, name: String },

    #[error("BND-032: Binding instruction for selector '{selector}' must be a string or function")]
    InvalidInstruction { selector: String },

    #[error("BND-033: Binding instruction for selector '{selector}' has an invalid expression '{expression}': {reason}")]
    InvalidExpression {
        selector: String,
        expression: String,
        reason: String,
    },
}

impl BinderError {
    /// Stable `BND-0xx` code of the error.
    pub fn code(&self) -> &'static str {
        match self {
            BinderError::InvalidTemplate { .. } => "BND-001",
            BinderError::InvalidSpec { .. } => "BND-002",
            BinderError::UnresolvedSelector { .. } => "BND-010",
            BinderError::InvalidSelector { .. } => "BND-011",
            BinderError::MultipleAttributeTokens { .. } => "BND-012",
            BinderError::MultipleSubInstructions { .. } => "BND-013",
            BinderError::InvalidClassInstruction { .. } => "BND-020",
            BinderError::InvalidAttributeInstruction { .. } => "BND-021",
            BinderError::EventNotFunction { .. } => "BND-022",
            BinderError::AppendNotFunction { .. } => "BND-023",
            BinderError::DuplicateBoundEvent { .. } => "BND-024",
            BinderError::UnknownScopeMethod { .. } => "BND-030",
            BinderError::UnknownScopeProperty { .. } => "BND-031",
            BinderError::InvalidInstruction { .. } => "BND-032",
            BinderError::InvalidExpression { .. } => "BND-033",
        }
    }
}
