//! Rich diagnostic error types for the evibus engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the evibus engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, source spans) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum BusError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Term(#[from] TermError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Infer(#[from] InferError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),
}

// ---------------------------------------------------------------------------
// Term and factory errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TermError {
    #[error("unknown internal symbol {symbol}")]
    #[diagnostic(
        code(evibus::term::unknown_symbol),
        help(
            "A positive internal integer was externalized that the term factory \
             never produced. This is a programmer error: internal literals must \
             only be built from factory-assigned symbols."
        )
    )]
    UnknownSymbol { symbol: i64 },

    #[error("predicate of a literal must be an identifier or string constant, got {term}")]
    #[diagnostic(
        code(evibus::term::bad_predicate),
        help("Use an id-constant (lowercase identifier) or a quoted string as the predicate.")
    )]
    BadPredicate { term: String },

    #[error("head variable {var} does not occur in the body")]
    #[diagnostic(
        code(evibus::term::unsafe_clause),
        help(
            "Datalog safety requires every variable in a rule head to occur in \
             its body. Bind {var} in a body literal or drop it from the head."
        )
    )]
    UnsafeClause { var: String },

    #[error("claim literal is not ground: {literal}")]
    #[diagnostic(
        code(evibus::term::nonground_claim),
        help("Claims are ground facts. Substitute all variables before asserting.")
    )]
    NonGroundClaim { literal: String },
}

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("unexpected character '{found}' at line {line}, column {column}")]
    #[diagnostic(
        code(evibus::parse::unexpected_char),
        help("Valid tokens are identifiers, numbers, quoted strings, and punctuation.")
    )]
    UnexpectedChar {
        found: char,
        line: usize,
        column: usize,
    },

    #[error("unterminated string starting at line {line}, column {column}")]
    #[diagnostic(
        code(evibus::parse::unterminated_string),
        help("Close the string with a matching quote before the end of the file.")
    )]
    UnterminatedString { line: usize, column: usize },

    #[error("expected {expected} but found {found} at line {line}, column {column}")]
    #[diagnostic(
        code(evibus::parse::unexpected_token),
        help(
            "Statements are `fact.`, `head :- body.` or `head <= body.`; \
             arguments are identifiers, numbers, strings, arrays or maps."
        )
    )]
    UnexpectedToken {
        expected: String,
        found: String,
        line: usize,
        column: usize,
    },

    #[error("map keys must be constants, got variable {var} at line {line}")]
    #[diagnostic(
        code(evibus::parse::variable_map_key),
        help("Map keys are string or identifier constants, never variables.")
    )]
    VariableMapKey { var: String, line: usize },

    #[error("invalid number literal '{text}' at line {line}")]
    #[diagnostic(code(evibus::parse::bad_number))]
    BadNumber { text: String, line: usize },

    #[error("I/O error reading {path}: {source}")]
    #[diagnostic(
        code(evibus::parse::io),
        help("Check that the file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Dependency-graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("no annotation for live graph node {node}")]
    #[diagnostic(
        code(evibus::graph::missing_annotation),
        help(
            "Every goal and pending rule in the dependency graph carries an \
             annotation. A missing one indicates a bookkeeping defect; the \
             close/complete sweep skips the node and may retry later."
        )
    )]
    MissingAnnotation { node: String },

    #[error("claim appended to completed goal {goal}")]
    #[diagnostic(
        code(evibus::graph::completed_goal_mutated),
        help(
            "A completed goal's claim set is final. A late claim for it means \
             the goal was completed prematurely or an external tool answered \
             after saturation; the claim is dropped."
        )
    )]
    CompletedGoalMutated { goal: String },
}

// ---------------------------------------------------------------------------
// Inference errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum InferError {
    #[error("goal {goal} uses interpreted predicate {predicate} with invalid argument modes")]
    #[diagnostic(
        code(evibus::infer::invalid_modes),
        help(
            "Interpreted predicates declare argument modes: '+' arguments must \
             be ground at call time, '-' arguments must be variables. Rewrite \
             the goal to satisfy the registered signature."
        )
    )]
    InvalidModes { goal: String, predicate: String },

    #[error("no wrapper registered for interpreted predicate {predicate}")]
    #[diagnostic(
        code(evibus::infer::no_wrapper),
        help("Register a handler for this predicate before posing goals that use it.")
    )]
    NoWrapper { predicate: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Term(#[from] TermError),
}

// ---------------------------------------------------------------------------
// Engine errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(evibus::engine::invalid_config),
        help("Check the EngineConfig fields. {message}")
    )]
    InvalidConfig { message: String },

    #[error("state file error for {path}: {message}")]
    #[diagnostic(
        code(evibus::engine::state_file),
        help(
            "The logic-state snapshot could not be read or written. Verify the \
             path and that the file was produced by a compatible version."
        )
    )]
    StateFile { path: String, message: String },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(evibus::engine::serde),
        help("The stored data format may have changed between versions. Re-save the state.")
    )]
    Serialization { message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Term(#[from] TermError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),
}

/// Convenience alias for functions returning evibus results.
pub type BusResult<T> = std::result::Result<T, BusError>;
