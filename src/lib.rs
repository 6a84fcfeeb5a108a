//! # evibus
//!
//! An evidential tool bus: a Datalog inference core that composes
//! heterogeneous analysis tools (solvers, compilers, ad-hoc scripts) into
//! a cooperative inference network. Goals posed in an extended Datalog
//! language are resolved by combining declarative rules with externally
//! computed claims delivered by tool wrappers.
//!
//! ## Architecture
//!
//! - **Terms** (`term`, `parser`): the external data model and its Datalog
//!   text surface, with tagged-JSON round-tripping
//! - **Interning** (`factory`): terms and literals compiled to compact
//!   integer vectors; all inference runs on these
//! - **Indexing** (`index`): discrimination trees with four retrieval
//!   modes (generalizations, specializations, matchings, renamings)
//! - **Inference** (`unify`, `state`, `infer`): SLD-style top-down goal
//!   expansion interleaved with bottom-up claim propagation
//! - **Saturation** (`graph`): a goal-dependency graph whose close and
//!   complete algorithms decide when no more answers can ever arrive
//! - **Tool seam** (`interpret`, `engine`): interpreted predicates relay
//!   to registered wrappers, whose answers feed back asynchronously
//!
//! ## Library usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use evibus::engine::Engine;
//! use evibus::interpret::ToolRegistry;
//! use evibus::parser;
//! use evibus::term::Reason;
//!
//! let engine = Engine::new(Arc::new(ToolRegistry::with_builtins()));
//! for clause in parser::parse_program("edge(a, b). path(X, Y) :- edge(X, Y).").unwrap() {
//!     engine.add_rule(&clause, Reason::Axiom).unwrap();
//! }
//! let goal = parser::parse_literal("path(a, X)").unwrap();
//! engine.add_goal(&goal).unwrap();
//! for subst in engine.get_substitutions(&goal) {
//!     println!("{subst}");
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod factory;
pub mod graph;
pub mod index;
pub mod infer;
pub mod interpret;
pub mod parser;
pub mod persist;
pub mod state;
pub mod term;
pub mod unify;

pub use engine::{Engine, EngineConfig};
pub use error::{BusError, BusResult};
pub use interpret::{ArgMode, InterpretState, PredicateSpec, ToolRegistry, WrapperOutcome};
pub use term::{Claim, Clause, Literal, Reason, Subst, Term};
