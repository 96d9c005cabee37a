//! Quality rules backed by the semantic core

pub mod no_unused_vars;
pub mod strict_boolean_expressions;

pub use no_unused_vars::{NoUnusedVars, NoUnusedVarsOptions};
pub use strict_boolean_expressions::{
    ConditionError, StrictBooleanExpressions, StrictBooleanOptions,
};
