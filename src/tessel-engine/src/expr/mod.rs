//! Expression evaluation over the blocks of one partition.
//!
//! The evaluator walks a resolved [`Expression`](tessel_logical::Expression)
//! tree and applies the block operators bottom-up. Column references are
//! looked up by identity, never by name.
//!
//! # Example
//!
//! ```rust,ignore
//! use tessel_engine::expr::ExprEvaluator;
//!
//! let evaluator = ExprEvaluator::new(&blocks, num_rows);
//! let mask = evaluator.evaluate_predicate(&predicate)?;
//! ```

mod evaluator;

pub use evaluator::ExprEvaluator;
