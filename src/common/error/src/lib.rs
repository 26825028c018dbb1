//! Error types and result aliases for Tessel.
//!
//! Every failure raised by the expression and partition layers is a
//! precondition or invariant violation. They are surfaced to the immediate
//! caller as a [`TesselError`] and never retried.

mod error;

pub use error::{TesselError, TesselResult};
