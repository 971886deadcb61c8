//! # ql-quotes
//!
//! Observable market quotes.  Mutating a quote notifies everything that
//! registered with it, which is how a bootstrapped curve learns that it has
//! gone stale.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// `Quote` trait and concrete implementations.
pub mod quote;

pub use quote::{Quote, SimpleQuote};
