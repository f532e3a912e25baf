//! # remodel endpoint
//!
//! URL construction primitives for remodel clients.
//!
//! This crate provides:
//! - `BaseUrl` for base-path and locale-prefix composition
//! - `Endpoint` templates with `:name` placeholder resolution
//! - `Filter` criteria and the `Order` direction
//! - `QueryString` building with empty-value omission
//!
//! This is a pure crate with no I/O operations. Resolution is
//! synchronous, stateless and side-effect-free; failures surface as
//! `EndpointError` values, never panics.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod base;
mod error;
mod filter;
mod query;
mod template;

pub use base::{join_segments, BaseUrl};
pub use error::{EndpointError, EndpointResult};
pub use filter::{Filter, FilterTerm, Order};
pub use query::QueryString;
pub use template::{Endpoint, PlaceholderFn, ResolveOptions};
