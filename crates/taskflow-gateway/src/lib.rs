//! Task gateway implementations.
//!
//! [`InMemoryGateway`] behaves like a task server: it assigns ids and
//! versions, keeps per-project task lists with the same position rules as
//! the client store, and can be told to fail or report conflicts on demand.

pub mod memory;

pub use memory::{FailureMode, GatewayCall, InMemoryGateway};
