//! Purpose: Define the stable public Rust API boundary for rpnstack.
//! Exports: Registry, operator, and error types plus the HTTP client.
//! Role: Public, additive-only surface used by the binary and integration tests.
//! Invariants: Callers reach stacks only through `StackRegistry` or `RemoteClient`.

mod remote;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::op::{Operator, apply};
pub use crate::core::random::{MAX_VALUE, MIN_VALUE, RandomDigits, ValueSource};
pub use crate::core::registry::StackRegistry;
pub use crate::core::stack::Stack;
pub use remote::{CreatedStack, RemoteClient};
