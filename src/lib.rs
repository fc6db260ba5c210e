//! Purpose: Shared library crate backing the `rpnstack` server, CLI, and tests.
//! Exports: `core` (stacks, operators, registry, errors) and `api` (public surface + client).
//! Role: Keeps domain logic free of HTTP concerns; `serve` in the binary is thin glue.
//! Invariants: All stack mutation goes through `core::registry::StackRegistry`.
//! Invariants: Stack contents are always reported top of stack first.
pub mod api;
pub mod core;
