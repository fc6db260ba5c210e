// Core modules implementing stacks, operators, the registry, and error modeling.
pub mod error;
pub mod op;
pub mod random;
pub mod registry;
pub mod stack;
