// LIFO integer stack with pop-pop-apply-push evaluation.
use crate::core::error::{Error, ErrorKind};
use crate::core::op::Operator;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Stack {
    // Bottom at index 0, top at the end.
    values: Vec<i64>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn push(&mut self, value: i64) {
        self.values.push(value);
    }

    pub fn pop(&mut self) -> Option<i64> {
        self.values.pop()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Contents ordered top of stack first.
    pub fn snapshot(&self) -> Vec<i64> {
        self.values.iter().rev().copied().collect()
    }

    /// Pops `x` then `y`, pushes `x OP y`.
    ///
    /// When evaluation fails both operands stay popped and nothing is pushed.
    pub fn apply(&mut self, op: Operator) -> Result<i64, Error> {
        if self.values.len() < 2 {
            return Err(Error::new(ErrorKind::InsufficientOperands)
                .with_message(format!(
                    "operator needs 2 operands, stack holds {}",
                    self.values.len()
                ))
                .with_hint("Push more values before applying an operator.")
                .with_op(op.symbol()));
        }
        let (Some(x), Some(y)) = (self.values.pop(), self.values.pop()) else {
            return Err(Error::new(ErrorKind::Internal).with_message("stack underflow"));
        };
        let result = op.apply(x, y)?;
        self.values.push(result);
        Ok(result)
    }
}

impl From<Vec<i64>> for Stack {
    /// Builds a stack from bottom-to-top values.
    fn from(values: Vec<i64>) -> Self {
        Self { values }
    }
}
