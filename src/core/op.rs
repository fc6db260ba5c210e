// Binary integer operators and their evaluation.
use std::fmt;
use std::str::FromStr;

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
}

impl Operator {
    pub const ALL: [Operator; 4] = [Operator::Add, Operator::Sub, Operator::Mul, Operator::Div];

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.symbol() == symbol)
    }

    /// Computes `x OP y`. Division truncates toward zero.
    pub fn apply(self, x: i64, y: i64) -> Result<i64, Error> {
        let result = match self {
            Operator::Add => x.checked_add(y),
            Operator::Sub => x.checked_sub(y),
            Operator::Mul => x.checked_mul(y),
            Operator::Div => {
                if y == 0 {
                    return Err(Error::new(ErrorKind::DivisionByZero)
                        .with_message("division by zero")
                        .with_op(self.symbol()));
                }
                x.checked_div(y)
            }
        };
        result.ok_or_else(|| {
            Error::new(ErrorKind::Overflow)
                .with_message(format!("{x} {} {y} overflows a 64-bit integer", self.symbol()))
                .with_op(self.symbol())
        })
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(symbol: &str) -> Result<Self, Self::Err> {
        Self::from_symbol(symbol).ok_or_else(|| unknown_operator(symbol))
    }
}

/// Evaluates a raw operator symbol against two operands.
pub fn apply(x: i64, y: i64, symbol: &str) -> Result<i64, Error> {
    symbol.parse::<Operator>()?.apply(x, y)
}

pub(crate) fn unknown_operator(symbol: &str) -> Error {
    Error::new(ErrorKind::UnknownOperator)
        .with_message(format!("unknown operator {symbol:?}"))
        .with_hint("Use one of + - * / (list them with GET /op).")
        .with_op(symbol)
}

#[cfg(test)]
mod tests {
    use super::{Operator, apply};
    use crate::core::error::ErrorKind;

    #[test]
    fn symbols_round_trip_in_listing_order() {
        let symbols: Vec<_> = Operator::ALL.iter().map(|op| op.symbol()).collect();
        assert_eq!(symbols, ["+", "-", "*", "/"]);
        for op in Operator::ALL {
            assert_eq!(Operator::from_symbol(op.symbol()), Some(op));
        }
    }

    #[test]
    fn arithmetic_uses_x_op_y_order() {
        assert_eq!(apply(5, 3, "+").expect("add"), 8);
        assert_eq!(apply(5, 3, "-").expect("sub"), 2);
        assert_eq!(apply(5, 3, "*").expect("mul"), 15);
        assert_eq!(apply(9, 2, "/").expect("div"), 4);
        assert_eq!(apply(3, 5, "-").expect("sub"), -2);
    }

    #[test]
    fn division_truncates_toward_zero() {
        assert_eq!(apply(-7, 2, "/").expect("div"), -3);
        assert_eq!(apply(7, -2, "/").expect("div"), -3);
        assert_eq!(apply(-7, -2, "/").expect("div"), 3);
        assert_eq!(apply(0, 4, "/").expect("div"), 0);
    }

    #[test]
    fn division_by_zero_fails() {
        let err = apply(4, 0, "/").expect_err("expected division by zero");
        assert_eq!(err.kind(), ErrorKind::DivisionByZero);
        assert_eq!(err.op(), Some("/"));
    }

    #[test]
    fn unknown_symbol_fails() {
        for symbol in ["%", "", "plus", "++", " +"] {
            let err = apply(1, 2, symbol).expect_err("expected unknown operator");
            assert_eq!(err.kind(), ErrorKind::UnknownOperator);
        }
    }

    #[test]
    fn overflow_is_reported_not_wrapped() {
        let err = Operator::Mul.apply(i64::MAX, 2).expect_err("overflow");
        assert_eq!(err.kind(), ErrorKind::Overflow);
        let err = Operator::Div.apply(i64::MIN, -1).expect_err("overflow");
        assert_eq!(err.kind(), ErrorKind::Overflow);
        let err = Operator::Sub.apply(i64::MIN, 1).expect_err("overflow");
        assert_eq!(err.kind(), ErrorKind::Overflow);
    }
}
