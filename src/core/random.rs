//! Random stack keys and pushed values.

use getrandom::fill as fill_random;
use uuid::Uuid;

use crate::core::error::{Error, ErrorKind};

pub const MIN_VALUE: i64 = 1;
pub const MAX_VALUE: i64 = 9;

/// Supplies the values pushed by `StackRegistry::push`.
pub trait ValueSource: Send + Sync {
    fn next_value(&self) -> Result<i64, Error>;
}

/// Uniform integers in `MIN_VALUE..=MAX_VALUE`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomDigits;

impl ValueSource for RandomDigits {
    fn next_value(&self) -> Result<i64, Error> {
        let span = (MAX_VALUE - MIN_VALUE + 1) as u8;
        // Bytes above `limit` would favor the low digits.
        let limit = u8::MAX - (u8::MAX % span) - 1;
        loop {
            let mut byte = [0u8; 1];
            fill_random(&mut byte).map_err(random_error)?;
            if byte[0] <= limit {
                return Ok(MIN_VALUE + i64::from(byte[0] % span));
            }
        }
    }
}

/// Fresh random version-4 UUID in hyphenated lowercase form.
pub fn generate_key() -> String {
    Uuid::new_v4().to_string()
}

fn random_error(err: getrandom::Error) -> Error {
    Error::new(ErrorKind::Internal).with_message(format!("failed to read random bytes: {err}"))
}
