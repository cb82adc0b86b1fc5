use tracing::debug;

use crate::error::ValidationError;

/// A single stored integer that only ever accepts positive writes.
#[derive(Debug, Default)]
pub struct ScalarCell {
    value: i64,
}

impl ScalarCell {
    pub fn set(&mut self, value: i64) -> Result<(), ValidationError> {
        if value <= 0 {
            return Err(ValidationError::NonPositiveValue { value });
        }
        self.value = value;
        debug!(value, "cell updated");
        Ok(())
    }

    pub fn get(&self) -> i64 {
        self.value
    }
}
