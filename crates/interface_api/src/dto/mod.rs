//! Request and response bodies

pub mod claims;
pub mod approvals;
pub mod workflow;

use rust_decimal::Decimal;
use validator::{Validate, ValidationError};

use crate::error::ApiError;

/// Runs the `validator` rules of a request body
pub fn validate_request<T: Validate>(request: &T) -> Result<(), ApiError> {
    request.validate().map_err(ApiError::from)
}

pub(crate) fn non_negative(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() {
        return Err(ValidationError::new("negative_amount"));
    }
    Ok(())
}
