//! Translation of response status blocks into errors.

use super::messages::{Status, SUCCESS_STATUS};
use crate::error::ServerError;

/// Map a status block to `Ok(())` or a [`ServerError`].
///
/// Only an exact success code passes; every other code, including
/// success-with-info, is reported as a failure with defaults filled in for
/// absent parts.
pub fn check_status(status: &Status) -> Result<(), ServerError> {
    if status.status_code == SUCCESS_STATUS {
        return Ok(());
    }

    Err(ServerError::new(
        status.error_message.clone(),
        status.error_code,
        status.sql_state.clone(),
    ))
}
