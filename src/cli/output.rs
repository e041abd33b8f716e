//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ApiError;

/// Map domain/service errors to a single line for CLI output, with a next
/// step where one exists.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::NoTask(_) => format!("{} (start a task with `notegen topic <text>`)", e),
        ApiError::PageNotFound(_) => format!("{} (run `notegen status` to list pages)", e),
        ApiError::RetryInFlight(_) => {
            format!("{} (wait for the running retry to finish)", e)
        }
        ApiError::RequestFailed(_) | ApiError::StreamFailed(_) => format!(
            "{} (check that service.base_url is reachable)",
            e
        ),
        _ => e.to_string(),
    }
}
