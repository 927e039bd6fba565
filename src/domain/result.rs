//! Result type alias for Tether
//!
//! This module provides a convenient Result type alias that uses TetherError
//! as the error type.

use super::errors::TetherError;

/// Result type alias for Tether operations
///
/// # Examples
///
/// ```
/// use tether::domain::result::Result;
/// use tether::domain::errors::TetherError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(TetherError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, TetherError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::TetherError;

    #[test]
    fn test_result_err() {
        let result: Result<i32> = Err(TetherError::Validation("test error".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<i32> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }
}
