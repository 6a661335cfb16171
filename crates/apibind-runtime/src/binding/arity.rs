//! Argument-count contracts

use crate::error::{BindError, BindResult};

/// Validates call-site argument counts
///
/// Adapters that synthesize trailing arguments (buffers, callbacks) pass the
/// number they add as `offset`; the caller then supplies `declared - offset`.
pub struct ArityGuard;

impl ArityGuard {
    /// Check `actual` against `declared - offset`
    ///
    /// ```
    /// # use apibind_runtime::binding::ArityGuard;
    /// assert!(ArityGuard::check("get_window_text", 3, 2, 1).is_ok());
    /// assert!(ArityGuard::check("get_window_text", 3, 2, 3).is_err());
    /// ```
    pub fn check(function: &str, declared: usize, offset: usize, actual: usize) -> BindResult<()> {
        let expected = declared.saturating_sub(offset);
        if actual == expected {
            Ok(())
        } else {
            Err(BindError::ArgumentCount {
                function: function.to_string(),
                expected,
                actual,
            })
        }
    }

    /// Check `actual` lies in `min..=max` (for adapters with an optional
    /// trailing argument); reports `max` as the expectation
    pub fn check_range(function: &str, min: usize, max: usize, actual: usize) -> BindResult<()> {
        if (min..=max).contains(&actual) {
            Ok(())
        } else {
            Err(BindError::ArgumentCount {
                function: function.to_string(),
                expected: if actual < min { min } else { max },
                actual,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 0, 1)]
    #[case(3, 2, 1)]
    #[case(0, 0, 0)]
    fn test_matching_counts_pass(#[case] declared: usize, #[case] offset: usize, #[case] actual: usize) {
        assert!(ArityGuard::check("f", declared, offset, actual).is_ok());
    }

    #[test]
    fn test_mismatch_reports_expected_and_actual() {
        let err = ArityGuard::check("is_window", 1, 0, 3).unwrap_err();
        assert_eq!(
            err,
            BindError::ArgumentCount {
                function: "is_window".to_string(),
                expected: 1,
                actual: 3,
            }
        );
    }

    #[test]
    fn test_offset_reduces_expected() {
        let err = ArityGuard::check("get_class_name", 3, 2, 0).unwrap_err();
        assert!(matches!(err, BindError::ArgumentCount { expected: 1, actual: 0, .. }));
    }

    #[test]
    fn test_range() {
        assert!(ArityGuard::check_range("enum_child_windows", 1, 2, 1).is_ok());
        assert!(ArityGuard::check_range("enum_child_windows", 1, 2, 2).is_ok());
        assert!(matches!(
            ArityGuard::check_range("enum_child_windows", 1, 2, 3),
            Err(BindError::ArgumentCount { expected: 2, actual: 3, .. })
        ));
        assert!(matches!(
            ArityGuard::check_range("enum_child_windows", 1, 2, 0),
            Err(BindError::ArgumentCount { expected: 1, actual: 0, .. })
        ));
    }
}
