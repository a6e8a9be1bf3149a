//! Shared result type returned by the validation, pricing, and risk services.

/// Outcome of a business-rule check against an order.
///
/// Errors demote `valid` to false; warnings never do. Validation, pricing,
/// and risk all produce this shape so the submit use case can merge them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    /// Overall pass/fail outcome.
    pub valid: bool,
    /// Hard failures.
    pub errors: Vec<String>,
    /// Soft findings that do not block submission.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// A fresh, passing result with no errors or warnings.
    #[must_use]
    pub fn success() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Records a hard failure and demotes `valid` to false.
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(message.into());
    }

    /// Records a soft finding. Does not affect `valid`.
    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Merges another result's errors and warnings into this one.
    /// `valid` becomes the logical AND of both.
    pub fn merge(&mut self, other: Self) {
        self.valid &= other.valid;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_starts_valid() {
        let result = ValidationResult::success();
        assert!(result.valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn add_error_demotes_valid() {
        let mut result = ValidationResult::success();
        result.add_error("symbol not tradeable");
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn add_warning_does_not_demote_valid() {
        let mut result = ValidationResult::success();
        result.add_warning("market is closed");
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn merge_combines_and_ands_valid() {
        let mut a = ValidationResult::success();
        a.add_warning("warn-a");

        let mut b = ValidationResult::success();
        b.add_error("error-b");

        a.merge(b);
        assert!(!a.valid);
        assert_eq!(a.warnings.len(), 1);
        assert_eq!(a.errors.len(), 1);
    }
}
