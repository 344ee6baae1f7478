//! Error/warning accumulator shared by every validator.

use std::fmt;

use serde::Serialize;

/// Outcome of a validation pass.
///
/// A result is valid exactly when it holds no errors. Errors can only be
/// added, never removed, so once a result turns invalid it stays invalid.
/// Warnings are advisory and never affect validity.
///
/// # Examples
///
/// ```
/// use repofig_core::ValidationResult;
///
/// let mut result = ValidationResult::new();
/// result.add_warning("looks odd");
/// assert!(result.is_valid());
///
/// let result = result.with_error("definitely wrong");
/// assert!(!result.is_valid());
/// assert_eq!(result.errors(), ["definitely wrong"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationResult {
    /// An empty, valid result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error. The result is invalid from now on.
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Record a warning.
    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Builder form of [`add_error`](Self::add_error).
    #[must_use]
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.add_error(message);
        self
    }

    /// Builder form of [`add_warning`](Self::add_warning).
    #[must_use]
    pub fn with_warning(mut self, message: impl Into<String>) -> Self {
        self.add_warning(message);
        self
    }

    /// Append another result's errors and warnings, keeping their order.
    pub fn absorb(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

impl Serialize for ValidationResult {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("ValidationResult", 3)?;
        state.serialize_field("valid", &self.is_valid())?;
        state.serialize_field("errors", &self.errors)?;
        state.serialize_field("warnings", &self.warnings)?;
        state.end()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "valid")?;
        } else {
            write!(f, "invalid ({} error(s))", self.errors.len())?;
        }
        if self.has_warnings() {
            write!(f, ", {} warning(s)", self.warnings.len())?;
        }
        Ok(())
    }
}

/// Check that a value is a usable identifier: a letter or underscore
/// followed by letters, digits, underscores or hyphens.
pub fn validate_identifier(value: &str, field: &str) -> ValidationResult {
    let mut result = ValidationResult::new();
    let mut chars = value.chars();
    match chars.next() {
        None => result.add_error(format!("{field} cannot be empty")),
        Some(first) => {
            let head_ok = first.is_ascii_alphabetic() || first == '_';
            let tail_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
            if !head_ok || !tail_ok {
                result.add_error(format!(
                    "{field} must start with a letter or underscore and contain only \
                     letters, numbers, underscores, and hyphens"
                ));
            }
        }
    }
    result
}
