//! Validation pipeline
//!
//! Rules are evaluated in attachment order; the first rule that rejects a
//! proposal short-circuits the rest. Each rule belongs to a stage: Prepare
//! rules may look at the previous value, Check rules judge the proposal in
//! isolation.

use mibtx_core::{RequestError, Value};
use std::fmt;

/// Phase a rule runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Stage {
    #[default]
    Prepare,
    Check,
}

/// A validation rule
///
/// Closures of the shape `Fn(&Value, &Value) -> Option<RequestError>` are
/// rules too, and run in [`Stage::Prepare`].
pub trait ValueConstraint: Send + Sync {
    /// Reject `proposed` (given the live `previous` value) or accept it
    fn validate(&self, proposed: &Value, previous: &Value) -> Option<RequestError>;

    /// Stage this rule runs in
    fn stage(&self) -> Stage {
        Stage::Prepare
    }
}

impl<F> ValueConstraint for F
where
    F: Fn(&Value, &Value) -> Option<RequestError> + Send + Sync,
{
    fn validate(&self, proposed: &Value, previous: &Value) -> Option<RequestError> {
        self(proposed, previous)
    }
}

/// Inclusive byte-length bounds for OCTET STRING proposals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthRange {
    pub min: usize,
    pub max: usize,
}

impl LengthRange {
    /// Create new range
    #[inline]
    #[must_use]
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    /// DisplayString bounds (0..255)
    #[inline]
    #[must_use]
    pub const fn display_string() -> Self {
        Self::new(0, 255)
    }

    /// Check a raw length
    ///
    /// # Errors
    /// Returns [`RequestError::WrongLength`] when outside the range
    pub fn check_len(&self, actual: usize) -> Result<(), RequestError> {
        if actual < self.min || actual > self.max {
            return Err(RequestError::WrongLength {
                actual,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

impl Default for LengthRange {
    fn default() -> Self {
        Self::display_string()
    }
}

impl ValueConstraint for LengthRange {
    fn validate(&self, proposed: &Value, _previous: &Value) -> Option<RequestError> {
        let bytes = proposed.as_octets()?;
        self.check_len(bytes.len()).err()
    }
}

/// Printable NVT ASCII content (RFC 2579 DisplayString)
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayString;

impl ValueConstraint for DisplayString {
    fn validate(&self, proposed: &Value, _previous: &Value) -> Option<RequestError> {
        let bytes = proposed.as_octets()?;
        bytes
            .iter()
            .position(|b| !matches!(b, 0x20..=0x7e | b'\r' | b'\n' | b'\t'))
            .map(|at| RequestError::WrongValue(format!("non-printable octet at {at}")))
    }
}

/// Inclusive bounds for INTEGER proposals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegerRange {
    pub min: i32,
    pub max: i32,
}

impl IntegerRange {
    /// Create new range
    #[inline]
    #[must_use]
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }
}

impl ValueConstraint for IntegerRange {
    fn validate(&self, proposed: &Value, _previous: &Value) -> Option<RequestError> {
        let v = proposed.as_integer()?;
        (v < self.min || v > self.max).then(|| {
            RequestError::WrongValue(format!("{v} outside [{}, {}]", self.min, self.max))
        })
    }

    fn stage(&self) -> Stage {
        Stage::Check
    }
}

/// Ordered rule list owned by a managed object
#[derive(Default)]
pub struct ValidationPipeline {
    rules: Vec<Box<dyn ValueConstraint>>,
}

impl ValidationPipeline {
    /// Create empty pipeline
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a rule after the existing ones
    pub fn push(&mut self, rule: impl ValueConstraint + 'static) {
        self.rules.push(Box::new(rule));
    }

    /// Run the rules of `stage` in order
    ///
    /// # Errors
    /// Returns the first rejection
    pub fn validate(
        &self,
        stage: Stage,
        proposed: &Value,
        previous: &Value,
    ) -> Result<(), RequestError> {
        self.rules
            .iter()
            .filter(|rule| rule.stage() == stage)
            .find_map(|rule| rule.validate(proposed, previous))
            .map_or(Ok(()), Err)
    }

    /// Number of attached rules
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if no rules are attached
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl fmt::Debug for ValidationPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationPipeline")
            .field("rules", &self.rules.len())
            .finish()
    }
}
