//! Packing of trait-indexed variables into flat `f64` records.
//!
//! Every species stores one record per cohort (or mesh cell). A record is the
//! concatenation of its fields in registration order, so a field is fully
//! described by its name, its stride (number of scalars) and its offset
//! inside the record.

use crate::error::{ConfigError, LookupError};

/// A single named variable inside a species record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: String,
    stride: usize,
    offset: usize,
}

impl Field {
    /// Returns the variable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of scalars this variable occupies per record.
    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the position of the first scalar inside the record.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the record-relative range covered by this field.
    #[must_use]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.stride
    }
}

/// Ordered, gap-free set of fields describing one record.
///
/// Fields are packed back to back: the offset of each new field must equal the
/// current record width, and the width is always the sum of all strides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    fields: Vec<Field>,
    core_len: usize,
}

impl Layout {
    /// Creates an empty layout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a variable and returns the number of registered fields.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is already registered, if `stride` is zero,
    /// or if `offset` would leave a gap or overlap the current record.
    pub fn add_var(&mut self, name: &str, stride: usize, offset: usize) -> Result<usize, ConfigError> {
        if self.fields.iter().any(|field| field.name == name) {
            return Err(ConfigError::DuplicateVariable(name.to_owned()));
        }
        if stride == 0 {
            return Err(ConfigError::ZeroStride {
                name: name.to_owned(),
            });
        }
        let expected = self.width();
        if offset != expected {
            return Err(ConfigError::MisplacedOffset {
                name: name.to_owned(),
                offset,
                expected,
            });
        }

        self.fields.push(Field {
            name: name.to_owned(),
            stride,
            offset,
        });
        Ok(self.fields.len())
    }

    /// Appends a scalar variable at the end of the record.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is already registered.
    pub fn push_scalar(&mut self, name: &str) -> Result<usize, ConfigError> {
        let offset = self.width();
        self.add_var(name, 1, offset)
    }

    /// Removes every field.
    pub fn clear_vars(&mut self) {
        self.fields.clear();
        self.core_len = 0;
    }

    /// Marks every field registered so far as a core (method) variable.
    pub(crate) fn seal_core(&mut self) {
        self.core_len = self.fields.len();
    }

    /// Returns the number of scalars per record.
    #[must_use]
    pub fn width(&self) -> usize {
        self.fields.iter().map(Field::stride).sum()
    }

    /// Returns the registered fields in record order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns the field registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::UnknownVariable`] if no such field exists.
    pub fn field(&self, name: &str) -> Result<&Field, LookupError> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .ok_or_else(|| LookupError::UnknownVariable(name.to_owned()))
    }

    /// Returns the variable names in record order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(Field::name)
    }

    /// Record-relative range holding the model-declared extra variables.
    #[must_use]
    pub fn extra_range(&self) -> std::ops::Range<usize> {
        let start: usize = self.fields[..self.core_len]
            .iter()
            .map(Field::stride)
            .sum();
        start..self.width()
    }

    /// Returns the number of scalars used by model-declared extras.
    #[must_use]
    pub fn extra_width(&self) -> usize {
        self.extra_range().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn packs_fields_back_to_back() {
        let mut layout = Layout::new();
        assert_eq!(layout.add_var("X", 1, 0), Ok(1));
        assert_eq!(layout.add_var("u", 1, 1), Ok(2));
        layout.seal_core();
        assert_eq!(layout.add_var("leaf", 3, 2), Ok(3));

        assert_eq!(layout.width(), 5);
        assert_eq!(layout.field("leaf").unwrap().range(), 2..5);
        assert_eq!(layout.extra_range(), 2..5);
        assert_eq!(layout.names().collect::<Vec<_>>(), ["X", "u", "leaf"]);
    }

    #[test]
    fn rejects_bad_registrations() {
        let mut layout = Layout::new();
        layout.add_var("u", 1, 0).unwrap();

        assert_eq!(
            layout.add_var("u", 1, 1),
            Err(ConfigError::DuplicateVariable("u".into()))
        );
        assert_eq!(
            layout.add_var("v", 0, 1),
            Err(ConfigError::ZeroStride { name: "v".into() })
        );
        assert_eq!(
            layout.add_var("v", 1, 0),
            Err(ConfigError::MisplacedOffset {
                name: "v".into(),
                offset: 0,
                expected: 1
            })
        );
        assert_eq!(
            layout.add_var("v", 1, 2),
            Err(ConfigError::MisplacedOffset {
                name: "v".into(),
                offset: 2,
                expected: 1
            })
        );
        assert_eq!(layout.fields().len(), 1);
    }

    #[test]
    fn unknown_names_are_lookup_errors() {
        let layout = Layout::new();
        assert_eq!(
            layout.field("X"),
            Err(LookupError::UnknownVariable("X".into()))
        );
    }

    #[test]
    fn clear_empties_layout() {
        let mut layout = Layout::new();
        layout.push_scalar("X").unwrap();
        layout.seal_core();
        layout.clear_vars();
        assert_eq!(layout.width(), 0);
        assert!(layout.extra_range().is_empty());
    }

    proptest! {
        #[test]
        fn width_is_sum_of_strides(strides in proptest::collection::vec(1usize..6, 0..12)) {
            let mut layout = Layout::new();
            for (i, &stride) in strides.iter().enumerate() {
                let offset = layout.width();
                layout.add_var(&format!("v{i}"), stride, offset).unwrap();
            }

            prop_assert_eq!(layout.width(), strides.iter().sum::<usize>());

            let mut end = 0;
            for field in layout.fields() {
                prop_assert_eq!(field.offset(), end);
                end = field.range().end;
            }
            prop_assert_eq!(end, layout.width());
        }
    }
}
