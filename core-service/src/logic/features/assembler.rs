//! Feature Assembler
//!
//! Turns the three signal families into one fixed-length vector. Iterates
//! the schema, never the signal sets, so the output always has exactly one
//! value per slot no matter how many signals failed.

use super::layout::{FeatureSchema, SignalFamily};
use super::signals::{SignalError, SignalSet};
use super::vector::FeatureVector;

pub struct Assembler {
    schema: &'static FeatureSchema,
}

impl Assembler {
    pub fn new(schema: &'static FeatureSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &'static FeatureSchema {
        self.schema
    }

    /// Build the vector; failed or missing signals take the slot default
    pub fn assemble(
        &self,
        static_signals: &SignalSet,
        dynamic_signals: &SignalSet,
        reputation_signals: &SignalSet,
    ) -> FeatureVector {
        let mut vector = FeatureVector::defaults(self.schema);
        let mut defaulted = 0usize;

        for (index, spec) in self.schema.features.iter().enumerate() {
            let set = match spec.family {
                SignalFamily::Static => static_signals,
                SignalFamily::Dynamic => dynamic_signals,
                SignalFamily::Reputation => reputation_signals,
            };

            match set.get(spec.name) {
                Some(Ok(value)) if value.is_finite() => vector.set(index, *value),
                Some(Ok(value)) => {
                    defaulted += 1;
                    log::debug!("{} = {} is not finite, using default {}", spec.name, value, spec.default);
                }
                Some(Err(err)) => {
                    defaulted += 1;
                    log::debug!("{} failed ({}), using default {}", spec.name, err, spec.default);
                }
                None => {
                    defaulted += 1;
                    log::debug!("{} not produced, using default {}", spec.name, spec.default);
                }
            }
        }

        if defaulted > 0 {
            log::info!(
                "Assembled {} vector with {}/{} defaulted slots",
                self.schema.name,
                defaulted,
                self.schema.len()
            );
        }

        vector
    }
}

/// A signal set where every signal of `family` failed with `err`
pub fn failed_family(schema: &FeatureSchema, family: SignalFamily, err: SignalError) -> SignalSet {
    let mut set = SignalSet::new(family);
    for spec in schema.features.iter().filter(|f| f.family == family) {
        set.insert(spec.name, Err(err.clone()));
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::layout::{FULL_SCHEMA, TOP20_SCHEMA};

    fn empty(family: SignalFamily) -> SignalSet {
        SignalSet::new(family)
    }

    #[test]
    fn test_missing_signals_take_defaults() {
        let assembler = Assembler::new(&FULL_SCHEMA);
        let vector = assembler.assemble(
            &empty(SignalFamily::Static),
            &empty(SignalFamily::Dynamic),
            &empty(SignalFamily::Reputation),
        );
        assert_eq!(vector, FeatureVector::defaults(&FULL_SCHEMA));
    }

    #[test]
    fn test_values_land_in_schema_order() {
        let mut statics = empty(SignalFamily::Static);
        statics.insert("number_of_href", Ok(7.0));
        statics.insert("prefix_suffix", Err(SignalError::InvalidUrl("x".into())));
        let mut reputation = empty(SignalFamily::Reputation);
        reputation.insert("links_pointing_to_page", Ok(1.0));

        let vector = Assembler::new(&TOP20_SCHEMA).assemble(&statics, &empty(SignalFamily::Dynamic), &reputation);
        assert_eq!(vector.get(0), Some(7.0));
        assert_eq!(vector.get_by_name("prefix_suffix"), Some(1.0));
        assert_eq!(vector.get(19), Some(1.0));
        assert!(vector.validate(&TOP20_SCHEMA).is_ok());
    }

    #[test]
    fn test_non_finite_value_is_defaulted() {
        let mut statics = empty(SignalFamily::Static);
        statics.insert("length_of_text", Ok(f32::NAN));
        let vector = Assembler::new(&FULL_SCHEMA).assemble(
            &statics,
            &empty(SignalFamily::Dynamic),
            &empty(SignalFamily::Reputation),
        );
        assert_eq!(vector.get_by_name("length_of_text"), Some(0.0));
    }

    #[test]
    fn test_failed_family() {
        let set = failed_family(&FULL_SCHEMA, SignalFamily::Reputation, SignalError::Unavailable("panicked"));
        assert_eq!(set.len(), 14);
        assert_eq!(set.failures().count(), 14);
    }
}
