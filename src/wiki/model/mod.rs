//! Typed domain models for the three content kinds, built from a raw
//! field mapping via explicit normalize-then-build functions.

pub mod battlesuit;
pub mod stigmata;
pub mod weapon;

pub use battlesuit::{Battlesuit, Equipment, Recommendation};
pub use stigmata::{SetBonus, Stigma, StigmataSet};
pub use weapon::{Weapon, WeaponSkill, WeaponStats};

use crate::common::error::ModelError;
use crate::wiki::constants::CoreStrength;
use crate::wiki::markup::FieldMap;

/// A required field, by exact key.
pub(crate) fn field<'a>(fields: &'a FieldMap, key: &str) -> Result<&'a str, ModelError> {
    fields
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| ModelError::MissingField {
            key: key.to_owned(),
        })
}

/// An optional field; empty values count as absent.
pub(crate) fn opt_field<'a>(fields: &'a FieldMap, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

/// A required integer field.
pub(crate) fn int_field(fields: &FieldMap, key: &str) -> Result<i64, ModelError> {
    let raw = field(fields, key)?;
    raw.trim()
        .parse()
        .map_err(|_| ModelError::InvalidNumber {
            key: key.to_owned(),
            value: raw.to_owned(),
        })
}

/// Parse a comma-joined core-strength field into known strength tags.
pub(crate) fn parse_core_strengths(value: &str) -> Result<Vec<CoreStrength>, ModelError> {
    if value.is_empty() {
        return Ok(Vec::new());
    }
    value.split(", ").map(CoreStrength::parse).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_field_rejects_non_numeric() {
        let mut fields = FieldMap::new();
        fields.insert("ATK".into(), "lots".into());
        assert!(matches!(
            int_field(&fields, "ATK"),
            Err(ModelError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_parse_core_strengths_empty_and_joined() {
        assert!(parse_core_strengths("").unwrap().is_empty());
        let strengths = parse_core_strengths("Ice DMG, Freeze").unwrap();
        assert_eq!(
            strengths,
            vec![CoreStrength::IceDmg, CoreStrength::Freeze]
        );
    }
}
