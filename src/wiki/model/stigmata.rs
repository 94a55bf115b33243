//! Stigmata pages: one to three gear pieces with optional set bonuses.

use serde::{Deserialize, Serialize};

use crate::common::error::ModelError;
use crate::wiki::constants::{StigmaRarity, StigmaSlot};
use crate::wiki::markup::FieldMap;

use super::{int_field, opt_field};

/// A set bonus granted at 2 or 3 matching pieces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetBonus {
    pub name: String,
    pub effect: String,
}

/// A singular stigma. Also carries the set-level bonus fields, since the
/// wiki repeats them on every piece.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stigma {
    pub name: String,
    pub hp: i64,
    pub attack: i64,
    pub defense: i64,
    pub crit: i64,
    pub effect_name: String,
    pub effect: String,
    pub slot: StigmaSlot,
    pub set_name: String,
    pub set_name_2p: Option<String>,
    pub set_effect_2p: Option<String>,
    pub set_name_3p: Option<String>,
    pub set_effect_3p: Option<String>,
    pub rarity: StigmaRarity,
}

impl Stigma {
    /// Build the stigma occupying `slot` from the set's field mapping.
    ///
    /// Per-piece fields are prefixed with the slot tag (`slotT_HP`, ...);
    /// set-level fields are unprefixed and shared between pieces.
    pub fn parse_slot(fields: &FieldMap, slot: StigmaSlot) -> Result<Self, ModelError> {
        let letter = slot.letter();
        let prefixed = |key: &str| format!("slot{letter}_{key}");

        let set_name = super::field(fields, "name")?.to_owned();
        let name = opt_field(fields, &format!("set{letter}"))
            .or_else(|| opt_field(fields, &format!("slot{letter}")))
            .unwrap_or(&set_name)
            .to_owned();

        // Stigmata rarity on the wiki takes the lowest rank.
        let rarity = StigmaRarity::new(int_field(fields, "rarity")? + 1)?;

        Ok(Self {
            name,
            hp: int_field(fields, &prefixed("HP"))?,
            attack: int_field(fields, &prefixed("ATK"))?,
            defense: int_field(fields, &prefixed("DEF"))?,
            crit: int_field(fields, &prefixed("CRT"))?,
            effect_name: super::field(fields, &prefixed("effectName"))?.to_owned(),
            effect: super::field(fields, &prefixed("effect"))?.to_owned(),
            slot,
            set_name,
            set_name_2p: opt_field(fields, "setEffect2pName").map(str::to_owned),
            set_effect_2p: opt_field(fields, "setEffect2p").map(str::to_owned),
            set_name_3p: opt_field(fields, "setEffect3pName").map(str::to_owned),
            set_effect_3p: opt_field(fields, "setEffect3p").map(str::to_owned),
            rarity,
        })
    }

    /// The set's 2-piece bonus. Present only if the source defines both the
    /// bonus name and its effect.
    pub fn set_bonus_2p(&self) -> Option<SetBonus> {
        match (&self.set_name_2p, &self.set_effect_2p) {
            (Some(name), Some(effect)) => Some(SetBonus {
                name: name.clone(),
                effect: effect.clone(),
            }),
            _ => None,
        }
    }

    /// The set's 3-piece bonus, if the set is a full 3-piece set.
    pub fn set_bonus_3p(&self) -> Option<SetBonus> {
        match (&self.set_name_3p, &self.set_effect_3p) {
            (Some(name), Some(effect)) => Some(SetBonus {
                name: name.clone(),
                effect: effect.clone(),
            }),
            _ => None,
        }
    }

    /// Zero, one or two bonuses, according to how many pieces the set has.
    pub fn set_bonuses(&self) -> Vec<SetBonus> {
        self.set_bonus_2p()
            .into_iter()
            .chain(self.set_bonus_3p())
            .collect()
    }
}

/// A set of stigmata, with full support for mixed sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StigmataSet {
    stigmata: Vec<Stigma>,
}

impl StigmataSet {
    /// Validate and build a set: one to three pieces, at most one per slot.
    pub fn new(stigmata: Vec<Stigma>) -> Result<Self, ModelError> {
        if stigmata.is_empty() || stigmata.len() > 3 {
            return Err(ModelError::InvalidSetSize {
                got: stigmata.len(),
            });
        }
        for (i, stigma) in stigmata.iter().enumerate() {
            if stigmata[..i].iter().any(|other| other.slot == stigma.slot) {
                return Err(ModelError::DuplicateSlot(stigma.slot));
            }
        }
        Ok(Self { stigmata })
    }

    /// Build a set from an already-classified field mapping: one stigma per
    /// slot key present in the source.
    pub fn parse(fields: &FieldMap) -> Result<Self, ModelError> {
        let stigmata = StigmaSlot::ALL
            .iter()
            .filter(|slot| fields.contains_key(&format!("slot{}", slot.letter())))
            .map(|&slot| Stigma::parse_slot(fields, slot))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(stigmata)
    }

    pub fn stigmata(&self) -> &[Stigma] {
        &self.stigmata
    }

    /// The largest group of stigmata sharing one identical bonus payload,
    /// with the bonuses that group grants.
    ///
    /// - full set: all three pieces, 2-piece and 3-piece bonuses;
    /// - 2:1 mixed set: the pair, its 2-piece bonus;
    /// - 1:1:1 mixed set (all payloads distinct): two empty vectors.
    ///
    /// The returned bonuses are truncated to `group_size - 1` entries, so a
    /// 1-piece group never grants anything.
    pub fn main_set_with_bonuses(&self) -> (Vec<&Stigma>, Vec<SetBonus>) {
        let mut groups: Vec<(Vec<SetBonus>, Vec<&Stigma>)> = Vec::new();
        for stigma in &self.stigmata {
            let bonuses = stigma.set_bonuses();
            if bonuses.is_empty() {
                continue;
            }
            match groups.iter_mut().find(|(payload, _)| *payload == bonuses) {
                Some((_, members)) => members.push(stigma),
                None => groups.push((bonuses, vec![stigma])),
            }
        }

        if groups.is_empty() || groups.len() == self.stigmata.len() {
            return (Vec::new(), Vec::new());
        }

        let (bonuses, members) = groups
            .into_iter()
            .max_by_key(|(_, members)| members.len())
            .unwrap_or_default();
        let granted = bonuses
            .into_iter()
            .take(members.len().saturating_sub(1))
            .collect();
        (members, granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stigma(slot: StigmaSlot, set_name: &str, bonus_2p: Option<&str>, bonus_3p: Option<&str>) -> Stigma {
        Stigma {
            name: format!("{set_name} ({})", slot.letter()),
            hp: 300,
            attack: 50,
            defense: 0,
            crit: 10,
            effect_name: "Effect".into(),
            effect: "Does things.".into(),
            slot,
            set_name: set_name.into(),
            set_name_2p: bonus_2p.map(|_| format!("{set_name} 2pc")),
            set_effect_2p: bonus_2p.map(str::to_owned),
            set_name_3p: bonus_3p.map(|_| format!("{set_name} 3pc")),
            set_effect_3p: bonus_3p.map(str::to_owned),
            rarity: StigmaRarity::new(5).unwrap(),
        }
    }

    #[test]
    fn test_duplicate_slot_fails_validation() {
        let result = StigmataSet::new(vec![
            stigma(StigmaSlot::Top, "Fuxi", Some("a"), None),
            stigma(StigmaSlot::Top, "Nuwa", Some("b"), None),
        ]);
        assert!(matches!(
            result,
            Err(ModelError::DuplicateSlot(StigmaSlot::Top))
        ));
    }

    #[test]
    fn test_empty_and_oversized_sets_fail() {
        assert!(StigmataSet::new(Vec::new()).is_err());
        assert!(StigmataSet::new(vec![
            stigma(StigmaSlot::Top, "A", None, None),
            stigma(StigmaSlot::Middle, "A", None, None),
            stigma(StigmaSlot::Bottom, "A", None, None),
            stigma(StigmaSlot::Top, "B", None, None),
        ])
        .is_err());
    }

    #[test]
    fn test_full_set_grants_both_bonuses() {
        let set = StigmataSet::new(vec![
            stigma(StigmaSlot::Top, "Shakespeare", Some("2p"), Some("3p")),
            stigma(StigmaSlot::Middle, "Shakespeare", Some("2p"), Some("3p")),
            stigma(StigmaSlot::Bottom, "Shakespeare", Some("2p"), Some("3p")),
        ])
        .unwrap();

        let (members, bonuses) = set.main_set_with_bonuses();
        assert_eq!(members.len(), 3);
        assert_eq!(bonuses.len(), 2);
        assert_eq!(bonuses[0].effect, "2p");
        assert_eq!(bonuses[1].effect, "3p");
    }

    #[test]
    fn test_mixed_set_grants_pair_bonus_only() {
        let set = StigmataSet::new(vec![
            stigma(StigmaSlot::Top, "Shakespeare", Some("2p"), Some("3p")),
            stigma(StigmaSlot::Middle, "Shakespeare", Some("2p"), Some("3p")),
            stigma(StigmaSlot::Bottom, "Newton", Some("other"), None),
        ])
        .unwrap();

        let (members, bonuses) = set.main_set_with_bonuses();
        assert_eq!(members.len(), 2);
        assert_eq!(bonuses.len(), 1);
        assert_eq!(bonuses[0].effect, "2p");
    }

    #[test]
    fn test_fully_mixed_set_grants_nothing() {
        let set = StigmataSet::new(vec![
            stigma(StigmaSlot::Top, "A", Some("a"), None),
            stigma(StigmaSlot::Middle, "B", Some("b"), None),
            stigma(StigmaSlot::Bottom, "C", Some("c"), None),
        ])
        .unwrap();

        let (members, bonuses) = set.main_set_with_bonuses();
        assert!(members.is_empty());
        assert!(bonuses.is_empty());
    }

    #[test]
    fn test_single_piece_grants_nothing() {
        let set = StigmataSet::new(vec![stigma(StigmaSlot::Top, "A", Some("a"), None)]).unwrap();
        let (members, bonuses) = set.main_set_with_bonuses();
        assert!(members.is_empty());
        assert!(bonuses.is_empty());
    }

    #[test]
    fn test_bonus_requires_name_and_effect() {
        let mut piece = stigma(StigmaSlot::Top, "A", Some("a"), None);
        piece.set_effect_2p = None;
        assert!(piece.set_bonus_2p().is_none());
        assert!(piece.set_bonuses().is_empty());
    }

    #[test]
    fn test_parse_from_fields() {
        let mut fields = FieldMap::new();
        for (key, value) in [
            ("name", "Ana Schariac"),
            ("rarity", "4"),
            ("slotT", "x"),
            ("slotT_HP", "330"),
            ("slotT_ATK", "0"),
            ("slotT_DEF", "30"),
            ("slotT_CRT", "7"),
            ("slotT_effectName", "Frost Blessing"),
            ("slotT_effect", "Gain ice resistance."),
            ("slotM", "x"),
            ("slotM_HP", "290"),
            ("slotM_ATK", "55"),
            ("slotM_DEF", "0"),
            ("slotM_CRT", "12"),
            ("slotM_effectName", "Frost Heart"),
            ("slotM_effect", "Ice DMG up."),
            ("setEffect2pName", "Glacier"),
            ("setEffect2p", "Total damage up."),
        ] {
            fields.insert(key.to_owned(), value.to_owned());
        }

        let set = StigmataSet::parse(&fields).unwrap();
        assert_eq!(set.stigmata().len(), 2);
        assert_eq!(set.stigmata()[0].slot, StigmaSlot::Top);
        // Wiki rarity takes the lowest rank; stored rarity is one above.
        assert_eq!(set.stigmata()[0].rarity.get(), 5);

        let (members, bonuses) = set.main_set_with_bonuses();
        assert_eq!(members.len(), 2);
        assert_eq!(bonuses.len(), 1);
        assert_eq!(bonuses[0].name, "Glacier");
    }
}
