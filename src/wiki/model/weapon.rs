//! Weapon pages: per-rarity stat tiers and active/passive skills.

use std::sync::OnceLock;

use fancy_regex::Regex;
use serde::{Deserialize, Serialize};

use crate::common::error::ModelError;
use crate::wiki::constants::{CoreStrength, WeaponRarity};
use crate::wiki::markup::FieldMap;

use super::{field, int_field, opt_field, parse_core_strengths};

/// Stat field suffixes in ascending tier order, as they appear on the wiki
/// (`ATK_baseRarity`, `ATK_2ndRarity`, ...). Tiers absent in the source are
/// skipped.
const STAT_TIERS: [&str; 6] = ["base", "2nd", "3rd", "4th", "5th", "max"];

fn active_skill_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[SP: \d+\]\[CD: \d+s\]").unwrap())
}

/// One stat row of a weapon at a specific rarity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponStats {
    pub attack: i64,
    pub crit: i64,
    pub rarity: WeaponRarity,
}

/// A single weapon skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponSkill {
    pub name: String,
    pub effect: String,
    pub core_strengths: Vec<CoreStrength>,
}

impl WeaponSkill {
    /// A skill is active iff its effect text carries an SP/cooldown marker.
    pub fn is_active(&self) -> bool {
        active_skill_pattern()
            .is_match(&self.effect)
            .unwrap_or(false)
    }
}

/// A weapon with all data on the wiki.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    pub name: String,
    pub kind: String,
    pub rarity: WeaponRarity,
    pub stats: Vec<WeaponStats>,
    pub description: String,
    pub skills: Vec<WeaponSkill>,
    pub pri_arm: Option<String>,
    pub pri_arm_base: Option<String>,
    pub divine_key: bool,
}

impl Weapon {
    /// Build a weapon from an already-classified field mapping.
    pub fn parse(fields: &FieldMap) -> Result<Self, ModelError> {
        let rarity = WeaponRarity::new(int_field(fields, "rarity")?)?;
        let stats = pack_stats(fields, rarity)?;
        let skills = pack_skills(fields)?;

        Ok(Self {
            name: field(fields, "name")?.to_owned(),
            kind: field(fields, "type")?.to_owned(),
            rarity,
            stats,
            description: field(fields, "description")?.to_owned(),
            skills,
            pri_arm: opt_field(fields, "priArm").map(str::to_owned),
            pri_arm_base: opt_field(fields, "priArmBase").map(str::to_owned),
            divine_key: opt_field(fields, "divine_key").is_some(),
        })
    }

    /// The rarity of the highest stat tier.
    pub fn max_rarity(&self) -> WeaponRarity {
        // Construction guarantees a non-empty, ascending stats list.
        self.stats[self.stats.len() - 1].rarity
    }

    /// The weapon's active skill, if its first skill is one.
    pub fn active_skill(&self) -> Option<&WeaponSkill> {
        self.skills.first().filter(|skill| skill.is_active())
    }

    pub fn passive_skills(&self) -> impl Iterator<Item = &WeaponSkill> {
        self.skills.iter().filter(|skill| !skill.is_active())
    }

    pub fn is_pri_arm(&self) -> bool {
        self.pri_arm_base.is_some()
    }
}

fn pack_stats(fields: &FieldMap, base_rarity: WeaponRarity) -> Result<Vec<WeaponStats>, ModelError> {
    let mut stats = Vec::new();
    for tier in STAT_TIERS {
        let atk_key = format!("ATK_{tier}Rarity");
        if opt_field(fields, &atk_key).is_none() {
            continue;
        }

        let rarity = WeaponRarity::new(i64::from(base_rarity.get()) + stats.len() as i64)?;
        stats.push(WeaponStats {
            attack: int_field(fields, &atk_key)?,
            crit: int_field(fields, &format!("CRT_{tier}Rarity"))?,
            rarity,
        });
    }

    if stats.is_empty() {
        return Err(ModelError::EmptyStats);
    }
    Ok(stats)
}

fn pack_skills(fields: &FieldMap) -> Result<Vec<WeaponSkill>, ModelError> {
    let mut skills = Vec::new();
    for i in 1..=4 {
        let Some(name) = opt_field(fields, &format!("s{i}_name")) else {
            break;
        };
        skills.push(WeaponSkill {
            name: name.to_owned(),
            effect: field(fields, &format!("s{i}_effect"))?.to_owned(),
            core_strengths: parse_core_strengths(
                opt_field(fields, &format!("s{i}_core_strengths")).unwrap_or_default(),
            )?,
        });
    }
    Ok(skills)
}

/// The stat row shown for a requested rarity tier, or `None` when the
/// request falls outside `[min_rarity, max_rarity]`.
pub fn stats_at(stats: &[WeaponStats], min_rarity: u8, max_rarity: u8, requested: u8) -> Option<&WeaponStats> {
    if !(min_rarity..=max_rarity).contains(&requested) {
        return None;
    }
    stats.get((requested - min_rarity) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weapon_fields() -> FieldMap {
        let mut fields = FieldMap::new();
        for (key, value) in [
            ("name", "Key of Reason"),
            ("type", "Cannons"),
            ("rarity", "3"),
            ("description", "A key that unlocks reason."),
            ("ATK", "285"),
            ("CRT", "21"),
            ("ATK_baseRarity", "160"),
            ("CRT_baseRarity", "9"),
            ("ATK_2ndRarity", "223"),
            ("CRT_2ndRarity", "15"),
            ("ATK_maxRarity", "285"),
            ("CRT_maxRarity", "21"),
            ("s1_name", "Icicle Crash"),
            ("s1_effect", "[SP: 25][CD: 18s] Deals heavy ice damage."),
            ("s1_core_strengths", "Ice DMG, Freeze"),
            ("s2_name", "Frost Armor"),
            ("s2_effect", "Passively grants 20% defense."),
        ] {
            fields.insert(key.to_owned(), value.to_owned());
        }
        fields
    }

    #[test]
    fn test_stats_ranks_strictly_ascending() {
        let weapon = Weapon::parse(&weapon_fields()).unwrap();
        let ranks: Vec<u8> = weapon.stats.iter().map(|s| s.rarity.get()).collect();
        assert_eq!(ranks, vec![3, 4, 5]);
        assert!(ranks.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_max_rarity_is_last_entry() {
        let weapon = Weapon::parse(&weapon_fields()).unwrap();
        assert_eq!(weapon.max_rarity(), weapon.stats.last().unwrap().rarity);
        assert_eq!(weapon.max_rarity().get(), 5);
    }

    #[test]
    fn test_skill_classification() {
        let weapon = Weapon::parse(&weapon_fields()).unwrap();
        assert_eq!(weapon.skills.len(), 2);
        assert!(weapon.skills[0].is_active());
        assert!(!weapon.skills[1].is_active());
        assert_eq!(weapon.active_skill().unwrap().name, "Icicle Crash");
        assert_eq!(weapon.passive_skills().count(), 1);
    }

    #[test]
    fn test_active_skill_tests_only_first() {
        let mut fields = weapon_fields();
        // Swap: first skill passive, second active.
        fields.insert("s1_effect".into(), "Just a passive aura.".into());
        fields.insert(
            "s2_effect".into(),
            "[SP: 10][CD: 20s] A burst.".into(),
        );
        let weapon = Weapon::parse(&fields).unwrap();
        assert!(weapon.active_skill().is_none());
    }

    #[test]
    fn test_missing_stats_fail() {
        let mut fields = weapon_fields();
        for tier in STAT_TIERS {
            fields.remove(&format!("ATK_{tier}Rarity"));
        }
        assert!(matches!(
            Weapon::parse(&fields),
            Err(ModelError::EmptyStats)
        ));
    }

    #[test]
    fn test_stats_round_trip() {
        let weapon = Weapon::parse(&weapon_fields()).unwrap();
        let json = serde_json::to_string(&weapon.stats).unwrap();
        let back: Vec<WeaponStats> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, weapon.stats);
    }

    #[test]
    fn test_stats_at_bounds() {
        let weapon = Weapon::parse(&weapon_fields()).unwrap();
        assert_eq!(stats_at(&weapon.stats, 3, 5, 3).unwrap().attack, 160);
        assert_eq!(stats_at(&weapon.stats, 3, 5, 5).unwrap().attack, 285);
        assert!(stats_at(&weapon.stats, 3, 5, 6).is_none());
        assert!(stats_at(&weapon.stats, 3, 5, 2).is_none());
    }
}
