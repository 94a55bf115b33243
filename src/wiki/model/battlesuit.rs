//! Battlesuit pages, including gear recommendations.

use serde::{Deserialize, Serialize};

use crate::common::error::ModelError;
use crate::wiki::constants::{
    BattlesuitRank, BattlesuitType, CoreStrength, RECOMMENDATION_KINDS, RECOMMENDATION_SCORES,
};
use crate::wiki::markup::{scan_templates, FieldMap};

use super::{field, opt_field, parse_core_strengths};

/// A piece of equipment named in a recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    pub name: String,
    pub rarity: i64,
}

/// An equipment recommendation: a weapon and one stigma per slot, not
/// necessarily of the same set, plus three quality scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: String,
    pub weapon: Equipment,
    pub top: Equipment,
    pub middle: Equipment,
    pub bottom: Equipment,
    pub offensive_ability: String,
    pub functionality: String,
    pub compatibility: String,
}

impl Recommendation {
    /// Equipment entries in display order: weapon, then top/middle/bottom.
    pub fn equipment(&self) -> [&Equipment; 4] {
        [&self.weapon, &self.top, &self.middle, &self.bottom]
    }
}

/// A battlesuit with all data on the wiki.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battlesuit {
    pub kind: BattlesuitType,
    pub rank: BattlesuitRank,
    pub name: String,
    pub character: String,
    /// Empty for augments, which define no profile on the wiki.
    pub profile: String,
    pub core_strengths: Vec<CoreStrength>,
    pub recommendations: Vec<Recommendation>,
    pub augment: Option<String>,
    pub awakening: Option<String>,
}

impl Battlesuit {
    /// Build a battlesuit from an already-classified field mapping.
    pub fn parse(fields: &FieldMap) -> Result<Self, ModelError> {
        Ok(Self {
            kind: BattlesuitType::parse(field(fields, "type")?)?,
            rank: BattlesuitRank::parse(field(fields, "rank")?)?,
            name: field(fields, "battlesuit")?.to_owned(),
            character: field(fields, "character")?.to_owned(),
            profile: opt_field(fields, "profile").unwrap_or_default().to_owned(),
            core_strengths: parse_core_strengths(
                opt_field(fields, "core_strengths").unwrap_or_default(),
            )?,
            recommendations: pack_recommendations(fields)?,
            augment: opt_field(fields, "augment").map(str::to_owned),
            awakening: opt_field(fields, "shared").map(str::to_owned),
        })
    }
}

/// Parse the recommendation templates embedded in the four recommendation
/// fields. Each inner template names one equipment piece; the `slot`
/// argument (or the template name, for weapons) says which.
fn pack_recommendations(fields: &FieldMap) -> Result<Vec<Recommendation>, ModelError> {
    let mut recommendations = Vec::new();

    for (key, label) in RECOMMENDATION_KINDS {
        let Some(data) = opt_field(fields, key) else {
            continue;
        };

        let mut weapon = None;
        let mut top = None;
        let mut middle = None;
        let mut bottom = None;

        for template in scan_templates(data) {
            let arg = |name: &str| {
                template
                    .args
                    .iter()
                    .find(|(k, _)| k == name)
                    .map(|(_, v)| v.as_str())
            };
            let entry = Equipment {
                name: arg("1").unwrap_or("...").to_owned(),
                rarity: arg("rarity").and_then(|r| r.parse().ok()).unwrap_or(0),
            };
            match arg("slot").unwrap_or(&template.name) {
                "T" => top = Some(entry),
                "M" => middle = Some(entry),
                "B" => bottom = Some(entry),
                _ => weapon = Some(entry),
            }
        }

        let mut resolve = |slot: &str, entry: Option<Equipment>| {
            entry.ok_or_else(|| ModelError::IncompleteRecommendation {
                kind: label.to_owned(),
                slot: slot.to_owned(),
            })
        };

        let [offense, functionality, compatibility] = RECOMMENDATION_SCORES
            .map(|score| field(fields, &format!("{key}_{score}")).map(str::to_owned));

        recommendations.push(Recommendation {
            kind: label.to_owned(),
            weapon: resolve("weapon", weapon)?,
            top: resolve("T", top)?,
            middle: resolve("M", middle)?,
            bottom: resolve("B", bottom)?,
            offensive_ability: offense?,
            functionality: functionality?,
            compatibility: compatibility?,
        });
    }

    Ok(recommendations)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn battlesuit_fields() -> FieldMap {
        let mut fields = FieldMap::new();
        for (key, value) in [
            ("battlesuit", "Argent Knight: Artemis"),
            ("character", "Rita Rossweisse"),
            ("type", "BIO"),
            ("rank", "S"),
            ("profile", "An elegant maid of Schicksal."),
            ("core_strengths", "Ice DMG, Freeze"),
            (
                "BBSrec",
                "{{weapon|1=Skadi Ondurs|rarity=5}}{{stig|slot=T|1=Shakespeare|rarity=5}}\
                 {{stig|slot=M|1=Shakespeare|rarity=5}}{{stig|slot=B|1=Shakespeare|rarity=5}}",
            ),
            ("BBSrec_offensive_ability", "S"),
            ("BBSrec_functionality", "A"),
            ("BBSrec_compatibility", "S"),
        ] {
            fields.insert(key.to_owned(), value.to_owned());
        }
        fields
    }

    #[test]
    fn test_parse_battlesuit() {
        let battlesuit = Battlesuit::parse(&battlesuit_fields()).unwrap();
        assert_eq!(battlesuit.name, "Argent Knight: Artemis");
        assert_eq!(battlesuit.kind, BattlesuitType::Bio);
        assert_eq!(battlesuit.rank, BattlesuitRank::S);
        assert_eq!(
            battlesuit.core_strengths,
            vec![CoreStrength::IceDmg, CoreStrength::Freeze]
        );
        assert!(battlesuit.augment.is_none());
    }

    #[test]
    fn test_recommendation_slots_and_scores() {
        let battlesuit = Battlesuit::parse(&battlesuit_fields()).unwrap();
        assert_eq!(battlesuit.recommendations.len(), 1);

        let rec = &battlesuit.recommendations[0];
        assert_eq!(rec.kind, "Recommended");
        assert_eq!(rec.weapon.name, "Skadi Ondurs");
        assert_eq!(rec.weapon.rarity, 5);
        assert_eq!(rec.top.name, "Shakespeare");
        assert_eq!(rec.middle.name, "Shakespeare");
        assert_eq!(rec.bottom.name, "Shakespeare");
        assert_eq!(rec.offensive_ability, "S");
        assert_eq!(rec.functionality, "A");
        assert_eq!(rec.compatibility, "S");
    }

    #[test]
    fn test_incomplete_recommendation_fails() {
        let mut fields = battlesuit_fields();
        fields.insert(
            "BBSrec".into(),
            "{{weapon|1=Skadi Ondurs|rarity=5}}{{stig|slot=T|1=Shakespeare|rarity=5}}".into(),
        );
        assert!(matches!(
            Battlesuit::parse(&fields),
            Err(ModelError::IncompleteRecommendation { .. })
        ));
    }

    #[test]
    fn test_augment_without_profile() {
        let mut fields = battlesuit_fields();
        fields.remove("profile");
        fields.insert("augment".into(), "Luna Kindred".into());
        let battlesuit = Battlesuit::parse(&fields).unwrap();
        assert!(battlesuit.profile.is_empty());
        assert_eq!(battlesuit.augment.as_deref(), Some("Luna Kindred"));
    }
}
