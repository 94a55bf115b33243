//! Constant tables for the Honkai Impact 3 wiki: request categories,
//! rarities, equipment slots, and the emoji used to render them.
//!
//! These mirror the category and template names as they appear on the wiki;
//! changing them breaks both API sweeps and embed rendering.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::error::ModelError;

/// Default MediaWiki API endpoint.
pub const DEFAULT_API_BASE: &str = "https://honkaiimpact3.fandom.com/api.php";

/// Default base URL for page and file links.
pub const DEFAULT_WIKI_BASE: &str = "https://honkaiimpact3.fandom.com/";

pub const STAR: &str = "<:icon_rarity_star:641631459865526302>";
pub const EMPTY_STAR: &str = "<:icon_rarity_star_empty:642086113539784782>";

pub const ACTIVE_SKILL_EMOJI: &str = "<:Active:914594001565413378>";
pub const PASSIVE_SKILL_EMOJI: &str = "<:Passive:914596917961445416>";

pub const UNDO_EMOJI: &str = "<:undo:997511439055061002>";
pub const CROSS_MARK_EMOJI: &str = "<:cross_mark:904873627466477678>";

/// The wiki categories a page query can target.
///
/// Only battlesuits, stigmata and weapons have request handlers; the other
/// variants exist so category strings coming back from the wiki (and from
/// cached rows) always parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RequestCategory {
    #[serde(rename = "Category:Battlesuits")]
    Battlesuits,
    #[serde(rename = "Category:ELFs")]
    Elfs,
    #[serde(rename = "Category:Stigmata")]
    Stigmata,
    #[serde(rename = "Category:Event Stigmata")]
    EventStigmata,
    #[serde(rename = "Category:Weapons")]
    Weapons,
}

impl RequestCategory {
    /// The category title as it appears on the wiki.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Battlesuits => "Category:Battlesuits",
            Self::Elfs => "Category:ELFs",
            Self::Stigmata => "Category:Stigmata",
            Self::EventStigmata => "Category:Event Stigmata",
            Self::Weapons => "Category:Weapons",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Category:Battlesuits" => Some(Self::Battlesuits),
            "Category:ELFs" => Some(Self::Elfs),
            "Category:Stigmata" => Some(Self::Stigmata),
            "Category:Event Stigmata" => Some(Self::EventStigmata),
            "Category:Weapons" => Some(Self::Weapons),
            _ => None,
        }
    }

    /// The display emoji belonging to this request category.
    pub fn emoji(self) -> &'static str {
        match self {
            Self::Battlesuits => "<:Valkyrie_Generic:909813519103430697>",
            Self::Elfs => "<:ELF_Generic:1021130366083403796>",
            Self::Stigmata | Self::EventStigmata => "<:Stigmata_Generic:914200965136138241>",
            Self::Weapons => "<:Equipment_Generic:642086143571132420>",
        }
    }

    /// The categories that have a request handler.
    pub fn handled() -> [Self; 3] {
        [Self::Battlesuits, Self::Stigmata, Self::Weapons]
    }

    /// Comma-joined handled category names, for error messages.
    pub fn handled_names() -> String {
        Self::handled()
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The rarity sub-categories requested alongside a listing sweep of
    /// this category, used to annotate pages with their rarity.
    pub fn sub_categories(self) -> Vec<String> {
        match self {
            Self::Battlesuits => ["B", "A", "S", "SS", "SSS"]
                .iter()
                .map(|rank| format!("Category:{rank}-rank Battlesuits"))
                .collect(),
            Self::Stigmata | Self::EventStigmata => (1..=5)
                .map(|r| format!("Category:{r}-star Stigmata"))
                .collect(),
            Self::Weapons => (1..=6)
                .map(|r| format!("Category:{r}-star Weapons"))
                .collect(),
            Self::Elfs => Vec::new(),
        }
    }
}

impl fmt::Display for RequestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Battlesuit types as they appear on the wiki.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattlesuitType {
    Bio,
    Psy,
    Mech,
    Qua,
    Img,
}

impl BattlesuitType {
    pub fn parse(value: &str) -> Result<Self, ModelError> {
        match value {
            "BIO" => Ok(Self::Bio),
            "PSY" => Ok(Self::Psy),
            "MECH" => Ok(Self::Mech),
            "QUA" => Ok(Self::Qua),
            "IMG" => Ok(Self::Img),
            _ => Err(ModelError::UnknownType {
                value: value.to_owned(),
            }),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Bio => "BIO",
            Self::Psy => "PSY",
            Self::Mech => "MECH",
            Self::Qua => "QUA",
            Self::Img => "IMG",
        }
    }

    /// The display colour belonging to this battlesuit type.
    pub fn colour(self) -> u32 {
        match self {
            Self::Bio => 0xFFB833,
            Self::Psy => 0xFE46CF,
            Self::Mech => 0x2FE0FF,
            Self::Qua => 0x9B78FE,
            Self::Img => 0xF1D799,
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Self::Bio => "<:Type_BIO:643900338864259072>",
            Self::Psy => "<:Type_PSY:643900338683772939>",
            Self::Mech => "<:Type_MECH:643900338868453417>",
            Self::Qua => "<:Type_QUA:643900338943819777>",
            Self::Img => "<:Type_IMG:996931175287365753>",
        }
    }
}

/// Battlesuit ranks as they appear on the wiki.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattlesuitRank {
    B,
    A,
    S,
    SS,
    SSS,
}

impl BattlesuitRank {
    pub fn parse(value: &str) -> Result<Self, ModelError> {
        match value {
            "B" => Ok(Self::B),
            "A" => Ok(Self::A),
            "S" => Ok(Self::S),
            "SS" => Ok(Self::SS),
            "SSS" => Ok(Self::SSS),
            _ => Err(ModelError::UnknownRank {
                value: value.to_owned(),
            }),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::B => "B",
            Self::A => "A",
            Self::S => "S",
            Self::SS => "SS",
            Self::SSS => "SSS",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Self::B => "<:Rank_B:643906316716474379>",
            Self::A => "<:Rank_A:643906316317884447>",
            Self::S => "<:Rank_S:643906316422742047>",
            Self::SS => "<:Rank_SS:643906317362266113>",
            Self::SSS => "<:Rank_SSS:643906317781696552>",
        }
    }
}

/// Valid equipment slots for stigmata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StigmaSlot {
    Top,
    Middle,
    Bottom,
}

impl StigmaSlot {
    pub const ALL: [Self; 3] = [Self::Top, Self::Middle, Self::Bottom];

    /// The single-letter slot tag used in wiki field names (`slotT`, ...).
    pub fn letter(self) -> &'static str {
        match self {
            Self::Top => "T",
            Self::Middle => "M",
            Self::Bottom => "B",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Top => "Top",
            Self::Middle => "Middle",
            Self::Bottom => "Bottom",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Self::Top => "<:Stig_T:640937795761733652>",
            Self::Middle => "<:Stig_M:640937795665395734>",
            Self::Bottom => "<:Stig_B:640937795103227909>",
        }
    }

    /// The display colour belonging to this stigma slot.
    pub fn colour(self) -> u32 {
        match self {
            Self::Top => 0xFF9279,
            Self::Middle => 0x9DAAFE,
            Self::Bottom => 0xB2C964,
        }
    }
}

impl fmt::Display for StigmaSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

/// A validated stigma rarity (1 through 5 stars).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StigmaRarity(u8);

impl StigmaRarity {
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> Result<Self, ModelError> {
        match u8::try_from(value) {
            Ok(v) if (1..=Self::MAX).contains(&v) => Ok(Self(v)),
            _ => Err(ModelError::InvalidRarity { value }),
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// A full row of star emoji for this rarity.
    pub fn stars(self) -> String {
        STAR.repeat(self.0 as usize)
    }
}

/// A validated weapon rarity (1 through 6 stars).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct WeaponRarity(u8);

impl WeaponRarity {
    pub const MAX: u8 = 6;

    pub fn new(value: i64) -> Result<Self, ModelError> {
        match u8::try_from(value) {
            Ok(v) if (1..=Self::MAX).contains(&v) => Ok(Self(v)),
            _ => Err(ModelError::InvalidRarity { value }),
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for WeaponRarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Core strength tags attached to battlesuits and weapon skills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoreStrength {
    IceDmg,
    FireDmg,
    LightningDmg,
    Physical,
    Burst,
    TimeMastery,
    Gather,
    Heal,
    FastAtk,
    HeavyAtk,
    Freeze,
    Ignite,
    Bleed,
    Weaken,
    Impair,
    Stun,
    Paralyze,
    Aerial,
}

impl CoreStrength {
    /// Parse one strength tag as it appears in a comma-joined wiki field,
    /// e.g. `Ice DMG` or `Time Mastery`.
    pub fn parse(value: &str) -> Result<Self, ModelError> {
        let normalized = value.trim().to_uppercase().replace(' ', "_");
        let strength = match normalized.as_str() {
            "ICE_DMG" => Self::IceDmg,
            "FIRE_DMG" => Self::FireDmg,
            "LIGHTNING_DMG" => Self::LightningDmg,
            "PHYSICAL" => Self::Physical,
            "BURST" => Self::Burst,
            "TIME_MASTERY" => Self::TimeMastery,
            "GATHER" => Self::Gather,
            "HEAL" => Self::Heal,
            "FAST_ATK" => Self::FastAtk,
            "HEAVY_ATK" => Self::HeavyAtk,
            "FREEZE" => Self::Freeze,
            "IGNITE" => Self::Ignite,
            "BLEED" => Self::Bleed,
            "WEAKEN" => Self::Weaken,
            "IMPAIR" => Self::Impair,
            "STUN" => Self::Stun,
            "PARALYZE" => Self::Paralyze,
            "AERIAL" => Self::Aerial,
            _ => {
                return Err(ModelError::UnknownStrength {
                    value: value.to_owned(),
                })
            }
        };
        Ok(strength)
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Self::IceDmg => "<:Ice_DMG:911355738008453151>",
            Self::FireDmg => "<:Fire_DMG:911355738042007572>",
            Self::LightningDmg => "<:Lightning_DMG:911355737832304650>",
            Self::Physical => "<:Physical:911355737819725875>",
            Self::Burst => "<:Burst:911356972044009532>",
            Self::TimeMastery => "<:Time_Mastery:911355737878462544>",
            Self::Gather => "<:Gather:911355737819725844>",
            Self::Heal => "<:Heal:911355737907822592>",
            Self::FastAtk => "<:Fast_ATK:911355737756807281>",
            Self::HeavyAtk => "<:Heavy_ATK:911355737861681183>",
            Self::Freeze => "<:Freeze:911355838394929236>",
            Self::Ignite => "<:Ignite:911355738083954739>",
            Self::Bleed => "<:Bleed:911355737886847026>",
            Self::Weaken => "<:Weaken:911355738100748338>",
            Self::Impair => "<:Impair:911355737903603792>",
            Self::Stun => "<:Stun:911355838491402250>",
            Self::Paralyze => "<:Paralyze:911355737958125639>",
            Self::Aerial => "<:Aerial:938545043038416936>",
        }
    }
}

/// The four equipment-recommendation templates on battlesuit pages, in
/// display order, paired with their human-readable labels.
pub const RECOMMENDATION_KINDS: [(&str, &str); 4] = [
    ("BBSrec", "Recommended"),
    ("BBSau", "Auxiliary"),
    ("BBSun", "Universal"),
    ("BBStr", "Transitional"),
];

/// Per-recommendation score fields, suffixed onto the template key.
pub const RECOMMENDATION_SCORES: [&str; 3] =
    ["offensive_ability", "functionality", "compatibility"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip() {
        for category in [
            RequestCategory::Battlesuits,
            RequestCategory::Elfs,
            RequestCategory::Stigmata,
            RequestCategory::EventStigmata,
            RequestCategory::Weapons,
        ] {
            assert_eq!(RequestCategory::parse(category.as_str()), Some(category));
        }
        assert_eq!(RequestCategory::parse("Category:Outfits"), None);
    }

    #[test]
    fn test_category_serde_uses_wiki_title() {
        let json = serde_json::to_string(&RequestCategory::EventStigmata).unwrap();
        assert_eq!(json, "\"Category:Event Stigmata\"");
        let back: RequestCategory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RequestCategory::EventStigmata);
    }

    #[test]
    fn test_weapon_rarity_bounds() {
        assert!(WeaponRarity::new(0).is_err());
        assert!(WeaponRarity::new(7).is_err());
        assert_eq!(WeaponRarity::new(4).unwrap().get(), 4);
    }

    #[test]
    fn test_core_strength_parses_display_names() {
        assert_eq!(
            CoreStrength::parse("Ice DMG").unwrap(),
            CoreStrength::IceDmg
        );
        assert_eq!(
            CoreStrength::parse("Time Mastery").unwrap(),
            CoreStrength::TimeMastery
        );
        assert!(CoreStrength::parse("Moral Support").is_err());
    }

    #[test]
    fn test_sub_categories_cover_all_rarities() {
        assert_eq!(RequestCategory::Weapons.sub_categories().len(), 6);
        assert_eq!(RequestCategory::Stigmata.sub_categories().len(), 5);
        assert_eq!(RequestCategory::Battlesuits.sub_categories().len(), 5);
    }
}
