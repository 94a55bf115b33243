//! Rendering domain models into embed-shaped documents.
//!
//! Documents are plain data so they can be cached as JSON and only turned
//! into Discord embeds at the edge. Weapon headers keep `%`-placeholders
//! for the stat values, so one cached document serves every rarity the
//! selector can pick.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::wiki::constants::{
    RequestCategory, StigmaSlot, ACTIVE_SKILL_EMOJI, EMPTY_STAR, PASSIVE_SKILL_EMOJI, STAR,
};
use crate::wiki::markup::{image_link, markdown_link, wiki_link, MarkupRenderer};
use crate::wiki::model::{Battlesuit, Stigma, StigmataSet, Weapon, WeaponStats};

const FOOTER: &str = "Press the title at the top of this embed to visit %name's wiki page!";

/// Discord's embed field value limit.
const VALUE_LIMIT: usize = 1024;

/// Resolved target of one rendered wikilink, keyed by page id in a
/// [`WikiLinkMap`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiLinkTarget {
    pub title: String,
    pub category: RequestCategory,
}

pub type WikiLinkMap = BTreeMap<String, WikiLinkTarget>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentAuthor {
    pub name: String,
    pub url: String,
    pub icon_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// One embed worth of rendered page content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colour: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<DocumentAuthor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<DocumentField>,
}

impl Document {
    /// Substitute `%name` placeholders in every textual member.
    pub fn format(&self, values: &[(&str, String)]) -> Document {
        let sub = |text: &str| substitute(text, values);
        Document {
            title: self.title.as_deref().map(sub),
            description: self.description.as_deref().map(sub),
            colour: self.colour,
            author: self.author.clone(),
            thumbnail: self.thumbnail.as_deref().map(sub),
            footer: self.footer.as_deref().map(sub),
            fields: self
                .fields
                .iter()
                .map(|field| DocumentField {
                    name: sub(&field.name),
                    value: sub(&field.value),
                    inline: field.inline,
                })
                .collect(),
        }
    }
}

fn substitute(text: &str, values: &[(&str, String)]) -> String {
    values.iter().fold(text.to_owned(), |acc, (name, value)| {
        acc.replace(&format!("%{name}"), value)
    })
}

/// Limit a string to `length`, reserving room for an ellipsis.
pub fn truncate(string: &str, length: usize) -> String {
    if string.chars().count() < length - 5 {
        return string.to_owned();
    }
    let mut cut: String = string.chars().take(length - 5).collect();
    cut.push_str("...");
    cut
}

/// A star row: filled up to `rarity`, empty up to `max_rarity`.
pub fn make_display_rarity(rarity: u8, max_rarity: u8) -> String {
    STAR.repeat(rarity as usize) + &EMPTY_STAR.repeat(max_rarity.saturating_sub(rarity) as usize)
}

/// A markdown link to a page's own wiki entry.
fn link(name: &str) -> String {
    markdown_link(name, &wiki_link(name))
}

fn footer_for(name: &str) -> String {
    substitute(FOOTER, &[("name", name.to_owned())])
}

// Battlesuits

fn battlesuit_fallback_description(battlesuit: &Battlesuit) -> String {
    let mut description = format!("{} battlesuit.", link(&battlesuit.character));
    if let Some(augment) = &battlesuit.augment {
        description.push_str(&format!(
            "\n{} upgrade of {}",
            link("Augment Core"),
            link(augment)
        ));
    }
    description
}

fn battlesuit_header(battlesuit: &Battlesuit, renderer: &MarkupRenderer) -> Document {
    let description = if battlesuit.profile.is_empty() {
        battlesuit_fallback_description(battlesuit)
    } else {
        renderer.render_inline(&battlesuit.profile)
    };

    Document {
        description: Some(description),
        colour: Some(battlesuit.kind.colour()),
        author: Some(DocumentAuthor {
            name: battlesuit.name.clone(),
            url: wiki_link(&battlesuit.name),
            icon_url: image_link(&format!("Valkyrie {}", battlesuit.rank.name())),
        }),
        thumbnail: Some(image_link(&format!("{} (Avatar)", battlesuit.name))),
        footer: Some(footer_for(&battlesuit.name)),
        ..Document::default()
    }
}

fn battlesuit_info(battlesuit: &Battlesuit) -> Document {
    let valkyrie_emoji = RequestCategory::Battlesuits.emoji();
    let mut about = battlesuit
        .core_strengths
        .iter()
        .map(|s| s.emoji())
        .collect::<Vec<_>>()
        .join(" ");
    about.push_str(&format!(
        "\nType: {} {}",
        battlesuit.kind.emoji(),
        battlesuit.kind.name()
    ));
    about.push_str(&format!(
        "\nRank: {} {}",
        battlesuit.rank.emoji(),
        battlesuit.rank.name()
    ));
    about.push_str(&format!(
        "\nValkyrie: {valkyrie_emoji} {}",
        link(&battlesuit.character)
    ));
    if let Some(augment) = &battlesuit.augment {
        about.push_str(&format!("\nAugment (of): {valkyrie_emoji} {}", link(augment)));
    }
    if let Some(awakening) = &battlesuit.awakening {
        about.push_str(&format!(
            "\nAwakening (of): {valkyrie_emoji} {}",
            link(awakening)
        ));
    }

    let mut fields = vec![DocumentField {
        name: "About:".to_owned(),
        value: about,
        inline: false,
    }];
    for recommendation in &battlesuit.recommendations {
        fields.push(DocumentField {
            name: format!("{}:", recommendation.kind),
            value: format!(
                "{} {}\n{} {}\n{} {}\n{} {}",
                RequestCategory::Weapons.emoji(),
                link(&recommendation.weapon.name),
                StigmaSlot::Top.emoji(),
                link(&recommendation.top.name),
                StigmaSlot::Middle.emoji(),
                link(&recommendation.middle.name),
                StigmaSlot::Bottom.emoji(),
                link(&recommendation.bottom.name),
            ),
            inline: true,
        });
    }

    Document {
        colour: Some(battlesuit.kind.colour()),
        fields,
        ..Document::default()
    }
}

pub fn render_battlesuit(battlesuit: &Battlesuit, renderer: &MarkupRenderer) -> Vec<Document> {
    vec![battlesuit_header(battlesuit, renderer), battlesuit_info(battlesuit)]
}

// Stigmata

fn stigma_document(stigma: &Stigma, show_rarity: bool, renderer: &MarkupRenderer) -> Document {
    let mut description = String::new();
    if show_rarity {
        description.push_str(&format!("Rarity: {}\n", stigma.rarity.stars()));
    }
    description.push_str(&renderer.render_inline(&stigma.effect));

    let stats = [
        ("HP", stigma.hp),
        ("ATK", stigma.attack),
        ("DEF", stigma.defense),
        ("CRT", stigma.crit),
    ]
    .iter()
    .filter(|(_, stat)| *stat != 0)
    .map(|(name, stat)| format!("**{name}**: {stat}"))
    .collect::<Vec<_>>()
    .join(",\u{2003}");

    Document {
        title: Some(stigma.effect_name.clone()),
        description: Some(truncate(&description, VALUE_LIMIT)),
        colour: Some(stigma.slot.colour()),
        author: Some(DocumentAuthor {
            name: stigma.name.clone(),
            url: wiki_link(&stigma.set_name),
            icon_url: image_link(&format!("Stigmata {}", stigma.slot.title())),
        }),
        thumbnail: Some(image_link(&format!(
            "{} ({}) (Icon)",
            stigma.set_name,
            stigma.slot.letter()
        ))),
        footer: Some(footer_for(&stigma.set_name)),
        fields: vec![DocumentField {
            name: "\u{200b}".to_owned(),
            value: stats,
            inline: true,
        }],
    }
}

pub fn render_stigmata(set: &StigmataSet, renderer: &MarkupRenderer) -> Vec<Document> {
    let (main_set, bonuses) = set.main_set_with_bonuses();

    let mut documents: Vec<Document> = set
        .stigmata()
        .iter()
        .map(|stigma| {
            let in_main_set = main_set.iter().any(|member| *member == stigma);
            stigma_document(stigma, !in_main_set, renderer)
        })
        .collect();

    if let (Some(first), false) = (main_set.first(), bonuses.is_empty()) {
        let mut bonus_document = Document {
            description: Some(format!("Rarity: {}", first.rarity.stars())),
            ..Document::default()
        };
        for bonus in bonuses {
            bonus_document.fields.push(DocumentField {
                name: bonus.name,
                value: renderer.render_inline(&bonus.effect),
                inline: false,
            });
        }
        documents.push(bonus_document);
    }

    documents
}

// Weapons

fn weapon_header(weapon: &Weapon, renderer: &MarkupRenderer) -> Document {
    let mut description = format!(
        "Rarity: %display_rarity\n\n{}\n\n**ATK**: %attack\t**CRT**: %crit",
        renderer.render_inline(&weapon.description)
    );
    if let Some(counterpart) = weapon.pri_arm.as_deref().or(weapon.pri_arm_base.as_deref()) {
        let relation = if weapon.pri_arm_base.is_some() {
            "of**:"
        } else {
            "**:"
        };
        description.push_str(&format!("\n\n**PRI-ARM {relation}\n{}", link(counterpart)));
    }

    Document {
        description: Some(description),
        author: Some(DocumentAuthor {
            name: weapon.name.clone(),
            url: wiki_link(&weapon.name),
            icon_url: image_link(&format!("{} (Type)", weapon.kind)),
        }),
        thumbnail: Some(image_link(&format!("{} (%rarity) (Icon)", weapon.name))),
        footer: Some(footer_for(&weapon.name)),
        ..Document::default()
    }
}

fn weapon_info(weapon: &Weapon, renderer: &MarkupRenderer) -> Document {
    let fields = weapon
        .skills
        .iter()
        .map(|skill| {
            let icon = if skill.is_active() {
                ACTIVE_SKILL_EMOJI
            } else {
                PASSIVE_SKILL_EMOJI
            };
            let mut name = format!("{icon} {}", skill.name);
            if !skill.core_strengths.is_empty() {
                name.push(' ');
                for strength in &skill.core_strengths {
                    name.push_str(strength.emoji());
                }
            }
            DocumentField {
                name,
                value: truncate(&renderer.render_inline(&skill.effect), VALUE_LIMIT),
                inline: false,
            }
        })
        .collect();

    Document {
        fields,
        ..Document::default()
    }
}

pub fn render_weapon(weapon: &Weapon, renderer: &MarkupRenderer) -> Vec<Document> {
    vec![weapon_header(weapon, renderer), weapon_info(weapon, renderer)]
}

/// Placeholder values that specialize a weapon header to one stat row.
pub fn weapon_header_values(stats: &WeaponStats, max_rarity: u8) -> Vec<(&'static str, String)> {
    vec![
        (
            "display_rarity",
            make_display_rarity(stats.rarity.get(), max_rarity),
        ),
        ("attack", stats.attack.to_string()),
        ("crit", stats.crit.to_string()),
        ("rarity", stats.rarity.get().to_string()),
    ]
}
