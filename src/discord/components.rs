//! Message components for wiki prompts: the wikilink browser, the weapon
//! rarity browser and the delete button.
//!
//! All navigation state lives in component custom ids, so prompts keep
//! working across restarts without any per-message bookkeeping.

use serenity::all::{
    ActionRow, ActionRowComponent, ButtonKind, ButtonStyle, CreateActionRow, CreateButton,
    CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter, CreateSelectMenu, CreateSelectMenuKind,
    CreateSelectMenuOption, Message, ReactionType,
};

use crate::wiki::constants::{RequestCategory, CROSS_MARK_EMOJI, STAR, UNDO_EMOJI};
use crate::wiki::orchestrator::RequestMeta;
use crate::wiki::render::{Document, WikiLinkMap};

const WIKILINK_PREFIX: &str = "wl";
const RARITY_PREFIX: &str = "rb";
const DELETE_PREFIX: &str = "del";

/// Discord's per-select option limit.
const OPTION_LIMIT: usize = 25;

fn emoji(tag: &str) -> Option<ReactionType> {
    ReactionType::try_from(tag).ok()
}

/// State of the wikilink browser, carried in its custom id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikilinkNav {
    pub author_id: u64,
    /// Category of the page the prompt currently shows.
    pub category: String,
    /// Page id of the page the prompt currently shows.
    pub page_id: String,
}

impl WikilinkNav {
    pub fn encode(&self) -> String {
        format!(
            "{WIKILINK_PREFIX}|{}|{}|{}",
            self.author_id, self.category, self.page_id
        )
    }

    pub fn decode(custom_id: &str) -> Option<Self> {
        let mut parts = custom_id.splitn(4, '|');
        if parts.next()? != WIKILINK_PREFIX {
            return None;
        }
        Some(Self {
            author_id: parts.next()?.parse().ok()?,
            category: parts.next()?.to_owned(),
            page_id: parts.next()?.to_owned(),
        })
    }
}

/// State of the rarity browser, carried in its custom id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RarityNav {
    pub author_id: u64,
    pub page_id: String,
}

impl RarityNav {
    pub fn encode(&self) -> String {
        format!("{RARITY_PREFIX}|{}|{}", self.author_id, self.page_id)
    }

    pub fn decode(custom_id: &str) -> Option<Self> {
        let mut parts = custom_id.splitn(3, '|');
        if parts.next()? != RARITY_PREFIX {
            return None;
        }
        Some(Self {
            author_id: parts.next()?.parse().ok()?,
            page_id: parts.next()?.to_owned(),
        })
    }
}

/// State of the delete button, carried in its custom id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteNav {
    pub author_id: u64,
}

impl DeleteNav {
    pub fn encode(&self) -> String {
        format!("{DELETE_PREFIX}|{}", self.author_id)
    }

    pub fn decode(custom_id: &str) -> Option<Self> {
        let (prefix, author) = custom_id.split_once('|')?;
        if prefix != DELETE_PREFIX {
            return None;
        }
        Some(Self {
            author_id: author.parse().ok()?,
        })
    }
}

/// A select value pointing at another page: `page_id:Category:...`.
pub fn parse_page_value(value: &str) -> Option<(&str, &str)> {
    value.split_once(':')
}

fn wikilink_options(
    wikilinks: &WikiLinkMap,
    back: Option<(&str, &str)>,
) -> Vec<CreateSelectMenuOption> {
    let mut options = Vec::new();

    if let Some((back_id, back_category)) = back {
        let mut option =
            CreateSelectMenuOption::new("Back", format!("{back_id}:{back_category}"));
        if let Some(undo) = emoji(UNDO_EMOJI) {
            option = option.emoji(undo);
        }
        options.push(option);
    }

    for (page_id, target) in wikilinks {
        if Some(page_id.as_str()) == back.map(|(id, _)| id) {
            continue;
        }
        if options.len() == OPTION_LIMIT {
            break;
        }
        let mut option = CreateSelectMenuOption::new(
            target.title.clone(),
            format!("{page_id}:{}", target.category.as_str()),
        );
        if let Some(category_emoji) = emoji(target.category.emoji()) {
            option = option.emoji(category_emoji);
        }
        options.push(option);
    }

    options
}

fn wikilink_row(nav: &WikilinkNav, options: Vec<CreateSelectMenuOption>) -> CreateActionRow {
    CreateActionRow::SelectMenu(
        CreateSelectMenu::new(nav.encode(), CreateSelectMenuKind::String { options })
            .placeholder("Continue searching...")
            .min_values(1)
            .max_values(1),
    )
}

/// The rarity select, with the current rarity pre-selected.
pub fn rarity_row(nav: &RarityNav, min_rarity: u8, max_rarity: u8, current: u8) -> CreateActionRow {
    let options = (min_rarity..=max_rarity)
        .map(|rarity| {
            let mut option = CreateSelectMenuOption::new(rarity.to_string(), rarity.to_string())
                .default_selection(rarity == current);
            if let Some(star) = emoji(STAR) {
                option = option.emoji(star);
            }
            option
        })
        .collect();

    CreateActionRow::SelectMenu(
        CreateSelectMenu::new(nav.encode(), CreateSelectMenuKind::String { options })
            .placeholder("View stats at a different rarity...")
            .min_values(1)
            .max_values(1),
    )
}

fn delete_row(author_id: u64) -> CreateActionRow {
    let mut button =
        CreateButton::new(DeleteNav { author_id }.encode()).style(ButtonStyle::Danger);
    if let Some(cross) = emoji(CROSS_MARK_EMOJI) {
        button = button.emoji(cross);
    }
    CreateActionRow::Buttons(vec![button])
}

/// Build the component rows for one rendered page.
///
/// `back` carries the previously shown page so the browser can offer a
/// Back entry; it is `None` for a fresh prompt.
pub fn build_for_content(
    author_id: u64,
    category: &str,
    page_id: &str,
    back: Option<(&str, &str)>,
    wikilinks: &WikiLinkMap,
    meta: &RequestMeta,
) -> Vec<CreateActionRow> {
    let mut rows = Vec::new();

    let options = wikilink_options(wikilinks, back);
    if !options.is_empty() {
        let nav = WikilinkNav {
            author_id,
            category: category.to_owned(),
            page_id: page_id.to_owned(),
        };
        rows.push(wikilink_row(&nav, options));
    }

    if let RequestMeta::Weapon {
        min_rarity,
        max_rarity,
        ..
    } = meta
    {
        let nav = RarityNav {
            author_id,
            page_id: page_id.to_owned(),
        };
        rows.push(rarity_row(&nav, *min_rarity, *max_rarity, *min_rarity));
    }

    rows.push(delete_row(author_id));
    rows
}

/// Rebuild a message's rows, swapping the select with `custom_id` for
/// `replacement` and keeping everything else as-is.
pub fn rows_with_replaced_select(
    message: &Message,
    custom_id: &str,
    replacement: CreateActionRow,
) -> Vec<CreateActionRow> {
    let mut replacement = Some(replacement);
    message
        .components
        .iter()
        .map(|row| {
            if row_contains(row, custom_id) {
                if let Some(new_row) = replacement.take() {
                    return new_row;
                }
            }
            convert_row(row)
        })
        .collect()
}

fn row_contains(row: &ActionRow, custom_id: &str) -> bool {
    row.components.iter().any(|component| match component {
        ActionRowComponent::SelectMenu(menu) => menu.custom_id.as_deref() == Some(custom_id),
        _ => false,
    })
}

/// Turn an action row received from Discord back into its builder form.
fn convert_row(row: &ActionRow) -> CreateActionRow {
    let mut buttons = Vec::new();
    for component in &row.components {
        match component {
            ActionRowComponent::Button(button) => {
                let mut builder = match &button.data {
                    ButtonKind::NonLink { custom_id, style } => {
                        CreateButton::new(custom_id.clone()).style(*style)
                    }
                    ButtonKind::Link { url } => CreateButton::new_link(url.clone()),
                    _ => continue,
                };
                if let Some(label) = &button.label {
                    builder = builder.label(label.clone());
                }
                if let Some(button_emoji) = &button.emoji {
                    builder = builder.emoji(button_emoji.clone());
                }
                buttons.push(builder.disabled(button.disabled));
            }
            ActionRowComponent::SelectMenu(menu) => {
                let options = menu
                    .options
                    .iter()
                    .map(|option| {
                        let mut builder =
                            CreateSelectMenuOption::new(option.label.clone(), option.value.clone())
                                .default_selection(option.default);
                        if let Some(option_emoji) = &option.emoji {
                            builder = builder.emoji(option_emoji.clone());
                        }
                        builder
                    })
                    .collect();

                let mut builder = CreateSelectMenu::new(
                    menu.custom_id.clone().unwrap_or_default(),
                    CreateSelectMenuKind::String { options },
                );
                if let Some(placeholder) = &menu.placeholder {
                    builder = builder.placeholder(placeholder.clone());
                }
                if let Some(min_values) = menu.min_values {
                    builder = builder.min_values(min_values);
                }
                if let Some(max_values) = menu.max_values {
                    builder = builder.max_values(max_values);
                }
                return CreateActionRow::SelectMenu(builder);
            }
            _ => {}
        }
    }
    CreateActionRow::Buttons(buttons)
}

/// Turn a cached document into a Discord embed.
pub fn document_to_embed(document: &Document) -> CreateEmbed {
    let mut embed = CreateEmbed::new();
    if let Some(title) = &document.title {
        embed = embed.title(title.clone());
    }
    if let Some(description) = &document.description {
        embed = embed.description(description.clone());
    }
    if let Some(colour) = document.colour {
        embed = embed.colour(colour);
    }
    if let Some(author) = &document.author {
        embed = embed.author(
            CreateEmbedAuthor::new(author.name.clone())
                .url(author.url.clone())
                .icon_url(author.icon_url.clone()),
        );
    }
    if let Some(thumbnail) = &document.thumbnail {
        embed = embed.thumbnail(thumbnail.clone());
    }
    if let Some(footer) = &document.footer {
        embed = embed.footer(CreateEmbedFooter::new(footer.clone()));
    }
    for field in &document.fields {
        embed = embed.field(field.name.clone(), field.value.clone(), field.inline);
    }
    embed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wiki::render::WikiLinkTarget;

    #[test]
    fn test_wikilink_nav_round_trip() {
        let nav = WikilinkNav {
            author_id: 123456789012345678,
            category: "Category:Event Stigmata".to_owned(),
            page_id: "4242".to_owned(),
        };
        assert_eq!(WikilinkNav::decode(&nav.encode()), Some(nav));
    }

    #[test]
    fn test_rarity_nav_round_trip() {
        let nav = RarityNav {
            author_id: 42,
            page_id: "7".to_owned(),
        };
        assert_eq!(RarityNav::decode(&nav.encode()), Some(nav));
    }

    #[test]
    fn test_delete_nav_round_trip() {
        let nav = DeleteNav { author_id: 99 };
        assert_eq!(DeleteNav::decode(&nav.encode()), Some(nav));
    }

    #[test]
    fn test_nav_prefixes_are_distinct() {
        let wikilink = WikilinkNav {
            author_id: 1,
            category: "Category:Weapons".to_owned(),
            page_id: "2".to_owned(),
        }
        .encode();
        assert!(RarityNav::decode(&wikilink).is_none());
        assert!(DeleteNav::decode(&wikilink).is_none());
    }

    #[test]
    fn test_nav_ids_fit_discord_limit() {
        let nav = WikilinkNav {
            author_id: u64::MAX,
            category: "Category:Event Stigmata".to_owned(),
            page_id: "99999999".to_owned(),
        };
        assert!(nav.encode().len() <= 100);
    }

    #[test]
    fn test_page_value_splits_on_first_colon() {
        assert_eq!(
            parse_page_value("123:Category:Event Stigmata"),
            Some(("123", "Category:Event Stigmata"))
        );
        assert_eq!(parse_page_value("no-colon"), None);
    }

    fn links(entries: &[(&str, &str)]) -> WikiLinkMap {
        entries
            .iter()
            .map(|(id, title)| {
                (
                    (*id).to_owned(),
                    WikiLinkTarget {
                        title: (*title).to_owned(),
                        category: RequestCategory::Weapons,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_back_option_comes_first_and_target_is_skipped() {
        let wikilinks = links(&[("1", "Key of Reason"), ("2", "Blood Dance")]);
        let options = wikilink_options(&wikilinks, Some(("1", "Category:Weapons")));

        // Back, plus the one link that is not the back target.
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn test_option_count_is_capped() {
        let titles: Vec<(String, String)> = (0..40)
            .map(|i| (i.to_string(), format!("Weapon {i}")))
            .collect();
        let wikilinks: WikiLinkMap = titles
            .iter()
            .map(|(id, title)| {
                (
                    id.clone(),
                    WikiLinkTarget {
                        title: title.clone(),
                        category: RequestCategory::Weapons,
                    },
                )
            })
            .collect();

        let options = wikilink_options(&wikilinks, None);
        assert_eq!(options.len(), OPTION_LIMIT);
    }

    #[test]
    fn test_weapon_content_gets_three_rows() {
        let wikilinks = links(&[("1", "Key of Reason")]);
        let meta = RequestMeta::Weapon {
            stats: Vec::new(),
            min_rarity: 3,
            max_rarity: 5,
        };
        let rows = build_for_content(42, "Category:Weapons", "7", None, &wikilinks, &meta);
        assert_eq!(rows.len(), 3);

        let rows = build_for_content(
            42,
            "Category:Battlesuits",
            "7",
            None,
            &WikiLinkMap::new(),
            &RequestMeta::None,
        );
        // No links and no rarity select leaves just the delete button.
        assert_eq!(rows.len(), 1);
    }
}
