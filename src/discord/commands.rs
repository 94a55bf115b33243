//! Slash command definitions and handlers.

use anyhow::{anyhow, Result};
use serenity::all::{
    CommandInteraction, CommandOptionType, Context, CreateAutocompleteResponse, CreateCommand,
    CreateCommandOption, CreateInteractionResponse, CreateInteractionResponseMessage,
    EditInteractionResponse, ResolvedOption, ResolvedValue,
};
use tracing::{debug, info, warn};

use crate::discord::bot::BotState;
use crate::discord::components::{build_for_content, document_to_embed, parse_page_value};
use crate::wiki::client::{unpack_aliases, PageAlias};
use crate::wiki::constants::RequestCategory;

/// All commands the bot registers.
pub fn command_definitions() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new("wiki")
            .description("Browse the Honkai Impact 3rd wiki")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::SubCommand,
                    "hi3",
                    "Look up a battlesuit, stigmata set or weapon",
                )
                .add_sub_option(
                    CreateCommandOption::new(
                        CommandOptionType::String,
                        "query",
                        "The page to look up",
                    )
                    .set_autocomplete(true)
                    .required(true),
                ),
            ),
        CreateCommand::new("cache")
            .description("Refresh the wiki alias tables (owner only)")
            .add_option(CreateCommandOption::new(
                CommandOptionType::Boolean,
                "clear",
                "Drop the existing tables before refreshing",
            )),
    ]
}

/// The `clear` flag of a `/cache` invocation. Defaults to off.
fn clear_flag(options: &[ResolvedOption<'_>]) -> bool {
    options
        .iter()
        .any(|option| {
            option.name == "clear" && matches!(option.value, ResolvedValue::Boolean(true))
        })
}

/// The `query` value of a `/wiki hi3` invocation, resolved or partial.
fn query_value<'a>(options: &'a [ResolvedOption<'a>]) -> Option<&'a str> {
    for option in options {
        if let ResolvedValue::SubCommand(sub_options) = &option.value {
            for sub_option in sub_options {
                match sub_option.value {
                    ResolvedValue::String(value) => return Some(value),
                    ResolvedValue::Autocomplete { value, .. } => return Some(value),
                    _ => {}
                }
            }
        }
    }
    None
}

pub async fn handle_wiki(
    ctx: &Context,
    interaction: &CommandInteraction,
    state: &BotState,
) -> Result<()> {
    let options = interaction.data.options();
    let query = query_value(&options).ok_or_else(|| anyhow!("missing query option"))?;

    let Some((page_id, category)) = parse_page_value(query) else {
        interaction
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content("Please pick one of the suggested pages.")
                        .ephemeral(true),
                ),
            )
            .await?;
        return Ok(());
    };

    debug!(page_id, category, "wiki lookup");
    let response = match state.orchestrator.handle_request(category, page_id).await {
        Ok(response) => response,
        Err(error) => {
            warn!(%error, page_id, "wiki request failed");
            interaction
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new()
                            .content(format!("Could not fetch that page: {error}"))
                            .ephemeral(true),
                    ),
                )
                .await?;
            return Ok(());
        }
    };

    let embeds = response.documents.iter().map(document_to_embed).collect();
    let rows = build_for_content(
        interaction.user.id.get(),
        category,
        page_id,
        None,
        &response.wikilinks,
        &response.meta,
    );

    interaction
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .embeds(embeds)
                    .components(rows),
            ),
        )
        .await?;
    Ok(())
}

fn autocomplete_title(row: &PageAlias) -> String {
    if row.title == row.alias_of {
        row.title.clone()
    } else {
        format!("{} \u{300c}{}\u{300d}", row.alias_of, row.title)
    }
}

pub async fn handle_autocomplete(
    ctx: &Context,
    interaction: &CommandInteraction,
    state: &BotState,
) -> Result<()> {
    let options = interaction.data.options();
    let partial = query_value(&options).unwrap_or_default();

    let mut response = CreateAutocompleteResponse::new();
    match state.aliases.search(partial).await {
        Ok(rows) => {
            for row in rows {
                response = response.add_string_choice(
                    autocomplete_title(&row),
                    format!("{}:{}", row.pageid, row.main_category.as_str()),
                );
            }
        }
        Err(error) => warn!(%error, "alias search failed"),
    }

    interaction
        .create_response(&ctx.http, CreateInteractionResponse::Autocomplete(response))
        .await?;
    Ok(())
}

/// Refresh the alias tables from the live wiki, one concurrent sweep per
/// handled category.
pub async fn handle_cache(
    ctx: &Context,
    interaction: &CommandInteraction,
    state: &BotState,
) -> Result<()> {
    if interaction.user.id.get() != state.owner_id {
        interaction
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content("Sorry, captain. This command is reserved for the bot owner.")
                        .ephemeral(true),
                ),
            )
            .await?;
        return Ok(());
    }

    interaction.defer(&ctx.http).await?;

    let clear = clear_flag(&interaction.data.options());
    let message = match refresh_aliases(state, clear).await {
        Ok(rows) => {
            info!(rows, clear, "alias refresh complete");
            "Successfully fetched and stored data.".to_owned()
        }
        Err(error) => {
            warn!(%error, "alias refresh failed");
            format!("Alias refresh failed: {error}")
        }
    };
    interaction
        .edit_response(&ctx.http, EditInteractionResponse::new().content(message))
        .await?;
    Ok(())
}

async fn refresh_aliases(state: &BotState, clear: bool) -> Result<usize> {
    if clear {
        state.aliases.clear().await?;
    }

    let [battlesuits, stigmata, weapons] = RequestCategory::handled();
    let (a, b, c) = futures::try_join!(
        sweep_category(state, battlesuits),
        sweep_category(state, stigmata),
        sweep_category(state, weapons),
    )?;
    Ok(a + b + c)
}

async fn sweep_category(state: &BotState, category: RequestCategory) -> Result<usize> {
    let pages = state.source.category_pages(category).await?;
    let rows: Vec<_> = pages
        .iter()
        .flat_map(|page| unpack_aliases(page, category))
        .collect();
    Ok(state.aliases.upsert_category(category, rows).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alias(title: &str, alias_of: &str) -> PageAlias {
        PageAlias {
            pageid: 7,
            title: title.to_owned(),
            categories: Vec::new(),
            main_category: RequestCategory::Weapons,
            alias_of: alias_of.to_owned(),
        }
    }

    #[test]
    fn test_cache_command_carries_clear_option() {
        let definitions = command_definitions();
        let cache = serde_json::to_value(&definitions[1]).unwrap();
        assert_eq!(cache["name"], "cache");
        assert_eq!(cache["options"][0]["name"], "clear");
        // 5 is the Boolean option type on the wire.
        assert_eq!(cache["options"][0]["type"], 5);
        assert_ne!(cache["options"][0]["required"], true);
    }

    #[test]
    fn test_clear_flag_defaults_off() {
        assert!(!clear_flag(&[]));
    }

    #[test]
    fn test_autocomplete_title_formats() {
        assert_eq!(
            autocomplete_title(&alias("Key of Reason", "Key of Reason")),
            "Key of Reason"
        );
        assert_eq!(
            autocomplete_title(&alias("KoR", "Key of Reason")),
            "Key of Reason \u{300c}KoR\u{300d}"
        );
    }
}
