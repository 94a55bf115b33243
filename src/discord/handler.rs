//! Gateway event handling: command registration on ready, and dispatch of
//! commands, autocomplete queries and message components.

use anyhow::Result;
use serenity::all::{
    ComponentInteraction, ComponentInteractionDataKind, Context, CreateEmbed,
    CreateInteractionResponse, CreateInteractionResponseMessage, EventHandler, GuildId,
    Interaction, Ready,
};
use serenity::async_trait;
use tracing::{error, info, warn};

use crate::discord::bot::BotState;
use crate::discord::commands;
use crate::discord::components::{
    build_for_content, document_to_embed, parse_page_value, rarity_row,
    rows_with_replaced_select, DeleteNav, RarityNav, WikilinkNav,
};
use crate::common::error::{CacheError, CacheResult};
use crate::wiki::cache::{WikiCache, FIELD_CONTENT, FIELD_MAX_RARITY, FIELD_RARITY, FIELD_STATS};
use crate::wiki::markup::{extract_fields, MarkupRenderer};
use crate::wiki::model::{weapon::stats_at, Weapon, WeaponStats};
use crate::wiki::render::{render_weapon, weapon_header_values, Document};

pub struct Handler;

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Discord bot connected as {}", ready.user.name);

        let guild_id = {
            let data = ctx.data.read().await;
            data.get::<BotState>().and_then(|state| state.guild_id)
        };

        let definitions = commands::command_definitions();
        let result = match guild_id {
            Some(guild_id) => {
                GuildId::new(guild_id)
                    .set_commands(&ctx.http, definitions)
                    .await
            }
            None => {
                serenity::all::Command::set_global_commands(&ctx.http, definitions).await
            }
        };
        match result {
            Ok(registered) => info!(count = registered.len(), "commands registered"),
            Err(error) => error!(%error, "command registration failed"),
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let state = {
            let data = ctx.data.read().await;
            match data.get::<BotState>() {
                Some(state) => state.clone(),
                None => return,
            }
        };

        let result = match interaction {
            Interaction::Command(command) => match command.data.name.as_str() {
                "wiki" => commands::handle_wiki(&ctx, &command, &state).await,
                "cache" => commands::handle_cache(&ctx, &command, &state).await,
                other => {
                    warn!(command = other, "unknown command");
                    Ok(())
                }
            },
            Interaction::Autocomplete(command) => {
                commands::handle_autocomplete(&ctx, &command, &state).await
            }
            Interaction::Component(component) => {
                dispatch_component(&ctx, &component, &state).await
            }
            _ => Ok(()),
        };

        if let Err(error) = result {
            error!(%error, "interaction handling failed");
        }
    }
}

async fn dispatch_component(
    ctx: &Context,
    component: &ComponentInteraction,
    state: &BotState,
) -> Result<()> {
    let custom_id = component.data.custom_id.as_str();

    if let Some(nav) = WikilinkNav::decode(custom_id) {
        return handle_wikilink_select(ctx, component, state, nav).await;
    }
    if let Some(nav) = RarityNav::decode(custom_id) {
        return handle_rarity_select(ctx, component, state, nav).await;
    }
    if let Some(nav) = DeleteNav::decode(custom_id) {
        return handle_delete(ctx, component, nav).await;
    }

    warn!(custom_id, "unknown component");
    Ok(())
}

/// The refusal shown when someone interacts with another user's prompt.
fn foreign_prompt_refusal() -> CreateInteractionResponse {
    CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .embed(
                CreateEmbed::new()
                    .title("You are not permitted to take this action.")
                    .description("This wiki prompt is for another captain."),
            )
            .ephemeral(true),
    )
}

fn selected_value(component: &ComponentInteraction) -> Option<&str> {
    match &component.data.kind {
        ComponentInteractionDataKind::StringSelect { values } => {
            values.first().map(String::as_str)
        }
        _ => None,
    }
}

async fn handle_wikilink_select(
    ctx: &Context,
    component: &ComponentInteraction,
    state: &BotState,
    nav: WikilinkNav,
) -> Result<()> {
    if component.user.id.get() != nav.author_id {
        component
            .create_response(&ctx.http, foreign_prompt_refusal())
            .await?;
        return Ok(());
    }

    let Some((page_id, category)) = selected_value(component).and_then(parse_page_value) else {
        return Ok(());
    };

    let response = state.orchestrator.handle_request(category, page_id).await?;

    let embeds: Vec<CreateEmbed> = response.documents.iter().map(document_to_embed).collect();
    let rows = build_for_content(
        nav.author_id,
        category,
        page_id,
        Some((&nav.page_id, &nav.category)),
        &response.wikilinks,
        &response.meta,
    );

    component
        .create_response(
            &ctx.http,
            CreateInteractionResponse::UpdateMessage(
                CreateInteractionResponseMessage::new()
                    .embeds(embeds)
                    .components(rows),
            ),
        )
        .await?;
    Ok(())
}

async fn cached_weapon_view(
    cache: &WikiCache,
    page_id: &str,
) -> CacheResult<(Vec<Document>, Vec<WeaponStats>, u8, u8)> {
    let documents: Vec<Document> =
        serde_json::from_str(&cache.read_field(page_id, FIELD_CONTENT).await?)?;
    let stats: Vec<WeaponStats> =
        serde_json::from_str(&cache.read_field(page_id, FIELD_STATS).await?)?;
    let min_rarity: u8 = serde_json::from_str(&cache.read_field(page_id, FIELD_RARITY).await?)?;
    let max_rarity: u8 =
        serde_json::from_str(&cache.read_field(page_id, FIELD_MAX_RARITY).await?)?;
    Ok((documents, stats, min_rarity, max_rarity))
}

/// The cached weapon data the rarity browser needs, refetched from the
/// live wiki when the cache entry expired.
async fn load_weapon_view(
    state: &BotState,
    page_id: &str,
) -> Result<(Vec<Document>, Vec<WeaponStats>, u8, u8)> {
    match cached_weapon_view(&state.cache, page_id).await {
        Ok(view) => return Ok(view),
        Err(CacheError::NotCached { .. }) => {}
        Err(error) => warn!(page_id, %error, "cache read failed, refetching"),
    }

    let page = state.source.content_revision(page_id).await?;
    let weapon = Weapon::parse(&extract_fields(&page.wikitext))?;
    let documents = render_weapon(&weapon, &MarkupRenderer::new());
    let min_rarity = weapon.rarity.get();
    let max_rarity = weapon.max_rarity().get();
    Ok((documents, weapon.stats, min_rarity, max_rarity))
}

async fn handle_rarity_select(
    ctx: &Context,
    component: &ComponentInteraction,
    state: &BotState,
    nav: RarityNav,
) -> Result<()> {
    if component.user.id.get() != nav.author_id {
        component
            .create_response(&ctx.http, foreign_prompt_refusal())
            .await?;
        return Ok(());
    }

    let Some(rarity) = selected_value(component).and_then(|v| v.parse::<u8>().ok()) else {
        return Ok(());
    };

    let (documents, stats, min_rarity, max_rarity) =
        load_weapon_view(state, &nav.page_id).await?;

    let Some(row) = stats_at(&stats, min_rarity, max_rarity, rarity) else {
        component
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content("That rarity is not available for this weapon.")
                        .ephemeral(true),
                ),
            )
            .await?;
        return Ok(());
    };

    let mut embeds: Vec<CreateEmbed> = Vec::with_capacity(documents.len());
    for (index, document) in documents.iter().enumerate() {
        if index == 0 {
            let formatted = document.format(&weapon_header_values(row, max_rarity));
            embeds.push(document_to_embed(&formatted));
        } else {
            embeds.push(document_to_embed(document));
        }
    }

    let replacement = rarity_row(&nav, min_rarity, max_rarity, rarity);
    let rows = rows_with_replaced_select(
        &component.message,
        &component.data.custom_id,
        replacement,
    );

    component
        .create_response(
            &ctx.http,
            CreateInteractionResponse::UpdateMessage(
                CreateInteractionResponseMessage::new()
                    .embeds(embeds)
                    .components(rows),
            ),
        )
        .await?;
    Ok(())
}

async fn handle_delete(
    ctx: &Context,
    component: &ComponentInteraction,
    nav: DeleteNav,
) -> Result<()> {
    let is_author = component.user.id.get() == nav.author_id;
    let can_manage = component
        .member
        .as_ref()
        .and_then(|member| member.permissions)
        .is_some_and(|permissions| permissions.manage_messages());

    if !is_author && !can_manage {
        component
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content("Sorry, captain. You are not authorized to operate this button.")
                        .ephemeral(true),
                ),
            )
            .await?;
        return Ok(());
    }

    component
        .create_response(&ctx.http, CreateInteractionResponse::Acknowledge)
        .await?;
    component.message.delete(&ctx.http).await?;
    Ok(())
}
