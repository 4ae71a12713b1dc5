// Drives one `/pickleboard` message.
//
// The `LeaderboardView` decides what is shown; this loop only waits on the four things
// that can change it: a button press, the global load finishing, the inactivity
// deadline, or a newer leaderboard from the same user replacing this one.

use crate::core::pickle::{
    Identity, IdentityCache, LeaderboardView, Scope, SessionKey, UnscopedResolution, ViewAction,
    ViewTransition,
};
use crate::discord::commands::pickle::{Context, Error, EMBED_COLOR};
use futures::StreamExt;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::{JoinError, JoinHandle};

const PREV_ID: &str = "pickleboard_prev";
const NEXT_ID: &str = "pickleboard_next";
const SCOPE_ID: &str = "pickleboard_scope";

fn parse_action(custom_id: &str) -> Option<ViewAction> {
    match custom_id {
        PREV_ID => Some(ViewAction::Prev),
        NEXT_ID => Some(ViewAction::Next),
        SCOPE_ID => Some(ViewAction::ToggleScope),
        _ => None,
    }
}

/// Snapshot the guild's members out of the cache.
///
/// Synchronous on purpose: the cache guard must not be held across an await.
fn member_snapshot(ctx: &serenity::Context, guild_id: serenity::GuildId) -> IdentityCache {
    let Some(guild) = ctx.cache.guild(guild_id) else {
        return IdentityCache::new();
    };

    guild
        .members
        .iter()
        .map(|(user_id, member)| {
            (
                user_id.get(),
                Identity::new(member.display_name(), member.user.bot),
            )
        })
        .collect()
}

fn build_reply(view: &LeaderboardView) -> poise::CreateReply {
    let rendered = view.render();

    let mut embed = serenity::CreateEmbed::new()
        .title(rendered.title)
        .description(rendered.body)
        .color(EMBED_COLOR);
    if let Some(footer) = rendered.footer {
        embed = embed.footer(serenity::CreateEmbedFooter::new(footer));
    }

    let components = match rendered.controls {
        Some(controls) => {
            let toggle_label = match controls.toggle_target {
                Scope::Global => "🌍 Global",
                Scope::Server => "🏠 Server",
            };
            vec![serenity::CreateActionRow::Buttons(vec![
                serenity::CreateButton::new(PREV_ID)
                    .label("◀ Previous")
                    .style(serenity::ButtonStyle::Primary)
                    .disabled(!controls.prev_enabled),
                serenity::CreateButton::new(NEXT_ID)
                    .label("Next ▶")
                    .style(serenity::ButtonStyle::Primary)
                    .disabled(!controls.next_enabled),
                serenity::CreateButton::new(SCOPE_ID)
                    .label(toggle_label)
                    .style(serenity::ButtonStyle::Secondary)
                    .disabled(!controls.toggle_enabled),
            ])]
        }
        // Empty components to remove them
        None => vec![],
    };

    poise::CreateReply::default()
        .embed(embed)
        .components(components)
}

/// Resolves when the global load finishes; never resolves when none is running.
async fn wait_for_load(
    load: &mut Option<JoinHandle<UnscopedResolution>>,
) -> Result<UnscopedResolution, JoinError> {
    match load {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

pub async fn run(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx
        .guild_id()
        .ok_or("This command only works in servers")?;
    let data = ctx.data();
    let settings = data.config.view_settings();

    ctx.defer().await?;

    let ranked = data.pickles.leaderboard().await?;
    let mut view = LeaderboardView::pending(ranked, settings, Instant::now());
    view.resolve_scope(&member_snapshot(ctx.serenity_context(), guild_id));

    let session = data.sessions.begin(SessionKey {
        guild_id: guild_id.get(),
        user_id: ctx.author().id.get(),
    });

    let reply = ctx.send(build_reply(&view)).await?;
    let message_id = reply.message().await?.id;

    let mut presses = Box::pin(
        serenity::ComponentInteractionCollector::new(ctx)
            .message_id(message_id)
            .author_id(ctx.author().id)
            .stream(),
    );
    let mut load: Option<JoinHandle<UnscopedResolution>> = None;

    loop {
        let deadline = tokio::time::Instant::from_std(view.deadline());

        tokio::select! {
            _ = session.superseded() => {
                tracing::debug!(message_id = message_id.get(), "Leaderboard superseded");
                break;
            }
            joined = wait_for_load(&mut load) => {
                load = None;
                let changed = match joined {
                    Ok(resolution) => {
                        tracing::info!(
                            entries = resolution.entries.len(),
                            resolved = resolution.resolved.len(),
                            skipped = resolution.skipped.len(),
                            "Global leaderboard loaded"
                        );
                        view.complete_global_load(resolution)
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Global leaderboard load failed");
                        view.abort_global_load()
                    }
                };
                if changed {
                    if let Err(e) = reply.edit(ctx, build_reply(&view)).await {
                        tracing::warn!(error = %e, "Failed to update leaderboard");
                    }
                }
            }
            press = presses.next() => {
                let Some(press) = press else { break };
                let Some(action) = parse_action(&press.data.custom_id) else { continue };

                // Defer the update to prevent "Unknown interaction" errors
                if let Err(e) = press.defer(ctx.http()).await {
                    tracing::warn!(error = %e, "Failed to acknowledge leaderboard button");
                }

                let transition = view.handle(action, Instant::now());
                tracing::debug!(
                    ?action,
                    state = ?view.state(),
                    scope = ?view.scope(),
                    page = view.page(),
                    "Leaderboard action"
                );

                match transition {
                    ViewTransition::Ignored => continue,
                    ViewTransition::Render => {}
                    ViewTransition::LoadGlobal(request) => {
                        let resolver = Arc::clone(&data.identities);
                        load = Some(tokio::spawn(request.run(resolver, settings.batch_size)));
                    }
                }

                // For a load this shows the placeholder with every button disabled.
                if let Err(e) = reply.edit(ctx, build_reply(&view)).await {
                    tracing::warn!(error = %e, "Failed to update leaderboard");
                }
            }
            _ = tokio::time::sleep_until(deadline) => break,
        }
    }

    if let Some(handle) = load {
        handle.abort();
    }

    view.expire();
    let _ = reply.edit(ctx, build_reply(&view)).await;

    Ok(())
}
