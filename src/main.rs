// This is the entry point of the pickle bot.
//
// **Architecture Overview:**
// - `core/` = Game rules, leaderboard state, config (platform-agnostic)
// - `infra/` = SQLite storage, logging setup
// - `discord/` = Discord-specific adapters (commands, sessions, announcements)
//
// This file's job is to:
// 1. Load configuration and start logging
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Spawn the monthly reset task

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::config::BotConfig;
use crate::core::help::CommandRegistry;
use crate::core::pickle::{MonthlyResetTask, PickleService, ViewSessions};
use crate::discord::commands::{all_commands, presence};
use crate::discord::identity::SerenityIdentityResolver;
use crate::discord::reset_announcements::SerenityResetAnnouncer;
use crate::discord::{Data, Error};
use crate::infra::log_setup;
use crate::infra::persistence::SqliteClient;
use crate::infra::pickle::SqlitePickleStore;
use poise::serenity_prelude as serenity;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info};

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Setup {
            error, framework, ..
        } => {
            error!(error = %error, "Failed to start bot");
            framework.shard_manager().shutdown_all().await;
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!(
                command = %ctx.command().name,
                user_id = ctx.author().id.get(),
                guild_id = ctx.guild_id().map(|g| g.get()),
                error = %error,
                "Command failed"
            );
            let apology = poise::CreateReply::default()
                .content("Sorry, something went wrong! Please try again later.")
                .ephemeral(true);
            if let Err(e) = ctx.send(apology).await {
                error!(error = %e, "Failed to report command error");
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!(error = %e, "Error while handling error");
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = Arc::new(BotConfig::from_env()?);

    // Keep the guard alive so buffered file logs get flushed on exit
    let _log_guard = log_setup::init(&config.log_dir)?;

    // Initialize the pickle store (runs migrations)
    let client = SqliteClient::connect(
        &config.database_path,
        config.database_max_connections,
        config.retry_policy(),
    )
    .await?;
    let store = SqlitePickleStore::new(client).await?;
    let pickles = Arc::new(PickleService::new_with_config(
        store,
        config.pickle_config(),
    ));
    info!(path = %config.database_path.display(), "Pickle store ready");

    let help = Arc::new(CommandRegistry::builtin());
    let sessions = Arc::new(ViewSessions::new());

    let owners: HashSet<serenity::UserId> = config
        .owner_id
        .filter(|id| *id != 0)
        .map(serenity::UserId::new)
        .into_iter()
        .collect();

    let intents = serenity::GatewayIntents::GUILDS | serenity::GatewayIntents::GUILD_MEMBERS;
    let token = config.discord_token.clone();
    let setup_config = Arc::clone(&config);

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: all_commands(),
            on_error: |error| Box::pin(on_error(error)),
            owners,
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                let config = setup_config;
                info!(user = %ready.user.name, "Bot is starting up");

                match config.dev_guild_id.filter(|id| *id != 0) {
                    // Guild registration updates instantly, global can take an hour
                    Some(guild_id) => {
                        poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            serenity::GuildId::new(guild_id),
                        )
                        .await?;
                        info!(guild_id, "Commands registered in development guild");
                    }
                    None => {
                        poise::builtins::register_globally(ctx, &framework.options().commands)
                            .await?;
                        info!("Commands registered globally");
                    }
                }

                presence::on_ready(ctx);

                let identities = Arc::new(SerenityIdentityResolver::new(ctx.http.clone()));
                let announcer = Arc::new(SerenityResetAnnouncer::new(
                    ctx.http.clone(),
                    ctx.cache.clone(),
                ));
                let maintenance = MonthlyResetTask::spawn(
                    Arc::clone(&pickles),
                    announcer,
                    config.reset_check_interval,
                    config.reset_timezone,
                );

                info!("Bot is ready");

                Ok(Data {
                    config,
                    pickles,
                    help,
                    sessions,
                    identities,
                    maintenance,
                })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    client.start().await?;

    info!("Bot stopped");
    Ok(())
}
