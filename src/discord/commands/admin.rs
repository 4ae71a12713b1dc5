// Owner-only bot maintenance.

use crate::discord::commands::pickle::{Context, Error};

/// Stop background tasks and disconnect every shard (Owner only).
#[poise::command(slash_command, prefix_command, owners_only, hide_in_help)]
pub async fn shutdown(ctx: Context<'_>) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .content("Shutting down. Goodbye!")
            .ephemeral(true),
    )
    .await?;

    tracing::warn!(user_id = ctx.author().id.get(), "Shutdown requested");

    ctx.data().maintenance.shutdown().await;
    ctx.framework().shard_manager().shutdown_all().await;
    Ok(())
}
