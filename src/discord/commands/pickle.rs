// Discord commands for the pickle game.
//
// Same shape as every command file: pull primitives out of the Discord types, call the
// core service, format the answer. All user-facing wording lives here.

use crate::core::config::BotConfig;
use crate::core::help::CommandRegistry;
use crate::core::pickle::{
    HistorySummary, IdentityResolver, MonthlyResetHandle, PickleService, ViewSessions,
};
use crate::discord::leaderboard_session;
use crate::infra::pickle::SqlitePickleStore;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared state handed to every command.
pub struct Data {
    pub config: Arc<BotConfig>,
    pub pickles: Arc<PickleService<SqlitePickleStore>>,
    pub help: Arc<CommandRegistry>,
    pub sessions: Arc<ViewSessions>,
    pub identities: Arc<dyn IdentityResolver>,
    pub maintenance: MonthlyResetHandle,
}

pub const PICKLE_EMOJI: &str = "🍆";
pub const EMBED_COLOR: u32 = 0x9B59B6;
const ERROR_COLOR: u32 = 0xE74C3C;

/// Who a size is being reported for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeSubject<'a> {
    /// The bot itself.
    Bot { asked_by_owner: bool },
    /// The bot owner checking their own size.
    Owner { is_new: bool },
    Member { display_name: &'a str },
}

pub fn size_message(subject: SizeSubject<'_>, size: i64) -> String {
    match subject {
        SizeSubject::Bot {
            asked_by_owner: true,
        } => format!(
            "**Oh master, my pickle size could never be as big as yours.**\n\nIt is a mere **{size} cm**."
        ),
        SizeSubject::Bot {
            asked_by_owner: false,
        } => format!("I dunno, maybe ask your mom?\n\nJK, it's **{size}** cm."),
        SizeSubject::Owner { is_new: true } if size > 25 => format!(
            "**Master! You did well this month.**\nYour pickle size is **{size} cm**! {PICKLE_EMOJI}"
        ),
        SizeSubject::Owner { is_new: true } => format!(
            "**I am so sorry master, I have failed you.**\nYour pickle is **{size} cm** this month {PICKLE_EMOJI}"
        ),
        SizeSubject::Owner { is_new: false } => {
            format!("Master, your pickle size is **{size} cm**! {PICKLE_EMOJI}")
        }
        SizeSubject::Member { display_name } => {
            format!("**{display_name}**'s pickle size is **{size} cm**! {PICKLE_EMOJI}")
        }
    }
}

/// Pick the message variant for `target`.
///
/// The owner gets the "master" lines whenever they are the target, whoever asked.
pub fn size_subject(
    target_id: u64,
    asker_id: u64,
    bot_id: u64,
    owner_id: Option<u64>,
    is_new: bool,
    display_name: &str,
) -> SizeSubject<'_> {
    let is_owner = |id: u64| owner_id == Some(id);

    if target_id == bot_id {
        SizeSubject::Bot {
            asked_by_owner: is_owner(asker_id),
        }
    } else if is_owner(target_id) {
        SizeSubject::Owner { is_new }
    } else {
        SizeSubject::Member { display_name }
    }
}

/// One text bar per month, widest bar for the largest size.
pub fn history_chart(summary: &HistorySummary) -> String {
    const WIDTH: i64 = 16;
    let max = summary
        .months
        .iter()
        .map(|m| m.size)
        .max()
        .unwrap_or(1)
        .max(1);

    let lines: Vec<String> = summary
        .months
        .iter()
        .map(|month| {
            let filled = (month.size.max(0) * WIDTH / max).max(1) as usize;
            format!(
                "{} {:<width$} {:>2} cm",
                month.label(),
                "█".repeat(filled),
                month.size,
                width = WIDTH as usize
            )
        })
        .collect();

    format!("```\n{}\n```", lines.join("\n"))
}

/// Shows the size of your pickle.
#[poise::command(slash_command, guild_only)]
pub async fn pickle(
    ctx: Context<'_>,
    #[description = "Whose pickle to check (defaults to you)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let target = user.as_ref().unwrap_or_else(|| ctx.author());
    let user_id = target.id.get();

    let roll = ctx.data().pickles.get_or_roll(user_id).await?;

    let display_name = target.global_name.as_deref().unwrap_or(&target.name);
    let subject = size_subject(
        user_id,
        ctx.author().id.get(),
        ctx.framework().bot_id.get(),
        ctx.data().config.owner_id,
        roll.is_new,
        display_name,
    );

    let embed = serenity::CreateEmbed::new()
        .description(size_message(subject, roll.size))
        .color(EMBED_COLOR);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Shows the pickle size leaderboard.
#[poise::command(slash_command, guild_only)]
pub async fn pickleboard(ctx: Context<'_>) -> Result<(), Error> {
    leaderboard_session::run(ctx).await
}

/// Shows a pickle size history for the last year.
#[poise::command(slash_command, guild_only)]
pub async fn picklegraph(
    ctx: Context<'_>,
    #[description = "Whose history to show (defaults to you)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let target = user.as_ref().unwrap_or_else(|| ctx.author());
    let display_name = target.global_name.as_deref().unwrap_or(&target.name);

    let Some(summary) = ctx.data().pickles.history_summary(target.id.get()).await? else {
        let embed = serenity::CreateEmbed::new()
            .description(format!(
                "No pickle history found for **{display_name}**.\nUse `/pickle` first!"
            ))
            .color(ERROR_COLOR);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        return Ok(());
    };

    let embed = serenity::CreateEmbed::new()
        .title("Yearly Pickle Length History")
        .author(serenity::CreateEmbedAuthor::new(display_name).icon_url(target.face()))
        .description(history_chart(&summary))
        .field(
            "Best Month",
            format!("**{}** - {} cm", summary.best.label(), summary.best.size),
            true,
        )
        .field("Average", format!("{} cm", summary.average), true)
        .color(EMBED_COLOR)
        .timestamp(serenity::Timestamp::now());

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Reset all pickle sizes (Admin only).
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    default_member_permissions = "ADMINISTRATOR"
)]
pub async fn resetpickles(ctx: Context<'_>) -> Result<(), Error> {
    ctx.data().pickles.clear_all().await?;

    tracing::warn!(
        user_id = ctx.author().id.get(),
        guild_id = ctx.guild_id().map(|g| g.get()),
        "Pickle sizes reset by admin"
    );

    ctx.send(
        poise::CreateReply::default()
            .content("All pickle sizes have been reset!")
            .ephemeral(true),
    )
    .await?;
    Ok(())
}
