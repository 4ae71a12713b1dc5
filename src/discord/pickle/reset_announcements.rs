// Posts the monthly reset notice into every server the bot is in.

use crate::core::pickle::{AnnounceError, ResetAnnouncer};
use crate::discord::commands::pickle::EMBED_COLOR;
use async_trait::async_trait;
use poise::serenity_prelude::{self as serenity, builder::CreateMessage};
use std::sync::Arc;

/// Channel names checked for the notice, any of them qualifies.
const ANNOUNCE_CHANNELS: &[&str] = &["general", "bot", "bot-commands", "announcements"];

/// A text channel as far as channel picking cares.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ChannelCandidate {
    id: u64,
    name: String,
    position: u16,
}

/// The highest listed (lowest position) channel with a well-known name.
fn pick_channel(candidates: &[ChannelCandidate]) -> Option<u64> {
    candidates
        .iter()
        .filter(|c| ANNOUNCE_CHANNELS.contains(&c.name.as_str()))
        .min_by_key(|c| (c.position, c.id))
        .map(|c| c.id)
}

pub struct SerenityResetAnnouncer {
    http: Arc<serenity::Http>,
    cache: Arc<serenity::Cache>,
}

impl SerenityResetAnnouncer {
    pub fn new(http: Arc<serenity::Http>, cache: Arc<serenity::Cache>) -> Self {
        Self { http, cache }
    }

    fn text_channels(&self, guild_id: serenity::GuildId) -> Option<Vec<ChannelCandidate>> {
        let guild = self.cache.guild(guild_id)?;
        Some(
            guild
                .channels
                .values()
                .filter(|c| c.kind == serenity::ChannelType::Text)
                .map(|c| ChannelCandidate {
                    id: c.id.get(),
                    name: c.name.clone(),
                    position: c.position,
                })
                .collect(),
        )
    }
}

#[async_trait]
impl ResetAnnouncer for SerenityResetAnnouncer {
    async fn contexts(&self) -> Vec<u64> {
        self.cache.guilds().into_iter().map(|g| g.get()).collect()
    }

    async fn announce(&self, context: u64) -> Result<(), AnnounceError> {
        if context == 0 {
            return Err(AnnounceError(String::from("invalid guild id 0")));
        }
        let guild_id = serenity::GuildId::new(context);

        let candidates = self
            .text_channels(guild_id)
            .ok_or_else(|| AnnounceError(format!("guild {context} is not cached")))?;
        let Some(channel_id) = pick_channel(&candidates) else {
            tracing::debug!(guild_id = context, "No announcement channel, skipping");
            return Ok(());
        };

        let embed = serenity::CreateEmbed::new()
            .title("🍆 Monthly Pickle Reset 🍆")
            .description(
                "All pickle sizes have been reset for the new month! \
                 Use `/pickle` to get your new size!",
            )
            .color(EMBED_COLOR);

        serenity::ChannelId::new(channel_id)
            .send_message(&self.http, CreateMessage::new().embed(embed))
            .await
            .map(|_| ())
            .map_err(|e| AnnounceError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(id: u64, name: &str, position: u16) -> ChannelCandidate {
        ChannelCandidate {
            id,
            name: name.to_string(),
            position,
        }
    }

    #[test]
    fn picks_the_top_known_channel() {
        let channels = [
            channel(1, "memes", 0),
            channel(2, "bot-commands", 4),
            channel(3, "general", 2),
        ];
        assert_eq!(pick_channel(&channels), Some(3));
    }

    #[test]
    fn no_known_channel_means_no_notice() {
        let channels = [channel(1, "memes", 0), channel(2, "General-chat", 1)];
        assert_eq!(pick_channel(&channels), None);
    }
}
