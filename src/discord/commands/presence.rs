// Bot presence, set once the gateway is ready.

use poise::serenity_prelude as serenity;

/// Points people at the main command.
pub fn on_ready(ctx: &serenity::Context) {
    let activity = serenity::ActivityData::playing("/pickle");
    ctx.set_presence(Some(activity), serenity::OnlineStatus::Online);
}
