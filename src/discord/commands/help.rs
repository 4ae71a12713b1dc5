use crate::core::help::{CommandCategory, CommandInfo, HelpLookup};
use crate::discord::commands::pickle::{Context, Error, EMBED_COLOR};
use poise::serenity_prelude as serenity;

fn command_line(command: &CommandInfo) -> String {
    format!("• **/{}** - {}", command.name, command.description)
}

fn category_title(category: &CommandCategory) -> String {
    format!("{} {}", category.emoji, category.display_name)
}

fn overview_embed(categories: &[&CommandCategory]) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title("Pickle Bot Commands")
        .description("Use `/help <category>` or `/help <command>` for details.")
        .color(EMBED_COLOR);

    for category in categories {
        let names: Vec<String> = category
            .commands
            .iter()
            .map(|c| format!("`/{}`", c.name))
            .collect();
        embed = embed.field(
            category_title(category),
            format!("{}\n{}", category.description, names.join(" ")),
            false,
        );
    }

    embed.footer(serenity::CreateEmbedFooter::new(
        "Need a hand? Ping a moderator.",
    ))
}

/// `highlight` marks the command the user asked about, if any.
fn category_embed(category: &CommandCategory, highlight: Option<&str>) -> serenity::CreateEmbed {
    let lines: Vec<String> = category
        .commands
        .iter()
        .map(|command| {
            let line = command_line(command);
            if highlight == Some(command.name) {
                format!("{line}  ⬅")
            } else {
                line
            }
        })
        .collect();

    serenity::CreateEmbed::new()
        .title(category_title(category))
        .description(format!("{}\n\n{}", category.description, lines.join("\n")))
        .color(EMBED_COLOR)
}

async fn autocomplete_help<'a>(
    ctx: Context<'_>,
    partial: &'a str,
) -> impl Iterator<Item = String> + 'a {
    ctx.data()
        .help
        .suggest(partial)
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>()
        .into_iter()
}

/// Show the bot's commands, or the details of one category or command.
#[poise::command(slash_command, prefix_command)]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Category or command to look up"]
    #[autocomplete = "autocomplete_help"]
    item: Option<String>,
) -> Result<(), Error> {
    let registry = &ctx.data().help;

    let Some(item) = item else {
        let embed = overview_embed(&registry.categories());
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        return Ok(());
    };

    let embed = match registry.lookup(&item) {
        HelpLookup::Category(category) => category_embed(category, None),
        HelpLookup::Command { category, command } => category_embed(category, Some(command.name)),
        HelpLookup::NotFound => {
            ctx.send(
                poise::CreateReply::default()
                    .content(format!("No category or command found for: **{item}**."))
                    .ephemeral(true),
            )
            .await?;
            return Ok(());
        }
    };

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_lines_use_the_slash_form() {
        let info = CommandInfo {
            name: "pickle",
            description: "Check a pickle size.",
        };
        assert_eq!(command_line(&info), "• **/pickle** - Check a pickle size.");
    }
}
