// Static catalogue of command categories used by `/help`.
//
// Categories are declared once here instead of being discovered at runtime. The
// Discord layer checks in a test that every registered slash command is listed.

/// A command as `/help` shows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandInfo {
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandCategory {
    pub id: &'static str,
    pub display_name: &'static str,
    pub emoji: &'static str,
    pub description: &'static str,
    /// Alternative names accepted by `/help <item>`.
    pub aliases: &'static [&'static str],
    /// In display order.
    pub commands: Vec<CommandInfo>,
}

impl CommandCategory {
    fn matches(&self, needle: &str) -> bool {
        self.id.eq_ignore_ascii_case(needle)
            || self.display_name.eq_ignore_ascii_case(needle)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(needle))
    }

    fn command(&self, needle: &str) -> Option<&CommandInfo> {
        self.commands
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(needle))
    }
}

/// What `/help <item>` resolved to.
#[derive(Debug, PartialEq, Eq)]
pub enum HelpLookup<'a> {
    Category(&'a CommandCategory),
    Command {
        category: &'a CommandCategory,
        command: &'a CommandInfo,
    },
    NotFound,
}

/// Autocomplete can offer at most this many choices.
pub const MAX_SUGGESTIONS: usize = 25;

pub struct CommandRegistry {
    categories: Vec<CommandCategory>,
}

impl CommandRegistry {
    pub fn new(categories: Vec<CommandCategory>) -> Self {
        Self { categories }
    }

    /// The bot's own commands.
    pub fn builtin() -> Self {
        Self::new(vec![
            CommandCategory {
                id: "pickle",
                display_name: "Pickle",
                emoji: "🥒",
                description: "The monthly pickle size game.",
                aliases: &["game", "pickles"],
                commands: vec![
                    CommandInfo {
                        name: "pickle",
                        description: "Check a pickle size (rolled once per month).",
                    },
                    CommandInfo {
                        name: "pickleboard",
                        description: "Browse the server or global pickle leaderboard.",
                    },
                    CommandInfo {
                        name: "picklegraph",
                        description: "Show a user's pickle history for the last year.",
                    },
                    CommandInfo {
                        name: "resetpickles",
                        description: "Clear every pickle size and history (Admin only).",
                    },
                ],
            },
            CommandCategory {
                id: "help",
                display_name: "Help",
                emoji: "📖",
                description: "Find out what the bot can do.",
                aliases: &[],
                commands: vec![CommandInfo {
                    name: "help",
                    description: "List categories, or show one category or command.",
                }],
            },
            CommandCategory {
                id: "admin",
                display_name: "Admin",
                emoji: "🛠️",
                description: "Bot maintenance for the owner.",
                aliases: &["owner"],
                commands: vec![CommandInfo {
                    name: "shutdown",
                    description: "Stop background tasks and disconnect (Owner only).",
                }],
            },
        ])
    }

    /// Every category, sorted by display name.
    pub fn categories(&self) -> Vec<&CommandCategory> {
        let mut sorted: Vec<_> = self.categories.iter().collect();
        sorted.sort_by(|a, b| a.display_name.cmp(b.display_name));
        sorted
    }

    #[cfg(test)]
    pub fn command_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.categories
            .iter()
            .flat_map(|c| c.commands.iter().map(|cmd| cmd.name))
    }

    pub fn lookup(&self, item: &str) -> HelpLookup<'_> {
        let needle = item.trim();
        if needle.is_empty() {
            return HelpLookup::NotFound;
        }

        if let Some(category) = self.categories.iter().find(|c| c.matches(needle)) {
            return HelpLookup::Category(category);
        }

        let command_name = needle.strip_prefix('/').unwrap_or(needle);
        for category in &self.categories {
            if let Some(command) = category.command(command_name) {
                return HelpLookup::Command { category, command };
            }
        }

        HelpLookup::NotFound
    }

    /// Category names containing `partial`, case-insensitively.
    pub fn suggest(&self, partial: &str) -> Vec<&'static str> {
        let needle = partial.trim().to_lowercase();
        self.categories()
            .into_iter()
            .map(|c| c.display_name)
            .filter(|name| name.to_lowercase().contains(&needle))
            .take(MAX_SUGGESTIONS)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_are_listed_alphabetically() {
        let registry = CommandRegistry::builtin();
        let names: Vec<_> = registry
            .categories()
            .iter()
            .map(|c| c.display_name)
            .collect();
        assert_eq!(names, ["Admin", "Help", "Pickle"]);
    }

    #[test]
    fn category_lookup_ignores_case_and_accepts_aliases() {
        let registry = CommandRegistry::builtin();

        for item in ["pickle", "PICKLE", "game", " Game "] {
            match registry.lookup(item) {
                HelpLookup::Category(category) => assert_eq!(category.id, "pickle"),
                other => panic!("{item:?} resolved to {other:?}"),
            }
        }
    }

    #[test]
    fn command_lookup_accepts_a_leading_slash() {
        let registry = CommandRegistry::builtin();

        match registry.lookup("/PickleBoard") {
            HelpLookup::Command { category, command } => {
                assert_eq!(category.display_name, "Pickle");
                assert_eq!(command.name, "pickleboard");
            }
            other => panic!("unexpected lookup: {other:?}"),
        }
    }

    #[test]
    fn category_names_win_over_command_names() {
        // "help" is both a category and a command.
        let registry = CommandRegistry::builtin();
        assert!(matches!(registry.lookup("help"), HelpLookup::Category(_)));
    }

    #[test]
    fn unknown_items_are_not_found() {
        let registry = CommandRegistry::builtin();
        assert_eq!(registry.lookup("music"), HelpLookup::NotFound);
        assert_eq!(registry.lookup("   "), HelpLookup::NotFound);
    }

    #[test]
    fn suggestions_match_substrings() {
        let registry = CommandRegistry::builtin();
        assert_eq!(registry.suggest("P"), ["Help", "Pickle"]);
        assert_eq!(registry.suggest(""), ["Admin", "Help", "Pickle"]);
        assert!(registry.suggest("zzz").is_empty());
    }

    #[test]
    fn suggestions_are_capped() {
        let categories = (0..40)
            .map(|i| CommandCategory {
                id: "x",
                display_name: if i % 2 == 0 { "Even" } else { "Odd" },
                emoji: "",
                description: "",
                aliases: &[],
                commands: Vec::new(),
            })
            .collect();
        let registry = CommandRegistry::new(categories);
        assert_eq!(registry.suggest("").len(), MAX_SUGGESTIONS);
    }
}
