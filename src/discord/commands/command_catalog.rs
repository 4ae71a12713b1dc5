// Discord commands module.
// Each feature gets its own command file.

pub mod admin;
pub mod help;
pub mod pickle;
pub mod presence;

use pickle::{Data, Error};

/// Every command the framework registers.
pub fn all_commands() -> Vec<poise::Command<Data, Error>> {
    vec![
        pickle::pickle(),
        pickle::pickleboard(),
        pickle::picklegraph(),
        pickle::resetpickles(),
        help::help(),
        admin::shutdown(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::help::CommandRegistry;
    use std::collections::BTreeSet;

    #[test]
    fn help_registry_lists_every_registered_command() {
        let registered: BTreeSet<String> = all_commands().into_iter().map(|c| c.name).collect();
        let documented: BTreeSet<String> = CommandRegistry::builtin()
            .command_names()
            .map(str::to_string)
            .collect();

        assert_eq!(registered, documented);
    }
}
