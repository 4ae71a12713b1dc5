// Remote identity lookups for the global leaderboard.

use crate::core::pickle::{Identity, IdentityError, IdentityResolver};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Resolves user ids through Discord's user endpoint.
pub struct SerenityIdentityResolver {
    http: Arc<serenity::Http>,
}

impl SerenityIdentityResolver {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

fn is_not_found(error: &serenity::Error) -> bool {
    matches!(
        error,
        serenity::Error::Http(serenity::HttpError::UnsuccessfulRequest(response))
            if response.status_code.as_u16() == 404
    )
}

#[async_trait]
impl IdentityResolver for SerenityIdentityResolver {
    async fn resolve_user(&self, user_id: u64) -> Result<Identity, IdentityError> {
        // UserId panics on zero
        if user_id == 0 {
            return Err(IdentityError::NotFound(user_id));
        }

        match self.http.get_user(serenity::UserId::new(user_id)).await {
            Ok(user) => {
                let name = user.global_name.clone().unwrap_or_else(|| user.name.clone());
                Ok(Identity::new(name, user.bot))
            }
            Err(e) if is_not_found(&e) => Err(IdentityError::NotFound(user_id)),
            Err(e) => Err(IdentityError::Lookup {
                user_id,
                reason: e.to_string(),
            }),
        }
    }
}
