// Leaderboard aggregation: turns ranked (user_id, size) rows into named entries.
//
// Two strategies live here. The server scope only needs the guild's member list, which
// the caller already has, so it is a plain synchronous filter. The global scope has to
// look every unknown id up remotely, which is slow and can fail per user, so it runs in
// bounded batches and skips whoever cannot be resolved.

use super::pickle_models::RankedSize;
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

// ============================================================================
// IDENTITIES
// ============================================================================

/// What the leaderboard needs to know about a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub is_bot: bool,
}

impl Identity {
    pub fn new(name: impl Into<String>, is_bot: bool) -> Self {
        Self {
            name: name.into(),
            is_bot,
        }
    }
}

/// user_id -> identity, filled from the guild member list and grown by global loads.
pub type IdentityCache = HashMap<u64, Identity>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("user {0} does not exist")]
    NotFound(u64),

    #[error("lookup for user {user_id} failed: {reason}")]
    Lookup { user_id: u64, reason: String },
}

/// Remote identity lookup (the platform's user-fetch API in production).
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve_user(&self, user_id: u64) -> Result<Identity, IdentityError>;
}

// ============================================================================
// ENTRIES
// ============================================================================

/// One display-ready leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub user_id: u64,
    pub display_name: String,
    pub size: i64,
    pub is_bot: bool,
}

impl LeaderboardEntry {
    fn from_parts(ranked: &RankedSize, identity: &Identity) -> Self {
        Self {
            user_id: ranked.user_id,
            display_name: identity.name.clone(),
            size: ranked.size,
            is_bot: identity.is_bot,
        }
    }
}

/// Keep only the ranked users present in `members`, in rank order.
pub fn resolve_scoped(ranked: &[RankedSize], members: &IdentityCache) -> Vec<LeaderboardEntry> {
    ranked
        .iter()
        .filter_map(|row| {
            members
                .get(&row.user_id)
                .map(|identity| LeaderboardEntry::from_parts(row, identity))
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct UnscopedResolution {
    /// Every resolvable ranked user, in rank order.
    pub entries: Vec<LeaderboardEntry>,
    /// Identities fetched remotely by this run, for the caller's cache.
    pub resolved: IdentityCache,
    /// Ids whose lookup failed.
    pub skipped: Vec<u64>,
}

/// Resolve every ranked user, reusing `known` and fetching the rest.
///
/// Lookups run concurrently inside a batch of `batch_size`; batches run one after
/// another so a large leaderboard never floods the remote API.
pub async fn resolve_unscoped<R>(
    ranked: &[RankedSize],
    resolver: &R,
    known: &IdentityCache,
    batch_size: usize,
) -> UnscopedResolution
where
    R: IdentityResolver + ?Sized,
{
    let batch_size = batch_size.max(1);

    let mut queued = HashSet::new();
    let missing: Vec<u64> = ranked
        .iter()
        .map(|row| row.user_id)
        .filter(|id| !known.contains_key(id) && queued.insert(*id))
        .collect();

    let mut resolved = IdentityCache::new();
    let mut skipped = Vec::new();

    for batch in missing.chunks(batch_size) {
        let lookups = batch.iter().map(|&user_id| async move {
            (user_id, resolver.resolve_user(user_id).await)
        });

        for (user_id, result) in join_all(lookups).await {
            match result {
                Ok(identity) => {
                    resolved.insert(user_id, identity);
                }
                Err(e) => {
                    tracing::debug!(user_id, error = %e, "Skipping unresolvable leaderboard user");
                    skipped.push(user_id);
                }
            }
        }
    }

    let entries = ranked
        .iter()
        .filter_map(|row| {
            known
                .get(&row.user_id)
                .or_else(|| resolved.get(&row.user_id))
                .map(|identity| LeaderboardEntry::from_parts(row, identity))
        })
        .collect();

    UnscopedResolution {
        entries,
        resolved,
        skipped,
    }
}
