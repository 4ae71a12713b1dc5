// State machine behind one interactive leaderboard message.
//
// The view owns all of a session's mutable state (page, scope, cached entries) and only
// changes in response to `handle`, `complete_global_load`, `abort_global_load` and
// `expire`. The Discord driver feeds it button presses and task completions; the slow
// global resolution runs elsewhere on a `GlobalLoadRequest` that owns copies of its
// inputs, so the view itself never has two writers.

use super::leaderboard::{
    resolve_scoped, resolve_unscoped, IdentityCache, IdentityResolver, LeaderboardEntry,
    UnscopedResolution,
};
use super::pickle_models::RankedSize;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const SERVER_TITLE: &str = "🍆 Server Pickle Leaderboard 🍆";
pub const GLOBAL_TITLE: &str = "🍆 Global Pickle Leaderboard 🍆";
pub const EMPTY_BODY: &str = "No pickle sizes recorded yet!";
pub const GLOBAL_LOADING_BODY: &str = "Loading global leaderboard… this can take a moment.";
const INITIALIZING_BODY: &str = "Loading leaderboard…";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Initializing,
    ScopedReady,
    UnscopedLoading,
    UnscopedReady,
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Server,
    Global,
}

impl Scope {
    pub fn other(self) -> Self {
        match self {
            Scope::Server => Scope::Global,
            Scope::Global => Scope::Server,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewAction {
    Prev,
    Next,
    ToggleScope,
}

/// What the driver has to do after `handle`.
#[derive(Debug)]
pub enum ViewTransition {
    /// Re-render the message.
    Render,
    /// Re-render (the loading placeholder), then start the global resolution.
    LoadGlobal(GlobalLoadRequest),
    /// The action was not accepted in the current state.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewSettings {
    pub page_size: usize,
    /// Inactivity window before the controls are removed.
    pub timeout: Duration,
    pub batch_size: usize,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            page_size: 10,
            timeout: Duration::from_secs(180),
            batch_size: 50,
        }
    }
}

/// Inputs for one global resolution, detached from the view.
#[derive(Debug)]
pub struct GlobalLoadRequest {
    ranked: Arc<Vec<RankedSize>>,
    known: IdentityCache,
}

impl GlobalLoadRequest {
    pub async fn run(
        self,
        resolver: Arc<dyn IdentityResolver>,
        batch_size: usize,
    ) -> UnscopedResolution {
        resolve_unscoped(&self.ranked, resolver.as_ref(), &self.known, batch_size).await
    }
}

/// Which buttons to show and whether they can be pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewControls {
    pub prev_enabled: bool,
    pub next_enabled: bool,
    pub toggle_enabled: bool,
    /// The scope the toggle switches to.
    pub toggle_target: Scope,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedView {
    pub title: String,
    pub body: String,
    pub footer: Option<String>,
    /// `None` once the session is over.
    pub controls: Option<ViewControls>,
}

pub struct LeaderboardView {
    state: ViewState,
    scope: Scope,
    page: usize,
    settings: ViewSettings,
    ranked: Arc<Vec<RankedSize>>,
    scoped: Vec<LeaderboardEntry>,
    unscoped: Option<Vec<LeaderboardEntry>>,
    identities: IdentityCache,
    deadline: Instant,
}

impl LeaderboardView {
    /// A view that has the ranking but no names yet.
    pub fn pending(ranked: Vec<RankedSize>, settings: ViewSettings, now: Instant) -> Self {
        let settings = ViewSettings {
            page_size: settings.page_size.max(1),
            ..settings
        };

        Self {
            state: ViewState::Initializing,
            scope: Scope::Server,
            page: 0,
            settings,
            ranked: Arc::new(ranked),
            scoped: Vec::new(),
            unscoped: None,
            identities: IdentityCache::new(),
            deadline: now + settings.timeout,
        }
    }

    /// Attach the server's members and become interactive.
    pub fn resolve_scope(&mut self, members: &IdentityCache) {
        self.scoped = resolve_scoped(&self.ranked, members);
        self.identities = members.clone();
        self.scope = Scope::Server;
        self.page = 0;
        self.state = ViewState::ScopedReady;
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    fn entries(&self) -> &[LeaderboardEntry] {
        match self.scope {
            Scope::Server => &self.scoped,
            Scope::Global => self.unscoped.as_deref().unwrap_or(&[]),
        }
    }

    /// Always at least one, so an empty board still renders a page.
    pub fn page_count(&self) -> usize {
        self.entries().len().div_ceil(self.settings.page_size).max(1)
    }

    pub fn handle(&mut self, action: ViewAction, now: Instant) -> ViewTransition {
        match self.state {
            ViewState::ScopedReady | ViewState::UnscopedReady => {}
            ViewState::Initializing | ViewState::UnscopedLoading | ViewState::TimedOut => {
                return ViewTransition::Ignored;
            }
        }

        self.deadline = now + self.settings.timeout;

        match action {
            ViewAction::Prev => {
                self.page = self.page.saturating_sub(1);
                ViewTransition::Render
            }
            ViewAction::Next => {
                self.page = (self.page + 1).min(self.page_count() - 1);
                ViewTransition::Render
            }
            ViewAction::ToggleScope => self.toggle_scope(),
        }
    }

    fn toggle_scope(&mut self) -> ViewTransition {
        self.page = 0;
        self.scope = self.scope.other();

        match (self.scope, self.unscoped.is_some()) {
            (Scope::Server, _) => {
                self.state = ViewState::ScopedReady;
                ViewTransition::Render
            }
            (Scope::Global, true) => {
                self.state = ViewState::UnscopedReady;
                ViewTransition::Render
            }
            (Scope::Global, false) => {
                self.state = ViewState::UnscopedLoading;
                ViewTransition::LoadGlobal(GlobalLoadRequest {
                    ranked: Arc::clone(&self.ranked),
                    known: self.identities.clone(),
                })
            }
        }
    }

    /// Cache the global entries for the rest of the session.
    ///
    /// Returns `true` if the view changed and should be re-rendered.
    pub fn complete_global_load(&mut self, resolution: UnscopedResolution) -> bool {
        self.identities.extend(resolution.resolved);
        self.unscoped = Some(resolution.entries);

        if self.state != ViewState::UnscopedLoading {
            return false;
        }
        self.state = ViewState::UnscopedReady;
        self.page = 0;
        true
    }

    /// The resolution task died; fall back to the server scope.
    pub fn abort_global_load(&mut self) -> bool {
        if self.state != ViewState::UnscopedLoading {
            return false;
        }
        self.state = ViewState::ScopedReady;
        self.scope = Scope::Server;
        self.page = 0;
        true
    }

    /// End the session. A global load still in flight is dropped and the last
    /// message falls back to the server board, since there are no global entries to show.
    pub fn expire(&mut self) {
        if self.state == ViewState::UnscopedLoading {
            self.scope = Scope::Server;
            self.page = 0;
        }
        self.state = ViewState::TimedOut;
    }

    pub fn render(&self) -> RenderedView {
        let title = match self.scope {
            Scope::Server => SERVER_TITLE,
            Scope::Global => GLOBAL_TITLE,
        }
        .to_string();

        match self.state {
            ViewState::Initializing => RenderedView {
                title,
                body: INITIALIZING_BODY.to_string(),
                footer: None,
                controls: None,
            },
            ViewState::UnscopedLoading => RenderedView {
                title,
                body: GLOBAL_LOADING_BODY.to_string(),
                footer: None,
                controls: Some(ViewControls {
                    prev_enabled: false,
                    next_enabled: false,
                    toggle_enabled: false,
                    toggle_target: Scope::Server,
                }),
            },
            ViewState::ScopedReady | ViewState::UnscopedReady | ViewState::TimedOut => {
                let page_count = self.page_count();
                let controls = (self.state != ViewState::TimedOut).then(|| ViewControls {
                    prev_enabled: self.page > 0,
                    next_enabled: self.page + 1 < page_count,
                    toggle_enabled: true,
                    toggle_target: self.scope.other(),
                });

                RenderedView {
                    title,
                    body: self.render_page(),
                    footer: (page_count > 1)
                        .then(|| format!("Page {}/{}", self.page + 1, page_count)),
                    controls,
                }
            }
        }
    }

    fn render_page(&self) -> String {
        let entries = self.entries();
        if entries.is_empty() {
            return EMPTY_BODY.to_string();
        }

        let start = self.page * self.settings.page_size;
        entries
            .iter()
            .enumerate()
            .skip(start)
            .take(self.settings.page_size)
            .map(|(index, entry)| {
                let tag = if entry.is_bot { " (bot)" } else { "" };
                format!(
                    "**{}.** {}{} - **{}** cm",
                    index + 1,
                    entry.display_name,
                    tag,
                    entry.size
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
