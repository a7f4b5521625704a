pub const LOGIN_ROUTE: &str = "/login";
pub const ADMIN_ROUTE_PREFIX: &str = "/admin";

/// Source of the current session credential. Token storage itself lives
/// outside this crate.
pub trait SessionStore: Send + Sync {
    fn access_token(&self) -> Option<String>;
}

#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    token: Option<String>,
}

impl StaticSession {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|value| !value.trim().is_empty()),
        }
    }
}

impl SessionStore for StaticSession {
    fn access_token(&self) -> Option<String> {
        self.token.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Start,
    ExcludedRoute,
    NoSession,
}

impl GateDecision {
    pub fn allows_start(self) -> bool {
        matches!(self, GateDecision::Start)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GateDecision::Start => "start",
            GateDecision::ExcludedRoute => "excluded_route",
            GateDecision::NoSession => "no_session",
        }
    }
}

pub fn evaluate(route: &str, session: &dyn SessionStore) -> GateDecision {
    if is_excluded_route(route) {
        return GateDecision::ExcludedRoute;
    }
    match session.access_token() {
        Some(token) if !token.trim().is_empty() => GateDecision::Start,
        _ => GateDecision::NoSession,
    }
}

/// Login has no session and the admin console refreshes on its own cadence.
pub fn is_excluded_route(route: &str) -> bool {
    let path = route_path(route);
    path == LOGIN_ROUTE || path.starts_with(ADMIN_ROUTE_PREFIX)
}

fn route_path(route: &str) -> &str {
    let trimmed = route.trim();
    let end = trimmed.find(['?', '#']).unwrap_or(trimmed.len());
    &trimmed[..end]
}
