//! App routes and the redirect contract around the session guard.

use crate::gateway::is_local_path;
use crate::session::{GuardDecision, LoginRedirect, SessionGuard};
use std::fmt;

/// Where navigation lands after login when nothing was preserved.
pub const HOME_PATH: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Recipes,
    RecipeDetail(String),
    Profile,
    Favorites,
    Login,
    Register,
}

impl Route {
    /// Parse an app path. Query string, fragment and a trailing slash are ignored.
    pub fn parse(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').skip(1).collect();
        if !path.starts_with('/') {
            return None;
        }
        match segments.as_slice() {
            [] => Some(Route::Home),
            ["recipes"] => Some(Route::Recipes),
            ["recipe", id] if !id.is_empty() => Some(Route::RecipeDetail((*id).to_string())),
            ["profile"] => Some(Route::Profile),
            ["favorites"] => Some(Route::Favorites),
            ["login"] => Some(Route::Login),
            ["register"] => Some(Route::Register),
            _ => None,
        }
    }

    /// Routes that need a credential to render.
    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Profile | Route::Favorites)
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => HOME_PATH.to_string(),
            Route::Recipes => "/recipes".to_string(),
            Route::RecipeDetail(id) => format!("/recipe/{}", id),
            Route::Profile => "/profile".to_string(),
            Route::Favorites => "/favorites".to_string(),
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Show(Route),
    Redirect(LoginRedirect),
    NotFound(String),
}

/// Resolves paths to routes, asking the guard before any protected one.
#[derive(Clone)]
pub struct Navigator {
    guard: SessionGuard,
}

impl Navigator {
    pub fn new(guard: SessionGuard) -> Self {
        Self { guard }
    }

    pub fn guard(&self) -> &SessionGuard {
        &self.guard
    }

    pub fn navigate(&self, path: &str) -> Navigation {
        let Some(route) = Route::parse(path) else {
            return Navigation::NotFound(path.to_string());
        };
        if !route.is_protected() {
            return Navigation::Show(route);
        }
        match self.guard.guard(path) {
            GuardDecision::Render => Navigation::Show(route),
            GuardDecision::Redirect(redirect) => Navigation::Redirect(redirect),
        }
    }

    /// Destination to resume after a successful login.
    ///
    /// Only in-app paths are honoured; anything else, or a loop back to the
    /// login page, resumes at home.
    pub fn resume_after_login(&self, redirect: Option<&LoginRedirect>) -> String {
        redirect
            .map(|r| r.from.as_str())
            .filter(|from| is_local_path(from))
            .filter(|from| Route::parse(from) != Some(Route::Login))
            .unwrap_or(HOME_PATH)
            .to_string()
    }
}
