//! tadka-core: client core for Tadka Tales (session, request gateway, route
//! guard, recipes, favorites and locale tables).
//!
//! The voice assistant lives in `tadka-voice` and builds on the gateway here.

mod error;
mod token_store;

pub mod assistant;
pub mod auth;
pub mod config;
pub mod favorites;
pub mod gateway;
pub mod locale;
pub mod navigation;
pub mod recipes;
pub mod session;
pub mod telemetry;

pub use assistant::AssistantClient;
pub use auth::{AuthClient, LoginOutcome};
pub use config::ClientConfig;
pub use error::{AuthError, AuthResult, GatewayError, GatewayResult, StoreError, StoreResult};
pub use favorites::{Favorite, FavoriteSet, FavoritesClient};
pub use gateway::{Gateway, RequestOptions};
pub use locale::{toggle, Locale, LocaleTables, Translator};
pub use navigation::{Navigation, Navigator, Route};
pub use recipes::{RecipeClient, RecipeDetail, RecipeFilter, RecipeSummary, StepCursor};
pub use session::{Authorization, DenialReason, GuardDecision, LoginRedirect, SessionGuard};
pub use token_store::{Credential, MemoryTokenStore, SledTokenStore, TokenStore, TOKEN_SLOT};
