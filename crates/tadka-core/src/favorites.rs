//! Favorite recipes: the remote list plus a local set for list views.

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::Gateway;
use crate::recipes::{path_segment, RecipeDetail, RecipeRecord, RecipeSummary};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

pub const FAVORITES_PATH: &str = "/api/recipes/favorites/";

fn favorite_path(id: &str, action: &str) -> GatewayResult<String> {
    Ok(format!(
        "/api/recipes/recipes/{}/{}/",
        path_segment(id)?,
        action
    ))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Favorite {
    pub id: String,
    pub recipe: RecipeSummary,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct FavoriteEntry {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    recipe: Option<RecipeRecord>,
    #[serde(default)]
    created_at: Option<String>,
}

impl FavoriteEntry {
    fn into_favorite(self) -> Option<Favorite> {
        let recipe = self.recipe?.normalize();
        let created_at = self.created_at.as_deref().and_then(|s| {
            DateTime::parse_from_rfc3339(s)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|e| debug!("Unparseable favorite timestamp {:?}: {}", s, e))
                .ok()
        });
        let id = match self.id {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        Some(Favorite {
            id,
            recipe,
            created_at,
        })
    }
}

/// Decode the favorites listing; accepts a bare array or a `{results}` page.
pub fn decode_favorites(body: Option<Value>) -> GatewayResult<Vec<Favorite>> {
    let items = match body {
        None => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(Value::Object(mut map)) => match map.remove("results") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(GatewayError::MalformedResponse(
                    "favorites listing has no results".to_string(),
                ))
            }
        },
        Some(_) => {
            return Err(GatewayError::MalformedResponse(
                "favorites listing is not an array".to_string(),
            ))
        }
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<FavoriteEntry>(item) {
            Ok(entry) => entry.into_favorite(),
            Err(e) => {
                warn!("Skipping undecodable favorite: {}", e);
                None
            }
        })
        .collect())
}

/// Recipe ids the user has marked, as shown by list views.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoriteSet {
    ids: BTreeSet<String>,
}

impl FavoriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_favorites(favorites: &[Favorite]) -> Self {
        Self {
            ids: favorites
                .iter()
                .map(|f| f.recipe.id.clone())
                .filter(|id| !id.is_empty())
                .collect(),
        }
    }

    /// Record the server's view of one recipe, as reported on its detail.
    pub fn observe(&mut self, detail: &RecipeDetail) {
        if !detail.summary.id.is_empty() {
            self.set(&detail.summary.id, detail.is_favorited);
        }
    }

    /// Force membership for `id`.
    pub fn set(&mut self, id: &str, favorited: bool) {
        if favorited {
            self.ids.insert(id.to_string());
        } else {
            self.ids.remove(id);
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Flip membership; returns whether `id` is now a favorite.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.to_string());
            true
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

pub struct FavoritesClient {
    gateway: Gateway,
}

impl FavoritesClient {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub async fn list(&self) -> GatewayResult<Vec<Favorite>> {
        let body: Option<Value> = self.gateway.get(FAVORITES_PATH).await?;
        decode_favorites(body)
    }

    pub async fn add(&self, id: &str) -> GatewayResult<()> {
        let _: Option<Value> = self
            .gateway
            .post(&favorite_path(id, "favorite")?, &serde_json::json!({}))
            .await?;
        info!(recipe = id, "Recipe added to favorites");
        Ok(())
    }

    pub async fn remove(&self, id: &str) -> GatewayResult<()> {
        let _: Option<Value> = self
            .gateway
            .post(&favorite_path(id, "unfavorite")?, &serde_json::json!({}))
            .await?;
        info!(recipe = id, "Recipe removed from favorites");
        Ok(())
    }

    /// Toggle remotely, then mirror the result into `set`. The set is left
    /// untouched when the request fails.
    pub async fn toggle(&self, set: &mut FavoriteSet, id: &str) -> GatewayResult<bool> {
        if set.contains(id) {
            self.remove(id).await?;
        } else {
            self.add(id).await?;
        }
        Ok(set.toggle(id))
    }
}
