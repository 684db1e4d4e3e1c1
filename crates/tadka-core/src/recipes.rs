//! Recipe records from a loosely-typed API, normalized once at the boundary.
//!
//! `RecipeRecord` accepts anything the server might send (every field is
//! optional and type-lenient); `RecipeSummary` / `RecipeDetail` carry a safe
//! value for every field so rendering never has to check.

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{Gateway, RequestOptions};
use crate::locale::Translator;
use reqwest::Method;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

pub const RECIPES_PATH: &str = "/api/recipes/";

pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/400x300?text=Recipe";
pub const UNTITLED: &str = "Untitled recipe";
pub const MISSING_VALUE: &str = "—";
pub const DEFAULT_DIFFICULTY: &str = "medium";
pub const DEFAULT_CATEGORY: &str = "other";
pub const LOAD_FAILED: &str = "Failed to load recipes";

/// Wildcard for [`RecipeFilter`] fields.
pub const ALL: &str = "all";

/// Path of one recipe's detail resource.
pub fn recipe_detail_path(id: &str) -> GatewayResult<String> {
    Ok(format!("/api/recipes/recipes/{}/", path_segment(id)?))
}

pub(crate) fn path_segment(id: &str) -> GatewayResult<&str> {
    let ok = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(id)
    } else {
        Err(GatewayError::InvalidPath(id.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Lenient field decoding
// ---------------------------------------------------------------------------

fn value_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().and_then(value_text))
}

fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_value<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Value>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.filter(|v| !v.is_null()))
}

/// Minutes from a number (minutes) or a Django duration string
/// (`[D ]HH:MM:SS[.ffffff]`). Plain numeric strings count as minutes.
pub fn duration_minutes(v: &Value) -> Option<u64> {
    let minutes = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_duration_text(s.trim())?,
        _ => return None,
    };
    (minutes.is_finite() && minutes > 0.0).then(|| minutes.round() as u64)
}

fn parse_duration_text(s: &str) -> Option<f64> {
    if !s.contains(':') {
        return s.parse().ok();
    }
    let (days, clock) = match s.split_once(' ') {
        Some((d, rest)) => (d.trim().parse::<f64>().ok()?, rest.trim()),
        None => (0.0, s),
    };
    let parts: Vec<f64> = clock
        .split(':')
        .map(|p| p.parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    let (h, m, sec) = match parts.as_slice() {
        [h, m, s] => (*h, *m, *s),
        [m, s] => (0.0, *m, *s),
        _ => return None,
    };
    Some(days * 1440.0 + h * 60.0 + m + sec / 60.0)
}

/// Truthiness of a loosely-typed flag: `true`, `"true"`/`"1"`, or non-zero.
fn value_flag(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes"
        ),
        _ => false,
    }
}

fn time_label(prep: Option<&Value>, cook: Option<&Value>) -> String {
    prep.and_then(duration_minutes)
        .or_else(|| cook.and_then(duration_minutes))
        .map(|m| format!("{} min", m))
        .unwrap_or_else(|| MISSING_VALUE.to_string())
}

fn image_from_entry(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => map
            .get("image")
            .or_else(|| map.get("url"))
            .and_then(value_text),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Raw recipe as sent by the API. Nothing here is trusted to be present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub title_hi: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub main_image: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "lenient_value")]
    pub images: Option<Value>,
    #[serde(default, deserialize_with = "lenient_value")]
    pub prep_time: Option<Value>,
    #[serde(default, deserialize_with = "lenient_value")]
    pub cook_time: Option<Value>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub difficulty: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description_hi: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub servings: Option<f64>,
}

/// Listing entry with every field defaulted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeSummary {
    pub id: String,
    pub title: String,
    pub title_hi: String,
    pub image: String,
    pub time: String,
    pub difficulty: String,
    pub rating: Option<f64>,
    pub category: String,
    pub description: String,
    pub description_hi: String,
}

impl RecipeRecord {
    pub fn normalize(&self) -> RecipeSummary {
        let title = self
            .title
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| UNTITLED.to_string());
        let image = self
            .main_image
            .clone()
            .or_else(|| self.image.clone())
            .or_else(|| match &self.images {
                Some(Value::Array(items)) => items.first().and_then(image_from_entry),
                _ => None,
            })
            .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string());
        let description = self.description.clone().unwrap_or_default();

        RecipeSummary {
            id: self.id.clone().unwrap_or_default(),
            title_hi: self.title_hi.clone().unwrap_or_else(|| title.clone()),
            title,
            image,
            time: time_label(self.prep_time.as_ref(), self.cook_time.as_ref()),
            difficulty: self
                .difficulty
                .as_deref()
                .unwrap_or(DEFAULT_DIFFICULTY)
                .to_lowercase(),
            rating: self.rating.filter(|r| r.is_finite()),
            category: self
                .category
                .as_deref()
                .unwrap_or(DEFAULT_CATEGORY)
                .to_lowercase(),
            description_hi: self
                .description_hi
                .clone()
                .unwrap_or_else(|| description.clone()),
            description,
        }
    }
}

impl RecipeSummary {
    pub fn rating_label(&self) -> String {
        self.rating
            .map(|r| format!("{:.1}", r))
            .unwrap_or_else(|| MISSING_VALUE.to_string())
    }

    pub fn display_title<'a>(&'a self, t: &Translator) -> &'a str {
        t.pick(&self.title, &self.title_hi)
    }

    pub fn display_description<'a>(&'a self, t: &Translator) -> &'a str {
        t.pick(&self.description, &self.description_hi)
    }
}

/// Decode a listing body: a bare array, a paginated `{results: [...]}`, or
/// nothing at all. Entries that are not objects are skipped.
pub fn decode_listing(body: Option<Value>) -> GatewayResult<Vec<RecipeSummary>> {
    let items = match body {
        None => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(Value::Object(mut map)) => match map.remove("results") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) => Vec::new(),
            _ => {
                return Err(GatewayError::MalformedResponse(
                    "recipe listing is neither an array nor a page of results".to_string(),
                ))
            }
        },
        Some(other) => {
            return Err(GatewayError::MalformedResponse(format!(
                "unexpected recipe listing: {}",
                other
            )))
        }
    };

    let mut recipes = Vec::with_capacity(items.len());
    for item in items {
        if !item.is_object() {
            warn!("Skipping non-object recipe entry");
            continue;
        }
        match serde_json::from_value::<RecipeRecord>(item) {
            Ok(record) => recipes.push(record.normalize()),
            Err(e) => warn!("Skipping undecodable recipe entry: {}", e),
        }
    }
    Ok(recipes)
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Search box plus category/difficulty pickers of the listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeFilter {
    pub query: String,
    pub category: String,
    pub difficulty: String,
}

impl Default for RecipeFilter {
    fn default() -> Self {
        Self {
            query: String::new(),
            category: ALL.to_string(),
            difficulty: ALL.to_string(),
        }
    }
}

impl RecipeFilter {
    pub fn matches(&self, recipe: &RecipeSummary) -> bool {
        let query = self.query.trim();
        let matches_search = query.is_empty()
            || recipe.title.to_lowercase().contains(&query.to_lowercase())
            || recipe.title_hi.contains(query);
        let matches_category =
            self.category == ALL || recipe.category.eq_ignore_ascii_case(&self.category);
        let matches_difficulty =
            self.difficulty == ALL || recipe.difficulty.eq_ignore_ascii_case(&self.difficulty);
        matches_search && matches_category && matches_difficulty
    }

    pub fn apply<'a>(&self, recipes: &'a [RecipeSummary]) -> Vec<&'a RecipeSummary> {
        recipes.iter().filter(|r| self.matches(r)).collect()
    }
}

// ---------------------------------------------------------------------------
// Detail
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ingredient {
    pub name: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeStep {
    pub number: u32,
    pub instruction: String,
    pub image: Option<String>,
    pub video_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeDetail {
    pub summary: RecipeSummary,
    pub servings: u32,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<RecipeStep>,
    pub notes: String,
    pub video_url: Option<String>,
    pub is_favorited: bool,
}

#[derive(Debug, Default, Deserialize)]
struct DetailExtras {
    #[serde(default, deserialize_with = "lenient_value")]
    ingredients: Option<Value>,
    #[serde(default, deserialize_with = "lenient_value")]
    steps: Option<Value>,
    #[serde(default, deserialize_with = "lenient_text")]
    notes: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    video_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_value")]
    is_favorited: Option<Value>,
}

fn ingredient_from(v: &Value) -> Option<Ingredient> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(Ingredient {
            name: s.trim().to_string(),
            amount: String::new(),
        }),
        Value::Object(map) => {
            let name = map
                .get("name")
                .or_else(|| map.get("item"))
                .and_then(value_text)?;
            let amount = map
                .get("amount")
                .or_else(|| map.get("quantity"))
                .and_then(value_text)
                .map(|a| match map.get("unit").and_then(value_text) {
                    Some(unit) => format!("{} {}", a, unit),
                    None => a,
                })
                .unwrap_or_default();
            Some(Ingredient { name, amount })
        }
        _ => None,
    }
}

fn step_from(index: usize, v: &Value) -> Option<RecipeStep> {
    let map = v.as_object()?;
    let instruction = map
        .get("instruction")
        .or_else(|| map.get("description"))
        .and_then(value_text)?;
    let number = map
        .get("step_number")
        .or_else(|| map.get("step"))
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(index as u32 + 1);
    Some(RecipeStep {
        number,
        instruction,
        image: map.get("image").and_then(value_text),
        video_url: map
            .get("video_url")
            .or_else(|| map.get("video"))
            .and_then(value_text),
    })
}

/// Decode a detail body. Steps come back ordered by step number.
pub fn decode_detail(body: Value) -> GatewayResult<RecipeDetail> {
    if !body.is_object() {
        return Err(GatewayError::MalformedResponse(
            "recipe detail is not an object".to_string(),
        ));
    }
    let record: RecipeRecord = serde_json::from_value(body.clone())
        .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;
    let extras: DetailExtras = serde_json::from_value(body)
        .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;

    let ingredients = match &extras.ingredients {
        Some(Value::Array(items)) => items.iter().filter_map(ingredient_from).collect(),
        _ => Vec::new(),
    };
    let mut steps: Vec<RecipeStep> = match &extras.steps {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(i, v)| step_from(i, v))
            .collect(),
        _ => Vec::new(),
    };
    steps.sort_by_key(|s| s.number);

    let servings = record
        .servings
        .filter(|s| s.is_finite() && *s >= 1.0)
        .map(|s| s as u32)
        .unwrap_or(1);

    Ok(RecipeDetail {
        summary: record.normalize(),
        servings,
        ingredients,
        steps,
        notes: extras.notes.unwrap_or_default(),
        video_url: extras.video_url,
        is_favorited: extras.is_favorited.as_ref().map_or(false, value_flag),
    })
}

/// Step-by-step cooking position within a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepCursor {
    current: usize,
    total: usize,
}

impl StepCursor {
    pub fn new(total: usize) -> Self {
        Self { current: 0, total }
    }

    pub fn index(&self) -> usize {
        self.current
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_first(&self) -> bool {
        self.current == 0
    }

    pub fn is_last(&self) -> bool {
        self.total == 0 || self.current + 1 >= self.total
    }

    /// Advance; stays on the last step. Returns whether the position moved.
    pub fn next(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.current += 1;
        true
    }

    pub fn previous(&mut self) -> bool {
        if self.is_first() {
            return false;
        }
        self.current -= 1;
        true
    }

    pub fn current<'a>(&self, steps: &'a [RecipeStep]) -> Option<&'a RecipeStep> {
        steps.get(self.current)
    }

    /// "Step 2 of 5", in the translator's locale.
    pub fn progress(&self, t: &Translator) -> String {
        let shown = if self.total == 0 { 0 } else { self.current + 1 };
        format!("{} {} {} {}", t.t("step"), shown, t.t("of"), self.total)
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct RecipeClient {
    gateway: Gateway,
}

impl RecipeClient {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub async fn list(&self) -> GatewayResult<Vec<RecipeSummary>> {
        self.list_with(RequestOptions::default()).await
    }

    /// Listing with server-side query parameters (e.g. `search`, `difficulty`).
    pub async fn list_with(&self, options: RequestOptions) -> GatewayResult<Vec<RecipeSummary>> {
        let body: Option<Value> = self
            .gateway
            .send::<(), _>(Method::GET, RECIPES_PATH, None, options)
            .await?;
        let recipes = decode_listing(body)?;
        debug!("Loaded {} recipes", recipes.len());
        Ok(recipes)
    }

    pub async fn detail(&self, id: &str) -> GatewayResult<RecipeDetail> {
        let body: Value = self.gateway.get(&recipe_detail_path(id)?).await?;
        decode_detail(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::Locale;
    use serde_json::json;

    #[test]
    fn empty_record_gets_every_default() {
        let s = RecipeRecord::default().normalize();
        assert_eq!(s.id, "");
        assert_eq!(s.title, UNTITLED);
        assert_eq!(s.title_hi, UNTITLED);
        assert_eq!(s.image, PLACEHOLDER_IMAGE);
        assert_eq!(s.time, "—");
        assert_eq!(s.difficulty, "medium");
        assert_eq!(s.category, "other");
        assert_eq!(s.rating_label(), "—");
        assert_eq!(s.description, "");
    }

    #[test]
    fn normalizes_api_shapes() {
        let record: RecipeRecord = serde_json::from_value(json!({
            "id": 7,
            "name": "Masala Dosa",
            "images": [{"image": "/media/dosa.jpg"}],
            "prep_time": "00:30:00",
            "difficulty": "Easy",
            "rating": "4.6",
            "category": "Breakfast",
            "description": "Crisp crepe"
        }))
        .unwrap();
        let s = record.normalize();
        assert_eq!(s.id, "7");
        assert_eq!(s.title, "Masala Dosa");
        assert_eq!(s.title_hi, "Masala Dosa");
        assert_eq!(s.image, "/media/dosa.jpg");
        assert_eq!(s.time, "30 min");
        assert_eq!(s.difficulty, "easy");
        assert_eq!(s.rating_label(), "4.6");
        assert_eq!(s.category, "breakfast");
        assert_eq!(s.description_hi, "Crisp crepe");
    }

    #[test]
    fn wrong_field_types_do_not_fail_decoding() {
        let record: RecipeRecord = serde_json::from_value(json!({
            "title": ["not", "a", "string"],
            "rating": {"avg": 4},
            "prep_time": null,
            "cook_time": 25
        }))
        .unwrap();
        let s = record.normalize();
        assert_eq!(s.title, UNTITLED);
        assert_eq!(s.rating, None);
        assert_eq!(s.time, "25 min");
    }

    #[test]
    fn duration_formats() {
        assert_eq!(duration_minutes(&json!("1 02:00:00")), Some(1560));
        assert_eq!(duration_minutes(&json!("45:00")), Some(45));
        assert_eq!(duration_minutes(&json!("00:00:00")), None);
        assert_eq!(duration_minutes(&json!("20")), Some(20));
        assert_eq!(duration_minutes(&json!("soon")), None);
        assert_eq!(duration_minutes(&json!(12.4)), Some(12));
    }

    #[test]
    fn listing_accepts_array_page_and_null() {
        assert!(decode_listing(None).unwrap().is_empty());
        let list = decode_listing(Some(json!([{"title": "A"}, 5, {"title": "B"}]))).unwrap();
        assert_eq!(list.len(), 2);
        let page = decode_listing(Some(json!({"count": 1, "results": [{"title": "C"}]}))).unwrap();
        assert_eq!(page[0].title, "C");
        assert!(matches!(
            decode_listing(Some(json!({"recipes": "/api/recipes/recipes/"}))),
            Err(GatewayError::MalformedResponse(_))
        ));
    }

    #[test]
    fn filter_matches_search_category_and_difficulty() {
        let recipes = decode_listing(Some(json!([
            {"title": "Butter Chicken", "title_hi": "बटर चिकन", "category": "dinner", "difficulty": "medium"},
            {"title": "Masala Dosa", "category": "breakfast", "difficulty": "easy"},
        ])))
        .unwrap();

        let mut filter = RecipeFilter {
            query: "chicken".to_string(),
            ..Default::default()
        };
        assert_eq!(filter.apply(&recipes).len(), 1);

        filter.query = "बटर".to_string();
        assert_eq!(filter.apply(&recipes)[0].title, "Butter Chicken");

        filter.query.clear();
        filter.category = "breakfast".to_string();
        filter.difficulty = "easy".to_string();
        assert_eq!(filter.apply(&recipes)[0].title, "Masala Dosa");

        filter.difficulty = "hard".to_string();
        assert!(filter.apply(&recipes).is_empty());
    }

    #[test]
    fn detail_orders_steps_and_reads_ingredients() {
        let detail = decode_detail(json!({
            "id": "b3c1",
            "title": "Butter Chicken",
            "servings": 4,
            "ingredients": ["Butter", {"name": "Chicken breast", "amount": "500", "unit": "g"}, 3],
            "steps": [
                {"step_number": 2, "instruction": "Cook the chicken"},
                {"step_number": 1, "instruction": "Marinate the chicken"},
                {"instruction": ""}
            ],
            "is_favorited": true
        }))
        .unwrap();
        assert_eq!(detail.servings, 4);
        assert_eq!(detail.ingredients.len(), 2);
        assert_eq!(detail.ingredients[1].amount, "500 g");
        assert_eq!(detail.steps[0].instruction, "Marinate the chicken");
        assert_eq!(detail.steps[1].number, 2);
        assert!(detail.is_favorited);
    }

    #[test]
    fn favorited_flag_accepts_loose_types() {
        for (raw, expected) in [
            (json!(true), true),
            (json!("true"), true),
            (json!(1), true),
            (json!(0), false),
            (json!("no"), false),
            (json!({"yes": true}), false),
            (Value::Null, false),
        ] {
            let detail = decode_detail(json!({"id": "r1", "title": "Dal", "is_favorited": raw}))
                .unwrap();
            assert_eq!(detail.is_favorited, expected, "{raw:?}");
        }
        assert!(!decode_detail(json!({"id": "r1"})).unwrap().is_favorited);
    }

    #[test]
    fn step_cursor_clamps_and_reports_progress() {
        let mut cursor = StepCursor::new(3);
        assert!(!cursor.previous());
        assert!(cursor.next());
        assert!(cursor.next());
        assert!(!cursor.next());
        assert!(cursor.is_last());

        let en = Translator::bundled(Locale::En);
        assert_eq!(cursor.progress(&en), "Step 3 of 3");
        let hi = Translator::bundled(Locale::Hi);
        assert_eq!(cursor.progress(&hi), "स्टेप 3 का 3");

        let empty = StepCursor::new(0);
        assert!(empty.is_last());
        assert_eq!(empty.progress(&en), "Step 0 of 0");
    }

    #[test]
    fn detail_path_rejects_unsafe_ids() {
        assert_eq!(
            recipe_detail_path("3f2a-9c").unwrap(),
            "/api/recipes/recipes/3f2a-9c/"
        );
        assert!(recipe_detail_path("../admin").is_err());
        assert!(recipe_detail_path("").is_err());
    }
}
