use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Maximum number of actions kept on an analytics record.
pub const MAX_RECORDED_ACTIONS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionType {
    View,
    AddToWishlist,
    AddToCart,
    Purchase,
    Other(String),
}

impl ActionType {
    /// Soft label used as the training target for this kind of interaction.
    pub fn weight(&self) -> f32 {
        match self {
            ActionType::Purchase => 1.0,
            ActionType::AddToCart => 0.7,
            ActionType::AddToWishlist => 0.5,
            ActionType::View => 0.1,
            ActionType::Other(_) => 0.0,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActionType::View => "product_view",
            ActionType::AddToWishlist => "add_to_wishlist",
            ActionType::AddToCart => "add_to_cart",
            ActionType::Purchase => "purchase",
            ActionType::Other(name) => name,
        }
    }
}

impl From<String> for ActionType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "product_view" | "view" => ActionType::View,
            "add_to_wishlist" => ActionType::AddToWishlist,
            "add_to_cart" => ActionType::AddToCart,
            "purchase" => ActionType::Purchase,
            _ => ActionType::Other(name),
        }
    }
}

impl From<&str> for ActionType {
    fn from(name: &str) -> Self {
        ActionType::from(name.to_string())
    }
}

impl From<ActionType> for String {
    fn from(action: ActionType) -> Self {
        match action {
            ActionType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub product_id: String,
    #[serde(rename = "action", alias = "actionType")]
    pub action_type: ActionType,
    #[serde(default, deserialize_with = "deserialize_instant")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Fields the engine does not read, such as `shopId`.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Interaction {
    pub fn new(product_id: impl Into<String>, action_type: ActionType) -> Self {
        Self {
            product_id: product_id.into(),
            action_type,
            timestamp: Some(Utc::now()),
            extra: serde_json::Map::new(),
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnalyticsRecord {
    pub user_id: String,
    #[serde(default)]
    pub actions: Vec<Interaction>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_instant",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_trained: Option<DateTime<Utc>>,
    /// Profile fields (`country`, `device`, `lastVisited`, ...) kept as stored.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserAnalyticsRecord {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    pub fn with_actions(mut self, actions: Vec<Interaction>) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_cache(mut self, recommendations: Vec<String>, last_trained: DateTime<Utc>) -> Self {
        self.recommendations = recommendations;
        self.last_trained = Some(last_trained);
        self
    }

    /// Applies one tracked storefront event to the action log.
    ///
    /// Views always append, cart and wishlist additions append once per
    /// product, removals drop the matching additions and anything else is
    /// ignored. Returns whether the log changed.
    pub fn record_event(&mut self, product_id: &str, action: &str, at: DateTime<Utc>) -> bool {
        let exists = self
            .actions
            .iter()
            .any(|entry| entry.product_id == product_id && entry.action_type.as_str() == action);

        let changed = match action {
            "product_view" | "view" => {
                self.actions
                    .push(Interaction::new(product_id, ActionType::View).at(at));
                true
            }
            "add_to_cart" | "add_to_wishlist" if !exists => {
                self.actions
                    .push(Interaction::new(product_id, ActionType::from(action)).at(at));
                true
            }
            "remove_from_cart" => self.remove_actions(product_id, &ActionType::AddToCart),
            "remove_from_wishlist" => self.remove_actions(product_id, &ActionType::AddToWishlist),
            _ => false,
        };

        if self.actions.len() > MAX_RECORDED_ACTIONS {
            let overflow = self.actions.len() - MAX_RECORDED_ACTIONS;
            self.actions.drain(..overflow);
        }

        changed
    }

    fn remove_actions(&mut self, product_id: &str, action_type: &ActionType) -> bool {
        let before = self.actions.len();
        self.actions
            .retain(|entry| !(entry.product_id == product_id && &entry.action_type == action_type));
        self.actions.len() != before
    }
}

/// A catalog entry. Only `id` is interpreted; every other field is carried
/// through to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Product {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: serde_json::Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: serde_json::Value) -> Self {
        self.attributes.insert(key.to_string(), value);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSource {
    Fallback,
    Cached,
    Trained,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub request_id: Uuid,
    pub source: RecommendationSource,
    pub product_ids: Vec<String>,
    pub products: Vec<Product>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl RecommendationResult {
    pub fn new(request_id: Uuid, source: RecommendationSource, products: Vec<Product>) -> Self {
        Self {
            request_id,
            source,
            product_ids: products.iter().map(|p| p.id.clone()).collect(),
            products,
            warning: None,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }
}

/// Interprets a stored instant. Accepts RFC 3339 strings carrying an offset,
/// epoch milliseconds and `{"$date": ...}` wrappers; anything else is `None`.
pub fn parse_instant(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(text) => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|instant| instant.with_timezone(&Utc)),
        serde_json::Value::Number(millis) => millis
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        serde_json::Value::Object(fields) => fields.get("$date").and_then(parse_instant),
        _ => None,
    }
}

fn deserialize_instant<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_instant))
}
