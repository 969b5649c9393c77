use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One restaurant in the directory, keyed by the id the agent resolves
/// spoken restaurant names to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodSpot {
    pub id: String,
    #[serde(default)]
    pub food: Vec<String>,
    #[serde(default)]
    pub cuisine: Vec<String>,
}

/// Compares two names ignoring case, using full Unicode lowercase mappings.
pub fn same_text(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

impl FoodSpot {
    pub fn sells(&self, food: &str) -> bool {
        self.food.iter().any(|item| same_text(item, food))
    }

    pub fn serves_cuisine(&self, cuisine: &str) -> bool {
        self.cuisine.iter().any(|c| same_text(c, cuisine))
    }
}

/// Read-only snapshot of every known food spot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantDirectory {
    pub entries: Vec<FoodSpot>,
    pub loaded_at: DateTime<Utc>,
}

impl Default for RestaurantDirectory {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl RestaurantDirectory {
    pub fn new(entries: Vec<FoodSpot>) -> Self {
        Self {
            entries,
            loaded_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids of the spots whose food list contains `food`, ignoring case.
    pub fn spots_selling(&self, food: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|spot| spot.sells(food))
            .map(|spot| spot.id.clone())
            .collect()
    }

    /// Ids of the spots serving `cuisine`, ignoring case.
    pub fn spots_with_cuisine(&self, cuisine: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|spot| spot.serves_cuisine(cuisine))
            .map(|spot| spot.id.clone())
            .collect()
    }

    pub fn find(&self, id: &str) -> Option<&FoodSpot> {
        self.entries
            .iter()
            .find(|spot| same_text(&spot.id, id))
    }
}

/// What the user has asked about but not yet committed to the order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    #[serde(default)]
    pub food: Vec<String>,
    #[serde(default)]
    pub cuisine: Option<String>,
    #[serde(default)]
    pub food_spot: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub food_spot: Option<String>,
}

/// Conversation-scoped data bag round-tripped through the agent runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub query: Query,
    #[serde(default)]
    pub order: Order,
    #[serde(default)]
    pub last_prompt: Option<String>,
}

impl Session {
    /// Drops the query and the order; `last_prompt` survives so the next
    /// prompt still avoids repeating the previous one.
    pub fn reset(&mut self) {
        self.query = Query::default();
        self.order = Order::default();
    }

    /// Moves queued food into the order and empties the query's food list.
    pub fn fold_query_into_order(&mut self) {
        self.order.items.append(&mut self.query.food);
    }
}

/// Intents the journey understands, keyed by the agent's action name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Start,
    Restart,
    EarlyQuit,
    Quit,
    BrowseByFood,
    BrowseByCuisine,
    ChooseFoodSpot,
    OrderFromFoodSpot,
    ConfirmOrder,
    OrderReady,
    OrderUnready,
}

impl Intent {
    pub const ALL: [Intent; 11] = [
        Intent::Start,
        Intent::Restart,
        Intent::EarlyQuit,
        Intent::Quit,
        Intent::BrowseByFood,
        Intent::BrowseByCuisine,
        Intent::ChooseFoodSpot,
        Intent::OrderFromFoodSpot,
        Intent::ConfirmOrder,
        Intent::OrderReady,
        Intent::OrderUnready,
    ];

    pub fn action(self) -> &'static str {
        match self {
            Intent::Start => "journey.start",
            Intent::Restart => "journey.restart",
            Intent::EarlyQuit => "journey.quit",
            Intent::Quit => "journey.end",
            Intent::BrowseByFood => "journey.browse.byFood",
            Intent::BrowseByCuisine => "journey.browse.byCuisine",
            Intent::ChooseFoodSpot => "journey.order.foodSpot",
            Intent::OrderFromFoodSpot => "journey.browse.onlyFoodSpot",
            Intent::ConfirmOrder => "journey.confirmOrder",
            Intent::OrderReady => "journey.order.ready",
            Intent::OrderUnready => "journey.order.unready",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown intent action '{0}'")]
pub struct UnknownIntent(pub String);

impl FromStr for Intent {
    type Err = UnknownIntent;

    fn from_str(action: &str) -> Result<Self, Self::Err> {
        Intent::ALL
            .into_iter()
            .find(|intent| intent.action() == action)
            .ok_or_else(|| UnknownIntent(action.to_string()))
    }
}
