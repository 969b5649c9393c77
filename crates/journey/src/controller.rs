use rand::Rng;
use serde_json::{Map, Value};
use shared::{
    domain::{same_text, Intent, RestaurantDirectory, Session},
    protocol::AgentContext,
};
use tracing::{debug, info, warn};

use crate::{
    format::{concat_list, fill},
    prompts::{self, pick_prompt},
    turn::{Reply, Slots, Turn, TurnOutcome},
};

pub const BROWSING_CONTEXT: &str = "browsing";
pub const BROWSING_CONTEXT_LIFESPAN: u32 = 5;
pub const MATCHED_SPOTS_PARAM: &str = "matched_spots";
pub const BAD_SPOT_CONTEXT: &str = "bad_spot";
pub const BAD_SPOT_CONTEXT_LIFESPAN: u32 = 2;
pub const BAD_INPUT_PARAM: &str = "bad_input";
pub const CHOSEN_FOOD_SPOT_FOLLOWUP_CONTEXT: &str = "chosen_foodspot-followup";

/// Runs one conversational turn against a directory snapshot.
pub fn handle_turn<R: Rng + ?Sized>(
    turn: Turn,
    directory: &RestaurantDirectory,
    rng: &mut R,
) -> TurnOutcome {
    let Turn {
        intent,
        slots,
        session,
        contexts,
    } = turn;

    let mut journey = Journey {
        slots,
        session,
        directory,
        contexts_in: contexts,
        contexts_out: Vec::new(),
        rng,
    };
    let reply = journey.dispatch(intent);
    debug!(%intent, reply = reply.text(), "turn handled");

    TurnOutcome {
        reply,
        session: journey.session,
        contexts: journey.contexts_out,
    }
}

struct Journey<'a, R: ?Sized> {
    slots: Slots,
    session: Session,
    directory: &'a RestaurantDirectory,
    contexts_in: Vec<AgentContext>,
    contexts_out: Vec<AgentContext>,
    rng: &'a mut R,
}

impl<R: Rng + ?Sized> Journey<'_, R> {
    fn dispatch(&mut self, intent: Intent) -> Reply {
        match intent {
            Intent::Start | Intent::Restart => self.start(self.slots.restart),
            Intent::EarlyQuit | Intent::Quit => self.quit(),
            Intent::BrowseByFood => self.browse_by_food(),
            Intent::BrowseByCuisine => self.browse_by_cuisine(),
            Intent::ChooseFoodSpot => self.choose_food_spot(),
            Intent::OrderFromFoodSpot => self.order_from_food_spot(),
            Intent::ConfirmOrder => self.confirm_order(),
            Intent::OrderReady => self.order_ready(),
            Intent::OrderUnready => self.order_unready(),
        }
    }

    fn start(&mut self, restart: bool) -> Reply {
        self.session.reset();
        info!(restart, "journey start");

        if !restart {
            let greeting = self.pick(prompts::GREETING);
            let invocation = self.pick(prompts::INVOCATION);
            return Reply::Ask(format!("{greeting} {invocation}"));
        }
        if !self.slots.food.is_empty() {
            return self.browse_by_food();
        }
        if self.slots.cuisine.is_some() {
            return self.browse_by_cuisine();
        }
        Reply::Ask(self.pick(prompts::INVOCATION).to_string())
    }

    fn quit(&mut self) -> Reply {
        info!("quitting journey");
        Reply::Tell(self.pick(prompts::QUIT).to_string())
    }

    fn browse_by_food(&mut self) -> Reply {
        // A committed restaurant is kept even if the directory changed since.
        if let Some(food_spot) = self.session.order.food_spot.clone() {
            debug!(%food_spot, "food spot already chosen");
            self.session.query.cuisine = None;
            self.session.query.food = self.slots.food.clone();
            self.session.fold_query_into_order();
            return self.after_fold(&food_spot);
        }

        let Some(requested) = self.slots.food.first().cloned() else {
            return Reply::Ask(self.pick(prompts::INVOCATION).to_string());
        };
        let matched = self.directory.spots_selling(&requested);
        info!(food = %requested, matches = matched.len(), "browsing by food");

        let food = concat_list(&self.slots.food);
        if matched.is_empty() {
            let template = self.pick(prompts::NO_MATCHING_FOOD);
            return Reply::Ask(fill(template, &[("food", food.as_str())]));
        }

        self.session.query.food = self.slots.food.clone();
        self.session.query.cuisine = None;
        self.remember_matches(&matched);

        let available = self.pick(prompts::AVAILABLE_FOOD_SPOTS);
        let which = self.pick(prompts::WHICH_RESTAURANT);
        let spots = concat_list(&matched);
        Reply::Ask(format!(
            "{} {which}",
            fill(available, &[("food", food.as_str()), ("spots", spots.as_str())])
        ))
    }

    fn browse_by_cuisine(&mut self) -> Reply {
        if let Some(food_spot) = self.session.order.food_spot.clone() {
            debug!(%food_spot, "food spot already chosen");
            self.session.query.food.clear();
            return self.after_fold(&food_spot);
        }

        let Some(cuisine) = self.slots.cuisine.clone() else {
            return Reply::Ask(self.pick(prompts::INVOCATION).to_string());
        };
        let matched = self.directory.spots_with_cuisine(&cuisine);
        info!(%cuisine, matches = matched.len(), "browsing by cuisine");

        if matched.is_empty() {
            let template = self.pick(prompts::NO_MATCHING_CUISINE);
            return Reply::Ask(fill(template, &[("cuisine", cuisine.as_str())]));
        }

        self.session.query.cuisine = Some(cuisine.clone());
        self.session.query.food.clear();
        self.remember_matches(&matched);

        let available = self.pick(prompts::AVAILABLE_CUISINE_SPOTS);
        let which = self.pick(prompts::WHICH_RESTAURANT);
        let spots = concat_list(&matched);
        Reply::Ask(format!(
            "{} {which}",
            fill(available, &[("cuisine", cuisine.as_str()), ("spots", spots.as_str())])
        ))
    }

    fn choose_food_spot(&mut self) -> Reply {
        if let Some(food_spot) = self.session.order.food_spot.clone() {
            debug!(%food_spot, "keeping previously chosen food spot");
            self.session.fold_query_into_order();
            return self.after_fold(&food_spot);
        }

        let input = self
            .slots
            .food_spot
            .clone()
            .or_else(|| self.session.query.food_spot.clone());
        let cuisine = self
            .slots
            .cuisine
            .clone()
            .or_else(|| self.session.query.cuisine.clone());

        // Only the spots offered last turn are acceptable, whatever the
        // directory holds.
        let matched = self.matched_spots();
        let chosen = input.as_deref().and_then(|input| {
            matched
                .iter()
                .find(|spot| same_text(spot, input))
                .cloned()
        });

        let Some(food_spot) = chosen else {
            return self.reject_food_spot(input, &matched);
        };

        info!(%food_spot, "food spot chosen");
        self.session.order.food_spot = Some(food_spot.clone());
        self.session.query.food_spot = Some(food_spot.clone());

        if let Some(cuisine) = cuisine {
            self.session.query.cuisine = Some(cuisine);
            if self.session.query.food.is_empty() {
                return self.order_from_food_spot();
            }
        }

        self.session.fold_query_into_order();
        self.after_fold(&food_spot)
    }

    fn reject_food_spot(&mut self, input: Option<String>, matched: &[String]) -> Reply {
        warn!(input = ?input, matched = ?matched, "chosen food spot was not offered");

        let mut params = Map::new();
        params.insert(
            BAD_INPUT_PARAM.to_string(),
            input.clone().map(Value::String).unwrap_or(Value::Null),
        );
        self.set_context(AgentContext::new(
            BAD_SPOT_CONTEXT,
            BAD_SPOT_CONTEXT_LIFESPAN,
            params,
        ));
        if !matched.is_empty() {
            self.remember_matches(matched);
        }

        let Some(input) = input else {
            return Reply::Ask(self.pick(prompts::WHICH_RESTAURANT).to_string());
        };
        if self.session.query.food.is_empty() {
            let template = self.pick(prompts::BAD_SPOT_UNLISTED);
            return Reply::Ask(fill(template, &[("spot", input.as_str())]));
        }
        let food = concat_list(&self.session.query.food);
        let template = self.pick(prompts::BAD_SPOT);
        Reply::Ask(fill(template, &[("food", food.as_str()), ("spot", input.as_str())]))
    }

    fn order_from_food_spot(&mut self) -> Reply {
        let food_spot = self.session.order.food_spot.clone().or_else(|| {
            self.slots
                .food_spot
                .as_deref()
                .and_then(|id| self.directory.find(id))
                .map(|spot| spot.id.clone())
        });

        let Some(food_spot) = food_spot else {
            return self.missing_food_spot();
        };
        if self.session.order.food_spot.is_none() {
            info!(%food_spot, "food spot chosen while ordering");
            self.session.order.food_spot = Some(food_spot.clone());
            self.session.query.food_spot = Some(food_spot.clone());
        }
        if let Some(cuisine) = self.slots.cuisine.clone() {
            self.session.query.cuisine = Some(cuisine);
        }

        if self.slots.food.is_empty() {
            return self.ask_what_to_order(&food_spot);
        }

        info!(%food_spot, items = ?self.slots.food, "adding items to order");
        self.session.query.food = self.slots.food.clone();
        self.session.fold_query_into_order();
        self.order_more(&food_spot)
    }

    fn confirm_order(&mut self) -> Reply {
        let Some(food_spot) = self.session.order.food_spot.clone() else {
            return self.missing_food_spot();
        };
        if self.session.order.items.is_empty() {
            return self.ask_what_to_order(&food_spot);
        }

        let items = concat_list(&self.session.order.items);
        let template = self.pick(prompts::CONFIRM_ORDER);
        Reply::Ask(fill(template, &[("items", items.as_str()), ("spot", food_spot.as_str())]))
    }

    fn order_ready(&mut self) -> Reply {
        let Some(food_spot) = self.session.order.food_spot.clone() else {
            return self.missing_food_spot();
        };
        if self.session.order.items.is_empty() {
            return self.ask_what_to_order(&food_spot);
        }

        let items = concat_list(&self.session.order.items);
        info!(%food_spot, %items, "order placed");
        let placed = self.pick(prompts::ORDER_PLACED);
        let again = self.pick(prompts::START_AGAIN);
        Reply::Ask(format!(
            "{} {again}",
            fill(placed, &[("items", items.as_str()), ("spot", food_spot.as_str())])
        ))
    }

    fn order_unready(&mut self) -> Reply {
        let Some(food_spot) = self.session.order.food_spot.clone() else {
            return self.missing_food_spot();
        };
        self.set_context(AgentContext::new(
            CHOSEN_FOOD_SPOT_FOLLOWUP_CONTEXT,
            1,
            Map::new(),
        ));
        self.ask_what_to_order(&food_spot)
    }

    fn after_fold(&mut self, food_spot: &str) -> Reply {
        if self.session.order.items.is_empty() {
            self.ask_what_to_order(food_spot)
        } else {
            self.order_more(food_spot)
        }
    }

    fn order_more(&mut self, food_spot: &str) -> Reply {
        let acknowledge = self.pick(prompts::ACKNOWLEDGE);
        let more = self.pick(prompts::ORDER_MORE);
        Reply::Ask(format!(
            "{acknowledge} {}",
            fill(more, &[("spot", food_spot)])
        ))
    }

    fn ask_what_to_order(&mut self, food_spot: &str) -> Reply {
        let template = self.pick(prompts::FOOD_SPOT_CHOSEN);
        Reply::Ask(fill(template, &[("spot", food_spot)]))
    }

    fn missing_food_spot(&mut self) -> Reply {
        warn!("order attempted before a food spot was chosen");
        Reply::Tell(self.pick(prompts::MISSING_FOOD_SPOT).to_string())
    }

    fn pick(&mut self, candidates: &[&'static str]) -> &'static str {
        pick_prompt(candidates, &mut self.session.last_prompt, &mut *self.rng)
    }

    fn matched_spots(&self) -> Vec<String> {
        self.contexts_in
            .iter()
            .find(|context| context.name == BROWSING_CONTEXT)
            .and_then(|context| context.parameters.get(MATCHED_SPOTS_PARAM))
            .and_then(Value::as_array)
            .map(|spots| {
                spots
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Re-emits the browsing context with the latest matches, keeping its
    /// lifespan and other parameters.
    fn remember_matches(&mut self, matched: &[String]) {
        let (lifespan, mut params) = self
            .contexts_in
            .iter()
            .find(|context| context.name == BROWSING_CONTEXT)
            .map(|context| {
                (
                    context.lifespan.unwrap_or(BROWSING_CONTEXT_LIFESPAN),
                    context.parameters.clone(),
                )
            })
            .unwrap_or((BROWSING_CONTEXT_LIFESPAN, Map::new()));

        params.insert(
            MATCHED_SPOTS_PARAM.to_string(),
            Value::Array(matched.iter().cloned().map(Value::String).collect()),
        );
        self.set_context(AgentContext::new(BROWSING_CONTEXT, lifespan, params));
    }

    fn set_context(&mut self, context: AgentContext) {
        self.contexts_out.retain(|existing| existing.name != context.name);
        self.contexts_out.push(context);
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
