use rand::{seq::SliceRandom, Rng};

pub const NO_INPUT: &[&str] = &[
    "I didn't catch that. Could you please repeat?",
    "Hey, you there?",
    "Okay well let me know when you want some food. Talk to you soon!",
];

pub const GREETING: &[&str] =
    &["Welcome to Foodrun, your personal waiter for takeaways and deliveries!"];

pub const INVOCATION: &[&str] = &[
    "What would you like to eat?",
    "What would you like to order?",
    "What do you feel like eating?",
];

pub const QUIT: &[&str] = &[
    "Ok, let me know when you get hungry. Bye!",
    "Ok, bye",
    "Ok, see you soon!",
];

pub const ACKNOWLEDGE: &[&str] = &["Great!", "Awesome.", "Yummy!", "Sure.", "Okay."];

pub const AVAILABLE_FOOD_SPOTS: &[&str] = &[
    "These places sell {food}: {spots}.",
    "I know these places sell {food}: {spots}.",
];

pub const AVAILABLE_CUISINE_SPOTS: &[&str] = &[
    "These places sell {cuisine} cuisine: {spots}.",
    "Coming right up! Cuisine a la {cuisine} by {spots}.",
];

pub const WHICH_RESTAURANT: &[&str] = &["Which one shall we order from?"];

pub const FOOD_SPOT_CHOSEN: &[&str] = &[
    "What would you like from {spot}?",
    "What would you like to order from {spot}?",
    "What did you have in mind from {spot}?",
];

pub const ORDER_MORE: &[&str] = &[
    "Anything else from {spot}?",
    "Would you like anything else from {spot}?",
    "Anything else to order from {spot}?",
];

pub const CONFIRM_ORDER: &[&str] = &[
    "Okay so that's {items} from {spot}. Shall I go ahead and order?",
    "So that's {items} to order from {spot}. Shall I order?",
    "Sweet. The order is {items} from {spot}. Shall I place the order?",
];

pub const ORDER_PLACED: &[&str] = &[
    "Order placed: {items} from {spot}.",
    "Awesome! Your {items} from {spot} is on its way.",
    "Your order of {items} from {spot} has been placed.",
];

pub const START_AGAIN: &[&str] = &[
    "Want to order again?",
    "Another order?",
    "Shall I order from another restaurant?",
];

pub const NO_MATCHING_FOOD: &[&str] =
    &["Hmmmm I couldn't find any restaurants that sell {food}. Let's try a different choice?"];

pub const NO_MATCHING_CUISINE: &[&str] = &[
    "Hmmmm I couldn't find any restaurants that have {cuisine} cuisine. Let's try a different choice?",
];

pub const BAD_SPOT: &[&str] =
    &["Hmmm don't think they serve {food}. Do you want something else from {spot} instead?"];

pub const BAD_SPOT_UNLISTED: &[&str] =
    &["Hmmm {spot} isn't one of the places I found. Which one shall we order from?"];

pub const MISSING_FOOD_SPOT: &[&str] =
    &["You haven't picked a restaurant yet. Start a new order to choose one."];

/// Picks a prompt uniformly at random, skipping `last_prompt` so the same
/// line is never used twice in a row. Single-entry lists are returned as-is.
/// The pick becomes the new `last_prompt`.
pub fn pick_prompt<R: Rng + ?Sized>(
    candidates: &[&'static str],
    last_prompt: &mut Option<String>,
    rng: &mut R,
) -> &'static str {
    let prompt = match candidates {
        [] => "",
        [only] => *only,
        _ => {
            let fresh: Vec<&'static str> = candidates
                .iter()
                .copied()
                .filter(|candidate| last_prompt.as_deref() != Some(*candidate))
                .collect();
            let pool = if fresh.is_empty() { candidates } else { &fresh[..] };
            pool.choose(rng).copied().unwrap_or_default()
        }
    };
    *last_prompt = Some(prompt.to_string());
    prompt
}
