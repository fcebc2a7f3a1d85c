//! Best-effort conversion of scraped text fragments into typed fields.
//!
//! Everything here is a pure function over strings and never fails; unrecognised input
//! degrades to the raw text or `None`.

mod ingredient;
mod numbers;

pub use ingredient::{looks_like_quantity, looks_like_unit, parse_ingredient_line, UNKNOWN_INGREDIENT};
pub use numbers::{parse_calories, parse_rating, parse_review_count, parse_servings};
