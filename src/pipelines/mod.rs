pub mod extract;

pub use extract::{ExtractOptions, RecipeExtractor};
