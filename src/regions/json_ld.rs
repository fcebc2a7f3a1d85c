use html_escape::decode_html_entities;
use log::debug;
use scraper::Html;
use serde::Deserialize;
use serde_json::Value;

use super::PageMarkers;
use crate::model::{NutritionInfo, Timing};
use crate::parsing::{parse_calories, parse_rating, parse_review_count};

/// Recipe regions recovered from a page's embedded schema.org JSON-LD
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LinkedRecipe {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub timing: Timing,
    pub yield_text: Option<String>,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub tags: Vec<String>,
    pub nutrition: Option<NutritionInfo>,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
}

impl LinkedRecipe {
    /// First Recipe object found in the page's `application/ld+json` scripts
    pub fn find(document: &Html, markers: &PageMarkers) -> Option<Self> {
        for (index, script) in document.select(&markers.linked_data).enumerate() {
            let raw_json = script.inner_html();
            let json_ld = match serde_json::from_str::<Value>(raw_json.trim()) {
                Ok(json_ld) => json_ld,
                Err(e) => {
                    debug!("Skipping JSON-LD script {}: {}", index, e);
                    continue;
                }
            };

            let Some(recipe_json) = find_recipe_node(&json_ld) else {
                debug!("No recipe in JSON-LD script {}", index);
                continue;
            };

            match serde_json::from_value::<JsonLdRecipe>(recipe_json.clone()) {
                Ok(recipe) => return Some(recipe.into()),
                Err(e) => debug!("Failed to read JSON-LD recipe {}: {}", index, e),
            }
        }
        None
    }
}

fn find_recipe_node(json_ld: &Value) -> Option<&Value> {
    if let Some(items) = json_ld.as_array() {
        return items.iter().find_map(find_recipe_node);
    }
    if is_recipe_type(json_ld) {
        return Some(json_ld);
    }
    json_ld
        .get("@graph")
        .and_then(Value::as_array)
        .and_then(|graph| graph.iter().find(|item| is_recipe_type(item)))
}

fn is_recipe_type(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(kind)) => kind.eq_ignore_ascii_case("recipe"),
        Some(Value::Array(kinds)) => kinds
            .iter()
            .filter_map(Value::as_str)
            .any(|kind| kind.eq_ignore_ascii_case("recipe")),
        _ => false,
    }
}

#[derive(Debug, Deserialize)]
struct JsonLdRecipe {
    name: Option<String>,
    description: Option<DescriptionType>,
    author: Option<Author>,
    #[serde(rename = "recipeIngredient")]
    recipe_ingredient: Option<StringOrList>,
    #[serde(rename = "recipeInstructions")]
    recipe_instructions: Option<RecipeInstructions>,
    #[serde(rename = "recipeYield")]
    recipe_yield: Option<RecipeYield>,
    #[serde(rename = "prepTime")]
    prep_time: Option<String>,
    #[serde(rename = "cookTime")]
    cook_time: Option<String>,
    #[serde(rename = "totalTime")]
    total_time: Option<String>,
    #[serde(rename = "recipeCategory")]
    recipe_category: Option<StringOrList>,
    #[serde(rename = "recipeCuisine")]
    recipe_cuisine: Option<StringOrList>,
    keywords: Option<StringOrList>,
    nutrition: Option<JsonLdNutrition>,
    #[serde(rename = "aggregateRating")]
    aggregate_rating: Option<AggregateRating>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringOrList {
    String(String),
    Multiple(Vec<String>),
}

impl StringOrList {
    fn into_vec(self) -> Vec<String> {
        match self {
            StringOrList::String(s) => vec![s],
            StringOrList::Multiple(v) => v,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

impl Scalar {
    fn text(&self) -> String {
        match self {
            Scalar::Text(s) => s.trim().to_string(),
            Scalar::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TextObject {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DescriptionType {
    String(String),
    Object(TextObject),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Author {
    String(String),
    Object(AuthorObject),
    Multiple(Vec<AuthorObject>),
}

#[derive(Debug, Deserialize)]
struct AuthorObject {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecipeYield {
    String(String),
    Number(i64),
    Array(Vec<Scalar>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecipeInstructions {
    String(String),
    Multiple(Vec<InstructionItem>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InstructionItem {
    Text(String),
    Node(InstructionNode),
}

/// HowToStep or HowToSection; sections carry their steps in `itemListElement`
#[derive(Debug, Deserialize)]
struct InstructionNode {
    text: Option<String>,
    name: Option<String>,
    #[serde(rename = "itemListElement", default)]
    item_list_element: Vec<InstructionItem>,
}

#[derive(Debug, Deserialize)]
struct JsonLdNutrition {
    calories: Option<Scalar>,
    #[serde(rename = "proteinContent")]
    protein: Option<Scalar>,
    #[serde(rename = "carbohydrateContent")]
    carbohydrates: Option<Scalar>,
    #[serde(rename = "fatContent")]
    fat: Option<Scalar>,
    #[serde(rename = "fiberContent")]
    fiber: Option<Scalar>,
    #[serde(rename = "sugarContent")]
    sugar: Option<Scalar>,
    #[serde(rename = "sodiumContent")]
    sodium: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
struct AggregateRating {
    #[serde(rename = "ratingValue")]
    rating_value: Option<Scalar>,
    #[serde(rename = "ratingCount")]
    rating_count: Option<Scalar>,
    #[serde(rename = "reviewCount")]
    review_count: Option<Scalar>,
}

impl From<JsonLdRecipe> for LinkedRecipe {
    fn from(recipe: JsonLdRecipe) -> Self {
        let author = recipe.author.and_then(|author| match author {
            Author::String(name) => Some(name),
            Author::Object(obj) => obj.name,
            Author::Multiple(authors) => {
                let names: Vec<String> = authors.into_iter().filter_map(|a| a.name).collect();
                (!names.is_empty()).then(|| names.join(", "))
            }
        });

        let description = recipe.description.map(|desc| match desc {
            DescriptionType::String(d) => d,
            DescriptionType::Object(d) => d.text,
        });

        let yield_text = recipe.recipe_yield.and_then(|yield_val| match yield_val {
            RecipeYield::String(s) => Some(s),
            RecipeYield::Number(n) => Some(n.to_string()),
            // prefer the descriptive entry ("4 servings") over a bare number
            RecipeYield::Array(values) => {
                let values: Vec<String> = values.iter().map(Scalar::text).collect();
                values
                    .iter()
                    .find(|s| s.contains(char::is_alphabetic))
                    .or_else(|| values.first())
                    .cloned()
            }
        });

        let mut instructions = Vec::new();
        match recipe.recipe_instructions {
            Some(RecipeInstructions::String(text)) => {
                instructions.extend(text.lines().map(str::to_string));
            }
            Some(RecipeInstructions::Multiple(items)) => flatten_steps(items, &mut instructions),
            None => {}
        }

        let mut tags = Vec::new();
        for list in [recipe.recipe_category, recipe.recipe_cuisine, recipe.keywords]
            .into_iter()
            .flatten()
        {
            for entry in list.into_vec() {
                tags.extend(entry.split(',').map(str::to_string));
            }
        }

        let nutrition = recipe.nutrition.map(|n| NutritionInfo {
            calories: n.calories.as_ref().and_then(|c| parse_calories(&c.text())),
            protein: n.protein.as_ref().map(Scalar::text),
            carbohydrates: n.carbohydrates.as_ref().map(Scalar::text),
            fat: n.fat.as_ref().map(Scalar::text),
            fiber: n.fiber.as_ref().map(Scalar::text),
            sugar: n.sugar.as_ref().map(Scalar::text),
            sodium: n.sodium.as_ref().map(Scalar::text),
        });

        let (rating, review_count) = match recipe.aggregate_rating {
            Some(aggregate) => (
                aggregate
                    .rating_value
                    .as_ref()
                    .and_then(|v| parse_rating(&v.text())),
                aggregate
                    .review_count
                    .or(aggregate.rating_count)
                    .as_ref()
                    .and_then(|v| parse_review_count(&v.text())),
            ),
            None => (None, None),
        };

        LinkedRecipe {
            title: clean(recipe.name),
            author: clean(author),
            description: clean(description),
            timing: Timing {
                prep: recipe.prep_time.as_deref().and_then(|d| clean(Some(humanize_duration(d)))),
                cook: recipe.cook_time.as_deref().and_then(|d| clean(Some(humanize_duration(d)))),
                total: recipe.total_time.as_deref().and_then(|d| clean(Some(humanize_duration(d)))),
            },
            yield_text: clean(yield_text),
            ingredients: clean_all(recipe.recipe_ingredient.map(StringOrList::into_vec).unwrap_or_default()),
            instructions: clean_all(instructions),
            tags: clean_all(tags),
            nutrition: nutrition.filter(|n| !n.is_empty()),
            rating,
            review_count,
        }
    }
}

fn flatten_steps(items: Vec<InstructionItem>, steps: &mut Vec<String>) {
    for item in items {
        match item {
            InstructionItem::Text(text) => steps.push(text),
            InstructionItem::Node(node) if !node.item_list_element.is_empty() => {
                flatten_steps(node.item_list_element, steps)
            }
            InstructionItem::Node(node) => {
                // prefer text over name
                if let Some(text) = node.text.or(node.name) {
                    steps.push(text);
                }
            }
        }
    }
}

fn decode_html_symbols(text: &str) -> String {
    // feeds sometimes double-encode entities (&amp;amp;)
    decode_html_entities(&decode_html_entities(text)).into_owned()
}

fn clean(text: Option<String>) -> Option<String> {
    let text = decode_html_symbols(text?.trim());
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

fn clean_all(texts: Vec<String>) -> Vec<String> {
    texts.into_iter().filter_map(|text| clean(Some(text))).collect()
}

/// ISO 8601 durations (`PT1H30M`, `P0DT45M`, `PT5400.0S`) as "1 hour 30 minutes".
/// Anything it cannot read is returned as-is.
fn humanize_duration(duration: &str) -> String {
    let Some(body) = duration
        .strip_prefix("PT")
        .or_else(|| duration.strip_prefix("P0DT"))
    else {
        return duration.to_string();
    };

    let mut minutes = 0.0;
    let mut number = String::new();
    for c in body.chars() {
        if c.is_ascii_digit() || c == '.' {
            number.push(c);
            continue;
        }
        let Ok(value) = number.parse::<f64>() else {
            return duration.to_string();
        };
        match c {
            'H' => minutes += value * 60.0,
            'M' => minutes += value,
            'S' => minutes += value / 60.0,
            _ => return duration.to_string(),
        }
        number.clear();
    }

    let total = minutes.round() as u64;
    if !number.is_empty() || total == 0 {
        return duration.to_string();
    }

    let plural = |n: u64, unit: &str| format!("{} {}{}", n, unit, if n == 1 { "" } else { "s" });
    match (total / 60, total % 60) {
        (0, m) => plural(m, "minute"),
        (h, 0) => plural(h, "hour"),
        (h, m) => format!("{} {}", plural(h, "hour"), plural(m, "minute")),
    }
}
