use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::compliance::ComplianceDecision;
use crate::error::{ErrorKind, ExtractError};

/// One ingredient line split into its parts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedIngredient {
    pub quantity: Option<String>,
    pub unit: Option<String>,
    pub item: String,
    pub preparation_note: Option<String>,
    /// The line exactly as scraped
    pub raw_text: String,
}

/// Nutrition facts as published; only calories are numeric
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NutritionInfo {
    pub calories: Option<u32>,
    pub protein: Option<String>,
    pub carbohydrates: Option<String>,
    pub fat: Option<String>,
    pub fiber: Option<String>,
    pub sugar: Option<String>,
    pub sodium: Option<String>,
}

impl NutritionInfo {
    pub fn is_empty(&self) -> bool {
        *self == NutritionInfo::default()
    }
}

/// Free-text timing fields, not normalized to durations
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Timing {
    pub prep: Option<String>,
    pub cook: Option<String>,
    pub total: Option<String>,
}

impl Timing {
    pub fn is_empty(&self) -> bool {
        self.prep.is_none() && self.cook.is_none() && self.total.is_none()
    }
}

/// Fields collected while reading a page, before they are frozen into a [`RecipeRecord`]
#[derive(Debug, Clone, Default)]
pub struct RecipeDraft {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub timing: Timing,
    pub yield_text: Option<String>,
    pub ingredients: Vec<ParsedIngredient>,
    pub instructions: Vec<String>,
    pub tags: Vec<String>,
    pub nutrition: Option<NutritionInfo>,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
}

impl RecipeDraft {
    /// Add a tag unless an equal one (ignoring case) is already present
    pub fn add_tag(&mut self, tag: &str) {
        let tag = tag.trim();
        if tag.is_empty() || self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            return;
        }
        self.tags.push(tag.to_string());
    }

    /// Names of mandatory regions that are still missing
    pub fn missing_regions(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
            missing.push("title");
        }
        if self.ingredients.is_empty() {
            missing.push("ingredients");
        }
        if self.instructions.is_empty() {
            missing.push("instructions");
        }
        missing
    }

    /// Freeze the draft; fails when title, ingredients or instructions are absent
    pub fn freeze(
        self,
        source_url: &str,
        compliance: ComplianceDecision,
        extracted_at: DateTime<Utc>,
    ) -> Result<RecipeRecord, ExtractError> {
        let missing = self.missing_regions();
        let title = match self.title {
            Some(title) if missing.is_empty() => title,
            _ => return Err(ExtractError::MissingRegions(missing)),
        };
        let servings = self.yield_text.as_deref().and_then(crate::parsing::parse_servings);

        Ok(RecipeRecord {
            title,
            source_url: source_url.to_string(),
            author: self.author,
            description: self.description,
            ingredients: self.ingredients,
            instructions: self.instructions,
            timing: self.timing,
            servings,
            yield_text: self.yield_text,
            nutrition: self.nutrition.filter(|n| !n.is_empty()),
            tags: self.tags,
            rating: self.rating,
            review_count: self.review_count,
            extracted_at,
            compliance,
        })
    }
}

/// A fully extracted recipe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeRecord {
    pub title: String,
    pub source_url: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub ingredients: Vec<ParsedIngredient>,
    pub instructions: Vec<String>,
    pub timing: Timing,
    pub servings: Option<u32>,
    /// Servings text as published, e.g. "4 to 6 servings"
    pub yield_text: Option<String>,
    pub nutrition: Option<NutritionInfo>,
    pub tags: Vec<String>,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    pub extracted_at: DateTime<Utc>,
    pub compliance: ComplianceDecision,
}

/// A recipe rendered as a plain note (title, body and labels)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeepNote {
    pub title: String,
    pub content: String,
    pub labels: Vec<String>,
}

impl RecipeRecord {
    pub fn to_keep_note(&self) -> KeepNote {
        let ingredients = self
            .ingredients
            .iter()
            .map(|ingredient| format!("• {}", ingredient.raw_text.trim()))
            .collect::<Vec<_>>()
            .join("\n");
        let instructions = self
            .instructions
            .iter()
            .enumerate()
            .map(|(i, step)| format!("{}. {}", i + 1, step))
            .collect::<Vec<_>>()
            .join("\n");

        let mut content = format!(
            "**{}**\n\n**Ingredients:**\n{}\n\n**Instructions:**\n{}",
            self.title, ingredients, instructions
        );

        let mut times = Vec::new();
        if let Some(prep) = &self.timing.prep {
            times.push(format!("Prep: {prep}"));
        }
        if let Some(cook) = &self.timing.cook {
            times.push(format!("Cook: {cook}"));
        }
        if !times.is_empty() {
            content.push_str(&format!("\n\n**Time:** {}", times.join(" | ")));
        }

        if let Some(servings) = &self.yield_text {
            content.push_str(&format!("\n**Servings:** {servings}"));
        }

        content.push_str(&format!("\n\n**Source:** {}", self.source_url));

        let mut labels = vec!["recipe".to_string()];
        labels.extend(self.tags.iter().cloned());

        KeepNote {
            title: format!("Recipe: {}", self.title),
            content,
            labels,
        }
    }
}

/// Success or failure of one extraction call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Success { recipe: Box<RecipeRecord> },
    Failure { reason: String, kind: ErrorKind },
}

/// What an extraction call returns, successful or not
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionOutcome {
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Optional regions that could not be read
    pub warnings: Vec<String>,
    #[serde(rename = "extraction_time", serialize_with = "serialize_seconds")]
    pub elapsed: Duration,
    /// The gate decision taken before rendering; absent when the URL was rejected first
    pub compliance: Option<ComplianceDecision>,
}

impl ExtractionOutcome {
    pub fn success(
        recipe: RecipeRecord,
        warnings: Vec<String>,
        elapsed: Duration,
        compliance: ComplianceDecision,
    ) -> Self {
        Self {
            outcome: Outcome::Success {
                recipe: Box::new(recipe),
            },
            warnings,
            elapsed,
            compliance: Some(compliance),
        }
    }

    pub fn failure(
        error: &ExtractError,
        warnings: Vec<String>,
        elapsed: Duration,
        compliance: Option<ComplianceDecision>,
    ) -> Self {
        Self {
            outcome: Outcome::Failure {
                reason: error.to_string(),
                kind: error.kind(),
            },
            warnings,
            elapsed,
            compliance,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }

    pub fn recipe(&self) -> Option<&RecipeRecord> {
        match &self.outcome {
            Outcome::Success { recipe } => Some(recipe.as_ref()),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success { .. } => None,
            Outcome::Failure { reason, .. } => Some(reason),
        }
    }

    pub fn failure_kind(&self) -> Option<ErrorKind> {
        match &self.outcome {
            Outcome::Success { .. } => None,
            Outcome::Failure { kind, .. } => Some(*kind),
        }
    }
}

fn serialize_seconds<S: serde::Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::{ComplianceGate, ComplianceLimits};
    use crate::parsing::parse_ingredient_line;

    fn decision() -> ComplianceDecision {
        ComplianceGate::with_session_id(ComplianceLimits::default(), "s").check(Utc::now())
    }

    fn complete_draft() -> RecipeDraft {
        RecipeDraft {
            title: Some("Weeknight Dal".to_string()),
            ingredients: vec![parse_ingredient_line("1 cup red lentils, rinsed")],
            instructions: vec!["Simmer the lentils.".to_string()],
            yield_text: Some("4 servings".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_freeze_complete_draft() {
        let record = complete_draft()
            .freeze("https://cooking.nytimes.com/recipes/1-dal", decision(), Utc::now())
            .unwrap();
        assert_eq!(record.title, "Weeknight Dal");
        assert_eq!(record.servings, Some(4));
        assert!(record.nutrition.is_none());
    }

    #[test]
    fn test_freeze_reports_every_missing_region() {
        let draft = RecipeDraft {
            title: Some("   ".to_string()),
            ..Default::default()
        };
        let err = draft.freeze("u", decision(), Utc::now()).unwrap_err();
        match err {
            ExtractError::MissingRegions(missing) => {
                assert_eq!(missing, vec!["title", "ingredients", "instructions"])
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_empty_nutrition_is_dropped() {
        let draft = RecipeDraft {
            nutrition: Some(NutritionInfo::default()),
            ..complete_draft()
        };
        let record = draft.freeze("u", decision(), Utc::now()).unwrap();
        assert!(record.nutrition.is_none());
    }

    #[test]
    fn test_add_tag_dedupes() {
        let mut draft = RecipeDraft::default();
        draft.add_tag("Vegetarian");
        draft.add_tag("vegetarian");
        draft.add_tag(" ");
        draft.add_tag("Quick");
        assert_eq!(draft.tags, vec!["Vegetarian", "Quick"]);
    }

    #[test]
    fn test_keep_note_format() {
        let mut draft = complete_draft();
        draft.timing.prep = Some("10 minutes".to_string());
        draft.add_tag("Indian");
        let record = draft
            .freeze("https://cooking.nytimes.com/recipes/1-dal", decision(), Utc::now())
            .unwrap();

        let note = record.to_keep_note();
        assert_eq!(note.title, "Recipe: Weeknight Dal");
        assert_eq!(note.labels, vec!["recipe", "Indian"]);
        assert!(note.content.contains("• 1 cup red lentils, rinsed"));
        assert!(note.content.contains("1. Simmer the lentils."));
        assert!(note.content.contains("**Time:** Prep: 10 minutes"));
        assert!(note.content.contains("**Servings:** 4 servings"));
        assert!(note
            .content
            .ends_with("**Source:** https://cooking.nytimes.com/recipes/1-dal"));
    }

    #[test]
    fn test_failure_outcome_serializes() {
        let outcome = ExtractionOutcome::failure(
            &ExtractError::InvalidUrl("https://example.com".to_string()),
            Vec::new(),
            Duration::from_millis(1500),
            None,
        );
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["outcome"], "failure");
        assert_eq!(value["kind"], "invalid_input");
        assert_eq!(value["extraction_time"], 1.5);
        assert!(value["compliance"].is_null());
    }
}
