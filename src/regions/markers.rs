use log::debug;
use scraper::{ElementRef, Html, Selector};

use super::{element_text, non_empty, selector};
use crate::error::ExtractError;
use crate::model::{NutritionInfo, Timing};
use crate::parsing::{parse_calories, parse_rating, parse_review_count};

/// Compiled selectors for the structural markers of a recipe page
pub struct PageMarkers {
    title: Selector,
    author: Selector,
    description: Selector,
    timing_item: Selector,
    term: Selector,
    definition: Selector,
    servings: Selector,
    ingredient: Selector,
    instruction: Selector,
    tag: Selector,
    nutrition_item: Selector,
    nutrition_label: Selector,
    nutrition_value: Selector,
    rating: Selector,
    review_count: Selector,
    pub(crate) linked_data: Selector,
}

impl PageMarkers {
    pub fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            title: selector(r#"h1[data-testid="recipe-title"]"#)?,
            author: selector(r#"[data-testid="recipe-author"]"#)?,
            description: selector(r#"[data-testid="recipe-summary"]"#)?,
            timing_item: selector(r#"section[data-testid="recipe-timing"] .recipe-time-item"#)?,
            term: selector("dt")?,
            definition: selector("dd")?,
            servings: selector(r#"[data-testid="recipe-servings"]"#)?,
            ingredient: selector(r#"[data-testid="recipe-ingredient"]"#)?,
            instruction: selector(r#"[data-testid="recipe-instruction"]"#)?,
            tag: selector("a.tag-link")?,
            nutrition_item: selector(r#"section[data-testid="nutrition-summary"] .nutrition-item"#)?,
            nutrition_label: selector(".nutrition-label")?,
            nutrition_value: selector(".nutrition-value")?,
            rating: selector(r#"[data-testid="recipe-rating"]"#)?,
            review_count: selector(r#"[data-testid="recipe-review-count"]"#)?,
            linked_data: selector(r#"script[type="application/ld+json"]"#)?,
        })
    }

    fn first_text(&self, document: &Html, selector: &Selector) -> Option<String> {
        document
            .select(selector)
            .map(element_text)
            .find(|text| !text.is_empty())
    }

    fn all_texts(&self, document: &Html, selector: &Selector) -> Option<Vec<String>> {
        let texts: Vec<String> = document
            .select(selector)
            .map(element_text)
            .filter(|text| !text.is_empty())
            .collect();
        (!texts.is_empty()).then_some(texts)
    }

    /// `dt`/`dd` style label and value inside one item, with alternate selectors
    fn label_value(
        &self,
        item: ElementRef,
        alt_label: Option<&Selector>,
        alt_value: Option<&Selector>,
    ) -> Option<(String, String)> {
        let pick = |primary: &Selector, alternate: Option<&Selector>| {
            item.select(primary)
                .next()
                .or_else(|| alternate.and_then(|alt| item.select(alt).next()))
                .map(element_text)
                .and_then(non_empty)
        };
        let label = pick(&self.term, alt_label)?;
        let value = pick(&self.definition, alt_value)?;
        Some((label.to_lowercase(), value))
    }

    pub fn title(&self, document: &Html) -> Option<String> {
        self.first_text(document, &self.title)
    }

    pub fn author(&self, document: &Html) -> Option<String> {
        self.first_text(document, &self.author)
    }

    pub fn description(&self, document: &Html) -> Option<String> {
        self.first_text(document, &self.description)
    }

    pub fn timing(&self, document: &Html) -> Option<Timing> {
        let mut timing = Timing::default();
        for item in document.select(&self.timing_item) {
            let Some((label, value)) = self.label_value(item, None, None) else {
                continue;
            };
            if label.contains("prep") {
                timing.prep = Some(value);
            } else if label.contains("cook") {
                timing.cook = Some(value);
            } else if label.contains("total") {
                timing.total = Some(value);
            } else {
                debug!("Ignoring timing entry {:?}", label);
            }
        }
        (!timing.is_empty()).then_some(timing)
    }

    pub fn servings(&self, document: &Html) -> Option<String> {
        self.first_text(document, &self.servings)
    }

    pub fn ingredient_lines(&self, document: &Html) -> Option<Vec<String>> {
        self.all_texts(document, &self.ingredient)
    }

    pub fn instructions(&self, document: &Html) -> Option<Vec<String>> {
        self.all_texts(document, &self.instruction)
    }

    pub fn tags(&self, document: &Html) -> Option<Vec<String>> {
        self.all_texts(document, &self.tag)
    }

    pub fn nutrition(&self, document: &Html) -> Option<NutritionInfo> {
        let mut nutrition = NutritionInfo::default();
        for item in document.select(&self.nutrition_item) {
            let Some((label, value)) =
                self.label_value(item, Some(&self.nutrition_label), Some(&self.nutrition_value))
            else {
                continue;
            };

            if label.contains("calories") {
                nutrition.calories = parse_calories(&value);
            } else if label.contains("protein") {
                nutrition.protein = Some(value);
            } else if label.contains("carb") {
                nutrition.carbohydrates = Some(value);
            } else if label.contains("fat") {
                nutrition.fat = Some(value);
            } else if label.contains("fiber") {
                nutrition.fiber = Some(value);
            } else if label.contains("sugar") {
                nutrition.sugar = Some(value);
            } else if label.contains("sodium") {
                nutrition.sodium = Some(value);
            }
        }
        (!nutrition.is_empty()).then_some(nutrition)
    }

    pub fn rating(&self, document: &Html) -> Option<f64> {
        self.first_text(document, &self.rating)
            .as_deref()
            .and_then(parse_rating)
    }

    pub fn review_count(&self, document: &Html) -> Option<u32> {
        self.first_text(document, &self.review_count)
            .as_deref()
            .and_then(parse_review_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
            <h1 data-testid="recipe-title">  Sheet-Pan
                Chicken </h1>
            <span data-testid="recipe-author">Melissa Clark</span>
            <div data-testid="recipe-summary">Crisp skin, little effort.</div>
            <section data-testid="recipe-timing">
                <div class="recipe-time-item"><dt>Prep Time</dt><dd>15 minutes</dd></div>
                <div class="recipe-time-item"><dt>Total Time</dt><dd>1 hour</dd></div>
                <div class="recipe-time-item"><dt>Rest</dt><dd>10 minutes</dd></div>
            </section>
            <span data-testid="recipe-servings">4 servings</span>
            <ul>
                <li data-testid="recipe-ingredient"><span>2</span> pounds chicken thighs</li>
                <li data-testid="recipe-ingredient">   </li>
                <li data-testid="recipe-ingredient">1 lemon, sliced</li>
            </ul>
            <ol>
                <li data-testid="recipe-instruction">Heat oven to 425 degrees.</li>
                <li data-testid="recipe-instruction">Roast until golden.</li>
            </ol>
            <a class="tag-link" href="/tag/easy">Easy</a>
            <a class="tag-link" href="/tag/chicken">Chicken</a>
            <section data-testid="nutrition-summary">
                <div class="nutrition-item"><dt>Calories</dt><dd>520 kcal</dd></div>
                <div class="nutrition-item"><span class="nutrition-label">Protein</span><span class="nutrition-value">38 grams</span></div>
                <div class="nutrition-item"><dt>Sodium</dt></div>
            </section>
            <span data-testid="recipe-rating">4.5 stars</span>
            <span data-testid="recipe-review-count">1,204 ratings</span>
        </body></html>
    "#;

    #[test]
    fn test_reads_every_region() {
        let markers = PageMarkers::new().unwrap();
        let document = Html::parse_document(PAGE);

        assert_eq!(markers.title(&document).as_deref(), Some("Sheet-Pan Chicken"));
        assert_eq!(markers.author(&document).as_deref(), Some("Melissa Clark"));
        assert_eq!(
            markers.description(&document).as_deref(),
            Some("Crisp skin, little effort.")
        );

        let timing = markers.timing(&document).unwrap();
        assert_eq!(timing.prep.as_deref(), Some("15 minutes"));
        assert_eq!(timing.cook, None);
        assert_eq!(timing.total.as_deref(), Some("1 hour"));

        assert_eq!(markers.servings(&document).as_deref(), Some("4 servings"));
        assert_eq!(
            markers.ingredient_lines(&document).unwrap(),
            vec!["2 pounds chicken thighs", "1 lemon, sliced"]
        );
        assert_eq!(markers.instructions(&document).unwrap().len(), 2);
        assert_eq!(markers.tags(&document).unwrap(), vec!["Easy", "Chicken"]);

        let nutrition = markers.nutrition(&document).unwrap();
        assert_eq!(nutrition.calories, Some(520));
        assert_eq!(nutrition.protein.as_deref(), Some("38 grams"));
        assert_eq!(nutrition.sodium, None);

        assert_eq!(markers.rating(&document), Some(4.5));
        assert_eq!(markers.review_count(&document), Some(1204));
    }

    #[test]
    fn test_missing_regions_are_none() {
        let markers = PageMarkers::new().unwrap();
        let document = Html::parse_document("<html><body><h2>Nothing here</h2></body></html>");

        assert!(markers.title(&document).is_none());
        assert!(markers.timing(&document).is_none());
        assert!(markers.ingredient_lines(&document).is_none());
        assert!(markers.instructions(&document).is_none());
        assert!(markers.tags(&document).is_none());
        assert!(markers.nutrition(&document).is_none());
        assert!(markers.rating(&document).is_none());
        assert!(markers.review_count(&document).is_none());
    }
}
