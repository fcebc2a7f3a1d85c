use crate::model::ParsedIngredient;

/// Item name used when an ingredient line is empty
pub const UNKNOWN_INGREDIENT: &str = "Unknown ingredient";

/// Trailing clauses at least this long are not treated as preparation notes
const MAX_NOTE_CHARS: usize = 50;

const VULGAR_FRACTIONS: &[(char, &str)] = &[
    ('½', "0.5"),
    ('¼', "0.25"),
    ('¾', "0.75"),
    ('⅓', "0.33"),
    ('⅔', "0.67"),
    ('⅛', "0.125"),
];

const UNITS: &[&str] = &[
    // Volume
    "cup", "cups", "c",
    "tablespoon", "tablespoons", "tbsp", "tbsps", "tbs",
    "teaspoon", "teaspoons", "tsp", "tsps",
    "liter", "liters", "litre", "litres", "l",
    "milliliter", "milliliters", "millilitre", "millilitres", "ml",
    "pint", "pints", "pt",
    "quart", "quarts", "qt",
    "gallon", "gallons", "gal",
    // Mass
    "pound", "pounds", "lb", "lbs",
    "ounce", "ounces", "oz",
    "gram", "grams", "g",
    "kilogram", "kilograms", "kg",
    // Length
    "inch", "inches", "in",
    // Count
    "clove", "cloves",
    "bunch", "bunches",
    "head", "heads",
    "piece", "pieces",
    "slice", "slices",
    "can", "cans",
    "jar", "jars",
    "bottle", "bottles",
    "package", "packages", "pkg", "pkgs",
    "bag", "bags",
];

fn strip_punctuation(token: &str) -> &str {
    token.trim_matches(|c| matches!(c, '.' | ',' | ';'))
}

fn normalize_fractions(token: &str) -> String {
    let mut normalized = String::with_capacity(token.len());
    for c in token.chars() {
        match VULGAR_FRACTIONS.iter().find(|(glyph, _)| *glyph == c) {
            Some((_, decimal)) => normalized.push_str(decimal),
            None => normalized.push(c),
        }
    }
    normalized
}

fn is_number(text: &str) -> bool {
    text.parse::<f64>().is_ok()
}

fn is_pair(text: &str, separator: char) -> bool {
    let mut parts = text.split(separator);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), None) => is_number(a) && is_number(b),
        _ => false,
    }
}

/// Whether `token` reads as an amount: a decimal, an `a/b` fraction or an `a-b` range.
///
/// Unicode vulgar fractions count as their decimal value and surrounding `. , ;` are
/// ignored, so `"2."`, `"½"` and `"1-2"` all qualify while `"1/a"` does not.
pub fn looks_like_quantity(token: &str) -> bool {
    let normalized = normalize_fractions(token);
    let candidate = strip_punctuation(&normalized);
    if candidate.is_empty() {
        return false;
    }

    is_number(candidate) || is_pair(candidate, '/') || is_pair(candidate, '-')
}

/// Whether `token` is a measurement unit, ignoring case and surrounding `. , ;`
pub fn looks_like_unit(token: &str) -> bool {
    let candidate = strip_punctuation(token).to_lowercase();
    UNITS.contains(&candidate.as_str())
}

fn is_fraction_token(token: &str) -> bool {
    let candidate = strip_punctuation(token);
    let mut chars = candidate.chars();
    let lone_glyph = matches!(
        (chars.next(), chars.next()),
        (Some(c), None) if VULGAR_FRACTIONS.iter().any(|(glyph, _)| *glyph == c)
    );
    lone_glyph || (candidate.contains('/') && looks_like_quantity(candidate))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split a parenthesised note out of `item`, returning (item without the span, note)
fn take_parenthetical(item: &str) -> Option<(String, Option<String>)> {
    let start = item.find('(')?;
    let end = start + item[start..].find(')')?;

    let note = item[start + 1..end].trim();
    let remaining = format!("{} {}", &item[..start], &item[end + 1..]);
    let note = (!note.is_empty()).then(|| note.to_string());
    Some((collapse_whitespace(&remaining), note))
}

/// Split a short trailing comma clause out of `item`; an empty clause yields no note
fn take_comma_clause(item: &str) -> Option<(String, Option<String>)> {
    let (head, tail) = item.split_once(',')?;
    let tail = tail.trim();
    if tail.chars().count() >= MAX_NOTE_CHARS {
        return None;
    }
    let note = (!tail.is_empty()).then(|| tail.to_string());
    Some((head.trim().to_string(), note))
}

/// Parse one scraped ingredient line.
///
/// A leading amount (optionally a mixed number such as `2 1/2`) and a unit are peeled
/// off the front; a parenthesised span, or failing that a short clause after the first
/// comma, becomes the preparation note. Never fails: unrecognised lines keep the whole
/// trimmed text as the item, and an empty line becomes [`UNKNOWN_INGREDIENT`].
pub fn parse_ingredient_line(text: &str) -> ParsedIngredient {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ParsedIngredient {
            quantity: None,
            unit: None,
            item: UNKNOWN_INGREDIENT.to_string(),
            preparation_note: None,
            raw_text: text.to_string(),
        };
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    let mut rest = tokens.as_slice();
    let mut quantity = None;
    let mut unit = None;

    if let Some((first, after)) = rest.split_first() {
        if looks_like_quantity(first) {
            let mut amount = strip_punctuation(first).to_string();
            rest = after;

            if let Some((next, after)) = rest.split_first() {
                if is_fraction_token(next) {
                    amount = format!("{} {}", amount, strip_punctuation(next));
                    rest = after;
                }
            }
            quantity = Some(amount);

            if let Some((next, after)) = rest.split_first() {
                if looks_like_unit(next) {
                    unit = Some(next.trim_end_matches([',', ';']).to_string());
                    rest = after;
                }
            }
        }
    }

    let mut item = if rest.is_empty() {
        trimmed.to_string()
    } else {
        rest.join(" ")
    };
    let mut preparation_note = None;

    if let Some((without_note, note)) = take_parenthetical(&item) {
        item = without_note;
        preparation_note = note;
    } else if let Some((head, note)) = take_comma_clause(&item) {
        item = head;
        preparation_note = note;
    }

    if item.is_empty() {
        item = trimmed.to_string();
    }

    ParsedIngredient {
        quantity,
        unit,
        item,
        preparation_note,
        raw_text: text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_numbers_are_quantities() {
        for token in ["2", "0.5", "10", "1.25", "-3", "2.", "2,", "3;", "100.0"] {
            assert!(looks_like_quantity(token), "{token} should be a quantity");
        }
    }

    #[test]
    fn test_fractions_and_ranges() {
        assert!(looks_like_quantity("1/2"));
        assert!(looks_like_quantity("2-3"));
        assert!(looks_like_quantity("½"));
        assert!(looks_like_quantity("⅛"));
        assert!(looks_like_quantity("1½"));
        assert!(!looks_like_quantity("1/a"));
        assert!(!looks_like_quantity("2-a"));
        assert!(!looks_like_quantity("1/2/3"));
        assert!(!looks_like_quantity("flour"));
        assert!(!looks_like_quantity(""));
        assert!(!looks_like_quantity("..."));
    }

    #[test]
    fn test_any_float_spelling_is_a_quantity() {
        for token in ["nan", "inf", "1e400", "2e3"] {
            assert!(looks_like_quantity(token), "{token} should be a quantity");
        }
    }

    #[test]
    fn test_units_case_insensitive() {
        for token in ["cup", "Cups", "TBSP", "tsp.", "oz,", "Cloves", "pkg.", "ml", "bags"] {
            assert!(looks_like_unit(token), "{token} should be a unit");
        }
        assert!(!looks_like_unit("flour"));
        assert!(!looks_like_unit("large"));
    }

    #[test]
    fn test_mixed_number_with_comma_note() {
        let parsed = parse_ingredient_line("2 1/2 cups flour, sifted");
        assert_eq!(parsed.quantity.as_deref(), Some("2 1/2"));
        assert_eq!(parsed.unit.as_deref(), Some("cups"));
        assert_eq!(parsed.item, "flour");
        assert_eq!(parsed.preparation_note.as_deref(), Some("sifted"));
        assert_eq!(parsed.raw_text, "2 1/2 cups flour, sifted");
    }

    #[test]
    fn test_parenthetical_note_wins_over_comma() {
        let parsed = parse_ingredient_line("2 cups flour (sifted)");
        assert_eq!(parsed.quantity.as_deref(), Some("2"));
        assert_eq!(parsed.item, "flour");
        assert_eq!(parsed.preparation_note.as_deref(), Some("sifted"));

        let parsed = parse_ingredient_line("1 onion (finely chopped), about 200 grams");
        assert_eq!(parsed.preparation_note.as_deref(), Some("finely chopped"));
        assert_eq!(parsed.item, "onion , about 200 grams");
    }

    #[test]
    fn test_trailing_comma_is_dropped_from_item() {
        let parsed = parse_ingredient_line("2 cups flour,");
        assert_eq!(parsed.quantity.as_deref(), Some("2"));
        assert_eq!(parsed.unit.as_deref(), Some("cups"));
        assert_eq!(parsed.item, "flour");
        assert_eq!(parsed.preparation_note, None);
    }

    #[test]
    fn test_long_comma_clause_is_kept_in_item() {
        let line = "salt, plus more to taste and for the pasta water if you like it salty";
        let parsed = parse_ingredient_line(line);
        assert_eq!(parsed.item, line);
        assert!(parsed.preparation_note.is_none());
    }

    #[test]
    fn test_unrecognised_line_falls_back_to_text() {
        let parsed = parse_ingredient_line("  Salt and pepper  ");
        assert_eq!(parsed.item, "Salt and pepper");
        assert!(parsed.quantity.is_none());
        assert!(parsed.unit.is_none());
        assert!(parsed.preparation_note.is_none());
    }

    #[test]
    fn test_empty_line_is_unknown_ingredient() {
        assert_eq!(parse_ingredient_line("").item, UNKNOWN_INGREDIENT);
        assert_eq!(parse_ingredient_line("   ").item, UNKNOWN_INGREDIENT);
    }

    #[test]
    fn test_quantity_only_line_keeps_text() {
        let parsed = parse_ingredient_line("2");
        assert_eq!(parsed.quantity.as_deref(), Some("2"));
        assert_eq!(parsed.item, "2");

        let parsed = parse_ingredient_line("3 cups");
        assert_eq!(parsed.unit.as_deref(), Some("cups"));
        assert_eq!(parsed.item, "3 cups");
    }

    #[test]
    fn test_punctuated_quantity_and_glyph() {
        let parsed = parse_ingredient_line("2. eggs");
        assert_eq!(parsed.quantity.as_deref(), Some("2"));
        assert_eq!(parsed.item, "eggs");

        let parsed = parse_ingredient_line("1 ½ tsp. Kosher salt");
        assert_eq!(parsed.quantity.as_deref(), Some("1 ½"));
        assert_eq!(parsed.unit.as_deref(), Some("tsp."));
        assert_eq!(parsed.item, "Kosher salt");
    }

    #[test]
    fn test_range_and_count_unit() {
        let parsed = parse_ingredient_line("2-3 cloves garlic, minced");
        assert_eq!(parsed.quantity.as_deref(), Some("2-3"));
        assert_eq!(parsed.unit.as_deref(), Some("cloves"));
        assert_eq!(parsed.item, "garlic");
        assert_eq!(parsed.preparation_note.as_deref(), Some("minced"));
    }

    #[test]
    fn test_empty_parentheses_give_no_note() {
        let parsed = parse_ingredient_line("1 cup rice ()");
        assert_eq!(parsed.item, "rice");
        assert!(parsed.preparation_note.is_none());
    }

    #[test]
    fn test_item_never_empty() {
        for line in ["(chopped)", ", sifted", "2 cups (sifted)", "1 (2)", "()", ",", "½"] {
            let parsed = parse_ingredient_line(line);
            assert!(!parsed.item.is_empty(), "empty item for {line:?}");
        }
    }
}
