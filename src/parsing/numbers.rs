/// Rating shown as `"4.5 out of 5"` or `"4"`: the first token as a number
pub fn parse_rating(text: &str) -> Option<f64> {
    text.split_whitespace()
        .next()
        .and_then(|token| token.parse::<f64>().ok())
        .filter(|rating| rating.is_finite())
}

/// Review count from text like `"1,234 reviews"`: all digits, concatenated
pub fn parse_review_count(text: &str) -> Option<u32> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Calories from text like `"350 kcal"`: the first token as an integer
pub fn parse_calories(text: &str) -> Option<u32> {
    text.split_whitespace()
        .next()
        .and_then(|token| token.trim_end_matches(',').parse().ok())
}

/// Serving count from a yield string: the first integer found
/// (`"Serves 4 to 6"` gives 4, `"8 servings"` gives 8)
pub fn parse_servings(text: &str) -> Option<u32> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok().filter(|count| *count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rating() {
        assert_eq!(parse_rating("4.5 out of 5"), Some(4.5));
        assert_eq!(parse_rating("5"), Some(5.0));
        assert_eq!(parse_rating("no ratings yet"), None);
        assert_eq!(parse_rating(""), None);
    }

    #[test]
    fn test_parse_review_count() {
        assert_eq!(parse_review_count("1,234 reviews"), Some(1234));
        assert_eq!(parse_review_count("(87)"), Some(87));
        assert_eq!(parse_review_count("no reviews"), None);
    }

    #[test]
    fn test_parse_calories() {
        assert_eq!(parse_calories("350 kcal"), Some(350));
        assert_eq!(parse_calories("about 350"), None);
    }

    #[test]
    fn test_parse_servings() {
        assert_eq!(parse_servings("Serves 4 to 6"), Some(4));
        assert_eq!(parse_servings("8 servings"), Some(8));
        assert_eq!(parse_servings("12"), Some(12));
        assert_eq!(parse_servings("One loaf"), None);
        assert_eq!(parse_servings("0 servings"), None);
    }
}
