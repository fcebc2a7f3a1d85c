use serde::Serialize;
use url::Url;

/// A recipe site the extractor knows how to read
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupportedSite {
    pub domain: &'static str,
    pub name: &'static str,
    #[serde(skip)]
    pub path_prefix: &'static str,
    pub format: &'static str,
    pub requires_subscription: bool,
}

pub const NYT_COOKING: SupportedSite = SupportedSite {
    domain: "cooking.nytimes.com",
    name: "NYT Cooking",
    path_prefix: "/recipes/",
    format: "https://cooking.nytimes.com/recipes/{recipe-id}-{recipe-name}",
    requires_subscription: true,
};

pub const SUPPORTED_SITES: &[SupportedSite] = &[NYT_COOKING];

impl SupportedSite {
    /// Origin and path prefix check done before any quota is touched
    pub fn matches(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(parsed) => {
                parsed.scheme() == "https"
                    && parsed.host_str() == Some(self.domain)
                    && parsed.path().starts_with(self.path_prefix)
            }
            Err(_) => false,
        }
    }
}

/// Result of [`validate_url`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlValidation {
    pub valid: bool,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_subscription: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub supported_sites: Vec<String>,
}

impl UrlValidation {
    fn invalid(url: &str, reason: &str) -> Self {
        Self {
            valid: false,
            url: url.to_string(),
            reason: Some(reason.to_string()),
            site: None,
            recipe_id: None,
            expected_format: None,
            requires_subscription: None,
            supported_sites: Vec::new(),
        }
    }

    fn invalid_for(url: &str, site: &SupportedSite, reason: &str, expected: &str) -> Self {
        Self {
            site: Some(site.name.to_string()),
            expected_format: Some(expected.to_string()),
            ..Self::invalid(url, reason)
        }
    }
}

/// Check whether `url` is a recipe page of a supported site and pull out its recipe id
pub fn validate_url(url: &str) -> UrlValidation {
    let parsed = Url::parse(url).ok();
    let site = parsed
        .as_ref()
        .and_then(|u| u.host_str())
        .and_then(|host| SUPPORTED_SITES.iter().find(|site| site.domain == host));

    let (parsed, site) = match (parsed, site) {
        (Some(parsed), Some(site)) => (parsed, site),
        _ => {
            return UrlValidation {
                supported_sites: SUPPORTED_SITES.iter().map(|s| s.domain.to_string()).collect(),
                ..UrlValidation::invalid(url, "Unsupported recipe site")
            }
        }
    };

    if !site.matches(url) {
        return UrlValidation::invalid_for(url, site, "Not a NYT Cooking recipe URL", site.format);
    }

    let recipe_part = parsed
        .path()
        .strip_prefix(site.path_prefix)
        .and_then(|rest| rest.split('/').next())
        .unwrap_or_default();

    if recipe_part.is_empty() {
        return UrlValidation::invalid_for(url, site, "Invalid URL format", site.format);
    }

    let recipe_id = match recipe_part.split_once('-') {
        Some((id, _)) => id,
        None => {
            return UrlValidation::invalid_for(
                url,
                site,
                "Invalid recipe identifier format",
                "Recipe ID should contain numbers and recipe name",
            )
        }
    };

    UrlValidation {
        valid: true,
        url: url.to_string(),
        reason: None,
        site: Some(site.name.to_string()),
        recipe_id: Some(recipe_id.to_string()),
        expected_format: None,
        requires_subscription: Some(site.requires_subscription),
        supported_sites: Vec::new(),
    }
}
