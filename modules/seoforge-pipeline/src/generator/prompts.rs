use std::path::Path;
use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use regex::{Captures, Regex};
use serde::Deserialize;

const TITLE_PROMPT: &str = r#"Write an SEO title for an article.

Use as many of these terms as read naturally, favouring higher percentages:
{terms}

Every one of these words must appear verbatim, as whole words:
{search_keyword_terms}

Return only the title text, at most 60 characters, with no quotes."#;

const DESCRIPTION_PROMPT: &str = r#"Write a meta description for an article.

Use as many of these terms as read naturally, favouring higher percentages:
{terms}

Every one of these words must appear verbatim, as whole words:
{search_keyword_terms}

Return only the description text, between 140 and 160 characters, with no quotes."#;

const ARTICLE_PROMPT: &str = r#"Write a long-form article in HTML.

The article must start with a single <h1> and be organised in <h2> sections
with <p>, <ul> and <li> content. Do not include <html>, <head> or <body> tags.

Terms to use in the <h1>:
{h1_terms}

Terms to use in <h2> headings:
{h2_terms}

Terms related to the title topic:
{title_terms}

Use each of these terms in the body roughly the given number of times:
{terms}

Return only the HTML."#;

const HEADINGS_PROMPT: &str = r#"Improve the <h1> and <h2> headings of the article below.

Use these terms where they fit:
{terms}

Every one of these words must appear verbatim, as whole words, in the <h1>:
{search_keyword_terms}

The article is published on {homepage}. Follow these rules when a heading
refers to the site:
{anchor_text_rules}

Preferred anchor texts:
{anchor_texts}

Keep exactly the same number of headings, in the same order and at the same
levels. Return only the rewritten heading elements, one per line, and no
other text.

Article:
{article}"#;

const TERMS_NOT_USED_PROMPT: &str = r#"Rewrite the article below so that it uses every one of these terms at
least once, as whole words, without changing its headings or structure:
{terms}

Article:
{article}

Return only the full HTML."#;

const TERMS_TO_USE_LESS_PROMPT: &str = r#"The article below overuses some terms. Rewrite it so each term is used
about as often as suggested, keeping headings and structure unchanged:
{terms}

Article:
{article}

Return only the full HTML."#;

/// The six prompt templates. Placeholders are written `{name}`.
///
/// Any subset can be overridden from a YAML file keyed by template name;
/// missing keys keep the built-in text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PromptSet {
    pub title_creation_prompt: String,
    pub description_creation_prompt: String,
    pub article_prompt: String,
    pub headings_optimization_prompt: String,
    pub terms_not_used_prompt: String,
    pub terms_to_use_less_prompt: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            title_creation_prompt: TITLE_PROMPT.to_string(),
            description_creation_prompt: DESCRIPTION_PROMPT.to_string(),
            article_prompt: ARTICLE_PROMPT.to_string(),
            headings_optimization_prompt: HEADINGS_PROMPT.to_string(),
            terms_not_used_prompt: TERMS_NOT_USED_PROMPT.to_string(),
            terms_to_use_less_prompt: TERMS_TO_USE_LESS_PROMPT.to_string(),
        }
    }
}

impl PromptSet {
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let prompts: PromptSet = serde_yaml::from_str(raw).context("Invalid prompts YAML")?;
        prompts.validate()?;
        Ok(prompts)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompts file {}", path.display()))?;
        Self::from_yaml_str(&raw).with_context(|| format!("In prompts file {}", path.display()))
    }

    /// Built-in defaults, or the file's overrides when a path is given.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::from_yaml_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Each template must reference the placeholders its operation fills.
    pub fn validate(&self) -> Result<()> {
        let checks: [(&str, &str, &[&str]); 6] = [
            ("title_creation_prompt", self.title_creation_prompt.as_str(), &["terms", "search_keyword_terms"]),
            (
                "description_creation_prompt",
                self.description_creation_prompt.as_str(),
                &["terms", "search_keyword_terms"],
            ),
            ("article_prompt", self.article_prompt.as_str(), &["h1_terms", "h2_terms", "terms"]),
            (
                "headings_optimization_prompt",
                self.headings_optimization_prompt.as_str(),
                &["article", "search_keyword_terms"],
            ),
            ("terms_not_used_prompt", self.terms_not_used_prompt.as_str(), &["terms", "article"]),
            ("terms_to_use_less_prompt", self.terms_to_use_less_prompt.as_str(), &["terms", "article"]),
        ];

        for (name, template, required) in checks {
            for placeholder in required {
                if !template.contains(&format!("{{{placeholder}}}")) {
                    bail!("{name} is missing the {{{placeholder}}} placeholder");
                }
            }
        }
        Ok(())
    }
}

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").unwrap());

/// Substitute `{name}` placeholders in a single pass over the template, so
/// braces inside substituted values are never expanded. Unknown
/// placeholders are left as is.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            match vars.iter().find(|(key, _)| *key == name) {
                Some((_, value)) => value.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        PromptSet::default().validate().unwrap();
    }

    #[test]
    fn yaml_overrides_only_given_keys() {
        let prompts = PromptSet::from_yaml_str(
            "title_creation_prompt: |\n  Title with {terms} and {search_keyword_terms}\n",
        )
        .unwrap();
        assert_eq!(
            prompts.title_creation_prompt,
            "Title with {terms} and {search_keyword_terms}\n"
        );
        assert_eq!(prompts.article_prompt, PromptSet::default().article_prompt);
    }

    #[test]
    fn override_missing_placeholder_is_rejected() {
        let err = PromptSet::from_yaml_str("terms_not_used_prompt: \"Add {terms}\"\n").unwrap_err();
        assert!(err.to_string().contains("{article}"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(PromptSet::load(Some("/nonexistent/prompts.yaml")).is_err());
        assert!(PromptSet::load(None).is_ok());
    }

    #[test]
    fn render_fills_known_placeholders() {
        let out = render("{a} and {b} but not {c}", &[("a", "x"), ("b", "y")]);
        assert_eq!(out, "x and y but not {c}");
    }

    #[test]
    fn render_does_not_expand_placeholders_inside_values() {
        let out = render(
            "Article:\n{article}\nTerms:\n{terms}",
            &[("article", "<p>Use {terms} wisely</p>"), ("terms", "grinder")],
        );
        assert_eq!(out, "Article:\n<p>Use {terms} wisely</p>\nTerms:\ngrinder");
    }
}
