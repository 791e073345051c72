mod prompts;

pub use prompts::{render, PromptSet};

use std::sync::Arc;

use ai_client::{strip_code_blocks, AiError, ChatModel};
use async_trait::async_trait;
use tracing::{debug, info};

use seoforge_common::{PipelineError, Term};

use crate::site_policy::SitePolicy;
use crate::terms::{format_list, format_overused, format_weighted, format_with_targets, OverusedTerm};
use crate::traits::{ContentGenerator, Result};

/// `ContentGenerator` backed by a chat model and a prompt set.
pub struct LlmGenerator {
    model: Arc<dyn ChatModel>,
    prompts: PromptSet,
}

impl LlmGenerator {
    pub fn new(model: Arc<dyn ChatModel>, prompts: PromptSet) -> Self {
        Self { model, prompts }
    }

    pub fn prompts(&self) -> &PromptSet {
        &self.prompts
    }

    async fn complete(&self, operation: &'static str, prompt: String) -> Result<String> {
        debug!(operation, model = self.model.model(), prompt_len = prompt.len(), "Sending prompt");
        let raw = self
            .model
            .complete(&prompt)
            .await
            .map_err(|e| generation_error(operation, e))?;
        info!(operation, response_len = raw.len(), "Completion received");
        Ok(raw)
    }
}

fn generation_error(operation: &str, err: AiError) -> PipelineError {
    PipelineError::Generation(format!("{operation}: {err}"))
}

/// Drop surrounding fences and every `*`; models like to add markdown
/// emphasis to HTML.
pub fn clean_html(raw: &str) -> String {
    strip_code_blocks(raw).replace('*', "").trim().to_string()
}

/// Trim and drop wrapping quotes from a one-line answer.
pub fn clean_line(raw: &str) -> String {
    let text = strip_code_blocks(raw);
    let text = text.trim();
    let unquoted = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .or_else(|| text.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')))
        .unwrap_or(text);
    unquoted.trim().to_string()
}

/// One quoted token per line.
fn format_exact(phrases: &[String]) -> String {
    phrases
        .iter()
        .map(|p| format!("\"{p}\""))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl ContentGenerator for LlmGenerator {
    async fn generate_title(&self, terms: &[Term], exact_phrases: &[String]) -> Result<String> {
        let prompt = render(
            &self.prompts.title_creation_prompt,
            &[
                ("terms", &format_weighted(terms)),
                ("search_keyword_terms", &format_exact(exact_phrases)),
            ],
        );
        Ok(clean_line(&self.complete("title", prompt).await?))
    }

    async fn generate_description(
        &self,
        terms: &[Term],
        exact_phrases: &[String],
    ) -> Result<String> {
        let prompt = render(
            &self.prompts.description_creation_prompt,
            &[
                ("terms", &format_weighted(terms)),
                ("search_keyword_terms", &format_exact(exact_phrases)),
            ],
        );
        Ok(clean_line(&self.complete("description", prompt).await?))
    }

    async fn generate_article(
        &self,
        title_terms: &[Term],
        h1_terms: &[Term],
        h2_terms: &[Term],
        content_terms: &[Term],
    ) -> Result<String> {
        let prompt = render(
            &self.prompts.article_prompt,
            &[
                ("title_terms", &format_weighted(title_terms)),
                ("h1_terms", &format_weighted(h1_terms)),
                ("h2_terms", &format_weighted(h2_terms)),
                ("terms", &format_with_targets(content_terms)),
            ],
        );
        Ok(clean_html(&self.complete("article", prompt).await?))
    }

    async fn rewrite_headings(
        &self,
        html: &str,
        h1_terms: &[Term],
        h2_terms: &[Term],
        exact_phrases: &[String],
        policy: &SitePolicy,
    ) -> Result<String> {
        let terms = format!(
            "H1 terms:\n{}\n\nH2 terms:\n{}",
            format_weighted(h1_terms),
            format_weighted(h2_terms)
        );
        let prompt = render(
            &self.prompts.headings_optimization_prompt,
            &[
                ("terms", &terms),
                ("article", html),
                ("search_keyword_terms", &format_exact(exact_phrases)),
                ("homepage", &policy.homepage),
                ("anchor_text_rules", &policy.rules_text()),
                ("anchor_texts", &policy.anchors_text()),
            ],
        );
        Ok(clean_html(&self.complete("headings", prompt).await?))
    }

    async fn fill_gaps(&self, html: &str, missing_terms: &[String]) -> Result<String> {
        let prompt = render(
            &self.prompts.terms_not_used_prompt,
            &[("terms", &format_list(missing_terms)), ("article", html)],
        );
        Ok(clean_html(&self.complete("fill_gaps", prompt).await?))
    }

    async fn reduce_terms(&self, html: &str, overused: &[OverusedTerm]) -> Result<String> {
        let prompt = render(
            &self.prompts.terms_to_use_less_prompt,
            &[("terms", &format_overused(overused)), ("article", html)],
        );
        Ok(clean_html(&self.complete("reduce_terms", prompt).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use ai_client::Message;
    use seoforge_common::{TermCategory, UsageRange};

    /// Records prompts and replies with a fixed completion.
    struct EchoModel {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl EchoModel {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl ChatModel for EchoModel {
        fn model(&self) -> &str {
            "echo"
        }

        async fn chat(&self, messages: Vec<Message>) -> ai_client::error::Result<String> {
            let prompt = messages.into_iter().map(|m| m.content).collect::<Vec<_>>().join("\n");
            self.prompts.lock().unwrap().push(prompt);
            Ok(self.reply.clone())
        }
    }

    struct FailingModel;

    #[async_trait]
    impl ChatModel for FailingModel {
        fn model(&self) -> &str {
            "failing"
        }

        async fn chat(&self, _messages: Vec<Message>) -> ai_client::error::Result<String> {
            Err(AiError::Network("connection reset".into()))
        }
    }

    #[test]
    fn clean_html_strips_fences_and_asterisks() {
        let raw = "```html\n<h1>**Best** espresso</h1>\n```";
        assert_eq!(clean_html(raw), "<h1>Best espresso</h1>");
    }

    #[test]
    fn clean_line_strips_quotes() {
        assert_eq!(clean_line("  \"Best Espresso Machines\"\n"), "Best Espresso Machines");
        assert_eq!(clean_line("'Quoted'"), "Quoted");
        assert_eq!(clean_line("He said \"hi\""), "He said \"hi\"");
    }

    #[tokio::test]
    async fn title_prompt_carries_weights_and_exact_phrases() {
        let model = EchoModel::new("\"Espresso Machines Reviewed\"");
        let generator = LlmGenerator::new(model.clone(), PromptSet::default());
        let terms = vec![Term::new("espresso", TermCategory::Title).with_weight(90)];

        let title = generator
            .generate_title(&terms, &["espresso".into(), "machine".into()])
            .await
            .unwrap();

        assert_eq!(title, "Espresso Machines Reviewed");
        let prompt = model.last_prompt();
        assert!(prompt.contains("- \"espresso\" (90%)"));
        assert!(prompt.contains("\"espresso\"\n\"machine\""));
        assert!(!prompt.contains("{terms}"));
    }

    #[tokio::test]
    async fn reduce_prompt_lists_overused_terms() {
        let model = EchoModel::new("<p>*fewer* grinders</p>");
        let generator = LlmGenerator::new(model.clone(), PromptSet::default());
        let overused = vec![OverusedTerm {
            term: "grinder".into(),
            usage: UsageRange { lo: 2, hi: 4 },
            current: 11,
        }];

        let html = generator.reduce_terms("<p>grinder</p>", &overused).await.unwrap();

        assert_eq!(html, "<p>fewer grinders</p>");
        assert!(model
            .last_prompt()
            .contains("grinder: should be used 2-4x times (currently used 11 times)"));
    }

    #[tokio::test]
    async fn headings_prompt_includes_site_policy() {
        let model = EchoModel::new("<h1>New</h1>");
        let generator = LlmGenerator::new(model.clone(), PromptSet::default());
        let mut policy = SitePolicy::empty("coffee.example");
        policy.anchors = vec!["best grinders".into()];

        generator
            .rewrite_headings("<h1>Old</h1>", &[], &[], &["coffee".into()], &policy)
            .await
            .unwrap();

        let prompt = model.last_prompt();
        assert!(prompt.contains("coffee.example"));
        assert!(prompt.contains("best grinders"));
        assert!(prompt.contains("<h1>Old</h1>"));
    }

    #[tokio::test]
    async fn model_failure_is_a_generation_error() {
        let generator = LlmGenerator::new(Arc::new(FailingModel), PromptSet::default());
        let err = generator.fill_gaps("<p></p>", &["crema".into()]).await.unwrap_err();
        assert_eq!(err.kind(), "generation_error");
        assert!(err.to_string().contains("fill_gaps"));
    }
}
