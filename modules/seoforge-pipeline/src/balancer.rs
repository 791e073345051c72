//! Content-term coverage: add terms the article never uses, then thin out
//! terms it uses far more than the engine suggests.

use serde::Serialize;
use tracing::{info, warn};

use seoforge_common::{ContentDraft, QueryTerms, UsageRange};

use crate::terms::{contains_whole_word, count_prefix_matches, OverusedTerm};
use crate::traits::{ContentGenerator, Result, TermEngine};

/// An occurrence count at or above `EXCESS_LOW_FACTOR * lo` ...
pub const EXCESS_LOW_FACTOR: f64 = 5.0;
/// ... and at or above `EXCESS_HIGH_FACTOR * hi` is excessive.
pub const EXCESS_HIGH_FACTOR: f64 = 2.5;
pub const EXCESS_ROUNDS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalancerConfig {
    pub low_factor: f64,
    pub high_factor: f64,
    pub excess_rounds: usize,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            low_factor: EXCESS_LOW_FACTOR,
            high_factor: EXCESS_HIGH_FACTOR,
            excess_rounds: EXCESS_ROUNDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GapOutcome {
    NoGaps,
    Committed { missing: Vec<String>, score: i32 },
    Discarded { missing: Vec<String>, trial_score: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExcessRound {
    pub round: usize,
    pub flagged: Vec<String>,
    /// Submitted score, `None` when nothing was flagged.
    pub score: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct TermBalancer {
    config: BalancerConfig,
}

impl TermBalancer {
    pub fn new(config: BalancerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BalancerConfig {
        &self.config
    }

    /// Content terms with no whole-word occurrence in `html`, in engine order.
    pub fn find_gaps(&self, html: &str, terms: &QueryTerms) -> Vec<String> {
        terms
            .content_terms()
            .filter(|t| !contains_whole_word(html, &t.text))
            .map(|t| t.text.to_lowercase())
            .collect()
    }

    /// Content terms whose prefix-match count is excessive for their range.
    pub fn find_excess(&self, html: &str, terms: &QueryTerms) -> Vec<OverusedTerm> {
        terms
            .content_terms()
            .filter_map(|t| {
                let usage = t.usage?;
                let current = count_prefix_matches(html, &t.text);
                self.is_excessive(current, usage).then(|| OverusedTerm {
                    term: t.text.clone(),
                    usage,
                    current,
                })
            })
            .collect()
    }

    pub fn is_excessive(&self, actual: usize, usage: UsageRange) -> bool {
        // A term that never appears cannot be reduced. Without this a `[0, 0]`
        // range would flag every absent term (0 >= 0) and send a rewrite
        // request for nothing.
        if actual == 0 {
            return false;
        }
        let actual = actual as f64;
        if usage.is_single() {
            return actual >= self.config.low_factor * usage.lo as f64;
        }
        actual >= self.config.low_factor * usage.lo as f64
            && actual >= self.config.high_factor * usage.hi as f64
    }

    /// One gap pass. The rewrite is kept only if it scores at least as well
    /// as the current draft; otherwise the draft is left untouched.
    pub async fn fill_gaps(
        &self,
        engine: &dyn TermEngine,
        generator: &dyn ContentGenerator,
        query_id: &str,
        draft: &mut ContentDraft,
        terms: &QueryTerms,
    ) -> Result<GapOutcome> {
        let missing = self.find_gaps(&draft.html, terms);
        if missing.is_empty() {
            info!(query_id, "No missing content terms");
            return Ok(GapOutcome::NoGaps);
        }
        info!(query_id, missing = missing.len(), "Filling missing content terms");

        let candidate = generator.fill_gaps(&draft.html, &missing).await?;
        let trial = engine
            .evaluate(query_id, &candidate, &draft.title, &draft.description)
            .await?;

        if trial < draft.score {
            warn!(
                query_id,
                trial_score = trial,
                running_score = draft.score,
                "Gap fill lowered score, discarded"
            );
            return Ok(GapOutcome::Discarded {
                missing,
                trial_score: trial,
            });
        }

        let score = engine
            .submit(query_id, &candidate, &draft.title, &draft.description)
            .await?;
        info!(query_id, trial_score = trial, score, "Gap fill committed");
        draft.html = candidate;
        draft.score = score;
        Ok(GapOutcome::Committed { missing, score })
    }

    /// Fixed number of reduction rounds. Each round with flagged terms
    /// rewrites and submits without a score gate.
    pub async fn reduce_excess(
        &self,
        engine: &dyn TermEngine,
        generator: &dyn ContentGenerator,
        query_id: &str,
        draft: &mut ContentDraft,
        terms: &QueryTerms,
    ) -> Result<Vec<ExcessRound>> {
        let mut rounds = Vec::with_capacity(self.config.excess_rounds);

        for round in 1..=self.config.excess_rounds {
            let overused = self.find_excess(&draft.html, terms);
            let flagged: Vec<String> = overused.iter().map(|o| o.term.clone()).collect();

            if overused.is_empty() {
                info!(query_id, round, "No overused content terms");
                rounds.push(ExcessRound {
                    round,
                    flagged,
                    score: None,
                });
                continue;
            }

            info!(query_id, round, overused = overused.len(), "Reducing overused terms");
            let candidate = generator.reduce_terms(&draft.html, &overused).await?;
            let score = engine
                .submit(query_id, &candidate, &draft.title, &draft.description)
                .await?;
            info!(query_id, round, running_score = draft.score, score, "Reduction submitted");

            draft.html = candidate;
            draft.score = score;
            rounds.push(ExcessRound {
                round,
                flagged,
                score: Some(score),
            });
        }

        Ok(rounds)
    }
}
