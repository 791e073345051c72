//! Heading negotiation: adopt proposed h1/h2 rewrites one at a time, keeping
//! each only if the engine score does not regress past a tolerance.

use serde::Serialize;
use tracing::{info, warn};

use seoforge_common::{ContentDraft, PipelineError};

use crate::html::{extract_headings, HeadingDocument, HeadingLevel};
use crate::traits::{Result, TermEngine};

/// Score drop (in points) at which a heading swap is reverted.
pub const HEADING_REGRESSION_TOLERANCE: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadingState {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadingDecision {
    pub index: usize,
    pub is_h1: bool,
    pub state: HeadingState,
    pub trial_score: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiationOutcome {
    pub html: String,
    /// Score returned by the final submit.
    pub score: i32,
    pub decisions: Vec<HeadingDecision>,
}

impl NegotiationOutcome {
    pub fn accepted(&self) -> usize {
        self.decisions
            .iter()
            .filter(|d| d.state == HeadingState::Accepted)
            .count()
    }
}

/// `trial <= running - tolerance` counts as a regression.
pub fn is_regression(trial: i32, running: i32, tolerance: i32) -> bool {
    trial <= running - tolerance
}

#[derive(Debug, Clone, Copy)]
pub struct HeadingNegotiator {
    tolerance: i32,
}

impl Default for HeadingNegotiator {
    fn default() -> Self {
        Self::new(HEADING_REGRESSION_TOLERANCE)
    }
}

impl HeadingNegotiator {
    pub fn new(tolerance: i32) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> i32 {
        self.tolerance
    }

    /// Walk the proposed headings in order against `draft`, then submit the
    /// resulting document. Counts must match or nothing is sent to the engine.
    pub async fn negotiate(
        &self,
        engine: &dyn TermEngine,
        query_id: &str,
        draft: &ContentDraft,
        proposed_fragment: &str,
    ) -> Result<NegotiationOutcome> {
        let mut doc = HeadingDocument::parse(&draft.html);
        let proposed = extract_headings(proposed_fragment);

        if doc.heading_count() != proposed.len() {
            warn!(
                query_id,
                original = doc.heading_count(),
                proposed = proposed.len(),
                "Heading count mismatch, skipping negotiation"
            );
            return Err(PipelineError::HeadingCountMismatch {
                original: doc.heading_count(),
                proposed: proposed.len(),
            });
        }

        let mut decisions: Vec<HeadingDecision> = proposed
            .iter()
            .enumerate()
            .map(|(index, h)| HeadingDecision {
                index,
                is_h1: h.level == HeadingLevel::H1,
                state: HeadingState::Pending,
                trial_score: None,
            })
            .collect();

        let mut running = draft.score;

        let expected = proposed.len();
        for (index, heading) in proposed.into_iter().enumerate() {
            // Counts match, so every index names a slot; a miss means the
            // document changed shape under us and is reported, never skipped.
            let previous = doc.replace(index, heading).ok_or_else(|| {
                PipelineError::HeadingCountMismatch {
                    original: doc.heading_count(),
                    proposed: expected,
                }
            })?;

            let trial_html = doc.render();
            let trial = engine
                .evaluate(query_id, &trial_html, &draft.title, &draft.description)
                .await?;
            decisions[index].trial_score = Some(trial);

            if is_regression(trial, running, self.tolerance) {
                doc.replace(index, previous);
                decisions[index].state = HeadingState::Rejected;
                warn!(
                    query_id,
                    index,
                    trial_score = trial,
                    running_score = running,
                    "Heading rewrite regressed score, reverted"
                );
            } else {
                decisions[index].state = HeadingState::Accepted;
                info!(
                    query_id,
                    index,
                    trial_score = trial,
                    running_score = running,
                    "Heading rewrite accepted"
                );
                running = trial;
            }
        }

        let html = doc.render();
        let score = engine
            .submit(query_id, &html, &draft.title, &draft.description)
            .await?;

        let outcome = NegotiationOutcome {
            html,
            score,
            decisions,
        };
        info!(
            query_id,
            accepted = outcome.accepted(),
            total = outcome.decisions.len(),
            score,
            "Headings negotiated"
        );
        Ok(outcome)
    }
}
