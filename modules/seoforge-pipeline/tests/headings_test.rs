use seoforge_common::{ContentDraft, PipelineError};
use seoforge_pipeline::testing::{ScriptedEngine, DRAFT_ARTICLE, QUERY_ID};
use seoforge_pipeline::{HeadingNegotiator, HeadingState};

fn draft(score: i32) -> ContentDraft {
    ContentDraft {
        title: "Espresso Machine Buying Guide".into(),
        description: "How to pick one.".into(),
        html: DRAFT_ARTICLE.into(),
        score,
    }
}

const PROPOSED: &str = "<h1>Best Espresso Machine</h1>\n<h2>Buying Guide</h2>\n<h2>Machine Care</h2>";

#[tokio::test]
async fn count_mismatch_makes_no_engine_calls() {
    let engine = ScriptedEngine::new();
    let err = HeadingNegotiator::default()
        .negotiate(&engine, QUERY_ID, &draft(70), "<h1>Only</h1><h2>Two</h2>")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        PipelineError::HeadingCountMismatch {
            original: 3,
            proposed: 2
        }
    );
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn regressing_headings_are_reverted_and_others_kept() {
    let engine = ScriptedEngine::new().with_scorer(|html| {
        let mut score = 70;
        if html.contains("Best Espresso Machine") {
            score += 5;
        }
        if html.contains("Buying Guide") {
            score -= 4;
        }
        if html.contains("Machine Care") {
            score -= 2;
        }
        score
    });

    let outcome = HeadingNegotiator::default()
        .negotiate(&engine, QUERY_ID, &draft(70), PROPOSED)
        .await
        .unwrap();

    let states: Vec<_> = outcome.decisions.iter().map(|d| d.state).collect();
    assert_eq!(
        states,
        vec![HeadingState::Accepted, HeadingState::Rejected, HeadingState::Accepted]
    );
    let trials: Vec<_> = outcome.decisions.iter().map(|d| d.trial_score).collect();
    assert_eq!(trials, vec![Some(75), Some(71), Some(73)]);

    assert_eq!(
        outcome.html,
        "<h1>Best Espresso Machine</h1>\n<p>A grinder matters.</p>\n<h2>Choosing</h2>\n<p>Look at the boiler.</p>\n<h2>Machine Care</h2>\n<p>Descale often.</p>"
    );
    assert_eq!(outcome.score, 73);
    assert_eq!(engine.evaluated().len(), 3);
    assert_eq!(engine.submitted(), vec![outcome.html.clone()]);
}

#[tokio::test]
async fn all_rejected_leaves_document_byte_identical() {
    let engine = ScriptedEngine::new().with_scorer(|html| {
        if html == DRAFT_ARTICLE {
            80
        } else {
            60
        }
    });

    let outcome = HeadingNegotiator::default()
        .negotiate(&engine, QUERY_ID, &draft(80), PROPOSED)
        .await
        .unwrap();

    assert_eq!(outcome.accepted(), 0);
    assert_eq!(outcome.html, DRAFT_ARTICLE);
    assert_eq!(outcome.score, 80);
}

#[tokio::test]
async fn small_drops_within_tolerance_are_accepted() {
    // Each swap costs 3 points, one short of the default tolerance.
    let engine = ScriptedEngine::new().with_scorer(|html| {
        let swaps = ["Best Espresso Machine", "Buying Guide", "Machine Care"]
            .iter()
            .filter(|h| html.contains(*h))
            .count() as i32;
        70 - 3 * swaps
    });

    let outcome = HeadingNegotiator::default()
        .negotiate(&engine, QUERY_ID, &draft(70), PROPOSED)
        .await
        .unwrap();

    assert_eq!(outcome.accepted(), 3);
    assert_eq!(outcome.score, 61);
}

#[tokio::test]
async fn tolerance_is_configurable() {
    let engine = ScriptedEngine::new().with_scorer(|html| if html == DRAFT_ARTICLE { 70 } else { 69 });

    let outcome = HeadingNegotiator::new(1)
        .negotiate(&engine, QUERY_ID, &draft(70), PROPOSED)
        .await
        .unwrap();

    // 69 <= 70 - 1 reverts every swap.
    assert_eq!(outcome.accepted(), 0);
    assert_eq!(outcome.html, DRAFT_ARTICLE);
}

#[tokio::test]
async fn every_heading_is_tried_exactly_once() {
    let engine = ScriptedEngine::new().with_scorer(|_| 70);

    let outcome = HeadingNegotiator::default()
        .negotiate(&engine, QUERY_ID, &draft(70), PROPOSED)
        .await
        .unwrap();

    assert_eq!(engine.evaluated().len(), 3);
    assert!(outcome
        .decisions
        .iter()
        .all(|d| d.trial_score == Some(70) && d.state != HeadingState::Pending));
    assert_eq!(outcome.decisions.iter().map(|d| d.index).collect::<Vec<_>>(), vec![0, 1, 2]);
}
