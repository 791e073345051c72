use seoforge_common::{ContentDraft, QueryTerms, Term, TermCategory};
use seoforge_pipeline::testing::{GeneratorCall, ScriptedEngine, StubGenerator, QUERY_ID};
use seoforge_pipeline::{GapOutcome, TermBalancer};

fn draft(html: &str, score: i32) -> ContentDraft {
    ContentDraft {
        title: "Title".into(),
        description: "Description".into(),
        html: html.into(),
        score,
    }
}

fn content_terms() -> QueryTerms {
    let mut terms = QueryTerms::default();
    terms.push(Term::new("grinder", TermCategory::ContentBasic).with_usage(2, 4));
    terms.push(Term::new("crema", TermCategory::ContentExtended).with_usage(1, 2));
    terms
}

#[tokio::test]
async fn lower_scoring_gap_fill_is_discarded_exactly() {
    let engine = ScriptedEngine::new().with_scorer(|html| if html.contains("crema") { 40 } else { 50 });
    let generator = StubGenerator::new().on_fill_gaps("<p>grinder and crema</p>");
    let mut current = draft("<p>grinder</p>", 50);

    let outcome = TermBalancer::default()
        .fill_gaps(&engine, &generator, QUERY_ID, &mut current, &content_terms())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        GapOutcome::Discarded {
            missing: vec!["crema".into()],
            trial_score: 40
        }
    );
    assert_eq!(current, draft("<p>grinder</p>", 50));
    assert!(engine.submitted().is_empty());
}

#[tokio::test]
async fn equal_scoring_gap_fill_is_committed() {
    let engine = ScriptedEngine::new().with_scorer(|_| 50);
    let generator = StubGenerator::new().on_fill_gaps("<p>grinder and crema</p>");
    let mut current = draft("<p>grinder</p>", 50);

    let outcome = TermBalancer::default()
        .fill_gaps(&engine, &generator, QUERY_ID, &mut current, &content_terms())
        .await
        .unwrap();

    assert!(matches!(outcome, GapOutcome::Committed { score: 50, .. }));
    assert_eq!(current.html, "<p>grinder and crema</p>");
    assert_eq!(engine.submitted(), vec!["<p>grinder and crema</p>".to_string()]);
}

#[tokio::test]
async fn gap_pass_ignores_heading_and_meta_terms() {
    let mut terms = content_terms();
    terms.push(Term::new("headline", TermCategory::Title));
    terms.push(Term::new("summary", TermCategory::Description));
    terms.push(Term::new("top pick", TermCategory::H1));
    terms.push(Term::new("verdict", TermCategory::H2));

    let engine = ScriptedEngine::new();
    let generator = StubGenerator::new();
    let mut current = draft("<p>Grinder first, then CREMA.</p>", 50);

    let outcome = TermBalancer::default()
        .fill_gaps(&engine, &generator, QUERY_ID, &mut current, &terms)
        .await
        .unwrap();

    assert_eq!(outcome, GapOutcome::NoGaps);
    assert!(generator.calls().is_empty());
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn excess_rounds_submit_without_a_score_gate() {
    let engine = ScriptedEngine::new().with_scorer(|_| 10);
    let generator = StubGenerator::new().on_reduce("<p>grinder, grinders</p>");
    let mut current = draft(&"<p>grinder</p>".repeat(10), 60);

    let rounds = TermBalancer::default()
        .reduce_excess(&engine, &generator, QUERY_ID, &mut current, &content_terms())
        .await
        .unwrap();

    assert_eq!(rounds.len(), 2);
    assert_eq!(rounds[0].flagged, vec!["grinder".to_string()]);
    assert_eq!(rounds[0].score, Some(10));
    assert!(rounds[1].flagged.is_empty());
    assert_eq!(rounds[1].score, None);

    assert_eq!(current.html, "<p>grinder, grinders</p>");
    assert_eq!(current.score, 10);
    assert_eq!(engine.submitted().len(), 1);
    assert!(engine.evaluated().is_empty());

    match &generator.calls()[0] {
        GeneratorCall::ReduceTerms { overused } => {
            assert_eq!(overused[0].current, 10);
            assert_eq!(
                overused[0].to_string(),
                "grinder: should be used 2-4x times (currently used 10 times)"
            );
        }
        other => panic!("unexpected call {other:?}"),
    }
}

#[tokio::test]
async fn nine_uses_of_a_two_to_four_term_are_left_alone() {
    let engine = ScriptedEngine::new();
    let generator = StubGenerator::new();
    let mut current = draft(&"<p>grinder</p>".repeat(9), 60);

    let rounds = TermBalancer::default()
        .reduce_excess(&engine, &generator, QUERY_ID, &mut current, &content_terms())
        .await
        .unwrap();

    assert!(rounds.iter().all(|r| r.flagged.is_empty()));
    assert!(generator.calls().is_empty());
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn persistent_excess_is_reduced_in_both_rounds() {
    let engine = ScriptedEngine::new();
    let generator = StubGenerator::new();
    let mut current = draft(&"<p>grinder</p>".repeat(12), 60);

    let rounds = TermBalancer::default()
        .reduce_excess(&engine, &generator, QUERY_ID, &mut current, &content_terms())
        .await
        .unwrap();

    assert!(rounds.iter().all(|r| r.score == Some(50)));
    assert_eq!(engine.submitted().len(), 2);
}
