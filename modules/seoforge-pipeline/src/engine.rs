//! `TermEngine` over the NeuronWriter HTTP client.

use async_trait::async_trait;
use neuron_client::{ContentRequest, NeuronClient, NeuronError, NewQueryRequest, QueryTermsWire, TermWire};

use seoforge_common::{PipelineError, QuerySnapshot, QueryStatus, QueryTerms, Term, TermCategory, UsageRange};

use crate::traits::{Result, TermEngine};

fn unavailable(err: NeuronError) -> PipelineError {
    PipelineError::EngineUnavailable(err.to_string())
}

fn to_term(wire: &TermWire, category: TermCategory) -> Term {
    Term {
        text: wire.t.clone(),
        category,
        weight: wire.usage_pc.map(|pc| pc.round().max(0.0) as u32),
        usage: UsageRange::from_values(&wire.sugg_usage),
    }
}

pub fn to_query_terms(wire: &QueryTermsWire) -> QueryTerms {
    let sections: [(&[TermWire], TermCategory); 6] = [
        (wire.title.as_slice(), TermCategory::Title),
        (wire.desc.as_slice(), TermCategory::Description),
        (wire.h1.as_slice(), TermCategory::H1),
        (wire.h2.as_slice(), TermCategory::H2),
        (wire.content_basic.as_slice(), TermCategory::ContentBasic),
        (wire.content_extended.as_slice(), TermCategory::ContentExtended),
    ];

    let mut terms = QueryTerms::default();
    for (section, category) in sections {
        for term in section.iter().filter(|t| !t.t.trim().is_empty()) {
            terms.push(to_term(term, category));
        }
    }
    terms
}

fn content_request(query_id: &str, html: &str, title: &str, description: &str) -> ContentRequest {
    ContentRequest {
        query: query_id.to_string(),
        html: html.to_string(),
        title: title.to_string(),
        description: description.to_string(),
    }
}

fn require_score(resp: neuron_client::ContentResponse) -> Result<i32> {
    resp.score()
        .ok_or_else(|| PipelineError::EngineUnavailable("response has no content_score".into()))
}

#[async_trait]
impl TermEngine for NeuronClient {
    async fn create_query(
        &self,
        project_ref: &str,
        keyword: &str,
        engine_locale: &str,
        language: &str,
    ) -> Result<String> {
        let request = NewQueryRequest {
            project: project_ref.to_string(),
            keyword: keyword.to_string(),
            engine: engine_locale.to_string(),
            language: language.to_string(),
        };
        let resp = self.new_query(&request).await.map_err(unavailable)?;
        Ok(resp.query)
    }

    async fn fetch_query(&self, query_id: &str) -> Result<QuerySnapshot> {
        let resp = self.get_query(query_id).await.map_err(unavailable)?;
        let status = QueryStatus::parse(&resp.status);
        let terms = match (&status, &resp.terms) {
            (QueryStatus::Ready, Some(wire)) => to_query_terms(wire),
            _ => QueryTerms::default(),
        };
        Ok(QuerySnapshot { status, terms })
    }

    async fn evaluate(
        &self,
        query_id: &str,
        html: &str,
        title: &str,
        description: &str,
    ) -> Result<i32> {
        let resp = self
            .evaluate_content(&content_request(query_id, html, title, description))
            .await
            .map_err(unavailable)?;
        require_score(resp)
    }

    async fn submit(
        &self,
        query_id: &str,
        html: &str,
        title: &str,
        description: &str,
    ) -> Result<i32> {
        let resp = self
            .import_content(&content_request(query_id, html, title, description))
            .await
            .map_err(unavailable)?;
        require_score(resp)
    }
}
