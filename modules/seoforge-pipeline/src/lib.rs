pub mod balancer;
pub mod engine;
pub mod generator;
pub mod headings;
pub mod html;
pub mod orchestrator;
pub mod site_policy;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod terms;
pub mod traits;

pub use balancer::{BalancerConfig, ExcessRound, GapOutcome, TermBalancer};
pub use generator::{LlmGenerator, PromptSet};
pub use headings::{HeadingDecision, HeadingNegotiator, HeadingState, NegotiationOutcome};
pub use orchestrator::{
    ArticleReport, ArticleRequest, Pipeline, PipelineConfig, PipelineFailure, PipelineStage,
};
pub use site_policy::SitePolicy;
pub use terms::OverusedTerm;
pub use traits::{ContentGenerator, TermEngine};
