//! External service contracts: `Renderer` and `Enricher`.

pub mod enricher;
pub mod renderer;

pub use enricher::{
    EnricherClient, EnrichmentRequest, EnrichmentResponse, HttpEnricherClient, NoopEnricherClient,
    SectionExcerpt, Urgency,
};
pub use renderer::{
    HttpRendererClient, RenderRequest, RenderResponse, RendererClient, StaticRendererClient,
    UnconfiguredRendererClient,
};
