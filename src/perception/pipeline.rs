/// Perception pipeline: layout dump, element extraction and summary in one pass.
use crate::perception::extractor;
use crate::perception::fetcher::LayoutFetcher;
use crate::perception::serializer;
use crate::perception::types::{PerceptionContext, PerceptionSource};

/// Run the full perception pipeline:
///
/// 1. Dump and pull the layout (a failure here is not an error).
/// 2. Extract elements from the tree, then drop the tree.
/// 3. Serialize the elements into the planner summary.
pub async fn observe(fetcher: &LayoutFetcher) -> PerceptionContext {
    let tree = fetcher.fetch().await;
    let source = if tree.is_some() {
        PerceptionSource::LayoutDump
    } else {
        PerceptionSource::Unavailable
    };

    let elements = extractor::extract(tree.as_ref());
    drop(tree);

    let summary = serializer::serialize(&elements);
    tracing::debug!(elements = elements.len(), ?source, "observation complete");

    PerceptionContext {
        elements,
        summary,
        source,
    }
}

impl PerceptionContext {
    /// Text of the system message that carries this observation.
    pub fn to_message(&self) -> String {
        if self.summary.is_empty() {
            "UI Context: Unknown".to_string()
        } else {
            format!("UI Context: {}", self.summary)
        }
    }
}
