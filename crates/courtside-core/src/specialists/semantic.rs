//! Semantic specialist: the question goes to the retrieval engine as-is.

use crate::retrieval::Retriever;
use crate::state::ConversationState;

/// Formatted text of the semantic slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticOutput(String);

impl SemanticOutput {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn into_inner(self) -> String {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn fixture(text: &str) -> Self {
        Self(text.to_string())
    }
}

pub struct SemanticSpecialist {
    retriever: Retriever,
}

impl SemanticSpecialist {
    pub fn new(retriever: Retriever) -> Self {
        Self { retriever }
    }

    /// Retrieve for the state's question.
    ///
    /// Retrieval never fails; a broken embedder leaves the stat leaders
    /// (or nothing) in the output.
    pub async fn run(&self, state: &ConversationState) -> SemanticOutput {
        SemanticOutput(self.retriever.search(state.question()).await)
    }
}
