//! The two specialists the orchestrator fans out to.
//!
//! Each specialist reads a `&ConversationState` and returns its own output
//! type. Only the defining module can construct that type, so a
//! [`StructuredOutput`] always comes from [`StructuredSpecialist`] and a
//! [`SemanticOutput`] from [`SemanticSpecialist`].

mod semantic;
mod structured;

pub use semantic::{SemanticOutput, SemanticSpecialist};
pub use structured::{
    query_tool, StructuredOutput, StructuredSpecialist, DEFAULT_SQL_ATTEMPTS, QUERY_TOOL,
};
