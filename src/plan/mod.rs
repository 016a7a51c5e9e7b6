//! Dispatch-plan construction: two views over an
//! [`crate::analyzed::AnalyzedBytecode`] that the interpreter consumes
//! through a narrow contract, never by reaching back into the bit-planes
//! itself.

mod advanced;
mod minimal;

pub use advanced::{
    build_advanced_plan, AdvancedPlan, FusionHandlers, JumpdestInfo, MetadataView, StreamCell,
    StreamIdx,
};
pub use minimal::{build_minimal_plan, MinimalPlan};
