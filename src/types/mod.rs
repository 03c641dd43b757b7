//! Shared data structures for the parameter-optimization pipeline
//!
//! - Profiles: read-only material/tool/machine/holder/workholding records
//! - Envelope: aggregated constraint box with provenance
//! - Candidate: `[Vc, fz, ap, ae]` search points and objective weights
//! - Adaptation: belief/GP/wear shared shapes
//! - Risk: Monte Carlo reports and distributions
//! - Recommendation: the document returned by the pipeline

mod adaptation;
mod candidate;
mod envelope;
mod profiles;
mod recommendation;
mod risk;
pub(crate) mod unbounded;

pub use adaptation::*;
pub use candidate::*;
pub use envelope::*;
pub use profiles::*;
pub use recommendation::*;
pub use risk::*;
