//! Chorus Claim Graph
//!
//! Structure over the synthesized claim set: conflict components and tiers,
//! interactive forcing points, the blast-radius importance score that gates
//! survey questions, and the read-only completeness/alignment audit.

#![warn(missing_docs)]

pub mod assembler;
pub mod audit;
pub mod blast;

pub use assembler::assemble;
pub use audit::{alignment, completeness};
pub use blast::{score_claims, survey_skippable, BlastConfig, BlastScore};
