//! Shared vocabulary for the docctx workspace: the candidate record, the raw
//! row shapes returned by the two retrieval paths, the port traits, and the
//! ambient pieces (configuration, errors, logging).

pub mod config;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use normalize::CandidateNormalizer;
pub use types::{AssembledContext, LexicalRow, RetrievedCandidate, SearchPath, VectorRow};
