// Core algorithm exports
pub mod engine;
pub mod factors;
pub mod index;
pub mod similarity;

pub use engine::{MatchEngine, MatchError};
pub use index::{CandidateIndex, SparseVector};
pub use similarity::find_similar;
