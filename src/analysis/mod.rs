//! Query analysis: extraction safety, signatures, rule naming and diffing.

pub mod extract;
pub mod naming;
pub mod safety;
pub mod selector_diff;
pub mod signature;

pub use extract::{
    DEFAULT_PREFIX, ExtractOptions, ExtractionReport, QueryReport, RuleCandidate,
    extract_candidates, extract_from_queries,
};
pub use naming::hashed_metric_name;
pub use safety::{SafeRoot, SafeRootFinder, find_safe_roots, is_safe};
pub use selector_diff::{
    DiffReason, DiffSide, LabelVariance, MatcherSetDiff, SelectorDiffEntry, diff_matcher_sets,
    diff_selector_sets,
};
pub use signature::{Signature, SignatureError, SignatureOptions, expr_signature};
