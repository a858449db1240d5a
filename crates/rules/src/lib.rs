//! Field rules: regex pattern detection and schema matching.

pub mod matcher;
pub mod patterns;

pub use matcher::{match_fields, normalize_name, MatchSession};
pub use patterns::{detect_patterns, merge_pattern_fields, PatternType};
