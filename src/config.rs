//! Cross-cutting knobs for a single parse/transform/compile run (spec §5,
//! §10.3): no process-wide statics, everything passed explicitly to
//! [`crate::driver::Driver`], [`crate::transform::transform`], and
//! [`crate::pipeline::Pipeline`].
use crate::error::Severity;
use crate::node::SxprStyle;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum severity that short-circuits a [`crate::pipeline::Pipeline`]
    /// run (spec §4.6.1, §7).
    pub fatal_threshold: Severity,
    pub sxpr_style: SxprStyle,
    /// When set, the transformation engine records a `Note`-severity entry
    /// for operators applied against a node that doesn't satisfy their
    /// precondition (e.g. `replace_by_single_child` on a node with more than
    /// one child) instead of silently leaving the node unchanged.
    pub development_mode: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fatal_threshold: Severity::Fatal,
            sxpr_style: SxprStyle::default(),
            development_mode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_not_in_development_mode() {
        let config = EngineConfig::default();
        assert!(!config.development_mode);
        assert_eq!(config.fatal_threshold, Severity::Fatal);
    }
}
