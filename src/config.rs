//! Per-compilation configuration (ambient stack, SPEC_FULL.md §2.3).
//!
//! Grounded on the grounding codebase's `resource.rs` (`ResourceTracker`
//! config shape) for the numeric limits, and on `jit_ext.py`'s
//! `CACHE_OPTIONS` check in `meso_thunder_interpreter` for [`CacheOption`].

use std::rc::Rc;

use crate::capability::SafeCallSet;
use crate::host::{HostEvaluator, default_evaluator};
use crate::lookaside::CallbackRegistry;
use crate::primitive::TranslationTable;
use crate::sharp_edge::{SharpEdgeLevel, SharpEdgePolicy};

/// Caching strategy for a compiled trace (spec.md §4.9).
///
/// Only these two variants are representable: the original system's richer
/// cache-key machinery (symbolic-values caching, no caching at all beyond
/// these two, cache-info introspection) is out of scope here (see
/// SPEC_FULL.md §16 Open Questions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
pub enum CacheOption {
    /// Guard on concrete scalar/shape/dtype values observed during tracing.
    #[default]
    ConstantValues,
    /// Skip prologue guard emission entirely; the caller is responsible for
    /// re-tracing on every call.
    NoCaching,
}

/// Resource ceilings enforced while interpreting (spec.md §5).
#[derive(Debug, Clone, Copy)]
pub struct ResourceLimits {
    pub max_frame_depth: u32,
    pub max_steps: u64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self { max_frame_depth: 512, max_steps: 10_000_000 }
    }
}

/// Everything [`crate::trace_function`] needs beyond the function and its
/// arguments: the translation table, sharp-edge policy, resource limits,
/// and cache option (spec.md §4.9, §3 CompileOptions).
#[derive(Clone)]
pub struct CompileOptions {
    pub translations: TranslationTable,
    pub callbacks: CallbackRegistry,
    pub sharp_edges: SharpEdgePolicy,
    pub safe_calls: SafeCallSet,
    pub limits: ResourceLimits,
    pub cache_option: CacheOption,
    pub host: Rc<dyn HostEvaluator>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            translations: TranslationTable::with_defaults(),
            callbacks: CallbackRegistry::default(),
            sharp_edges: SharpEdgePolicy::new(SharpEdgeLevel::Error),
            safe_calls: SafeCallSet::default(),
            limits: ResourceLimits::default(),
            cache_option: CacheOption::default(),
            host: default_evaluator(),
        }
    }
}

impl std::fmt::Debug for CompileOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompileOptions")
            .field("translations", &self.translations)
            .field("callbacks", &self.callbacks)
            .field("sharp_edges", &self.sharp_edges)
            .field("safe_calls", &self.safe_calls)
            .field("limits", &self.limits)
            .field("cache_option", &self.cache_option)
            .field("host", &"<dyn HostEvaluator>")
            .finish()
    }
}

impl CompileOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_sharp_edges(mut self, level: SharpEdgeLevel) -> Self {
        self.sharp_edges = SharpEdgePolicy::new(level);
        self
    }

    #[must_use]
    pub fn with_cache_option(mut self, cache_option: CacheOption) -> Self {
        self.cache_option = cache_option;
        self
    }
}
