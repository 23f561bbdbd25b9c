//! Speculation failures recorded by previously optimized code

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an optimized guard failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitKind {
    /// A `CheckFunction` guard saw a different callee
    BadFunction,
    /// A structure check on a cached access failed
    BadCache,
    /// A `CheckExecutable` guard saw a different executable
    BadExecutable,
    /// A constant folded from a specific value went stale
    BadWeakConstantCache,
    /// A type speculation failed
    BadType,
}

impl fmt::Display for ExitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExitKind::BadFunction => "BadFunction",
            ExitKind::BadCache => "BadCache",
            ExitKind::BadExecutable => "BadExecutable",
            ExitKind::BadWeakConstantCache => "BadWeakConstantCache",
            ExitKind::BadType => "BadType",
        };
        f.write_str(name)
    }
}

/// A bytecode index where some kind of exit happened often enough to matter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrequentExitSite {
    pub bytecode_index: u32,
    pub kind: ExitKind,
}

/// Set of frequent exit sites for a code block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitProfile {
    sites: Vec<FrequentExitSite>,
}

impl ExitProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an exit site. Returns `false` if it was already present.
    pub fn add(&mut self, bytecode_index: u32, kind: ExitKind) -> bool {
        let site = FrequentExitSite { bytecode_index, kind };
        if self.sites.contains(&site) {
            return false;
        }
        self.sites.push(site);
        true
    }

    pub fn has_exit_site(&self, bytecode_index: u32, kind: ExitKind) -> bool {
        self.sites
            .iter()
            .any(|s| s.bytecode_index == bytecode_index && s.kind == kind)
    }

    pub fn sites(&self) -> &[FrequentExitSite] {
        &self.sites
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}
