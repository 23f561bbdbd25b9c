//! icstatus: inline-cache feedback classification for speculative compilers
//!
//! A speculative compiler needs to know what the interpreter and the
//! baseline JIT saw at every call and property access before it can emit a
//! guarded fast path. This crate turns that profiling evidence into small,
//! conservative verdicts.
//!
//! # Quick Start
//!
//! ```no_run
//! use icstatus::{ClassifierConfig, GetByIdStatus, ProfileSnapshot};
//!
//! fn main() -> icstatus::Result<()> {
//!     let snapshot = ProfileSnapshot::load("profile.json")?;
//!     let config = ClassifierConfig::default();
//!     let block = snapshot.profiled_block("main", &config)?;
//!     let status = GetByIdStatus::compute_for(&block, 4, &"length".into());
//!     println!("{}", status);
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! | Category | Modules |
//! |----------|---------|
//! | **Model** | [`heap`], [`bytecode`], [`profile`] |
//! | **Classifiers** | [`status`] |
//! | **Persistence** | [`snapshot`], [`config`] |
//! | **Errors** | [`error`](Error) |
// Clippy configuration for icstatus.
//
// - large_enum_variant: stub payloads are stored once per site
#![allow(clippy::large_enum_variant)]

pub mod bytecode;
pub mod config;
pub mod heap;
pub mod profile;
pub mod snapshot;
pub mod status;

mod error;

pub use config::ClassifierConfig;
pub use error::{Error, Result, SiteLocation};
pub use heap::{Heap, Identifier, StructureBuilder};
pub use profile::{CodeBlockProfile, ProfiledBlock};
pub use snapshot::ProfileSnapshot;
pub use status::{
    CallLinkStatus, GetByIdState, GetByIdStatus, PutByIdState, PutByIdStatus,
    ResolveGlobalState, ResolveGlobalStatus, StructureSet,
};

/// Version of icstatus
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
