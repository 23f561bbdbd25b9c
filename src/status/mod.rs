//! Inline-cache feedback classifiers
//!
//! Each status type turns the profiling evidence at one site into a lattice
//! position a speculative compiler can act on. Classification never fails:
//! missing, contradictory or dangling evidence degrades to the most
//! conservative state.

mod call_link;
pub mod chain;
mod get_by_id;
mod put_by_id;
mod resolve_global;
mod structure_set;

pub use call_link::CallLinkStatus;
pub use chain::{transition_chain_is_still_valid, validate_prototype_chain, PropertyAccess};
pub use get_by_id::{GetByIdState, GetByIdStatus};
pub use put_by_id::{PutByIdState, PutByIdStatus};
pub use resolve_global::{ResolveGlobalState, ResolveGlobalStatus};
pub use structure_set::StructureSet;
