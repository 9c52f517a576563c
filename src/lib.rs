//! Story allocation for delivery roadmaps.
//!
//! Assigns backlog stories to developers over workdays while respecting
//! dependencies, one story per developer at a time, an idle budget per
//! developer and a pluggable allocation policy.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Story`, `Developer`, `WorkCalendar`,
//!   `Period`, `AllocationConfig`, `Diagnostic`
//! - **`validation`**: Input integrity checks (duplicate IDs, unknown
//!   dependencies, story sizes, dependency cycles)
//! - **`ordering`**: Dependency-respecting backlog order by wave, priority and ID
//! - **`selector`**: Developer choice by idle budget and allocation policy
//! - **`scheduler`**: The `Allocator` (placement, repair loop, finalization)
//!   and roadmap KPIs
//!
//! # Architecture
//!
//! Data flows one way per run: validation, ordering, then the allocator,
//! which consults the calendar and the selector. Inputs are borrowed and
//! never mutated; the allocator returns updated stories together with
//! diagnostics and metrics. The crate performs no I/O and installs no
//! `tracing` subscriber.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Kahn (1962), "Topological sorting of large networks"
//! - Cormen et al. (2009), "Introduction to Algorithms"

pub mod error;
pub mod models;
pub mod ordering;
pub mod scheduler;
pub mod selector;
pub mod validation;

pub use error::AllocationError;
