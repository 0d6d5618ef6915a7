#![deny(missing_docs)]
#![deny(missing_copy_implementations)]
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]
#![deny(unused_import_braces)]
#![deny(unused_qualifications)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

//! This crate takes uploaded 3D models plus print parameters and derives a
//! complete, mutually consistent set of configuration documents (machine,
//! process, filament) for an external slicing engine, runs that engine
//! against a per-request temporary workspace, and reports the outcome.
//!
//! The interesting part is the configuration pipeline: loosely typed profile
//! documents are normalized into canonical shapes, request overrides are
//! applied in a fixed order, and the machine's identity is stamped into the
//! process and filament documents so the engine's compatibility matcher
//! accepts the combination. The HTTP layer, upload handling, and process
//! invocation around it are thin glue.

pub mod coerce;
pub mod compat;
pub mod config;
pub mod profile;
pub mod report;
pub mod resolver;
pub mod server;
pub mod slicer;
pub mod workspace;
