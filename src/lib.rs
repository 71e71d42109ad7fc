//! buildkit - build automation for Conan + CMake C++ projects
//!
//! This crate provides the library behind the `buildkit` CLI: discovery of
//! the conan and cmake executables, profile and descriptor editing, and the
//! clean/build/pack/test pipeline.

pub mod builder;
pub mod descriptor;
pub mod env;
pub mod errors;
pub mod ops;
pub mod profile;
pub mod util;

pub use builder::{BuildConfig, Builder, Workflow};
pub use errors::BuildkitError;
pub use util::context::ProjectContext;
