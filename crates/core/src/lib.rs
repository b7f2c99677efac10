//! Core library for the libprojectM package recipe.
//!
//! A static component tree is materialized against the build environment,
//! filtered by the recipe options and flattened into export entries for the
//! package manifest. Fetching sources and driving CMake are delegated to the
//! collaborators in [`source`] and [`build`].

pub mod build;
pub mod component;
pub mod error;
pub mod options;
pub mod pipeline;
pub mod recipe;
pub mod resolver;
pub mod source;
pub mod toolchain;

pub use build::{BuildContext, BuildEngine, BuildStep, CMakeEngine};
pub use component::{materialize, Component, ComponentTable, Declaration};
pub use error::{RecipeError, Result};
pub use options::{Environment, OptionName, OptionValue, Options, Os, Settings};
pub use pipeline::{BuildLayout, PackageReport, Pipeline};
pub use recipe::{requirements, RecipeData, RecipeMetadata, SourceEntry, METADATA};
pub use resolver::{resolve_active, ActiveSet, ComponentInfo, PackageInfo, Resolver};
pub use source::{FilesystemFetcher, SourceFetcher, SourceRef};
pub use toolchain::Toolchain;
