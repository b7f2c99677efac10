use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};

use crate::{options::Os, OptionName, Options, RecipeError, Result, Settings};

const BUILTIN_DATA: &str = include_str!("../../data/recipe.json");

/// Static description of the packaged library.
#[derive(Debug, Clone)]
pub struct RecipeMetadata {
    pub name: &'static str,
    pub version: &'static str,
    pub license: &'static str,
    pub author: &'static str,
    pub url: &'static str,
    pub description: &'static str,
    pub topics: &'static [&'static str],
}

pub const METADATA: RecipeMetadata = RecipeMetadata {
    name: "libprojectm",
    version: "4.1.0",
    license: "LGPL 2.1",
    author: "The projectM team",
    url: "https://github.com/conan-io/conan-center-index/tree/master/recipes/libprojectm",
    description: "The most advanced open-source music visualizer library. \
                  Project page https://github.com/projectM-visualizer/projectm",
    topics: &["audio", "opengl", "visualizer", "graphics"],
};

/// Where the sources for one version come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub url: String,
    /// Hex encoded SHA-256 of the archive. Unpinned archives cannot be
    /// fetched.
    #[serde(default)]
    pub sha256: Option<String>,
}

/// Per-version source locations and pinned third-party versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeData {
    pub sources: BTreeMap<String, SourceEntry>,
    pub dependencies: BTreeMap<String, BTreeMap<String, String>>,
}

impl RecipeData {
    /// Data shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_DATA)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading recipe data");
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn source(&self, version: &str) -> Result<&SourceEntry> {
        self.sources
            .get(version)
            .ok_or_else(|| RecipeError::config(format!("no sources listed for version `{version}`")))
    }

    pub fn pinned_versions(&self, version: &str) -> Result<&BTreeMap<String, String>> {
        self.dependencies.get(version).ok_or_else(|| {
            RecipeError::config(format!("no dependency versions listed for version `{version}`"))
        })
    }
}

/// Package-level requirements as `name/version` references.
pub fn requirements(
    options: &Options,
    settings: &Settings,
    data: &RecipeData,
    version: &str,
) -> Result<Vec<String>> {
    let pinned = data.pinned_versions(version)?;

    let mut packages = Vec::new();
    packages.push(if options.flag(OptionName::EnableGles) {
        "gles"
    } else {
        "opengl"
    });
    if options.flag(OptionName::EnableSystemGlm) {
        packages.push("glm");
    }
    if options.flag(OptionName::EnableSdlUi) {
        packages.push("sdl");
    }
    if settings.os == Os::Windows {
        packages.push("glew");
    }
    if options.flag(OptionName::BuildTesting) {
        packages.push("gtest");
    }
    if options.flag(OptionName::EnableBoostFilesystem) {
        packages.push("boost");
    }

    packages
        .into_iter()
        .map(|package| {
            pinned
                .get(package)
                .map(|pin| format!("{package}/{pin}"))
                .ok_or_else(|| {
                    RecipeError::config(format!(
                        "no pinned version of `{package}` for version `{version}`"
                    ))
                })
        })
        .collect()
}
