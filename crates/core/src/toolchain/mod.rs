use std::path::{Path, PathBuf};

use crate::{OptionName, Options, Result};

pub const TOOLCHAIN_FILE: &str = "projectm_toolchain.cmake";

/// CMake cache variables derived from the recipe options, in the order they
/// are written out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toolchain {
    variables: Vec<(String, bool)>,
}

impl Toolchain {
    pub fn generate(options: &Options) -> Self {
        let mut toolchain = Self::default();
        toolchain.set("ENABLE_EMSCRIPTEN", false);
        toolchain.set("BUILD_TESTING", options.flag(OptionName::BuildTesting));
        toolchain.set("BUILD_DOCS", false);
        toolchain.set("ENABLE_SDL_UI", options.flag(OptionName::EnableSdlUi));
        toolchain.set("ENABLE_PLAYLIST", options.flag(OptionName::EnablePlaylist));
        toolchain.set("ENABLE_GLES", options.flag(OptionName::EnableGles));
        toolchain.set("ENABLE_SYSTEM_GLM", options.flag(OptionName::EnableSystemGlm));
        toolchain.set("ENABLE_INSTALL", true);
        toolchain.set(
            "ENABLE_CXX_INTERFACE",
            options.flag(OptionName::EnableCxxInterface),
        );
        toolchain.set(
            "ENABLE_BOOST_FILESYSTEM",
            options.flag(OptionName::EnableBoostFilesystem),
        );
        toolchain.set("BUILD_SHARED_LIBS", options.flag(OptionName::Shared));
        if options.get_safe(OptionName::Fpic).is_some() {
            toolchain.set(
                "CMAKE_POSITION_INDEPENDENT_CODE",
                options.flag(OptionName::Fpic),
            );
        }
        toolchain
    }

    /// Sets a variable, overwriting an earlier value in place.
    pub fn set(&mut self, name: &str, value: bool) {
        match self.variables.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.variables.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<bool> {
        self.variables
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| *value)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.variables {
            let value = if *value { "ON" } else { "OFF" };
            out.push_str(&format!("set({name} {value} CACHE BOOL \"\" FORCE)\n"));
        }
        out
    }

    /// Writes the toolchain file into `dir`, creating it if needed.
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(TOOLCHAIN_FILE);
        std::fs::write(&path, self.render())?;
        tracing::info!(path = %path.display(), "toolchain written");
        Ok(path)
    }
}
