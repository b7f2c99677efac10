use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{RecipeError, Result};

/// Every option the recipe recognises. Unknown names never make it past
/// [`OptionName::from_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionName {
    Shared,
    #[serde(rename = "fPIC")]
    Fpic,
    EnablePlaylist,
    EnableSdlUi,
    EnableGles,
    EnableBoostFilesystem,
    EnableSystemGlm,
    EnableCxxInterface,
    BuildTesting,
    UseLocalSourceDir,
    LocalSourceDir,
}

/// Value kind accepted by an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Bool,
    Str,
}

impl OptionName {
    pub const ALL: [OptionName; 11] = [
        OptionName::Shared,
        OptionName::Fpic,
        OptionName::EnablePlaylist,
        OptionName::EnableSdlUi,
        OptionName::EnableGles,
        OptionName::EnableBoostFilesystem,
        OptionName::EnableSystemGlm,
        OptionName::EnableCxxInterface,
        OptionName::BuildTesting,
        OptionName::UseLocalSourceDir,
        OptionName::LocalSourceDir,
    ];

    /// Canonical option name as written on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            OptionName::Shared => "shared",
            OptionName::Fpic => "fPIC",
            OptionName::EnablePlaylist => "enable_playlist",
            OptionName::EnableSdlUi => "enable_sdl_ui",
            OptionName::EnableGles => "enable_gles",
            OptionName::EnableBoostFilesystem => "enable_boost_filesystem",
            OptionName::EnableSystemGlm => "enable_system_glm",
            OptionName::EnableCxxInterface => "enable_cxx_interface",
            OptionName::BuildTesting => "build_testing",
            OptionName::UseLocalSourceDir => "use_local_source_dir",
            OptionName::LocalSourceDir => "local_source_dir",
        }
    }

    pub fn kind(self) -> OptionKind {
        match self {
            OptionName::LocalSourceDir => OptionKind::Str,
            _ => OptionKind::Bool,
        }
    }

    pub fn default_value(self) -> OptionValue {
        match self {
            OptionName::Fpic | OptionName::EnablePlaylist => OptionValue::Bool(true),
            OptionName::LocalSourceDir => OptionValue::Str(String::new()),
            _ => OptionValue::Bool(false),
        }
    }
}

impl fmt::Display for OptionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionName {
    type Err = RecipeError;

    fn from_str(name: &str) -> Result<Self> {
        // Older recipe revisions spelled two of the options differently.
        match name {
            "enable_dep_glm" => return Ok(OptionName::EnableSystemGlm),
            "enable_tests" => return Ok(OptionName::BuildTesting),
            _ => {}
        }

        OptionName::ALL
            .iter()
            .copied()
            .find(|option| option.as_str() == name)
            .ok_or_else(|| RecipeError::config(format!("unknown option `{name}`")))
    }
}

/// Concrete value assigned to an option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Str(String),
}

impl OptionValue {
    /// Parses `raw` according to the kind expected by `name`.
    pub fn parse(name: OptionName, raw: &str) -> Result<Self> {
        match name.kind() {
            OptionKind::Str => Ok(OptionValue::Str(raw.to_string())),
            OptionKind::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "on" | "yes" => Ok(OptionValue::Bool(true)),
                "false" | "0" | "off" | "no" => Ok(OptionValue::Bool(false)),
                _ => Err(RecipeError::config(format!(
                    "option `{name}` expects a boolean, got `{raw}`"
                ))),
            },
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(value) => Some(*value),
            OptionValue::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Str(value) => Some(value),
            OptionValue::Bool(_) => None,
        }
    }

    fn kind(&self) -> OptionKind {
        match self {
            OptionValue::Bool(_) => OptionKind::Bool,
            OptionValue::Str(_) => OptionKind::Str,
        }
    }
}

/// Option values for a single invocation. Starts from the schema defaults;
/// options removed by platform rules read as absent afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    values: BTreeMap<OptionName, OptionValue>,
    removed: BTreeSet<OptionName>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            values: OptionName::ALL
                .iter()
                .map(|name| (*name, name.default_value()))
                .collect(),
            removed: BTreeSet::new(),
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds options from `name=value` assignments on top of the defaults.
    pub fn from_assignments<I, S>(assignments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options = Self::default();
        for assignment in assignments {
            options.apply_assignment(assignment.as_ref())?;
        }
        Ok(options)
    }

    /// Applies a single `name=value` assignment.
    pub fn apply_assignment(&mut self, assignment: &str) -> Result<()> {
        let (name, raw) = split_assignment(assignment)?;
        let name: OptionName = name.parse()?;
        let value = OptionValue::parse(name, raw)?;
        self.set(name, value)
    }

    pub fn set(&mut self, name: OptionName, value: OptionValue) -> Result<()> {
        if value.kind() != name.kind() {
            return Err(RecipeError::config(format!(
                "option `{name}` given a value of the wrong kind"
            )));
        }
        if self.removed.contains(&name) {
            tracing::warn!(option = %name, "ignoring value for removed option");
            return Ok(());
        }
        self.values.insert(name, value);
        Ok(())
    }

    /// Returns the option value, or `None` when the option has been removed.
    pub fn get_safe(&self, name: OptionName) -> Option<&OptionValue> {
        if self.removed.contains(&name) {
            return None;
        }
        self.values.get(&name)
    }

    /// Boolean view over [`Options::get_safe`]; removed options read as false.
    pub fn flag(&self, name: OptionName) -> bool {
        self.get_safe(name)
            .and_then(OptionValue::as_bool)
            .unwrap_or(false)
    }

    /// Drops an option for the rest of the invocation. Removing an option
    /// twice is a no-op.
    pub fn rm_safe(&mut self, name: OptionName) {
        if self.values.remove(&name).is_some() {
            tracing::debug!(option = %name, "option removed");
        }
        self.removed.insert(name);
    }

    pub fn is_removed(&self, name: OptionName) -> bool {
        self.removed.contains(&name)
    }

    /// Removes options that have no meaning for the target platform or the
    /// requested link mode.
    pub fn apply_platform_rules(&mut self, settings: &Settings) {
        if settings.os == Os::Windows {
            self.rm_safe(OptionName::Fpic);
        }
        if self.flag(OptionName::Shared) {
            self.rm_safe(OptionName::Fpic);
        }
    }

    /// Rejects option combinations the recipe cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.flag(OptionName::UseLocalSourceDir) && self.local_source_dir().is_none() {
            return Err(RecipeError::config(
                "`use_local_source_dir` requires a non-empty `local_source_dir`",
            ));
        }
        Ok(())
    }

    /// Configured local source directory, if one was given.
    pub fn local_source_dir(&self) -> Option<&str> {
        self.get_safe(OptionName::LocalSourceDir)
            .and_then(OptionValue::as_str)
            .filter(|dir| !dir.trim().is_empty())
    }

    /// Iterates over the options that are still present, in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (OptionName, &OptionValue)> {
        self.values.iter().map(|(name, value)| (*name, value))
    }
}

/// Target operating system as far as the recipe branches on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Os {
    Linux,
    Windows,
    Macos,
    Other(String),
}

impl Os {
    /// The operating system this binary was built for.
    pub fn host() -> Self {
        match std::env::consts::OS {
            "linux" => Os::Linux,
            "windows" => Os::Windows,
            "macos" => Os::Macos,
            other => Os::Other(other.to_string()),
        }
    }
}

impl FromStr for Os {
    type Err = RecipeError;

    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RecipeError::config("setting `os` cannot be empty"));
        }
        Ok(match trimmed.to_ascii_lowercase().as_str() {
            "linux" => Os::Linux,
            "windows" => Os::Windows,
            "macos" | "darwin" => Os::Macos,
            _ => Os::Other(trimmed.to_string()),
        })
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Os::Linux => f.write_str("Linux"),
            Os::Windows => f.write_str("Windows"),
            Os::Macos => f.write_str("Macos"),
            Os::Other(name) => f.write_str(name),
        }
    }
}

/// Build settings supplied alongside the options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub os: Os,
    pub arch: String,
    pub build_type: String,
    pub compiler: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            os: Os::host(),
            arch: std::env::consts::ARCH.to_string(),
            build_type: "Release".to_string(),
            compiler: "gcc".to_string(),
        }
    }
}

impl Settings {
    /// Builds settings from `key=value` assignments on top of the host defaults.
    pub fn from_assignments<I, S>(assignments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut settings = Self::default();
        for assignment in assignments {
            let (key, value) = split_assignment(assignment.as_ref())?;
            settings.set(key, value)?;
        }
        Ok(settings)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "os" => self.os = value.parse()?,
            "arch" => self.arch = value.to_string(),
            "build_type" => self.build_type = value.to_string(),
            "compiler" => self.compiler = value.to_string(),
            _ => {
                return Err(RecipeError::config(format!("unknown setting `{key}`")));
            }
        }
        Ok(())
    }
}

/// Environment facts that shape the external dependency lists of the
/// component table. Captured once, after platform rules have run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub os: Os,
    pub gles: bool,
    pub shared: bool,
    pub system_glm: bool,
    pub build_testing: bool,
    pub boost_filesystem: bool,
}

impl Environment {
    pub fn capture(options: &Options, settings: &Settings) -> Self {
        Self {
            os: settings.os.clone(),
            gles: options.flag(OptionName::EnableGles),
            shared: options.flag(OptionName::Shared),
            system_glm: options.flag(OptionName::EnableSystemGlm),
            build_testing: options.flag(OptionName::BuildTesting),
            boost_filesystem: options.flag(OptionName::EnableBoostFilesystem),
        }
    }
}

fn split_assignment(assignment: &str) -> Result<(&str, &str)> {
    assignment
        .split_once('=')
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| {
            RecipeError::config(format!("expected `name=value`, got `{assignment}`"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windows() -> Settings {
        Settings {
            os: Os::Windows,
            ..Settings::default()
        }
    }

    fn linux() -> Settings {
        Settings {
            os: Os::Linux,
            ..Settings::default()
        }
    }

    #[test]
    fn defaults_match_schema() {
        let options = Options::new();
        assert!(options.flag(OptionName::EnablePlaylist));
        assert!(options.flag(OptionName::Fpic));
        assert!(!options.flag(OptionName::Shared));
        assert!(!options.flag(OptionName::EnableSdlUi));
        assert_eq!(options.local_source_dir(), None);
    }

    #[test]
    fn parses_assignments_and_aliases() {
        let options =
            Options::from_assignments(["enable_gles=True", "enable_dep_glm=1", "enable_tests=yes"])
                .unwrap();

        assert!(options.flag(OptionName::EnableGles));
        assert!(options.flag(OptionName::EnableSystemGlm));
        assert!(options.flag(OptionName::BuildTesting));
    }

    #[test]
    fn rejects_unknown_option() {
        let err = Options::from_assignments(["enable_vulkan=True"]).unwrap_err();
        assert!(err.is_configuration());
        assert!(format!("{err}").contains("enable_vulkan"));
    }

    #[test]
    fn rejects_non_boolean_value() {
        let err = Options::from_assignments(["shared=maybe"]).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn rejects_malformed_assignment() {
        assert!(Options::from_assignments(["shared"]).is_err());
        assert!(Options::from_assignments(["=True"]).is_err());
    }

    #[test]
    fn removes_fpic_on_windows() {
        let mut options = Options::new();
        options.apply_platform_rules(&windows());

        assert!(options.get_safe(OptionName::Fpic).is_none());
        assert!(options.is_removed(OptionName::Fpic));
    }

    #[test]
    fn removes_fpic_for_shared_builds() {
        let mut options = Options::from_assignments(["shared=True"]).unwrap();
        options.apply_platform_rules(&linux());
        assert!(options.get_safe(OptionName::Fpic).is_none());

        let mut static_options = Options::new();
        static_options.apply_platform_rules(&linux());
        assert!(static_options.flag(OptionName::Fpic));
    }

    #[test]
    fn ignores_values_for_removed_options() {
        let mut options = Options::new();
        options.rm_safe(OptionName::Fpic);
        options.rm_safe(OptionName::Fpic);
        options
            .set(OptionName::Fpic, OptionValue::Bool(true))
            .unwrap();

        assert!(options.get_safe(OptionName::Fpic).is_none());
    }

    #[test]
    fn local_source_requires_directory() {
        let options = Options::from_assignments(["use_local_source_dir=True"]).unwrap();
        assert!(options.validate().unwrap_err().is_configuration());

        let options = Options::from_assignments([
            "use_local_source_dir=True",
            "local_source_dir=/src/projectm",
        ])
        .unwrap();
        assert!(options.validate().is_ok());
        assert_eq!(options.local_source_dir(), Some("/src/projectm"));
    }

    #[test]
    fn option_names_serialize_canonically() {
        for name in OptionName::ALL {
            let json = serde_json::to_string(&name).unwrap();
            assert_eq!(json, format!("\"{}\"", name.as_str()));
            assert_eq!(serde_json::from_str::<OptionName>(&json).unwrap(), name);
        }
    }

    #[test]
    fn parses_settings() {
        let settings = Settings::from_assignments(["os=Windows", "build_type=Debug"]).unwrap();
        assert_eq!(settings.os, Os::Windows);
        assert_eq!(settings.build_type, "Debug");

        assert!(Settings::from_assignments(["libc=musl"]).is_err());
    }

    #[test]
    fn captures_environment_facts() {
        let options = Options::from_assignments(["enable_gles=True", "shared=True"]).unwrap();
        let env = Environment::capture(&options, &windows());

        assert!(env.gles);
        assert!(env.shared);
        assert_eq!(env.os, Os::Windows);
        assert!(!env.boost_filesystem);
    }
}
