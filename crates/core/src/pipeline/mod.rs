//! Recipe façade tying the individual steps into the fixed sequence
//! declare → materialize → resolve → export, and the full `create` flow on top
//! of it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    build::{BuildContext, BuildEngine},
    component::{materialize, ComponentTable, Declaration},
    recipe::{self, RecipeData, METADATA},
    resolver::{ComponentInfo, PackageInfo, Resolver},
    source::{SourceFetcher, SourceRef},
    toolchain::Toolchain,
    Environment, OptionName, Options, Result, Settings,
};

/// On-disk layout of a single `create` run.
#[derive(Debug, Clone)]
pub struct BuildLayout {
    root: PathBuf,
}

impl BuildLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn source_dir(&self) -> PathBuf {
        self.root.join("src")
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root.join("build")
    }

    pub fn install_dir(&self) -> PathBuf {
        self.root.join("package")
    }

    /// Download cache for release archives, kept outside the extracted tree.
    pub fn download_dir(&self) -> PathBuf {
        self.root.join("downloads")
    }
}

/// Package header plus export entries, as printed for the manifest writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageReport {
    pub name: String,
    pub version: String,
    pub license: String,
    pub author: String,
    pub url: String,
    pub description: String,
    pub topics: Vec<String>,
    pub components: Vec<ComponentInfo>,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    options: Options,
    settings: Settings,
    data: RecipeData,
    version: String,
}

impl Pipeline {
    /// Applies platform rules to `options` and validates them against the
    /// recipe data for `version`.
    pub fn new(
        mut options: Options,
        settings: Settings,
        data: RecipeData,
        version: impl Into<String>,
    ) -> Result<Self> {
        let version = version.into();
        options.apply_platform_rules(&settings);
        options.validate()?;
        data.source(&version)?;

        tracing::debug!(%version, os = %settings.os, "recipe configured");
        Ok(Self {
            options,
            settings,
            data,
            version,
        })
    }

    /// Pipeline for the current recipe version using the embedded data.
    pub fn with_builtin_data(options: Options, settings: Settings) -> Result<Self> {
        Self::new(options, settings, RecipeData::builtin()?, METADATA.version)
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn environment(&self) -> Environment {
        Environment::capture(&self.options, &self.settings)
    }

    pub fn component_table(&self) -> Result<ComponentTable> {
        materialize(&Declaration::projectm(), &self.environment())
    }

    /// Export entries for every active component.
    pub fn package_info(&self) -> Result<PackageInfo> {
        let table = self.component_table()?;
        let resolver = Resolver::new(&table, &self.options)?;
        Ok(resolver.export(METADATA.name))
    }

    /// Wraps export entries with the recipe metadata for this version.
    pub fn report(&self, info: PackageInfo) -> PackageReport {
        PackageReport {
            name: METADATA.name.to_string(),
            version: self.version.clone(),
            license: METADATA.license.to_string(),
            author: METADATA.author.to_string(),
            url: METADATA.url.to_string(),
            description: METADATA.description.to_string(),
            topics: METADATA.topics.iter().map(|t| t.to_string()).collect(),
            components: info.components,
        }
    }

    pub fn requirements(&self) -> Result<Vec<String>> {
        recipe::requirements(&self.options, &self.settings, &self.data, &self.version)
    }

    pub fn toolchain(&self) -> Toolchain {
        Toolchain::generate(&self.options)
    }

    pub fn source_ref(&self) -> Result<SourceRef> {
        if self.options.flag(OptionName::UseLocalSourceDir) {
            if let Some(dir) = self.options.local_source_dir() {
                return Ok(SourceRef::Local(PathBuf::from(dir)));
            }
        }
        let entry = self.data.source(&self.version)?;
        Ok(SourceRef::Archive {
            url: entry.url.clone(),
            sha256: entry.sha256.clone(),
        })
    }

    /// Fetches, builds, optionally tests and installs the library, then
    /// returns its export entries. Stops at the first failing step.
    pub fn create(
        &self,
        layout: &BuildLayout,
        fetcher: &dyn SourceFetcher,
        engine: &mut dyn BuildEngine,
    ) -> Result<PackageInfo> {
        // Resolve up front so configuration errors surface before any work.
        let info = self.package_info()?;
        let requirements = self.requirements()?;
        tracing::info!(?requirements, "package requirements");

        let source_dir = fetcher.fetch(&self.source_ref()?, &layout.source_dir())?;
        let ctx = self.build_context(layout, &source_dir)?;

        engine.configure(&ctx)?;
        engine.build(&ctx)?;
        if self.options.flag(OptionName::BuildTesting) {
            engine.test(&ctx)?;
        }
        engine.install(&ctx)?;

        tracing::info!(
            components = info.components.len(),
            install_dir = %ctx.install_dir.display(),
            "package created"
        );
        Ok(info)
    }

    fn build_context(&self, layout: &BuildLayout, source_dir: &Path) -> Result<BuildContext> {
        let build_dir = layout.build_dir();
        let toolchain_file = self.toolchain().write(&build_dir)?;
        Ok(BuildContext {
            source_dir: source_dir.to_path_buf(),
            build_dir,
            install_dir: layout.install_dir(),
            toolchain_file,
            build_type: self.settings.build_type.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build::BuildStep, options::Os, RecipeError};

    #[derive(Debug, Default)]
    struct RecordingEngine {
        steps: Vec<BuildStep>,
        fail_at: Option<BuildStep>,
    }

    impl RecordingEngine {
        fn step(&mut self, step: BuildStep) -> Result<()> {
            self.steps.push(step);
            if self.fail_at == Some(step) {
                return Err(RecipeError::build(step.to_string(), "exit status: 2"));
            }
            Ok(())
        }
    }

    impl BuildEngine for RecordingEngine {
        fn configure(&mut self, ctx: &BuildContext) -> Result<()> {
            assert!(ctx.toolchain_file.is_file());
            self.step(BuildStep::Configure)
        }

        fn build(&mut self, _ctx: &BuildContext) -> Result<()> {
            self.step(BuildStep::Build)
        }

        fn test(&mut self, _ctx: &BuildContext) -> Result<()> {
            self.step(BuildStep::Test)
        }

        fn install(&mut self, _ctx: &BuildContext) -> Result<()> {
            self.step(BuildStep::Install)
        }
    }

    struct FixedFetcher(PathBuf);

    impl SourceFetcher for FixedFetcher {
        fn fetch(&self, _source: &SourceRef, _dest: &Path) -> Result<PathBuf> {
            Ok(self.0.clone())
        }
    }

    fn linux() -> Settings {
        Settings {
            os: Os::Linux,
            ..Settings::default()
        }
    }

    fn pipeline(assignments: &[&str]) -> Pipeline {
        let options = Options::from_assignments(assignments.iter().copied()).unwrap();
        Pipeline::with_builtin_data(options, linux()).unwrap()
    }

    #[test]
    fn default_package_info() {
        let info = pipeline(&[]).package_info().unwrap();

        let names: Vec<&str> = info.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["playlist", "projectm"]);

        let projectm = info.component("projectm").unwrap();
        assert_eq!(projectm.cmake_target_name, "libprojectm::projectm");
        assert_eq!(projectm.libs, ["projectM-4"]);
        assert_eq!(projectm.requires, ["playlist", "opengl::opengl"]);
    }

    #[test]
    fn report_carries_recipe_metadata() {
        let pipeline = pipeline(&[]);
        let report = pipeline.report(pipeline.package_info().unwrap());

        assert_eq!(report.name, "libprojectm");
        assert_eq!(report.version, "4.1.0");
        assert_eq!(report.license, "LGPL 2.1");
        assert_eq!(report.topics, ["audio", "opengl", "visualizer", "graphics"]);
        assert_eq!(report.components.len(), 2);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["author"], "The projectM team");
        assert_eq!(json["components"][1]["name"], "projectm");
    }

    #[test]
    fn download_cache_sits_beside_extracted_sources() {
        let layout = BuildLayout::new("/work");
        assert_eq!(layout.download_dir(), PathBuf::from("/work/downloads"));
        assert!(!layout.download_dir().starts_with(layout.source_dir()));
    }

    #[test]
    fn sdl_ui_with_boost_filesystem() {
        let info = pipeline(&["enable_sdl_ui=True", "enable_boost_filesystem=True"])
            .package_info()
            .unwrap();

        let ui = info.component("projectm-test-ui").unwrap();
        assert!(ui.libs.is_empty());
        assert_eq!(ui.requires, ["projectm", "sdl::sdl", "boost::filesystem"]);
    }

    #[test]
    fn package_info_is_stable_across_calls() {
        let pipeline = pipeline(&["enable_gles=True"]);
        assert_eq!(pipeline.package_info().unwrap(), pipeline.package_info().unwrap());
    }

    #[test]
    fn windows_adds_glew_and_drops_fpic() {
        let settings = Settings {
            os: Os::Windows,
            ..Settings::default()
        };
        let pipeline = Pipeline::with_builtin_data(Options::new(), settings).unwrap();

        assert!(pipeline.options().get_safe(OptionName::Fpic).is_none());
        let info = pipeline.package_info().unwrap();
        assert_eq!(
            info.component("projectm").unwrap().requires,
            ["playlist", "opengl::opengl", "glew::glew"]
        );
    }

    #[test]
    fn invalid_option_combination_is_rejected() {
        let options = Options::from_assignments(["use_local_source_dir=True"]).unwrap();
        let err = Pipeline::with_builtin_data(options, linux()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn local_source_option_selects_local_reference() {
        let pipeline = pipeline(&["use_local_source_dir=True", "local_source_dir=/opt/projectm"]);
        assert_eq!(
            pipeline.source_ref().unwrap(),
            SourceRef::Local(PathBuf::from("/opt/projectm"))
        );

        let remote = self::pipeline(&[]).source_ref().unwrap();
        assert!(matches!(remote, SourceRef::Archive { .. }));
    }

    #[test]
    fn create_runs_steps_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let layout = BuildLayout::new(dir.path());
        let mut engine = RecordingEngine::default();

        let info = pipeline(&[])
            .create(&layout, &FixedFetcher(dir.path().to_path_buf()), &mut engine)
            .unwrap();

        assert_eq!(
            engine.steps,
            [BuildStep::Configure, BuildStep::Build, BuildStep::Install]
        );
        assert_eq!(info.components.len(), 2);
    }

    #[test]
    fn create_runs_tests_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let layout = BuildLayout::new(dir.path());
        let mut engine = RecordingEngine::default();

        pipeline(&["build_testing=True"])
            .create(&layout, &FixedFetcher(dir.path().to_path_buf()), &mut engine)
            .unwrap();

        assert_eq!(
            engine.steps,
            [
                BuildStep::Configure,
                BuildStep::Build,
                BuildStep::Test,
                BuildStep::Install
            ]
        );
    }

    #[test]
    fn create_stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let layout = BuildLayout::new(dir.path());
        let mut engine = RecordingEngine {
            fail_at: Some(BuildStep::Build),
            ..RecordingEngine::default()
        };

        let err = pipeline(&[])
            .create(&layout, &FixedFetcher(dir.path().to_path_buf()), &mut engine)
            .unwrap_err();

        assert!(matches!(err, RecipeError::Build { .. }));
        assert_eq!(engine.steps, [BuildStep::Configure, BuildStep::Build]);
    }

    #[test]
    fn fetch_failure_prevents_build() {
        let dir = tempfile::tempdir().unwrap();
        let layout = BuildLayout::new(dir.path());
        let mut engine = RecordingEngine::default();
        let fetcher = crate::source::FilesystemFetcher::new(dir.path().join("cache"));

        let err = pipeline(&[])
            .create(&layout, &fetcher, &mut engine)
            .unwrap_err();

        assert!(matches!(err, RecipeError::Fetch(_)));
        assert!(engine.steps.is_empty());
    }
}
