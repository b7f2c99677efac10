use std::{
    fmt,
    path::{Path, PathBuf},
    process::Command,
};

use crate::{RecipeError, Result};

/// Directories and files the build engine operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    pub install_dir: PathBuf,
    pub toolchain_file: PathBuf,
    pub build_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    Configure,
    Build,
    Test,
    Install,
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BuildStep::Configure => "configure",
            BuildStep::Build => "build",
            BuildStep::Test => "test",
            BuildStep::Install => "install",
        })
    }
}

/// External build orchestration. Each step fails with
/// [`RecipeError::Build`] when the underlying tool does.
pub trait BuildEngine {
    fn configure(&mut self, ctx: &BuildContext) -> Result<()>;
    fn build(&mut self, ctx: &BuildContext) -> Result<()>;
    fn test(&mut self, ctx: &BuildContext) -> Result<()>;
    fn install(&mut self, ctx: &BuildContext) -> Result<()>;
}

/// Drives `cmake`/`ctest` as child processes.
#[derive(Debug, Clone)]
pub struct CMakeEngine {
    cmake: PathBuf,
    ctest: PathBuf,
}

impl Default for CMakeEngine {
    fn default() -> Self {
        Self {
            cmake: PathBuf::from("cmake"),
            ctest: PathBuf::from("ctest"),
        }
    }
}

impl CMakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses explicit tool paths instead of looking them up on `PATH`.
    pub fn with_programs(cmake: impl Into<PathBuf>, ctest: impl Into<PathBuf>) -> Self {
        Self {
            cmake: cmake.into(),
            ctest: ctest.into(),
        }
    }

    fn run(&self, step: BuildStep, program: &Path, args: Vec<String>) -> Result<()> {
        tracing::info!(%step, program = %program.display(), ?args, "running build step");
        let status = Command::new(program)
            .args(&args)
            .status()
            .map_err(|err| {
                RecipeError::build(step.to_string(), format!("failed to launch: {err}"))
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(RecipeError::build(step.to_string(), status.to_string()))
        }
    }
}

impl BuildEngine for CMakeEngine {
    fn configure(&mut self, ctx: &BuildContext) -> Result<()> {
        let args = vec![
            "-S".to_string(),
            ctx.source_dir.display().to_string(),
            "-B".to_string(),
            ctx.build_dir.display().to_string(),
            format!("-DCMAKE_TOOLCHAIN_FILE={}", ctx.toolchain_file.display()),
            format!("-DCMAKE_BUILD_TYPE={}", ctx.build_type),
            format!("-DCMAKE_INSTALL_PREFIX={}", ctx.install_dir.display()),
        ];
        self.run(BuildStep::Configure, &self.cmake, args)
    }

    fn build(&mut self, ctx: &BuildContext) -> Result<()> {
        let args = vec![
            "--build".to_string(),
            ctx.build_dir.display().to_string(),
            "--config".to_string(),
            ctx.build_type.clone(),
        ];
        self.run(BuildStep::Build, &self.cmake, args)
    }

    fn test(&mut self, ctx: &BuildContext) -> Result<()> {
        let args = vec![
            "--test-dir".to_string(),
            ctx.build_dir.display().to_string(),
            "-C".to_string(),
            ctx.build_type.clone(),
            "--output-on-failure".to_string(),
        ];
        self.run(BuildStep::Test, &self.ctest, args)
    }

    fn install(&mut self, ctx: &BuildContext) -> Result<()> {
        let args = vec![
            "--install".to_string(),
            ctx.build_dir.display().to_string(),
            "--config".to_string(),
            ctx.build_type.clone(),
        ];
        self.run(BuildStep::Install, &self.cmake, args)
    }
}
