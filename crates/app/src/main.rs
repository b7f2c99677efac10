use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use projectm_recipe_core::{
    BuildLayout, CMakeEngine, FilesystemFetcher, Options, Pipeline, RecipeData, Settings, METADATA,
};
use tracing_subscriber::EnvFilter;

fn main() -> projectm_recipe_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Info { recipe } => run_info(&recipe),
        Commands::Requirements { recipe } => run_requirements(&recipe),
        Commands::Toolchain { recipe, output } => run_toolchain(&recipe, &output),
        Commands::Create {
            recipe,
            build_dir,
            archive_cache,
        } => run_create(&recipe, build_dir, archive_cache),
    }
}

fn run_info(recipe: &RecipeArgs) -> projectm_recipe_core::Result<()> {
    let pipeline = recipe.pipeline()?;
    let info = pipeline.package_info()?;
    println!("{}", serde_json::to_string_pretty(&pipeline.report(info))?);
    Ok(())
}

fn run_requirements(recipe: &RecipeArgs) -> projectm_recipe_core::Result<()> {
    let pipeline = recipe.pipeline()?;
    for requirement in pipeline.requirements()? {
        println!("{requirement}");
    }
    Ok(())
}

fn run_toolchain(recipe: &RecipeArgs, output: &PathBuf) -> projectm_recipe_core::Result<()> {
    let pipeline = recipe.pipeline()?;
    let path = pipeline.toolchain().write(output)?;
    println!("{}", path.display());
    Ok(())
}

fn run_create(
    recipe: &RecipeArgs,
    build_dir: PathBuf,
    archive_cache: Option<PathBuf>,
) -> projectm_recipe_core::Result<()> {
    let pipeline = recipe.pipeline()?;
    tracing::info!(
        name = METADATA.name,
        version = pipeline.version(),
        ?build_dir,
        "creating package"
    );

    let layout = BuildLayout::new(build_dir);
    let fetcher = FilesystemFetcher::new(archive_cache.unwrap_or_else(|| layout.download_dir()));
    let mut engine = CMakeEngine::new();

    let info = pipeline.create(&layout, &fetcher, &mut engine)?;
    println!("{}", serde_json::to_string_pretty(&pipeline.report(info))?);
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Package recipe for the libprojectM visualizer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the exported components of the package as JSON.
    Info {
        #[command(flatten)]
        recipe: RecipeArgs,
    },
    /// Print the third-party packages this configuration requires.
    Requirements {
        #[command(flatten)]
        recipe: RecipeArgs,
    },
    /// Write the CMake toolchain file for this configuration.
    Toolchain {
        #[command(flatten)]
        recipe: RecipeArgs,
        /// Directory the toolchain file is written to.
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },
    /// Fetch, build and install the library, then print its components.
    ///
    /// The embedded recipe data pins no archive checksum, so either pass
    /// `--data` with a file that sets `sha256` for the version, or build from
    /// a checkout with `-o use_local_source_dir=True -o local_source_dir=<dir>`.
    Create {
        #[command(flatten)]
        recipe: RecipeArgs,
        /// Working directory for sources, build tree and install prefix.
        #[arg(long)]
        build_dir: PathBuf,
        /// Directory holding downloaded release archives.
        /// Defaults to `<build-dir>/downloads`.
        #[arg(long)]
        archive_cache: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct RecipeArgs {
    /// Recipe option as `name=value`, e.g. `enable_gles=True`.
    #[arg(short = 'o', long = "option", value_name = "NAME=VALUE")]
    options: Vec<String>,
    /// Build setting as `key=value`, e.g. `os=Windows`.
    #[arg(short = 's', long = "setting", value_name = "KEY=VALUE")]
    settings: Vec<String>,
    /// Recipe data file overriding the embedded sources and versions.
    #[arg(long)]
    data: Option<PathBuf>,
    /// Library version to package.
    #[arg(long = "package-version", default_value = METADATA.version)]
    package_version: String,
}

impl RecipeArgs {
    fn pipeline(&self) -> projectm_recipe_core::Result<Pipeline> {
        let options = Options::from_assignments(&self.options)?;
        let settings = Settings::from_assignments(&self.settings)?;
        let data = match &self.data {
            Some(path) => RecipeData::load(path)?,
            None => RecipeData::builtin()?,
        };
        Pipeline::new(options, settings, data, self.package_version.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_options() {
        let cli = Cli::try_parse_from([
            "projectm-recipe",
            "info",
            "-o",
            "enable_gles=True",
            "--option",
            "shared=True",
            "-s",
            "os=Windows",
        ])
        .unwrap();

        match cli.command {
            Commands::Info { recipe } => {
                assert_eq!(recipe.options, ["enable_gles=True", "shared=True"]);
                assert_eq!(recipe.settings, ["os=Windows"]);
                assert_eq!(recipe.package_version, METADATA.version);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn package_version_flag_selects_version() {
        let cli = Cli::try_parse_from(["projectm-recipe", "requirements", "--package-version", "4.0.0"])
            .unwrap();
        let Commands::Requirements { recipe } = cli.command else {
            panic!("expected requirements command");
        };
        assert_eq!(recipe.package_version, "4.0.0");
        assert!(recipe.pipeline().unwrap_err().is_configuration());
    }

    #[test]
    fn unknown_option_fails_before_resolution() {
        let cli = Cli::try_parse_from(["projectm-recipe", "info", "-o", "enable_vulkan=True"])
            .unwrap();
        let Commands::Info { recipe } = cli.command else {
            panic!("expected info command");
        };
        assert!(recipe.pipeline().unwrap_err().is_configuration());
    }

    #[test]
    fn create_help_names_source_requirements() {
        use clap::CommandFactory;
        let mut command = Cli::command();
        let create = command.find_subcommand_mut("create").unwrap();
        let help = create.render_long_help().to_string();

        assert!(help.contains("--data"));
        assert!(help.contains("use_local_source_dir"));
        assert!(help.contains("<build-dir>/downloads"));
    }

    #[test]
    fn cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
