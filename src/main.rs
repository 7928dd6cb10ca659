use anyhow::{Context, Result};
use bem_config::{CascadeOptions, ConfigCascade, EffectiveConfig, SetLevelsOptions};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bem-config")]
#[command(
	author,
	version,
	about = "Resolve cascading BEM project configuration"
)]
#[command(arg_required_else_help = true)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// Directory to start discovery from (defaults to the current directory)
	#[arg(long, global = true, value_name = "DIR")]
	cwd: Option<PathBuf>,

	/// Base name of rc files (`bem` looks for `.bemrc`)
	#[arg(long, global = true, default_value = bem_config::config::DEFAULT_NAME)]
	name: String,

	/// Use this config file instead of walking the directory tree
	#[arg(long, global = true, value_name = "FILE")]
	config: Option<PathBuf>,

	/// Highest directory the upward walk visits
	#[arg(long, global = true, value_name = "DIR")]
	fs_root: Option<PathBuf>,

	/// Directory holding the user-level rc file
	#[arg(long, global = true, value_name = "DIR")]
	fs_home: Option<PathBuf>,

	/// Resolve with blocking filesystem calls instead of the async runtime
	#[arg(long, global = true)]
	sync: bool,
}

#[derive(Subcommand)]
enum Commands {
	/// Print the project root directory
	Root,
	/// Print the merged effective configuration
	Show,
	/// List discovered config fragments in cascade order
	Fragments,
	/// Print the settings of one level
	Level {
		/// Level directory, relative to the project root
		path: PathBuf,
	},
	/// Print the settings of every project and library level
	LevelMap,
	/// Print the levels of a named set
	Levels {
		/// Set name
		set: String,

		/// Drop repeated levels
		#[arg(long)]
		unique: bool,
	},
	/// Print the location and configuration of a library
	Library {
		/// Library name
		name: String,
	},
	/// Print the configuration of a module
	Module {
		/// Module name
		name: String,
	},
}

fn main() -> ExitCode {
	init_logging();

	match run() {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:?}");
			ExitCode::FAILURE
		}
	}
}

fn init_logging() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}

fn run() -> Result<ExitCode> {
	let cli = Cli::parse();
	let cascade = ConfigCascade::new(build_options(&cli)?);

	let output = if cli.sync {
		execute_sync(&cascade, &cli.command)?
	} else {
		let runtime = tokio::runtime::Builder::new_current_thread()
			.enable_all()
			.build()
			.context("Failed to start async runtime")?;
		runtime.block_on(execute_async(&cascade, &cli.command))?
	};

	let rendered = serde_json::to_string_pretty(&output).context("Failed to render output")?;
	println!("{rendered}");
	Ok(ExitCode::SUCCESS)
}

fn build_options(cli: &Cli) -> Result<CascadeOptions> {
	let cwd = match cli.cwd {
		Some(ref cwd) => cwd.clone(),
		None => std::env::current_dir().context("Failed to get current directory")?,
	};

	let mut options = CascadeOptions::new(cwd).with_name(&cli.name);
	if let Some(ref config) = cli.config {
		options = options.with_config_path(config);
	}
	if let Some(ref fs_root) = cli.fs_root {
		options = options.with_fs_root(fs_root);
	}
	if let Some(ref fs_home) = cli.fs_home {
		options = options.with_fs_home(fs_home);
	}
	Ok(options)
}

/// Output of the `library` command.
#[derive(Serialize)]
struct LibraryReport {
	path: PathBuf,
	root: Option<PathBuf>,
	config: EffectiveConfig,
}

fn render<T: Serialize>(value: T) -> Result<Value> {
	serde_json::to_value(value).context("Failed to render output")
}

async fn execute_async(cascade: &ConfigCascade, command: &Commands) -> Result<Value> {
	match command {
		Commands::Root => render(cascade.root().await?),
		Commands::Show => render(cascade.effective_config().await?),
		Commands::Fragments => render(cascade.fragments().await?),
		Commands::Level { path } => render(
			cascade
				.level_config(path)
				.await
				.with_context(|| format!("Failed to resolve level {}", path.display()))?,
		),
		Commands::LevelMap => render(cascade.level_map().await?),
		Commands::Levels { set, unique } => render(
			cascade
				.resolve_set_levels_with(set, SetLevelsOptions { unique: *unique })
				.await
				.with_context(|| format!("Failed to resolve set `{set}`"))?,
		),
		Commands::Library { name } => {
			let library = cascade
				.library(name)
				.await
				.with_context(|| format!("Failed to load library `{name}`"))?;
			render(LibraryReport {
				path: library.options().cwd.clone(),
				root: library.root().await?,
				config: library.effective_config().await?,
			})
		}
		Commands::Module { name } => render(cascade.module(name).await?),
	}
}

fn execute_sync(cascade: &ConfigCascade, command: &Commands) -> Result<Value> {
	match command {
		Commands::Root => render(cascade.root_sync()?),
		Commands::Show => render(cascade.effective_config_sync()?),
		Commands::Fragments => render(cascade.fragments_sync()?),
		Commands::Level { path } => render(
			cascade
				.level_config_sync(path)
				.with_context(|| format!("Failed to resolve level {}", path.display()))?,
		),
		Commands::LevelMap => render(cascade.level_map_sync()?),
		Commands::Levels { set, unique } => render(
			cascade
				.resolve_set_levels_with_sync(set, SetLevelsOptions { unique: *unique })
				.with_context(|| format!("Failed to resolve set `{set}`"))?,
		),
		Commands::Library { name } => {
			let library = cascade
				.library_sync(name)
				.with_context(|| format!("Failed to load library `{name}`"))?;
			render(LibraryReport {
				path: library.options().cwd.clone(),
				root: library.root_sync()?,
				config: library.effective_config_sync()?,
			})
		}
		Commands::Module { name } => render(cascade.module_sync(name)?),
	}
}
