//! eapgen - Main entry point
//!
//! Command-line front end for the installer generator.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use eapgen::cli::{Cli, Commands};
use eapgen::generator::{self, BuildContext};
use eapgen::pipeline::InstallerSigner;
use eapgen::{
    AssetSource, CommandSigner, GeneratorConfig, InstallerWorkspace, MakensisCompiler,
    PassthroughTranslator, load_request,
};

/// Initialize the logger with appropriate settings
fn init_logger() {
    // RUST_LOG overrides the default level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<GeneratorConfig> {
    let config = match path {
        Some(path) => {
            info!("Loading generator configuration from {:?}", path);
            GeneratorConfig::load_from_file(path)?
        }
        None => {
            debug!("No configuration file given, using defaults");
            GeneratorConfig::default()
        }
    };
    config.validate().context("Invalid generator configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    init_logger();
    info!("eapgen starting up");

    let cli = Cli::parse_args();
    debug!("CLI arguments parsed");

    match cli.command {
        Commands::Validate { request } => run_validate(cli.config.as_deref(), &request),
        Commands::Plan { request } => run_plan(cli.config.as_deref(), &request),
        Commands::Build {
            request,
            assets,
            workspace,
            sign,
            dry_run,
        } => run_build(
            cli.config.as_deref(),
            &request,
            assets,
            workspace,
            sign,
            dry_run,
        ),
    }
}

fn run_validate(config: Option<&Path>, request: &Path) -> Result<()> {
    info!("Validating build request: {:?}", request);
    let result = load_config(config).and_then(|config| {
        let request = load_request(request)?;
        generator::plan_build(&request, &config, &PassthroughTranslator)?;
        Ok(())
    });
    match result {
        Ok(()) => {
            info!("Build request validation successful");
            println!("✓ Build request is valid: {:?}", request);
        }
        Err(e) => {
            error!("Build request validation failed: {:#}", e);
            eprintln!("✗ Build request validation failed: {:#}", e);
            std::process::exit(1);
        }
    }
    Ok(())
}

fn run_plan(config: Option<&Path>, request: &Path) -> Result<()> {
    let config = load_config(config)?;
    let request = load_request(request)?;
    let plan = generator::plan_build(&request, &config, &PassthroughTranslator)?;
    println!("{}", plan.summary());
    Ok(())
}

fn run_build(
    config: Option<&Path>,
    request: &Path,
    assets: PathBuf,
    workspace: PathBuf,
    sign: Option<PathBuf>,
    dry_run: bool,
) -> Result<()> {
    let config = load_config(config)?;
    let request = load_request(request)?;
    let assets = AssetSource::new(assets);
    let workspace = InstallerWorkspace::create(workspace)?;
    info!("Building in {:?}", workspace.root());

    let ctx = BuildContext {
        config: &config,
        translator: &PassthroughTranslator,
        assets: &assets,
        compositor: None,
    };

    if dry_run {
        let prepared = generator::prepare(&workspace, &request, &ctx)?;
        println!("{}", prepared.plan.summary());
        for file in &prepared.scripts.files {
            println!("Wrote {}", file);
        }
        for w in prepared.warnings() {
            println!("Warning: {}", w);
        }
        info!("Dry run: stopping before compilation");
        return Ok(());
    }

    let compiler = MakensisCompiler::new(&config.makensis_path, config.nsis_major_version);
    let signer = sign.map(CommandSigner::new);

    let outcome = generator::build(
        &workspace,
        &request,
        &ctx,
        &compiler,
        signer.as_ref().map(|s| s as &dyn InstallerSigner),
    )?;

    println!(
        "✓ {} installer written to {}",
        if outcome.signed { "Signed" } else { "Unsigned" },
        outcome.artifact.display()
    );
    for w in &outcome.warnings {
        println!("Warning: {}", w);
    }
    Ok(())
}
