//! The `portwright` binary: parses the CLI, assembles an [`Environment`],
//! and either prints the tree's package index or drives the scheduler to
//! quiescence and reports one of the three exit codes from §6.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use portwright::cli::{Cli, EXIT_ABORT, EXIT_FAILURE, EXIT_SUCCESS};
use portwright::core::Origin;
use portwright::monitor::NullMonitor;
use portwright::scheduler::Scheduler;
use portwright::tool::{PackageTool, SystemBuildTool, SystemPackageTool};
use portwright::Environment;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.debug);

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            tracing::error!(error = %err, "aborting");
            std::process::exit(EXIT_ABORT);
        }
    }
}

fn run(cli: Cli) -> portwright::Result<i32> {
    let (origins, env_pairs) = cli.origins_and_env();
    let want_index = cli.index;
    let monitor_delay = cli.monitor_delay;
    let overrides = cli.into_overrides();
    let env = Environment::load(overrides)?;

    let package_tool: Arc<dyn PackageTool> =
        Arc::new(SystemPackageTool::new(env.pkg_program.clone(), env.chroot.clone()));

    let mut build_tool = SystemBuildTool::new(env.make_program.clone(), env.ports_dir.clone(), env.no_op);
    build_tool.chroot = env.chroot.clone();
    build_tool.batch = env.batch;
    build_tool.vars = env_pairs;
    let build_tool: Arc<dyn portwright::tool::BuildTool> = Arc::new(build_tool);

    let mut scheduler = Scheduler::new(&env, build_tool, package_tool)?;

    // `--index` wants every target's attributes loaded and linked, but
    // nothing built; every other run drives targets to the mode's ceiling.
    let ceiling = if want_index { None } else { Some(env.mode.ceiling()) };
    for origin in &origins {
        scheduler.add_target(Origin::new(origin.clone()), ceiling);
    }

    if want_index {
        let mut monitor = NullMonitor;
        let failed = scheduler.run(&mut monitor)?;
        if !failed.is_empty() {
            for origin in &failed {
                tracing::warn!(%origin, "failed before index could be generated");
            }
            return Ok(EXIT_FAILURE);
        }
        let index = portwright::pkgindex::generate(scheduler.world());
        #[allow(clippy::print_stdout)]
        {
            print!("{index}");
        }
        return Ok(EXIT_SUCCESS);
    }

    let failed = match monitor_delay {
        Some(secs) => {
            let mut monitor = portwright::monitor::NumericMonitor::new(secs);
            scheduler.run(&mut monitor)?
        }
        None => {
            let mut monitor = NullMonitor;
            scheduler.run(&mut monitor)?
        }
    };

    if failed.is_empty() {
        Ok(EXIT_SUCCESS)
    } else {
        for origin in &failed {
            tracing::error!(%origin, "failed");
        }
        Ok(EXIT_FAILURE)
    }
}

fn init_tracing(verbose: u8, debug: bool) {
    let default_level = if debug || verbose >= 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
