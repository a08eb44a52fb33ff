use anyhow::Context;
use hostlaunch::cli::{Args, ConfigDiscovery, ExecutionMode, LauncherConfig, RunConfig};
use hostlaunch::env;
use hostlaunch::launcher::{
    ContainerLauncher, DockerEngine, ImageReference, LaunchRequest, LimitResolver, NixHost,
    Runner, envdir,
};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = match Args::parse().mode() {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    match mode {
        ExecutionMode::Run(config) => {
            let status = run(config).await?;
            std::process::exit(exit_code(status));
        }
        ExecutionMode::Ulimits { ulimits, json } => {
            init_logging(None, false);
            let limits =
                LimitResolver::new(Arc::new(NixHost::new())).resolve(ulimits.as_slice())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&limits)?);
            } else {
                for limit in limits {
                    println!("{:<8} {:>20} {:>20}", limit.name, limit.soft, limit.hard);
                }
            }
            Ok(())
        }
        ExecutionMode::ParseImage(reference) => {
            let parsed = ImageReference::parse(&reference);
            let (scheme, path) = parsed.as_parts();
            println!("scheme: {}", scheme);
            println!("path:   {}", path);
            Ok(())
        }
        ExecutionMode::ShowConfig => {
            ConfigDiscovery::show_discovery_info();
            Ok(())
        }
    }
}

async fn run(config: RunConfig) -> anyhow::Result<i64> {
    let launcher_config = ConfigDiscovery::load(config.config_override.as_deref())
        .context("Failed to load configuration")?;
    init_logging(launcher_config.log_filter.as_deref(), config.verbose);

    let request = build_request(&config, &launcher_config)?;
    info!("Launching {} from {}", request.name, config.image);

    let engine = DockerEngine::with_config(launcher_config.engine_config()).await?;
    let mut options = launcher_config.run_options();
    options.pull_missing &= !config.no_pull;
    options.remove_stale &= !config.keep_stale;
    options.detach = config.detach;
    debug!("Run options: {:?}", options);

    let runner = Runner::new(engine, ContainerLauncher::with_host_system(), options);
    Ok(runner.run(request).await?)
}

fn build_request(config: &RunConfig, defaults: &LauncherConfig) -> anyhow::Result<LaunchRequest> {
    let name = config.name.clone().unwrap_or_else(|| {
        format!("{}-{}", env::CONTAINER_NAME_PREFIX, uuid::Uuid::new_v4())
    });

    let mut request = LaunchRequest::from_reference(name, config.image.clone())
        .command(config.command.iter().cloned());
    if !config.entrypoint.is_empty() {
        request = request.entrypoint(config.entrypoint.iter().cloned());
    }

    // An explicit --ulimit list replaces the configured defaults entirely.
    request.ulimits = if config.ulimits.is_empty() {
        defaults.defaults.ulimits.clone()
    } else {
        config.ulimits.clone()
    };

    let envdirs: Vec<_> = defaults
        .defaults
        .envdirs
        .iter()
        .chain(config.envdirs.iter())
        .collect();
    request.env = envdir::read_env_dirs(envdirs.as_slice())?;
    request.binds = config.volumes.clone();

    Ok(request)
}

fn init_logging(configured: Option<&str>, verbose: bool) {
    let fallback = if verbose {
        env::VERBOSE_LOG_FILTER
    } else {
        configured.unwrap_or(env::DEFAULT_LOG_FILTER)
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Clamp a container status into a process exit code.
fn exit_code(status: i64) -> i32 {
    i32::try_from(status).unwrap_or(1)
}
