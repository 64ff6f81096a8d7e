// Entry point for the `stager` command.
//
// Each invocation runs exactly one step against the current directory and
// prints the step's result to stdout as JSON. Diagnostics go to stderr.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use stager_common::{ContainerBackendKind, HostContext, SettingsStore, StagerSettings};
use stager_sdk::StringUtil;
use std::path::PathBuf;

use stager_worker::steps::{ImageStagingRequest, PwdArguments, StageProjectRequest};
use stager_worker::worker::{Worker, EXIT_FAILED};

#[derive(Parser, Debug)]
#[command(name = "stager", version, about = "Release staging steps for CI agents")]
struct Cli {
    #[command(flatten)]
    overrides: SettingsOverrides,

    #[command(subcommand)]
    command: Command,
}

/// Highest-precedence configuration, applied over the settings file and
/// environment.
#[derive(Args, Debug)]
struct SettingsOverrides {
    /// Settings file to read instead of `./.stager`.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Docker registry host images are staged to.
    #[arg(long, global = true)]
    registry_host: Option<String>,

    /// Docker registry port images are staged to.
    #[arg(long, global = true)]
    registry_port: Option<String>,

    /// Where container scopes run: host, docker or kubernetes.
    #[arg(long, global = true)]
    backend: Option<ContainerBackendKind>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the working directory, or create a temporary one.
    Pwd {
        #[arg(long)]
        tmp: bool,
    },

    /// Pull, re-tag and push extra fabric8 images.
    StageExtraImages {
        #[arg(long)]
        tag: String,

        /// Image name, repeatable.
        #[arg(long = "image")]
        images: Vec<String>,
    },

    /// Clone a project, resolve its release version and stage its images.
    StageProject {
        #[arg(long)]
        git_url: Option<String>,

        #[arg(long)]
        release_version: Option<String>,

        #[arg(long = "repo-id")]
        repo_ids: Vec<String>,

        #[arg(long = "extra-image")]
        extra_images: Vec<String>,

        #[arg(long)]
        cd_organisation: Option<String>,

        #[arg(long = "cd-branch")]
        cd_branches: Vec<String>,
    },

    /// Run a step by name with JSON arguments.
    Step {
        name: String,

        /// JSON object of step arguments.
        #[arg(long)]
        args: Option<String>,
    },
}

impl Command {
    /// The registered step name and its JSON arguments.
    fn into_invocation(self) -> Result<(String, Value)> {
        let invocation = match self {
            Command::Pwd { tmp } => ("pwd".to_string(), serde_json::to_value(PwdArguments { tmp })?),
            Command::StageExtraImages { tag, images } => (
                "stageExtraImages".to_string(),
                serde_json::to_value(ImageStagingRequest::new(tag, images))?,
            ),
            Command::StageProject {
                git_url,
                release_version,
                repo_ids,
                extra_images,
                cd_organisation,
                cd_branches,
            } => (
                "stageProject".to_string(),
                serde_json::to_value(StageProjectRequest {
                    git_clone_url: git_url,
                    release_version,
                    repo_ids,
                    extra_images,
                    cd_organisation,
                    cd_branches,
                })?,
            ),
            Command::Step { name, args } => {
                let arguments = match args {
                    Some(text) => serde_json::from_str(&text)
                        .with_context(|| format!("--args for step '{name}' is not valid JSON"))?,
                    None => json!({}),
                };
                (name, arguments)
            }
        };
        Ok(invocation)
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to build Tokio runtime: {e}");
            std::process::exit(EXIT_FAILED);
        }
    };

    let exit_code = runtime.block_on(async move {
        match run(cli).await {
            Ok(code) => code,
            Err(e) => {
                tracing::error!("stager failed: {:#}", e);
                EXIT_FAILED
            }
        }
    });

    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<i32> {
    let settings = load_settings(&cli.overrides)?;
    let host_context = HostContext::from_process(settings)
        .context("Failed to read the current working directory")?;
    let worker = Worker::new(host_context).context("Invalid container backend settings")?;

    let (name, arguments) = cli.command.into_invocation()?;
    let result = worker.run_step(&name, arguments).await;
    let exit_code = Worker::exit_code(&result);

    if let Ok(value) = &result {
        println!("{}", StringUtil::convert_to_json(value)?);
    }
    Ok(exit_code)
}

/// Settings file, then environment, then command-line flags. A file named
/// with `--settings` must exist; `./.stager` is optional.
fn load_settings(overrides: &SettingsOverrides) -> Result<StagerSettings> {
    let store = match &overrides.settings {
        Some(path) => SettingsStore::required(path),
        None => {
            let cwd = std::env::current_dir().context("Failed to read the current directory")?;
            SettingsStore::for_directory(&cwd)
        }
    };
    let mut settings = store
        .load_with_environment()
        .with_context(|| format!("Failed to load settings from '{}'", store.settings_file().display()))?;

    if let Some(host) = &overrides.registry_host {
        settings.registry_host = Some(host.clone());
    }
    if let Some(port) = &overrides.registry_port {
        settings.registry_port = Some(port.clone());
    }
    if let Some(backend) = overrides.backend {
        settings.container_backend = backend;
    }
    Ok(settings)
}
