mod cli;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use hello_example::{HelloComponent, HelloModule, HELLO_INTERFACE};
use log::{error, info};
use scr_core::{Module, ModuleEvent, ScrConfig, ScrRuntime};
use scr_core::service::InMemoryServiceRegistry;

/// SCR: a declarative component runtime
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Simple ping command for testing
    #[arg(long)]
    ping: bool,

    /// Configuration file (JSON, YAML or TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured log level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the example module, greet, stop the module
    Run {
        /// Print component tables as JSON
        #[arg(long)]
        json: bool,

        /// Who to greet
        #[arg(long, default_value = "world")]
        name: String,
    },
    /// List the components of the example module
    List {
        #[arg(long)]
        json: bool,
    },
}

fn load_config(args: &CliArgs) -> Result<ScrConfig, scr_core::KernelError> {
    let mut config = match &args.config {
        Some(path) => ScrConfig::load(path)?,
        None => ScrConfig::default(),
    };
    if let Some(level) = &args.log_level {
        config = ScrConfig {
            log_level: level.clone(),
            ..config
        };
    }
    Ok(config)
}

fn print_components(runtime: &ScrRuntime, json: bool) -> Result<(), scr_core::KernelError> {
    let snapshots = runtime.list_components();
    if json {
        let rendered = cli::render_json(&snapshots).map_err(|e| e.to_string())?;
        println!("{}", rendered);
    } else {
        println!("{}", cli::render_table(&snapshots));
    }
    Ok(())
}

async fn run(runtime: &ScrRuntime, module: Arc<HelloModule>, json: bool, name: &str) -> Result<(), scr_core::KernelError> {
    runtime.module_changed(&ModuleEvent::Started(module.clone()));
    runtime.settle().await?;
    if !json {
        println!("Components after module start:");
    }
    print_components(runtime, json)?;

    let greeting = runtime
        .services()
        .providers(HELLO_INTERFACE)
        .first()
        .and_then(|service| service.with_object::<HelloComponent, _>(|hello| hello.say_hello(name)));
    match greeting {
        Some(greeting) if !json => println!("{}", greeting),
        Some(greeting) => info!("{}", greeting),
        None => return Err(format!("No {} available", HELLO_INTERFACE).into()),
    }

    runtime.module_changed(&ModuleEvent::Stopping(module));
    runtime.settle().await?;
    if !json {
        println!("Components after module stop:");
    }
    print_components(runtime, json)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    if args.ping {
        println!("pong");
        return ExitCode::SUCCESS;
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let level = match config.level_filter() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let runtime = ScrRuntime::new(config, Arc::new(InMemoryServiceRegistry::new()));
    let module = HelloModule::new(1);

    let result = match args.command {
        Some(Commands::List { json }) => {
            runtime.start(&[module.clone() as Arc<dyn Module>]);
            match runtime.settle().await {
                Ok(()) => print_components(&runtime, json),
                Err(e) => Err(e),
            }
        }
        Some(Commands::Run { json, name }) => run(&runtime, module, json, &name).await,
        None => run(&runtime, module, false, "world").await,
    };

    if let Err(e) = runtime.stop().await {
        error!("Failed to stop runtime: {}", e);
    }
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
