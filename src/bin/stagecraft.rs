use clap::{command, Parser, Subcommand};
use stagecraft::{
    formatter::ErrorReport, tokenizer::tokenize, Callbacks, Error, Value, Vm, VmConfig,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a stage file and report errors
    Check {
        #[arg(default_value = "data/station.stage")]
        file: PathBuf,
    },

    /// Print the token stream of a stage file
    Tokens {
        #[arg(default_value = "data/station.stage")]
        file: PathBuf,
    },

    /// Load a stage file and drive it for a number of ticks
    Run(RunArgs),
}

#[derive(Parser)]
struct RunArgs {
    #[arg(default_value = "data/station.stage")]
    file: PathBuf,

    /// VM config file (JSON)
    #[arg(short, long, default_value = "stagecraft.json")]
    config: PathBuf,

    /// Scenario to start before the first tick
    #[arg(short, long)]
    scenario: Option<String>,

    #[arg(short, long, default_value = "10")]
    ticks: u64,

    /// Milliseconds per tick
    #[arg(short, long, default_value = "16")]
    delta: f64,

    /// Events to emit before the first tick, as NAME or NAME=JSON
    #[arg(short, long)]
    emit: Vec<String>,
}

fn read_source(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path)
        .map_err(|e| Error::Internal(format!("Failed to read stage file {:?}: {}", path, e)))
}

fn report(path: &Path, source: &str, error: &Error) -> Error {
    let file = path.display().to_string();
    eprint!("{}", ErrorReport::new(&file, source).render(error));
    Error::Internal(format!("{} failed", file))
}

fn check(file: &Path) -> Result<(), Error> {
    let source = read_source(file)?;
    let module = stagecraft::parse(&source).map_err(|e| report(file, &source, &e))?;
    for (kind, count) in module.summary() {
        println!("{:>12}  {}", kind, count);
    }
    println!("{}: ok", file.display());
    Ok(())
}

fn tokens(file: &Path) -> Result<(), Error> {
    let source = read_source(file)?;
    let tokens = tokenize(&source).map_err(|e| report(file, &source, &e.into()))?;
    for token in tokens {
        println!("{:>4}:{:<3} {:<10} {:?}", token.line, token.column, token.kind, token.text);
    }
    Ok(())
}

fn parse_event(spec: &str) -> Result<(String, Value), Error> {
    match spec.split_once('=') {
        Some((name, data)) => {
            let data: serde_json::Value = serde_json::from_str(data)?;
            Ok((name.to_string(), Value::from(data)))
        }
        None => Ok((spec.to_string(), Value::Null)),
    }
}

fn drive(vm: &mut Vm, args: &RunArgs) -> Result<(), Error> {
    for spec in &args.emit {
        let (name, data) = parse_event(spec)?;
        vm.emit(&name, data)?;
    }
    for _ in 0..args.ticks {
        vm.tick(args.delta)?;
    }
    Ok(())
}

fn run(args: &RunArgs) -> Result<(), Error> {
    let config = if args.config.exists() {
        VmConfig::from_file(&args.config)?
    } else {
        VmConfig::default()
    };
    debug!("config: {:?}", config);

    let source = read_source(&args.file)?;
    let mut vm = Vm::new(config);
    vm.load_source(&source)
        .map_err(|e| report(&args.file, &source, &e))?;
    info!("{} loaded", args.file.display());

    vm.set_callbacks(
        Callbacks::new()
            .on_set_state(|target, state| println!("set-state {} {}", target, state))
            .on_play_animation(|target, animation, looped| {
                println!("play {} {}{}", target, animation, if looped { " loop" } else { "" })
            })
            .on_stop_animation(|target, animation| {
                println!("stop {} {}", target, animation.unwrap_or("*"))
            })
            .on_animate(|target, to, duration, _| {
                println!("animate {} to {} over {}ms", target, to, duration.unwrap_or(0.0))
            }),
    );
    vm.on("*", |event| println!("event {} {}", event.name, event.data));

    if let Some(scenario) = &args.scenario {
        if !vm.start_scenario(scenario)? {
            return Err(Error::Internal(format!("unknown scenario '{}'", scenario)));
        }
    }

    drive(&mut vm, args).map_err(|e| report(&args.file, &source, &e))?;

    println!("{}", serde_json::to_string_pretty(&vm.state_json())?);
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = if cli.verbose {
        EnvFilter::new(default_level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into())
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    let result = match &cli.command {
        Commands::Check { file } => check(file),
        Commands::Tokens { file } => tokens(file),
        Commands::Run(args) => run(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
