use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use xbasic_core::board::BoardCatalog;
use xbasic_core::build::{BuildAction, BuildOrchestrator, BuildRequest, BuildResult, BufferSet};
use xbasic_core::config::{Config, ConfigLoader};
use xbasic_core::error::{AppError, AppResult};
use xbasic_core::port::{available_ports, BaudRate, SystemPortOpener};
use xbasic_core::session::{SerialSession, WriterSink};

#[derive(Parser, Debug)]
#[command(
    name = "xbasic",
    version,
    about = "Build, load and talk to xBasic programs on Propeller boards.",
    long_about = "Runs the xBasic compiler for a project and board, classifies what it reported, and opens a serial terminal to the target. Settings come from xbasic.toml; the last board, port and project are remembered."
)]
struct Cli {
    /// Configuration file to use instead of the usual search
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List serial ports
    Ports {
        #[arg(long)]
        json: bool,
    },
    /// List board types from the board file
    Boards,
    /// Print one board's configuration block
    Board { name: String },
    /// Change one board field and save the board file
    Set {
        board: String,
        field: String,
        value: String,
    },
    /// Compile and verify
    Build(BuildArgs),
    /// Compile and write to EEPROM
    Burn(BuildArgs),
    /// Compile, load to RAM and start
    Run(BuildArgs),
    /// Run, then attach the terminal
    Debug(BuildArgs),
    /// Serial terminal: device output to stdout, stdin lines to the device
    Term(TermArgs),
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Main project file
    #[arg(long)]
    project: Option<String>,
    #[arg(long)]
    board: Option<String>,
    #[arg(long)]
    port: Option<String>,
    /// Compiler options, replacing the command's own
    #[arg(long)]
    options: Option<String>,
    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct TermArgs {
    #[arg(long)]
    port: Option<String>,
    #[arg(long)]
    baud: Option<BaudRate>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut loader = match load_config(cli.config.as_deref()) {
        Ok(loader) => loader,
        Err(e) => {
            eprintln!("xbasic: {e}");
            return ExitCode::from(e.exit_code() as u8);
        }
    };
    xbasic_core::logging::init(&loader.config().logging);

    match run(cli.command, &mut loader).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            eprintln!("xbasic: {e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn load_config(path: Option<&Path>) -> AppResult<ConfigLoader> {
    Ok(match path {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    })
}

async fn run(command: Command, loader: &mut ConfigLoader) -> AppResult<ExitCode> {
    match command {
        Command::Ports { json } => list_ports(json),
        Command::Boards => list_boards(loader.config()),
        Command::Board { name } => show_board(loader.config(), &name),
        Command::Set {
            board,
            field,
            value,
        } => set_board_field(loader.config(), &board, &field, &value),
        Command::Build(args) => compile(loader, BuildAction::Build, args).await,
        Command::Burn(args) => compile(loader, BuildAction::BurnEeprom, args).await,
        Command::Run(args) => compile(loader, BuildAction::Run, args).await,
        Command::Debug(args) => compile(loader, BuildAction::Debug, args).await,
        Command::Term(args) => terminal(loader, args).await,
    }
}

fn list_ports(json: bool) -> AppResult<ExitCode> {
    let ports = available_ports()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&ports)?);
    } else if ports.is_empty() {
        eprintln!("No serial ports found.");
    } else {
        for port in ports {
            match port.description {
                Some(description) => println!("{}\t{}", port.name, description),
                None => println!("{}", port.name),
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn load_catalog(config: &Config) -> (PathBuf, BoardCatalog) {
    let path = config.toolchain.board_config_path();
    let catalog = BoardCatalog::load_file(&path);
    (path, catalog)
}

fn list_boards(config: &Config) -> AppResult<ExitCode> {
    let (path, catalog) = load_catalog(config);
    if catalog.is_empty() {
        eprintln!(
            "No board types in {}. Set [toolchain] include_path or board_config.",
            path.display()
        );
    }
    for name in catalog.names() {
        println!("{name}");
    }
    Ok(ExitCode::SUCCESS)
}

fn show_board(config: &Config, name: &str) -> AppResult<ExitCode> {
    let (_, catalog) = load_catalog(config);
    let board = catalog
        .get(name)
        .ok_or_else(|| AppError::UnknownBoard(name.to_string()))?;
    print!("{}", board.formatted());
    Ok(ExitCode::SUCCESS)
}

fn set_board_field(config: &Config, board: &str, field: &str, value: &str) -> AppResult<ExitCode> {
    let (path, mut catalog) = load_catalog(config);
    if !catalog.contains(board) {
        return Err(AppError::UnknownBoard(board.to_string()));
    }
    if !catalog.set_field(board, field, value) {
        let kept = catalog.get(board).map(|b| b.get(field)).unwrap_or_default();
        eprintln!("{field}: '{value}' rejected, keeping '{kept}'");
        return Ok(ExitCode::from(1));
    }
    catalog.save(&path)?;
    info!(board, field, path = %path.display(), "board file saved");
    Ok(ExitCode::SUCCESS)
}

fn pick(given: Option<String>, recent: &Option<String>, what: &'static str) -> AppResult<String> {
    given
        .or_else(|| recent.clone())
        .filter(|v| !v.is_empty())
        .ok_or(AppError::MissingArgument(what))
}

async fn compile(
    loader: &mut ConfigLoader,
    action: BuildAction,
    args: BuildArgs,
) -> AppResult<ExitCode> {
    let config = loader.config().clone();
    // an unset project reaches preflight and is reported there
    let project = args
        .project
        .or_else(|| config.recent.project.clone())
        .unwrap_or_default();
    let board = pick(args.board, &config.recent.board, "board")?;
    let port = pick(args.port, &config.recent.port, "port")?;

    let (path, catalog) = load_catalog(&config);
    if catalog.is_empty() {
        warn!(path = %path.display(), "no board file, passing board type unchecked");
    } else if !catalog.contains(&board) {
        return Err(AppError::UnknownBoard(board));
    }

    let mut request =
        BuildRequest::new(project, board, port, config.toolchain.include_dir()).for_action(action);
    if let Some(options) = args.options {
        request = request.with_options(options);
    }

    let mut session = SerialSession::with_settings(
        Arc::new(SystemPortOpener),
        config.session_settings(),
    );
    session.init(request.port.clone(), config.serial.default_baud);

    let orchestrator = BuildOrchestrator::new(config.build_settings());
    let blocking_request = request.clone();
    let (session, result) = tokio::task::spawn_blocking(move || {
        let mut session = session;
        let mut workspace = BufferSet::new();
        let result = if action.attaches_terminal() {
            orchestrator.debug(&blocking_request, &mut session, &mut workspace)
        } else {
            orchestrator.build(&blocking_request, &mut session, &mut workspace)
        };
        (session, result)
    })
    .await?;
    if let Err(e) = &result {
        if let Some(finished) = e.build_result() {
            report(finished, args.json)?;
        }
    }
    let result = result?;

    report(&result, args.json)?;
    if !result.is_success() {
        return Ok(ExitCode::from(1));
    }

    let recent = &mut loader.config_mut().recent;
    recent.board = Some(request.board.clone());
    recent.port = Some(request.port.clone());
    recent.project = Some(request.project.clone());
    remember(loader);

    if action.attaches_terminal() {
        pump_terminal(session).await?;
    }
    Ok(ExitCode::SUCCESS)
}

fn report(result: &BuildResult, json: bool) -> AppResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }
    if result.is_success() {
        if !result.output.is_empty() {
            print!("{}", result.output);
        }
    } else {
        eprintln!("{}", result.title());
        if !result.output.is_empty() {
            eprintln!("{}", result.output);
        }
    }
    Ok(())
}

fn remember(loader: &mut ConfigLoader) {
    match loader.save() {
        Ok(path) => info!(path = %path.display(), "saved recent selections"),
        Err(e) => warn!("could not save recent selections: {e}"),
    }
}

async fn terminal(loader: &mut ConfigLoader, args: TermArgs) -> AppResult<ExitCode> {
    let config = loader.config().clone();
    let port = pick(args.port, &config.recent.port, "port")?;
    let baud = args.baud.unwrap_or(config.serial.default_baud);

    let mut session =
        SerialSession::with_settings(Arc::new(SystemPortOpener), config.session_settings());
    session.init(port.clone(), baud);
    session.open()?;

    loader.config_mut().recent.port = Some(port);
    remember(loader);

    pump_terminal(session).await?;
    Ok(ExitCode::SUCCESS)
}

/// Relay device output to stdout and stdin lines to the device until
/// ctrl-c.
async fn pump_terminal(mut session: SerialSession) -> AppResult<()> {
    session.set_terminal_sink(Box::new(WriterSink::new(std::io::stdout())));
    session.on_handshake_changed(|present| {
        if present {
            info!("target present");
        } else {
            warn!("target removed");
        }
    });

    let mut ticker = tokio::time::interval(std::time::Duration::from_millis(10));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    eprintln!("Connected. Press ctrl-c to exit.");
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = ticker.tick() => {
                session.dispatch_pending();
                if let Some(reason) = session.reader_error() {
                    eprintln!("\nxbasic: serial link lost: {reason}");
                    break;
                }
            }
            line = lines.next_line(), if stdin_open => match line? {
                Some(mut line) => {
                    line.push('\n');
                    session.send(line.as_bytes())?;
                }
                None => stdin_open = false,
            },
        }
    }

    session.close();
    Ok(())
}
