use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use lamscript::ast_printer::AstPrinter;
use lamscript::error::{Reporter, RuntimeError};
use lamscript::scanner::Scanner;
use lamscript::session::{RunError, Session};

#[derive(ClapParser, Debug)]
#[command(version, about = "Lamscript language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to lamscript.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize { filename: Option<PathBuf> },

    /// Parses a program and prints it back as source
    Parse {
        filename: Option<PathBuf>,

        /// Print the syntax tree as JSON instead
        #[arg(long)]
        json: bool,
    },

    /// Runs input from a file as a Lamscript program
    Run { filename: Option<PathBuf> },

    /// Starts an interactive prompt
    Repl,
}

/// Writes diagnostics to stderr in `[line N] Error at 'x': message` form.
struct StderrReporter;

impl Reporter for StderrReporter {
    fn report(&mut self, line: usize, location: &str, message: &str) {
        eprintln!("[line {}] Error{}: {}", line, location, message);
    }

    fn runtime(&mut self, error: &RuntimeError) {
        eprintln!("{}\n[line {}]", error.message(), error.token.line);
    }
}

fn report_all(error: &RunError) {
    let mut reporter = StderrReporter;

    for e in error.errors() {
        debug!("Reporting error (line {}): {}", e.line(), e);
        e.report(&mut reporter);
    }
}

/// Reads the contents of a file into a String
fn read_file(filename: PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(&filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = String::new();

    let bytes = reader
        .read_to_string(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("lamscript.log").context("Failed to create lamscript.log")?;

    // Debug by default; RUST_LOG overrides.
    Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("lamscript::").unwrap_or(module);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    info!("Logger initialized, writing to lamscript.log");
    Ok(())
}

fn no_input() -> ! {
    println!("No input filepath was provided. Exiting...");
    std::process::exit(0);
}

fn tokenize(filename: PathBuf) -> Result<()> {
    let source = read_file(filename)?;
    let mut tokenized = true;

    for token in Scanner::new(&source) {
        match token {
            Ok(token) => println!("{}", token),
            Err(e) => {
                tokenized = false;
                e.report(&mut StderrReporter);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code 65");
        std::process::exit(65);
    }

    Ok(())
}

fn parse(filename: PathBuf, json: bool) -> Result<()> {
    let source = read_file(filename)?;

    match Session::parse(&source) {
        Ok(statements) if json => {
            let rendered = serde_json::to_string_pretty(&statements)
                .context("Failed to serialize syntax tree")?;
            println!("{}", rendered);
        }

        Ok(statements) => println!("{}", AstPrinter.print(&statements)),

        Err(e) => {
            report_all(&e);
            std::process::exit(e.exit_code());
        }
    }

    Ok(())
}

fn run(filename: PathBuf) -> Result<()> {
    let source = read_file(filename)?;
    let mut session = Session::new();

    if let Err(e) = session.run(&source) {
        report_all(&e);
        std::process::exit(e.exit_code());
    }

    info!("Program executed successfully");
    Ok(())
}

/// Errors are reported and the prompt carries on; globals persist.
fn repl() -> Result<()> {
    let mut session = Session::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush prompt")?;

        let Some(line) = lines.next() else {
            println!();
            return Ok(());
        };

        let line = line.context("Failed to read from stdin")?;

        if let Err(e) = session.run(&line) {
            report_all(&e);
        }
    }
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        Builder::new().filter_level(log::LevelFilter::Off).init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename } => tokenize(filename.unwrap_or_else(|| no_input())),
        Commands::Parse { filename, json } => parse(filename.unwrap_or_else(|| no_input()), json),
        Commands::Run { filename } => run(filename.unwrap_or_else(|| no_input())),
        Commands::Repl => repl(),
    }
}
