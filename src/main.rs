use clap::Parser;
use dh_table::command::{Flow, Session, HELP};
use dh_table::config::{DEFAULT_CAPACITY, DEFAULT_MAX_LOAD_FACTOR};
use dh_table::{store, Table, TableConfig};
use env_logger::Builder;
use log::LevelFilter;
use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Initial number of slots (rounded up to a prime)
    #[arg(short, long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Load factor above which the table grows
    #[arg(short = 'f', long, default_value_t = DEFAULT_MAX_LOAD_FACTOR)]
    load_factor: f64,

    /// Largest slot count the table may grow to
    #[arg(short, long)]
    max_capacity: Option<usize>,

    /// File of key->value lines to load before reading commands
    #[arg(short, long)]
    load: Option<PathBuf>,
}

fn initialize_logger() {
    let mut builder = Builder::new();
    builder
        .filter_level(LevelFilter::Warn)
        .format_timestamp_millis()
        .parse_default_env();
    let _ = builder.try_init();
}

fn main() -> Result<(), Box<dyn Error>> {
    initialize_logger();
    let args = Args::parse();

    let mut config = TableConfig::default()
        .with_capacity(args.capacity)
        .with_max_load_factor(args.load_factor);
    if let Some(max_capacity) = args.max_capacity {
        config = config.with_max_capacity(max_capacity);
    }
    let mut table = Table::with_config(config)?;
    if let Some(path) = &args.load {
        let summary = store::load(&mut table, path)?;
        eprintln!(
            "loaded {} entries ({} updated, {} lines skipped)",
            summary.loaded, summary.updated, summary.skipped
        );
    }

    let mut session = Session::new(table);
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    writeln!(stdout, "{HELP}")?;
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        match session.run_line(&line, &mut stdout) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => eprintln!("error: {e}"),
        }
    }
    Ok(())
}
