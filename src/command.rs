//! Line-oriented command driver over a [`Table`].
//!
//! `Session` owns no state besides the table; each input line is parsed into
//! a [`Command`] and applied immediately. Keys are validated here before they
//! reach the table.

use crate::error::CommandError;
use crate::store;
use crate::table::Table;
use crate::validate::validate_key;
use std::io::Write;
use std::path::PathBuf;

pub const HELP: &str = "\
commands:
  insert <key> <value>   insert or update a key (alias: set)
  get <key>              print the value of a key (alias: retrieve)
  remove <key>           remove a key (alias: delete)
  stats                  print size, count and load factor
  print                  print every occupied slot
  save <path>            write all entries as key->value lines
  load <path>            read key->value lines into the table
  help                   show this message
  quit                   leave (alias: exit)";

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Insert { key: String, value: String },
    Get { key: String },
    Remove { key: String },
    Stats,
    Print,
    Save { path: PathBuf },
    Load { path: PathBuf },
    Help,
    Quit,
}

/// Whether the driver loop should keep reading.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

fn required<'a>(
    arg: &'a str,
    command: &'static str,
    argument: &'static str,
) -> Result<&'a str, CommandError> {
    if arg.is_empty() {
        Err(CommandError::MissingArgument { command, argument })
    } else {
        Ok(arg)
    }
}

fn key_arg(rest: &str, command: &'static str) -> Result<String, CommandError> {
    let (key, _) = split_word(rest);
    let key = required(key, command, "key")?;
    validate_key(key)?;
    Ok(key.to_string())
}

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
        let (word, rest) = split_word(line.trim());
        if word.is_empty() {
            return Ok(None);
        }
        let cmd = match word.to_ascii_lowercase().as_str() {
            "insert" | "set" => {
                let (key, value) = split_word(rest);
                let key = required(key, "insert", "key")?;
                validate_key(key)?;
                let value = required(value, "insert", "value")?;
                Command::Insert {
                    key: key.to_string(),
                    value: value.to_string(),
                }
            }
            "get" | "retrieve" => Command::Get {
                key: key_arg(rest, "get")?,
            },
            "remove" | "delete" => Command::Remove {
                key: key_arg(rest, "remove")?,
            },
            "stats" => Command::Stats,
            "print" => Command::Print,
            "save" => Command::Save {
                path: required(rest, "save", "path")?.into(),
            },
            "load" => Command::Load {
                path: required(rest, "load", "path")?.into(),
            },
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => return Err(CommandError::UnknownCommand(word.to_string())),
        };
        Ok(Some(cmd))
    }
}

pub struct Session {
    table: Table,
}

impl Session {
    pub fn new(table: Table) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn into_table(self) -> Table {
        self.table
    }

    /// Parse and execute one line, writing any output to `out`.
    pub fn run_line<W: Write>(&mut self, line: &str, out: &mut W) -> Result<Flow, CommandError> {
        match Command::parse(line)? {
            Some(cmd) => self.execute(cmd, out),
            None => Ok(Flow::Continue),
        }
    }

    pub fn execute<W: Write>(&mut self, cmd: Command, out: &mut W) -> Result<Flow, CommandError> {
        match cmd {
            Command::Insert { key, value } => {
                match self.table.insert(key.as_str(), value)? {
                    Some(old) => writeln!(out, "updated {key} (was {old})")?,
                    None => writeln!(out, "inserted {key}")?,
                }
            }
            Command::Get { key } => match self.table.retrieve(&key) {
                Some(value) => writeln!(out, "{value}")?,
                None => writeln!(out, "{key} not found")?,
            },
            Command::Remove { key } => match self.table.remove(&key) {
                Some(_) => writeln!(out, "removed {key}")?,
                None => writeln!(out, "{key} not found")?,
            },
            Command::Stats => writeln!(out, "{}", self.table.stats())?,
            Command::Print => {
                for (idx, entry) in self.table.slots() {
                    if let Some((key, value)) = entry {
                        writeln!(out, "[{idx}] {key} -> {value}")?;
                    }
                }
            }
            Command::Save { path } => {
                let n = store::save(&self.table, &path)?;
                writeln!(out, "saved {n} entries to {}", path.display())?;
            }
            Command::Load { path } => {
                let summary = store::load(&mut self.table, &path)?;
                writeln!(
                    out,
                    "loaded {} entries from {} ({} updated, {} lines skipped)",
                    summary.loaded,
                    path.display(),
                    summary.updated,
                    summary.skipped
                )?;
            }
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }
}
