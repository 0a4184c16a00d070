//! LedgerKV CLI Client
//!
//! Command-line interface for interacting with LedgerKV.

use std::io::{self, BufRead, Write};

use clap::{Parser, Subcommand};
use ledgerkv::network::Client;

/// LedgerKV CLI
#[derive(Parser, Debug)]
#[command(name = "ledgerkv-cli")]
#[command(about = "CLI for LedgerKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6380")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Remove a key
    Rm {
        /// The key to remove
        key: String,
    },

    /// Read `get`/`set`/`rm` commands from stdin until `quit` or EOF
    Repl,
}

/// One line typed at the prompt
#[derive(Debug, PartialEq)]
enum ReplLine {
    Run(Commands),
    Quit,
    Empty,
}

/// Parse `get <key>`, `set <key> <value...>`, `rm <key>` or `quit`
fn parse_repl_line(line: &str) -> Result<ReplLine, String> {
    let line = line.trim();
    let (op, rest) = match line.split_once(char::is_whitespace) {
        Some((op, rest)) => (op, rest.trim_start()),
        None => (line, ""),
    };

    match op.to_ascii_lowercase().as_str() {
        "" => Ok(ReplLine::Empty),
        "quit" | "exit" => Ok(ReplLine::Quit),
        "get" | "rm" if rest.is_empty() || rest.contains(char::is_whitespace) => {
            Err(format!("usage: {} <key>", op))
        }
        "get" => Ok(ReplLine::Run(Commands::Get {
            key: rest.to_string(),
        })),
        "rm" => Ok(ReplLine::Run(Commands::Rm {
            key: rest.to_string(),
        })),
        "set" => match rest.split_once(char::is_whitespace) {
            Some((key, value)) => Ok(ReplLine::Run(Commands::Set {
                key: key.to_string(),
                value: value.trim_start().to_string(),
            })),
            None => Err("usage: set <key> <value>".to_string()),
        },
        other => Err(format!("unknown command: {}", other)),
    }
}

fn run(client: &mut Client, command: Commands) -> ledgerkv::Result<()> {
    match command {
        Commands::Get { key } => client.get(&key).map(|value| match value {
            Some(v) => println!("{}", v),
            None => println!("(nil)"),
        }),
        Commands::Set { key, value } => client.set(&key, &value).map(|_| println!("OK")),
        Commands::Rm { key } => client.rm(&key).map(|_| println!("OK")),
        Commands::Repl => repl(client),
    }
}

fn repl(client: &mut Client) -> ledgerkv::Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("ledgerkv> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            return Ok(());
        };

        match parse_repl_line(&line?) {
            Ok(ReplLine::Run(Commands::Repl)) | Ok(ReplLine::Empty) => {}
            Ok(ReplLine::Run(command)) => {
                // A failed request ends only that line, not the session
                if let Err(e) = run(client, command) {
                    eprintln!("Error: {}", e);
                }
            }
            Ok(ReplLine::Quit) => return Ok(()),
            Err(usage) => eprintln!("{}", usage),
        }
    }
}

fn main() {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    let result = run(&mut client, args.command);

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
