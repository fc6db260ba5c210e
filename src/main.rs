//! Purpose: `rpnstack` CLI entry point: run the server or drive one over HTTP.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Client commands print the server's JSON payload on stdout.
//! Invariants: Errors go to stderr, as the server's error envelope unless stderr is a terminal.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
#![allow(clippy::result_large_err)]
use std::io::{self, IsTerminal};
use std::net::SocketAddr;

use clap::{CommandFactory, Parser, Subcommand, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Value, json};

mod command_dispatch;
mod serve;

use rpnstack::api::{Error, ErrorKind, RemoteClient, to_exit_code};

const DEFAULT_BIND: &str = "127.0.0.1:9700";
const DEFAULT_URL: &str = "http://127.0.0.1:9700";

fn main() {
    let exit_code = match run() {
        Ok(exit_code) => exit_code,
        Err(err) => {
            eprintln!("{}", render_error(&err, io::stderr().is_terminal()));
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<i32, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => return clap_outcome(err),
    };
    command_dispatch::dispatch_command(cli.command, &cli.url)?;
    Ok(0)
}

// Help and version go out as clap renders them; anything else is a usage error.
fn clap_outcome(err: clap::Error) -> Result<i32, Error> {
    match err.kind() {
        ClapErrorKind::DisplayHelp
        | ClapErrorKind::DisplayVersion
        | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            err.print().map_err(|io_err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to write help")
                    .with_source(io_err)
            })?;
            Ok(err.exit_code())
        }
        _ => {
            let rendered = err.to_string();
            let summary = rendered
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(|line| line.trim_start_matches("error:").trim())
                .unwrap_or("invalid arguments");
            Err(Error::new(ErrorKind::Usage)
                .with_message(summary)
                .with_hint("Try `rpnstack --help`."))
        }
    }
}

#[derive(Parser)]
#[command(
    name = "rpnstack",
    version,
    about = "Named integer stacks driven by reverse-Polish operators over HTTP",
    long_about = None,
    after_help = r#"EXAMPLES
  $ rpnstack serve                       # Terminal 1: start the API on 127.0.0.1:9700
  $ rpnstack stack create                # Terminal 2: {"stack":"<id>","contents":[]}
  $ rpnstack stack push <id>             # pushes a random digit 1-9
  $ rpnstack stack push <id>
  $ rpnstack apply + <id>                # pops x then y, pushes x + y

NOTES
  - Stack contents are always listed top of stack first
  - Operators: + - * / (division truncates toward zero)"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        default_value = DEFAULT_URL,
        help = "Base URL of a running rpnstack server"
    )]
    url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Serve stacks over HTTP (loopback default)",
        after_help = r#"EXAMPLES
  $ rpnstack serve
  $ rpnstack serve --bind 127.0.0.1:8080
  $ RUST_LOG=debug rpnstack serve

NOTES
  - State lives in memory and is gone when the server stops"#
    )]
    Serve {
        #[arg(long, default_value = DEFAULT_BIND, help = "Bind address")]
        bind: String,
        #[arg(long, help = "Allow non-loopback binds (no authentication is offered)")]
        allow_non_loopback: bool,
    },
    #[command(about = "List the supported operators")]
    Ops,
    #[command(arg_required_else_help = true, about = "Create, inspect, and edit stacks")]
    Stack {
        #[command(subcommand)]
        command: StackCommand,
    },
    #[command(
        arg_required_else_help = true,
        about = "Pop two values, apply OP, push the result",
        after_help = r#"EXAMPLES
  $ rpnstack apply - <id>     # x = first pop (top), y = second pop; pushes x - y
  $ rpnstack apply / <id>     # division by zero discards both operands"#
    )]
    Apply {
        #[arg(help = "Operator symbol: + - * /")]
        op: String,
        #[arg(help = "Stack id")]
        stack: String,
    },
    #[command(about = "Generate shell completion scripts")]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum StackCommand {
    #[command(about = "List stack ids")]
    List,
    #[command(about = "Create an empty stack")]
    Create,
    #[command(about = "Show stack contents (top first)")]
    Get { stack: String },
    #[command(about = "Push a random value in 1..=9")]
    Push { stack: String },
    #[command(about = "Remove every value from a stack")]
    Clear { stack: String },
    #[command(about = "Delete a stack")]
    Delete { stack: String },
}

fn parse_bind(bind: &str) -> Result<SocketAddr, Error> {
    bind.parse().map_err(|_| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid bind address")
            .with_hint("Use a host:port value like 127.0.0.1:9700.")
    })
}

fn remote_client(url: &str) -> Result<RemoteClient, Error> {
    RemoteClient::new(url).map_err(|err| {
        err.with_hint("Pass --url with a scheme, host, and port, like http://127.0.0.1:9700.")
    })
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

/// One envelope line for scripts, or `rpnstack: <error>` plus a hint line for people.
fn render_error(err: &Error, for_terminal: bool) -> String {
    if !for_terminal {
        return serde_json::to_string(&serve::ErrorEnvelope::new(err)).unwrap_or_else(|_| {
            "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
        });
    }
    let mut text = format!("rpnstack: {err}");
    if let Some(source) = std::error::Error::source(err) {
        text.push_str(&format!(": {source}"));
    }
    if let Some(hint) = err.hint() {
        text.push_str(&format!("\n  hint: {hint}"));
    }
    text
}
