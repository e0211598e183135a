//! sqlweave CLI
//!
//! Command-line tool for tokenizing, parsing, formatting and converting
//! PostgreSQL and MySQL SQL.

use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use futures::executor::block_on;
use futures::stream;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use sqlweave_core::{
    from_json_str, parse_async, to_dialect, Dialect, FormatOptions, KeywordCase, Tokenizer,
    TokenizerOptions, Tree, SCRIPT,
};

/// Tokenize, parse, format and convert SQL.
#[derive(Parser)]
#[command(name = "sqlweave")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Dialect of the input.
    #[arg(short, long, env = "SQLWEAVE_DIALECT", default_value = "postgres")]
    dialect: Dialect,

    /// Bytes read from the input per chunk.
    #[arg(long, default_value_t = 8192)]
    chunk_size: usize,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print one token per line.
    Tokenize {
        /// Input file (stdin if not specified).
        input: Option<PathBuf>,

        /// Also print whitespace tokens.
        #[arg(long)]
        whitespace: bool,

        /// Also print comment tokens.
        #[arg(long)]
        comments: bool,
    },

    /// Print the syntax tree as JSON.
    Parse {
        /// Input file (stdin if not specified).
        input: Option<PathBuf>,

        /// Node type to parse the whole input as.
        #[arg(short = 't', long = "type", default_value = SCRIPT)]
        node_type: String,

        /// Print compact single-line JSON.
        #[arg(long)]
        compact: bool,
    },

    /// Re-render SQL in a normalized layout.
    Format {
        /// Input file (stdin if not specified).
        input: Option<PathBuf>,

        #[command(flatten)]
        layout: Layout,
    },

    /// Render SQL in another dialect.
    Convert {
        /// Input file (stdin if not specified).
        input: Option<PathBuf>,

        /// Target dialect.
        #[arg(long)]
        to: Dialect,

        #[command(flatten)]
        layout: Layout,
    },

    /// Render SQL from a JSON syntax tree.
    Render {
        /// Input file (stdin if not specified).
        input: Option<PathBuf>,

        /// Node type of the tree's root.
        #[arg(short = 't', long = "type", default_value = SCRIPT)]
        node_type: String,

        #[command(flatten)]
        layout: Layout,
    },
}

/// Output layout flags shared by the rendering commands.
#[derive(Args)]
struct Layout {
    /// One clause per line, long lists wrapped.
    #[arg(long)]
    pretty: bool,

    /// Line width for wrapping in pretty mode.
    #[arg(long, default_value_t = 80)]
    line_width: usize,

    /// Lowercase keywords.
    #[arg(long)]
    lowercase: bool,

    /// Drop parentheses that precedence makes redundant.
    #[arg(long)]
    minimal_parens: bool,
}

impl Layout {
    fn options(&self) -> FormatOptions {
        let base = if self.pretty {
            FormatOptions::pretty()
        } else {
            FormatOptions::compact()
        };
        let case = if self.lowercase {
            KeywordCase::Lower
        } else {
            KeywordCase::Upper
        };
        base.line_width(self.line_width)
            .minimal_parens(self.minimal_parens)
            .keyword_case(case)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let dialect = cli.dialect;
    match cli.command {
        Commands::Tokenize {
            input,
            whitespace,
            comments,
        } => {
            let chunks = read_chunks(input.as_ref(), cli.chunk_size)?;
            let options = TokenizerOptions::for_dialect(dialect)
                .structured(false)
                .emit_whitespace(whitespace)
                .emit_comments(comments);
            for token in Tokenizer::from_chunks(chunks, dialect, options) {
                let token = token?;
                println!("{}:{}\t{token}", token.line, token.column);
            }
        }

        Commands::Parse {
            input,
            node_type,
            compact,
        } => {
            let tree = parse_input(input.as_ref(), cli.chunk_size, dialect, &node_type)?;
            let json = tree.to_json();
            let text = if compact {
                serde_json::to_string(&json)?
            } else {
                serde_json::to_string_pretty(&json)?
            };
            println!("{text}");
        }

        Commands::Format { input, layout } => {
            let tree = parse_input(input.as_ref(), cli.chunk_size, dialect, SCRIPT)?;
            println!("{}", tree.to_sql_with(dialect, &layout.options())?);
        }

        Commands::Convert { input, to, layout } => {
            let tree = parse_input(input.as_ref(), cli.chunk_size, dialect, SCRIPT)?;
            info!("Converting from {dialect} to {to}");
            let converted = to_dialect(&tree, to)
                .with_context(|| format!("input has no {to} equivalent"))?;
            println!("{}", converted.to_sql_with(to, &layout.options())?);
        }

        Commands::Render {
            input,
            node_type,
            layout,
        } => {
            let text = read_chunks(input.as_ref(), cli.chunk_size)?.concat();
            let tag = node_tag(&node_type)?;
            let tree = from_json_str(&text, &[tag], dialect)?;
            println!("{}", tree.to_sql_with(dialect, &layout.options())?);
        }
    }

    Ok(())
}

/// Parses the input fed chunk by chunk through the asynchronous tokenizer.
fn parse_input(
    input: Option<&PathBuf>,
    chunk_size: usize,
    dialect: Dialect,
    node_type: &str,
) -> anyhow::Result<Tree> {
    let tag = node_tag(node_type)?;
    let chunks = read_chunks(input, chunk_size)?;
    debug!(chunks = chunks.len(), %dialect, node = tag, "parsing input");
    let tree = block_on(parse_async(stream::iter(chunks), dialect, &[tag]))?;
    Ok(tree)
}

/// Resolves a node type name against the built-in grammar.
fn node_tag(name: &str) -> anyhow::Result<&'static str> {
    sqlweave_core::default_registry()
        .tags()
        .into_iter()
        .find(|tag| *tag == name)
        .with_context(|| format!("unknown node type '{name}'"))
}

/// Reads a file or stdin as UTF-8 chunks of about `chunk_size` bytes.
/// A character split by a chunk boundary is carried over to the next chunk.
fn read_chunks(input: Option<&PathBuf>, chunk_size: usize) -> anyhow::Result<Vec<String>> {
    let mut reader: Box<dyn Read> = match input {
        Some(path) => Box::new(
            File::open(path).with_context(|| format!("cannot open {}", path.display()))?,
        ),
        None => Box::new(io::stdin().lock()),
    };
    let mut chunks = Vec::new();
    let mut buffer = vec![0u8; chunk_size.max(4)];
    let mut pending: Vec<u8> = Vec::new();
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        pending.extend_from_slice(&buffer[..read]);
        let valid = match std::str::from_utf8(&pending) {
            Ok(text) => text.len(),
            Err(err) if err.error_len().is_none() => err.valid_up_to(),
            Err(err) => return Err(err).context("input is not valid UTF-8"),
        };
        let rest = pending.split_off(valid);
        chunks.push(String::from_utf8(std::mem::replace(&mut pending, rest))?);
    }
    if !pending.is_empty() {
        anyhow::bail!("input ends inside a UTF-8 character");
    }
    Ok(chunks)
}
