use std::io;
use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;

use word2vec::{run_queries, QueryKind, Vectors};

/// Solve analogies: given `a b c`, find `d` such that a is to b as c is to d.
#[derive(Parser)]
struct Options {
    /// Word vectors written by word2vec.
    #[arg(value_name = "FILE")]
    file_name: PathBuf,

    /// The file is in the binary format.
    #[arg(long)]
    binary: bool,

    /// Number of closest words to show.
    #[arg(short = 'n', long, default_value_t = 40)]
    top: usize,
}

fn run(options: Options) -> Result<()> {
    let vectors = Vectors::load(&options.file_name, options.binary)?;
    run_queries(
        &vectors,
        QueryKind::Analogy,
        io::stdin().lock(),
        io::stdout().lock(),
        options.top,
    )
}

fn main() {
    let options = Options::parse();
    if let Err(err) = run(options) {
        eprintln!("{err:#}");
        process::exit(1);
    }
}
