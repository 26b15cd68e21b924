use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

use word2vec::{real, train_model, Architecture, Config, Objective, OutputMode, VectorFormat};

#[derive(Parser)]
#[command(about = "WORD VECTOR estimation toolkit", long_about = None, version)]
struct Options {
    /// Use text data from FILE to train the model
    #[arg(long = "train", value_name = "FILE")]
    train_file: PathBuf,

    /// Use FILE to save the resulting word vectors
    #[arg(long = "output", value_name = "FILE")]
    output_file: Option<PathBuf>,

    /// Set size of word vectors
    #[arg(long = "size", default_value_t = 100)]
    layer1_size: usize,

    /// Set max skip length between words
    #[arg(long, default_value_t = 5)]
    window: usize,

    /// Set threshold for occurrence of words. Those that appear with higher
    /// frequency in the training data will be randomly down-sampled; useful
    /// range is (0, 1e-5); 0 disables
    #[arg(long, default_value_t = 1e-3)]
    sample: real,

    /// Use Hierarchical Softmax (not supported)
    #[arg(long)]
    hs: bool,

    /// Number of negative examples; common values are 3 - 10 (0 = not used)
    #[arg(long, default_value_t = 5)]
    negative: usize,

    /// Use N threads
    #[arg(long = "threads", value_name = "N", default_value_t = 12)]
    num_threads: usize,

    /// Run more training iterations
    #[arg(long, default_value_t = 5)]
    iter: usize,

    /// Discard words that appear less than N times
    #[arg(long = "min-count", value_name = "N", default_value_t = 5)]
    min_count: u64,

    /// Set the starting learning rate
    #[arg(long, default_value_t = 0.025)]
    alpha: real,

    /// Output word classes rather than word vectors (not supported)
    #[arg(long)]
    classes: Option<usize>,

    /// Set the debug mode (0 = warnings only, 1 = summary, 2 = progress)
    #[arg(long = "debug", default_value_t = 2)]
    debug_mode: usize,

    /// Save the resulting vectors in binary mode
    #[arg(long, group = "format")]
    binary: bool,

    /// Save the model, including output weights, in bincode format
    #[arg(long, group = "format")]
    bincode: bool,

    /// The vocabulary will be saved to FILE
    #[arg(long = "save-vocab", value_name = "FILE")]
    save_vocab_file: Option<PathBuf>,

    /// The vocabulary will be read from FILE, not constructed from the training data
    #[arg(long = "read-vocab", value_name = "FILE")]
    read_vocab_file: Option<PathBuf>,

    /// Use the continuous bag of words model (not supported)
    #[arg(long)]
    cbow: bool,

    /// Seed for weight initialization and subsampling
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

impl From<Options> for Config {
    fn from(options: Options) -> Config {
        let format = if options.binary {
            VectorFormat::Binary
        } else if options.bincode {
            VectorFormat::Bincode
        } else {
            VectorFormat::Text
        };
        Config {
            train_file: options.train_file,
            output_file: options.output_file,
            save_vocab_file: options.save_vocab_file,
            read_vocab_file: options.read_vocab_file,
            architecture: if options.cbow {
                Architecture::Cbow
            } else {
                Architecture::SkipGram
            },
            objective: if options.hs {
                Objective::HierarchicalSoftmax
            } else {
                Objective::NegativeSampling
            },
            output_mode: match options.classes {
                Some(classes) => OutputMode::Classes(classes),
                None => OutputMode::Vectors(format),
            },
            layer1_size: options.layer1_size,
            window: options.window,
            sample: options.sample,
            negative: options.negative,
            alpha: options.alpha,
            iter: options.iter,
            num_threads: options.num_threads,
            min_count: options.min_count,
            debug_mode: options.debug_mode,
            seed: options.seed,
        }
    }
}

fn init_logging(debug_mode: usize) {
    let filter = match debug_mode {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let options = Options::parse();
    init_logging(options.debug_mode);

    let config = Config::from(options);
    if let Err(err) = train_model(&config) {
        error!("{err:#}");
        process::exit(1);
    }
}
