use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use datastore::{
    Array, DatasetIndex, DatasetIndexBuilder, DuplicateLabels, FileLoader, GrayImage,
    IndexOptions, LabelScheme, LabelSelection, MatData, Selection, Table,
};

/// Index a directory of class-labelled data files and optionally load some.
#[derive(Parser, Debug)]
#[command(name = "datastore", version, about)]
struct Cli {
    /// Root directory; each directory below it with matching files is a class
    root: PathBuf,

    /// File format to load
    #[arg(short, long, value_enum, default_value_t = Format::Npy)]
    format: Format,

    /// Extensions to index instead of the format's defaults (repeatable)
    #[arg(short, long = "ext")]
    extensions: Vec<String>,

    /// JSON file with index options; flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only index the root directory itself
    #[arg(long)]
    no_recurse: bool,

    /// Descend into symlinked directories
    #[arg(long)]
    follow_links: bool,

    /// What to do when two directories share a name
    #[arg(long, value_enum)]
    on_duplicate: Option<DuplicateLabels>,

    /// How directories are turned into labels
    #[arg(long, value_enum)]
    label_scheme: Option<LabelScheme>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Load files and print what was read
    #[arg(long)]
    load: bool,

    /// Label to load (repeatable; default: all)
    #[arg(short, long = "label")]
    labels: Vec<String>,

    /// File index to load from every label (repeatable; default: all)
    #[arg(short, long = "index")]
    indices: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Npy,
    Matlab,
    Image,
    Table,
    #[cfg(feature = "hdf5")]
    Hdf5,
}

/// One-line description of a loaded value.
trait Describe {
    fn describe(&self) -> String;
}

impl Describe for Array {
    fn describe(&self) -> String {
        format!("array {:?}", self.shape)
    }
}

impl Describe for MatData {
    fn describe(&self) -> String {
        let vars: Vec<String> = self
            .variables
            .iter()
            .map(|(name, a)| format!("{name} {:?}", a.shape))
            .collect();
        format!("mat {{{}}}", vars.join(", "))
    }
}

impl Describe for GrayImage {
    fn describe(&self) -> String {
        let (w, h) = self.dimensions();
        format!("image {h}x{w}")
    }
}

impl Describe for Table {
    fn describe(&self) -> String {
        format!("table {} rows [{}]", self.n_rows(), self.columns.join(", "))
    }
}

#[cfg(feature = "hdf5")]
impl Describe for hdf5::File {
    fn describe(&self) -> String {
        let members = self.member_names().unwrap_or_default();
        format!("hdf5 [{}]", members.join(", "))
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.format {
        Format::Npy => run(DatasetIndex::npy(&cli.root), &cli),
        Format::Matlab => run(DatasetIndex::matlab(&cli.root), &cli),
        Format::Image => run(DatasetIndex::image(&cli.root), &cli),
        Format::Table => run(DatasetIndex::table(&cli.root), &cli),
        #[cfg(feature = "hdf5")]
        Format::Hdf5 => run(DatasetIndex::hdf5(&cli.root), &cli),
    }
}

fn run<L>(builder: DatasetIndexBuilder<L>, cli: &Cli) -> Result<()>
where
    L: FileLoader,
    L::Output: Describe,
{
    let ds = builder
        .options(options(cli)?)
        .build()
        .with_context(|| format!("indexing {}", cli.root.display()))?;

    let summary = ds.summary();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{summary}");
    }

    if !cli.load {
        return Ok(());
    }

    let labels = if cli.labels.is_empty() {
        LabelSelection::All
    } else {
        LabelSelection::Many(cli.labels.clone())
    };
    let selection = if cli.indices.is_empty() {
        Selection::All
    } else {
        Selection::Many(cli.indices.clone())
    };

    let loaded = ds.load(labels, selection).context("loading files")?;
    for (value, label) in loaded.into_pairs() {
        println!("{label}\t{}", value.describe());
    }
    Ok(())
}

fn options(cli: &Cli) -> Result<IndexOptions> {
    let mut options = match &cli.config {
        Some(path) => IndexOptions::from_json_file(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => IndexOptions::default(),
    };
    if !cli.extensions.is_empty() {
        options.extensions = cli.extensions.clone();
    }
    if cli.no_recurse {
        options.recurse = false;
    }
    if cli.follow_links {
        options.follow_links = true;
    }
    if let Some(policy) = cli.on_duplicate {
        options.duplicates = policy;
    }
    if let Some(scheme) = cli.label_scheme {
        options.label_scheme = scheme;
    }
    Ok(options)
}
