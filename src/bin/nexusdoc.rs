use clap::{Parser, Subcommand};
use nexusdoc::query::{self, FindOptions};
use nexusdoc::{Collection, Document, Map, Value, logger};
use serde::{Deserialize, Serialize};
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct BenchConfig {
    docs: Option<u32>,
    with_index: Option<bool>,
    log_dir: Option<PathBuf>,
    log_level: Option<String>,
}

impl BenchConfig {
    /// Fills fields still unset from `other`.
    fn or(self, other: Self) -> Self {
        Self {
            docs: self.docs.or(other.docs),
            with_index: self.with_index.or(other.with_index),
            log_dir: self.log_dir.or(other.log_dir),
            log_level: self.log_level.or(other.log_level),
        }
    }

    fn from_env() -> Self {
        Self {
            docs: std::env::var("NEXUSDOC_DOCS").ok().and_then(|s| s.parse().ok()),
            with_index: std::env::var("NEXUSDOC_WITH_INDEX")
                .ok()
                .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes")),
            log_dir: std::env::var("NEXUSDOC_LOG_DIR").ok().map(PathBuf::from),
            log_level: std::env::var("NEXUSDOC_LOG_LEVEL").ok(),
        }
    }
}

fn config_paths(cli_cfg: Option<&PathBuf>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(p) = cli_cfg {
        paths.push(p.clone());
    }
    if let Ok(p) = std::env::var("NEXUSDOC_CONFIG") {
        paths.push(PathBuf::from(p));
    }
    if let Ok(cur) = std::env::current_dir() {
        paths.push(cur.join("nexusdoc.toml"));
    }
    paths
}

// Precedence: CLI > env > config file > defaults
fn load_config(cli: BenchConfig, cli_cfg: Option<&PathBuf>) -> Result<BenchConfig, String> {
    let mut file_cfg = BenchConfig::default();
    for p in config_paths(cli_cfg) {
        if !p.exists() {
            continue;
        }
        let text = std::fs::read_to_string(&p).map_err(|e| format!("{}: {e}", p.display()))?;
        let parsed: BenchConfig = toml::from_str(&text).map_err(|e| format!("{}: {e}", p.display()))?;
        file_cfg = file_cfg.or(parsed);
    }
    Ok(cli.or(BenchConfig::from_env()).or(file_cfg))
}

#[derive(Parser, Debug)]
#[command(name = "nexusdoc", version, about = "nexusdoc query engine tools", long_about = None)]
struct Cli {
    #[arg(long, help = "Path to a config file (TOML). If omitted, ./nexusdoc.toml is tried.")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Insert N documents then look each one up with find")]
    BenchFind {
        #[arg(short = 'n', long, help = "Number of documents (default 10000)")]
        docs: Option<u32>,
        #[arg(long, help = "Index docNumber before querying")]
        with_index: bool,
    },
    #[command(name = "bench-find-one", about = "Insert N documents then look each one up with find_one")]
    BenchFindOne {
        #[arg(short = 'n', long)]
        docs: Option<u32>,
        #[arg(long)]
        with_index: bool,
    },
    #[command(about = "Run a query against a dump file and print matching lines")]
    Query {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value = "{}", help = "Query as JSON")]
        filter: String,
        #[arg(long, help = "Sort spec as JSON, e.g. {\"age\":-1}")]
        sort: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        skip: Option<usize>,
    },
}

fn json_map(text: &str) -> Result<Map, Box<dyn std::error::Error>> {
    let v: serde_json::Value = serde_json::from_str(text)?;
    Ok(Document::try_from(v)?.into_map())
}

fn seeded(n: u32, with_index: bool) -> Result<Collection, nexusdoc::DbError> {
    let col = Collection::new("bench");
    if with_index {
        col.ensure_index("docNumber");
    }
    for i in 0..n {
        let mut d = Document::new();
        d.insert("docNumber".into(), Value::from(f64::from(i)));
        col.insert(d)?;
    }
    Ok(col)
}

fn lookup_query(i: u32) -> Map {
    let mut q = Map::new();
    q.insert("docNumber".into(), Value::from(f64::from(i)));
    q
}

fn bench(n: u32, with_index: bool, one: bool) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    let col = seeded(n, with_index)?;
    log::info!("inserted {n} documents in {} ms", start.elapsed().as_millis());
    let start = Instant::now();
    for i in 0..n {
        let found = if one {
            usize::from(col.find_one(&lookup_query(i))?.is_some())
        } else {
            col.find(lookup_query(i)).exec()?.len()
        };
        if found != 1 {
            return Err(format!("docNumber {i}: expected one document, found {found}").into());
        }
    }
    let elapsed = start.elapsed();
    let op = if one { "find_one" } else { "find" };
    println!(
        "{op}: {n} lookups in {} ms ({:.0} ops/s, index={with_index})",
        elapsed.as_millis(),
        f64::from(n) / elapsed.as_secs_f64().max(f64::EPSILON)
    );
    Ok(())
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let (cli_cfg, bench_kind) = match &cli.command {
        Commands::BenchFind { docs, with_index } => {
            (BenchConfig { docs: *docs, with_index: with_index.then_some(true), ..Default::default() }, Some(false))
        }
        Commands::BenchFindOne { docs, with_index } => {
            (BenchConfig { docs: *docs, with_index: with_index.then_some(true), ..Default::default() }, Some(true))
        }
        Commands::Query { .. } => (BenchConfig::default(), None),
    };
    let cfg = load_config(cli_cfg, cli.config.as_ref())?;
    let level = logger::parse_level(cfg.log_level.as_deref().unwrap_or("info"));
    match &cfg.log_dir {
        Some(dir) => logger::init_rolling(dir, level, 7, true)?,
        None => logger::init_console(level)?,
    }

    if let Some(one) = bench_kind {
        return bench(cfg.docs.unwrap_or(10_000), cfg.with_index.unwrap_or(false), one);
    }
    let Commands::Query { file, filter, sort, limit, skip } = cli.command else {
        return Ok(());
    };
    let col = Collection::new("query");
    col.load(BufReader::new(std::fs::File::open(&file)?))?;
    let opts = FindOptions {
        sort: sort.as_deref().map(json_map).transpose()?.map(|m| query::parse_sort(&m)).transpose()?,
        limit,
        skip,
    };
    let docs = query::Cursor::with_options(&col, json_map(&filter)?, opts).exec()?;
    for d in &docs {
        println!("{}", nexusdoc::document::serialize(d)?);
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
