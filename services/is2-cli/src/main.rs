//! ICESat-2 data access command line.
//!
//! Searches CMR for granules, selects variables from a product's
//! capabilities listing or a local granule, places subsetting orders and
//! downloads the results.

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use earthdata::endpoints::{DEFAULT_CLIENT_ID, DEFAULT_CMR_BASE, DEFAULT_EGI_BASE, DEFAULT_ESIR_BASE};
use earthdata::{Endpoints, DEFAULT_FILENAME_PATTERN};
use is2_common::CatalogMode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use config::{FilterConfig, QueryConfig};

#[derive(Parser, Debug)]
#[command(name = "is2")]
#[command(about = "Search, subset, order and download ICESat-2 granules")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// CMR search API
    #[arg(long, global = true, env = "IS2_CMR_URL", default_value = DEFAULT_CMR_BASE)]
    cmr_url: String,

    /// EGI ordering API
    #[arg(long, global = true, env = "IS2_EGI_URL", default_value = DEFAULT_EGI_BASE)]
    egi_url: String,

    /// ESIR download API
    #[arg(long, global = true, env = "IS2_ESIR_URL", default_value = DEFAULT_ESIR_BASE)]
    esir_url: String,
}

impl Cli {
    fn endpoints(&self) -> Endpoints {
        Endpoints {
            cmr_base: self.cmr_url.clone(),
            egi_base: self.egi_url.clone(),
            esir_base: self.esir_url.clone(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search for granules and summarize them
    Search {
        #[command(flatten)]
        query: QueryArgs,

        /// Also print granule ids with their decoded tracks, cycles and dates
        #[arg(long)]
        ids: bool,
    },

    /// List or select the variables of a product
    Vars {
        #[command(flatten)]
        query: QueryArgs,

        #[command(flatten)]
        filter: FilterArgs,

        /// Where the variable listing comes from
        #[arg(long, value_enum, default_value = "order")]
        mode: ModeArg,

        /// Local granule to list in file mode
        #[arg(long, required_if_eq("mode", "file"))]
        file: Option<PathBuf>,

        /// Print the available variables, keywords and beams instead of the selection
        #[arg(long)]
        avail: bool,
    },

    /// Order the matching granules
    Order {
        #[command(flatten)]
        query: QueryArgs,

        #[command(flatten)]
        filter: FilterArgs,

        /// Order whole granules without subsetting
        #[arg(long)]
        no_subset: bool,

        /// Order a single page of granules (1-based)
        #[arg(long)]
        page_num: Option<usize>,

        /// Output format (one of the product's capabilities formats)
        #[arg(long)]
        format: Option<String>,

        /// Reprojection (one of the product's capabilities projections)
        #[arg(long)]
        projection: Option<String>,

        /// Seconds between order status checks
        #[arg(long, default_value = "10")]
        poll_secs: u64,

        /// Directory for the order restart file
        #[arg(long, default_value = ".")]
        state_dir: PathBuf,

        /// Download the completed orders into this directory
        #[arg(long)]
        download: Option<PathBuf>,
    },

    /// Download completed orders
    Download {
        /// Product the orders were placed for (used to verify the login)
        #[arg(short, long)]
        product: String,

        /// Product version (default: latest)
        #[arg(long)]
        version: Option<String>,

        /// Directory receiving the granules
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Directory holding the order restart and download id files
        #[arg(long, default_value = ".")]
        state_dir: PathBuf,

        /// Resume after the last downloaded order
        #[arg(long)]
        restart: bool,

        /// Orders to download when there is no restart file
        #[arg(long = "order-id")]
        order_ids: Vec<String>,
    },

    /// Find granules on disk and select their variables
    Local {
        /// Granule file or directory of granules
        path: PathBuf,

        #[arg(short, long)]
        product: String,

        /// File-name pattern the granules follow
        #[arg(long, default_value = DEFAULT_FILENAME_PATTERN)]
        pattern: String,

        #[command(flatten)]
        filter: FilterArgs,

        /// `h5ls` executable used to list granule contents
        #[arg(long, env = "H5LS", default_value = "h5ls")]
        h5ls: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Order,
    File,
}

impl From<ModeArg> for CatalogMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Order => CatalogMode::Order,
            ModeArg::File => CatalogMode::File,
        }
    }
}

/// Query flags; each overrides the matching field of `--query-file`.
#[derive(Args, Debug, Default)]
struct QueryArgs {
    /// YAML query file
    #[arg(long)]
    query_file: Option<PathBuf>,

    /// Product short name, e.g. ATL06
    #[arg(short, long)]
    product: Option<String>,

    /// Product version (default: latest)
    #[arg(long)]
    version: Option<String>,

    /// Bounding box: lon_min,lat_min,lon_max,lat_max
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    bbox: Option<Vec<f64>>,

    /// Start date, YYYY-MM-DD
    #[arg(long, requires = "end")]
    start: Option<String>,

    /// End date, YYYY-MM-DD
    #[arg(long, requires = "start")]
    end: Option<String>,

    /// Start time of day, HH:MM:SS
    #[arg(long)]
    start_time: Option<String>,

    /// End time of day, HH:MM:SS
    #[arg(long)]
    end_time: Option<String>,

    /// Granules per order
    #[arg(long)]
    page_size: Option<usize>,
}

impl QueryArgs {
    fn resolve(&self) -> Result<QueryConfig> {
        let mut config = match &self.query_file {
            Some(path) => QueryConfig::load(path)?,
            None => QueryConfig::default(),
        };

        if let Some(product) = &self.product {
            config.product = Some(product.clone());
        }
        if let Some(version) = &self.version {
            config.version = Some(version.clone());
        }
        if let Some(bbox) = &self.bbox {
            config.bbox = bbox.clone();
        }
        if let (Some(start), Some(end)) = (&self.start, &self.end) {
            config.dates = vec![start.clone(), end.clone()];
        }
        if self.start_time.is_some() {
            config.start_time = self.start_time.clone();
        }
        if self.end_time.is_some() {
            config.end_time = self.end_time.clone();
        }
        if self.page_size.is_some() {
            config.page_size = self.page_size;
        }
        Ok(config)
    }
}

/// Variable filter flags, applied after the query file's entries.
#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Variable names (final path segment)
    #[arg(long = "var", value_delimiter = ',')]
    vars: Vec<String>,

    /// Path segments that must appear, e.g. land_ice_segments
    #[arg(long = "keyword", value_delimiter = ',')]
    keywords: Vec<String>,

    /// Beams or profiles, e.g. gt1l
    #[arg(long = "beam", value_delimiter = ',')]
    beams: Vec<String>,

    /// Add the product's default variables
    #[arg(long)]
    defaults: bool,
}

impl FilterArgs {
    fn to_config(&self) -> FilterConfig {
        let list = |values: &Vec<String>| Some(values.clone()).filter(|v| !v.is_empty());
        FilterConfig {
            vars: list(&self.vars),
            keywords: list(&self.keywords),
            beams: list(&self.beams),
            defaults: self.defaults,
        }
    }
}

/// Query file entries followed by the flag filter, if any.
fn collect_filters(config: &mut QueryConfig, filter: &FilterArgs) {
    let flags = filter.to_config();
    if !flags.is_empty() {
        config.variables.push(flags);
    }
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs)?;

    let endpoints = cli.endpoints();

    match cli.command {
        Command::Search { query, ids } => {
            let config = query.resolve()?;
            commands::search(&endpoints, &config, ids).await
        }
        Command::Vars {
            query,
            filter,
            mode,
            file,
            avail,
        } => {
            let mut config = query.resolve()?;
            collect_filters(&mut config, &filter);
            commands::vars(&endpoints, &config, mode.into(), file.as_deref(), avail).await
        }
        Command::Order {
            query,
            filter,
            no_subset,
            page_num,
            format,
            projection,
            poll_secs,
            state_dir,
            download,
        } => {
            let mut config = query.resolve()?;
            collect_filters(&mut config, &filter);
            if no_subset {
                config.subset = false;
            }
            if format.is_some() {
                config.format = format;
            }
            if projection.is_some() {
                config.projection = projection;
            }
            let run = commands::OrderRun {
                page_num,
                poll_secs,
                state_dir,
                download,
            };
            commands::order(&endpoints, &config, &run).await
        }
        Command::Download {
            product,
            version,
            output,
            state_dir,
            restart,
            order_ids,
        } => {
            let run = commands::DownloadRun {
                product,
                version,
                output,
                state_dir,
                restart,
                order_ids,
            };
            commands::download(&endpoints, &run).await
        }
        Command::Local {
            path,
            product,
            pattern,
            filter,
            h5ls,
        } => {
            let mut config = QueryConfig {
                product: Some(product),
                ..QueryConfig::default()
            };
            collect_filters(&mut config, &filter);
            commands::local(&path, &config, &pattern, &h5ls).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_query_flags() {
        let cli = Cli::try_parse_from([
            "is2",
            "search",
            "--product",
            "ATL06",
            "--bbox",
            "-55,68,-48,71",
            "--start",
            "2019-02-22",
            "--end",
            "2019-02-28",
        ])
        .unwrap();

        let Command::Search { query, ids } = cli.command else {
            panic!("expected search");
        };
        assert!(!ids);
        let config = query.resolve().unwrap();
        assert_eq!(config.bbox, vec![-55.0, 68.0, -48.0, 71.0]);
        assert_eq!(config.dates, vec!["2019-02-22", "2019-02-28"]);
        assert_eq!(config.product.as_deref(), Some("ATL06"));
    }

    #[test]
    fn test_filter_flags() {
        let cli = Cli::try_parse_from([
            "is2",
            "vars",
            "--product",
            "ATL06",
            "--var",
            "latitude,longitude",
            "--beam",
            "gt1l",
        ])
        .unwrap();

        let Command::Vars { filter, mode, .. } = cli.command else {
            panic!("expected vars");
        };
        assert_eq!(mode, ModeArg::Order);
        let entry = filter.to_config();
        assert_eq!(
            entry.vars,
            Some(vec!["latitude".to_string(), "longitude".to_string()])
        );
        assert_eq!(entry.keywords, None);
        assert!(entry
            .to_filter()
            .unwrap()
            .matches("gt1l/land_ice_segments/latitude"));
    }

    #[test]
    fn test_flags_override_query_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("query.yaml");
        std::fs::write(
            &path,
            "product: ATL06\nbbox: [-55, 68, -48, 71]\ndates: ['2019-02-22', '2019-02-28']\n",
        )
        .unwrap();

        let args = QueryArgs {
            query_file: Some(path),
            product: Some("ATL08".to_string()),
            page_size: Some(5),
            ..QueryArgs::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.product.as_deref(), Some("ATL08"));
        assert_eq!(config.page_size, Some(5));
        assert_eq!(config.bbox.len(), 4);
    }

    #[test]
    fn test_file_mode_requires_file() {
        let result = Cli::try_parse_from(["is2", "vars", "--product", "ATL06", "--mode", "file"]);
        assert!(result.is_err());
    }
}
