//! Command implementations.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use earthdata::session::build_client;
use earthdata::{
    download_orders, latest_version, place_order, search_granules, CapabilitiesCatalog,
    Credentials, DownloadOptions, EarthdataSession, Endpoints, GranuleIds, GranuleInfo,
    LocalSource, OrderOptions,
};
use is2_common::{CatalogMode, Product};
use is2_variables::{CatalogSource, Variables};
use tracing::{info, warn};

use crate::config::QueryConfig;

/// Order flags that are not part of the query.
#[derive(Debug)]
pub struct OrderRun {
    pub page_num: Option<usize>,
    pub poll_secs: u64,
    pub state_dir: PathBuf,
    pub download: Option<PathBuf>,
}

#[derive(Debug)]
pub struct DownloadRun {
    pub product: String,
    pub version: Option<String>,
    pub output: PathBuf,
    pub state_dir: PathBuf,
    pub restart: bool,
    pub order_ids: Vec<String>,
}

/// The requested version, or the latest one published in CMR.
async fn resolve_version(
    endpoints: &Endpoints,
    product: &Product,
    version: Option<&str>,
) -> Result<String> {
    if let Some(version) = version {
        return Ok(version.to_string());
    }
    let client = build_client()?;
    let version = latest_version(&client, endpoints, product)
        .await
        .with_context(|| format!("Failed to look up the latest {} version", product))?;
    info!(product = %product, version = %version, "Using latest product version");
    Ok(version)
}

async fn login(endpoints: &Endpoints, product: &Product, version: &str) -> Result<EarthdataSession> {
    let credentials = Credentials::from_env()
        .context("Earthdata credentials are read from EARTHDATA_USERNAME and EARTHDATA_PASSWORD")?;
    let version = is2_common::product::format_version(version)?;
    let url = endpoints.capabilities_url(product, &version);
    Ok(EarthdataSession::login(credentials, endpoints.clone(), &url).await?)
}

/// Populate a selector and apply the configured filters in order.
async fn select_variables(
    product: Product,
    mode: CatalogMode,
    source: &dyn CatalogSource,
    config: &QueryConfig,
) -> Result<Variables> {
    let mut vars = Variables::new(product, mode);
    vars.populate(source)
        .await
        .context("Failed to list the product's variables")?;
    for filter in config.filters()? {
        vars.append(&filter)?;
    }
    Ok(vars)
}

fn print_selection(vars: &Variables, avail: bool) -> Result<()> {
    if avail {
        let options = vars.avail_options()?;
        println!("variables: {}", join(&options.variables));
        println!("keywords:  {}", join(&options.keywords));
        println!("beams:     {}", join(&options.beams));
        return Ok(());
    }

    for (name, paths) in vars.wanted_grouped() {
        println!("{}:", name);
        for path in paths {
            println!("  {}", path);
        }
    }
    Ok(())
}

fn join<'a>(values: impl IntoIterator<Item = &'a String>) -> String {
    values
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

pub async fn search(endpoints: &Endpoints, config: &QueryConfig, ids: bool) -> Result<()> {
    let product = config.product()?;
    let version = resolve_version(endpoints, &product, config.version.as_deref()).await?;
    let query = config.query(&version)?;

    let client = build_client()?;
    let granules = search_granules(&client, endpoints, &query.search_params()).await?;
    println!("{}", GranuleInfo::summarize(&granules)?);

    if ids {
        let decoded = GranuleIds::from_granules(&granules)?;
        println!("{}", serde_json::to_string_pretty(&decoded)?);
    }
    Ok(())
}

pub async fn vars(
    endpoints: &Endpoints,
    config: &QueryConfig,
    mode: CatalogMode,
    file: Option<&Path>,
    avail: bool,
) -> Result<()> {
    let product = config.product()?;

    let vars = match (mode, file) {
        (CatalogMode::File, Some(file)) => {
            let source = is2_variables::H5lsCatalog::new(file);
            select_variables(product, mode, &source, config).await?
        }
        (CatalogMode::File, None) => anyhow::bail!("File mode needs a granule file (--file)"),
        (CatalogMode::Order, _) => {
            let version = resolve_version(endpoints, &product, config.version.as_deref()).await?;
            let session = login(endpoints, &product, &version).await?;
            let version = is2_common::product::format_version(&version)?;
            let catalog = CapabilitiesCatalog::new(&session, endpoints.capabilities_url(&product, &version));
            select_variables(product, mode, &catalog, config).await?
        }
    };

    print_selection(&vars, avail)
}

pub async fn order(endpoints: &Endpoints, config: &QueryConfig, run: &OrderRun) -> Result<()> {
    let product = config.product()?;
    let version = resolve_version(endpoints, &product, config.version.as_deref()).await?;
    let mut query = config.query(&version)?;
    if let Some(page_num) = run.page_num {
        query = query.with_page_num(page_num);
    }

    let session = login(endpoints, &product, query.version()).await?;
    if let Some(email) = session.credentials().email() {
        query = query.with_email(email);
    }

    let coverage = if config.subset && !config.variables.is_empty() {
        let catalog = CapabilitiesCatalog::new(&session, query.capabilities_url(endpoints));
        let vars = select_variables(product.clone(), CatalogMode::Order, &catalog, config).await?;
        vars.coverage()
    } else {
        if !config.subset && !config.variables.is_empty() {
            warn!("Variable filters are ignored for orders without subsetting");
        }
        None
    };

    let options = OrderOptions {
        subset: config.subset,
        poll_interval: Duration::from_secs(run.poll_secs),
        state_dir: run.state_dir.clone(),
    };
    let subset = query.subset_params(coverage.as_deref());
    let placed = place_order(&session, &query, &subset, &options).await?;

    for outcome in &placed.outcomes {
        println!(
            "page {:>3}  order {}  {}",
            outcome.page_num, outcome.order_id, outcome.status
        );
        for message in &outcome.messages {
            println!("           {}", message);
        }
    }

    if let Some(output) = &run.download {
        let download_options = DownloadOptions {
            state_dir: run.state_dir.clone(),
            order_ids: placed.order_ids.clone(),
            ..DownloadOptions::new(output)
        };
        let report = download_orders(&session, &download_options).await?;
        println!(
            "Downloaded {} order(s), {} file(s) to {}",
            report.downloaded.len(),
            report.files.len(),
            output.display()
        );
    }
    Ok(())
}

pub async fn download(endpoints: &Endpoints, run: &DownloadRun) -> Result<()> {
    let product = Product::parse(&run.product)?;
    let version = resolve_version(endpoints, &product, run.version.as_deref()).await?;
    let session = login(endpoints, &product, &version).await?;

    let options = DownloadOptions {
        state_dir: run.state_dir.clone(),
        restart: run.restart,
        order_ids: run.order_ids.clone(),
        ..DownloadOptions::new(&run.output)
    };
    let report = download_orders(&session, &options).await?;

    for file in &report.files {
        println!("{}", file.display());
    }
    if !report.failed.is_empty() {
        warn!(orders = ?report.failed, "Some orders could not be downloaded");
    }
    Ok(())
}

pub async fn local(path: &Path, config: &QueryConfig, pattern: &str, h5ls: &str) -> Result<()> {
    let product = config.product()?;
    let source = LocalSource::discover(path, &product, pattern)?;
    for file in source.files() {
        println!("{}", file.display());
    }

    if config.variables.is_empty() {
        return Ok(());
    }
    let catalog = source.catalog()?.with_program(h5ls);
    let vars = select_variables(product, CatalogMode::File, &catalog, config).await?;
    print_selection(&vars, false)
}
