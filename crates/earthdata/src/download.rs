//! Download of completed order archives.
//!
//! Each order is served as one zip archive. Archives are streamed to disk,
//! then every member is extracted into the output directory under its
//! base name (the per-order folders inside the archive are dropped).

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};
use zip::ZipArchive;

use crate::error::{EarthdataError, EarthdataResult};
use crate::order::OrderRestart;
use crate::session::{check_status, EarthdataSession};

/// Name of the file holding the id of the last downloaded order.
pub const DOWNLOAD_ID_FILE: &str = ".download_ID";

/// Where and what to download.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Directory receiving the extracted granules.
    pub output_dir: PathBuf,
    /// Directory holding the order restart and download id files.
    pub state_dir: PathBuf,
    /// Resume after the order recorded in the download id file.
    pub restart: bool,
    /// Orders to download when there is no restart file.
    pub order_ids: Vec<String>,
}

impl DownloadOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            state_dir: PathBuf::from("."),
            restart: false,
            order_ids: Vec::new(),
        }
    }
}

/// What [`download_orders`] did.
#[derive(Debug, Clone, Default)]
pub struct DownloadReport {
    pub downloaded: Vec<String>,
    /// Orders whose archive could not be fetched or extracted.
    pub failed: Vec<String>,
    /// Extracted granule files.
    pub files: Vec<PathBuf>,
}

fn download_id_path(state_dir: &Path) -> PathBuf {
    state_dir.join(DOWNLOAD_ID_FILE)
}

async fn read_download_id(state_dir: &Path) -> EarthdataResult<Option<String>> {
    let path = download_id_path(state_dir);
    if !fs::try_exists(&path).await? {
        return Ok(None);
    }
    let id = fs::read_to_string(&path).await?;
    Ok(Some(id.trim().to_string()).filter(|id| !id.is_empty()))
}

/// Download and extract every order.
///
/// Order ids come from the restart file when it exists, else from
/// `options.order_ids`. An archive that cannot be fetched or extracted is
/// logged and skipped.
/// The bookkeeping files are removed once every order has been visited.
#[instrument(skip_all, fields(output_dir = %options.output_dir.display()))]
pub async fn download_orders(
    session: &EarthdataSession,
    options: &DownloadOptions,
) -> EarthdataResult<DownloadReport> {
    let order_ids = match OrderRestart::load(&options.state_dir).await? {
        Some(restart) => restart.order_ids,
        None => options.order_ids.clone(),
    };
    if order_ids.is_empty() {
        return Err(EarthdataError::NoOrders);
    }

    let mut start = 0;
    if options.restart {
        info!("Restarting download");
        if let Some(last) = read_download_id(&options.state_dir).await? {
            match order_ids.iter().position(|id| *id == last) {
                Some(i) => start = i + 1,
                None => warn!(order_id = %last, "Last downloaded order is not in the order list"),
            }
        }
    }

    fs::create_dir_all(&options.output_dir).await?;
    fs::create_dir_all(&options.state_dir).await?;

    let remaining = &order_ids[start..];
    let mut report = DownloadReport::default();

    for (i, order_id) in remaining.iter().enumerate() {
        let url = session.endpoints().download_url(order_id);
        let archive = options.output_dir.join(format!(".{}.zip.partial", order_id));

        debug!(url = %url, "Zip download URL");
        let fetched = match fetch_archive(session, &url, &archive).await {
            Ok(bytes) => extract_archive(archive.clone(), options.output_dir.clone())
                .await
                .map(|files| (bytes, files)),
            Err(e) => Err(e),
        };
        fs::remove_file(&archive).await.ok();

        match fetched {
            Ok((bytes, files)) => {
                info!(
                    order_id = %order_id,
                    request = i + 1,
                    of = remaining.len(),
                    bytes = bytes,
                    files = files.len(),
                    "Order downloaded"
                );
                report.files.extend(files);
                report.downloaded.push(order_id.clone());
            }
            Err(e) => {
                warn!(
                    order_id = %order_id,
                    error = %e,
                    "Unable to download order; check the order for messages"
                );
                report.failed.push(order_id.clone());
            }
        }

        fs::write(download_id_path(&options.state_dir), order_id).await?;
    }

    OrderRestart::remove(&options.state_dir).await?;
    let id_path = download_id_path(&options.state_dir);
    if fs::try_exists(&id_path).await? {
        fs::remove_file(id_path).await?;
    }

    info!(
        downloaded = report.downloaded.len(),
        failed = report.failed.len(),
        "Download complete"
    );
    Ok(report)
}

/// Stream an archive to `path`. Returns the number of bytes written.
async fn fetch_archive(
    session: &EarthdataSession,
    url: &str,
    path: &Path,
) -> EarthdataResult<u64> {
    let response = check_status(session.get(url).send().await?)?;

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .await?;

    let mut stream = response.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(written)
}

/// Extract every file in the archive into `out_dir`, flattened to base names.
pub async fn extract_archive(archive: PathBuf, out_dir: PathBuf) -> EarthdataResult<Vec<PathBuf>> {
    tokio::task::spawn_blocking(move || extract_flattened(&archive, &out_dir)).await?
}

fn extract_flattened(archive: &Path, out_dir: &Path) -> EarthdataResult<Vec<PathBuf>> {
    let mut archive = ZipArchive::new(File::open(archive)?)?;
    let mut files = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let Some(name) = entry.enclosed_name().and_then(|p| p.file_name()).map(PathBuf::from) else {
            warn!(member = %entry.name(), "Skipping archive member with an unsafe name");
            continue;
        };

        let target = out_dir.join(name);
        let mut outfile = File::create(&target)?;
        io::copy(&mut entry, &mut outfile)?;
        files.push(target);
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::zip_archive;

    #[tokio::test]
    async fn test_extract_flattens_members() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("order.zip");
        std::fs::write(
            &archive,
            zip_archive(&[
                ("5000001/ATL06_a.h5", &b"a"[..]),
                ("5000001/nested/ATL06_b.h5", &b"b"[..]),
            ]),
        )
        .unwrap();

        let out = dir.path().join("out");
        std::fs::create_dir_all(&out).unwrap();
        let mut files = extract_archive(archive, out.clone()).await.unwrap();
        files.sort();

        assert_eq!(files, vec![out.join("ATL06_a.h5"), out.join("ATL06_b.h5")]);
        assert_eq!(std::fs::read(out.join("ATL06_b.h5")).unwrap(), b"b");
    }

    #[tokio::test]
    async fn test_extract_rejects_non_zip() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("order.zip");
        std::fs::write(&archive, b"not a zip").unwrap();
        let result = extract_archive(archive, dir.path().to_path_buf()).await;
        assert!(matches!(result, Err(EarthdataError::Zip(_))));
    }

    #[tokio::test]
    async fn test_read_download_id() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_download_id(dir.path()).await.unwrap(), None);
        std::fs::write(download_id_path(dir.path()), "5000002\n").unwrap();
        assert_eq!(
            read_download_id(dir.path()).await.unwrap().as_deref(),
            Some("5000002")
        );
    }
}
