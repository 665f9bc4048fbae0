#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Download and extraction collaborator.
//!
//! The core pipeline only ever consumes local file paths; this crate is
//! the one place that touches the network. Downloads stream to disk to
//! avoid holding national-scale files in memory, and [`fetch`] implements
//! the caching policy: if the destination already exists, the download is
//! skipped entirely.

use std::path::Path;

use futures::StreamExt as _;
use tokio::io::AsyncWriteExt as _;

/// Errors from download and extraction operations.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("HTTP {status} for {url}")]
    HttpStatus {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// ZIP archive error.
    #[error("Archive error at {path}: {source}")]
    Zip {
        /// Archive path that caused the error.
        path: String,
        /// Underlying ZIP error.
        source: zip::result::ZipError,
    },

    /// I/O error reading or writing local files.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Downloads a file from a URL to a local path with progress logging.
///
/// Uses streaming to avoid loading the entire file into memory.
///
/// # Errors
///
/// Returns an error if the HTTP request fails, the response is not
/// successful, or the local file cannot be written.
pub async fn download_file(url: &str, dest: &Path) -> Result<u64, DownloadError> {
    log::info!("Downloading {url}");
    log::info!("  -> {}", dest.display());

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DownloadError::Io {
                path: parent.display().to_string(),
                source: e,
            })?;
    }

    let client = reqwest::Client::builder()
        .user_agent("airshed/0.1")
        .build()?;

    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(DownloadError::HttpStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let total_size = response.content_length();
    if let Some(size) = total_size {
        #[allow(clippy::cast_precision_loss)]
        let mb = size as f64 / 1_048_576.0;
        log::info!("  file size: {mb:.1} MB");
    }

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| DownloadError::Io {
            path: dest.display().to_string(),
            source: e,
        })?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    let mut last_log_mb: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)
            .await
            .map_err(|e| DownloadError::Io {
                path: dest.display().to_string(),
                source: e,
            })?;
        downloaded += chunk.len() as u64;

        // Log progress every 100 MB
        let current_mb = downloaded / (100 * 1_048_576);
        if current_mb > last_log_mb {
            last_log_mb = current_mb;
            #[allow(clippy::cast_precision_loss)]
            let mb = downloaded as f64 / 1_048_576.0;
            log::info!("  downloaded {mb:.0} MB");
        }
    }

    file.flush().await.map_err(|e| DownloadError::Io {
        path: dest.display().to_string(),
        source: e,
    })?;

    #[allow(clippy::cast_precision_loss)]
    let mb = downloaded as f64 / 1_048_576.0;
    log::info!("  download complete: {mb:.1} MB");

    Ok(downloaded)
}

/// Downloads a file unless the destination already exists.
///
/// This is the pipeline's caching policy: an existing artifact is trusted
/// and never re-fetched.
///
/// # Errors
///
/// See [`download_file`].
pub async fn fetch(url: &str, dest: &Path) -> Result<(), DownloadError> {
    if dest.exists() {
        log::info!("Skipping {}, already downloaded", dest.display());
        return Ok(());
    }
    download_file(url, dest).await?;
    Ok(())
}

/// Unpacks a ZIP archive into a directory.
///
/// The target directory is created if it does not exist. Existing
/// contents are **not** removed; the archive contents are extracted on
/// top.
///
/// # Errors
///
/// Returns an error if the archive cannot be read or the directory
/// cannot be written.
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<u64, DownloadError> {
    log::info!(
        "Extracting {} -> {}",
        archive_path.display(),
        dest_dir.display()
    );

    std::fs::create_dir_all(dest_dir).map_err(|e| DownloadError::Io {
        path: dest_dir.display().to_string(),
        source: e,
    })?;

    let file = std::fs::File::open(archive_path).map_err(|e| DownloadError::Io {
        path: archive_path.display().to_string(),
        source: e,
    })?;

    let mut archive = zip::ZipArchive::new(file).map_err(|e| DownloadError::Zip {
        path: archive_path.display().to_string(),
        source: e,
    })?;

    let count = archive.len() as u64;
    archive.extract(dest_dir).map_err(|e| DownloadError::Zip {
        path: archive_path.display().to_string(),
        source: e,
    })?;

    log::info!("  extracted {count} entries");
    Ok(count)
}

/// Removes large intermediate files, ignoring files already gone.
///
/// # Errors
///
/// Returns an error only for real I/O failures, not missing files.
pub fn remove_intermediates(paths: &[&Path]) -> Result<(), DownloadError> {
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => log::debug!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(DownloadError::Io {
                    path: path.display().to_string(),
                    source: e,
                });
            }
        }
    }
    Ok(())
}
