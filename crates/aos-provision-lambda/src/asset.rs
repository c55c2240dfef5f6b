//! Download and extraction of the S3-hosted provisioning asset.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use tracing::info;

const DOWNLOAD_ATTEMPTS: u32 = 10;
const DOWNLOAD_RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Downloaded and extracted provisioning asset.
pub struct ExtractedAsset {
    /// Root of the extracted configuration tree.
    pub path: PathBuf,
    /// ETag of the S3 object; serves as the stable physical resource id.
    pub etag: String,
}

/// Splits an `s3://bucket/key` URI into bucket and key.
fn parse_s3_uri(uri: &str) -> Result<(String, String)> {
    let remainder = uri
        .strip_prefix("s3://")
        .ok_or_else(|| anyhow!("Invalid S3 URI: {uri}"))?;
    let (bucket, key) = remainder
        .split_once('/')
        .ok_or_else(|| anyhow!("Invalid S3 URI: {uri}"))?;

    if bucket.is_empty() || key.is_empty() {
        bail!("Invalid S3 URI: {uri}");
    }

    Ok((bucket.to_string(), key.to_string()))
}

/// Downloads the zip asset, retrying on a fixed interval, and extracts it
/// next to the download in the temp directory.
pub async fn download_and_extract(uri: &str) -> Result<ExtractedAsset> {
    let (bucket, key) = parse_s3_uri(uri)?;
    let file_name = Path::new(&key)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("asset")
        .to_string();

    let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let s3 = aws_sdk_s3::Client::new(&config);

    let mut last_error = None;
    for attempt in 0..DOWNLOAD_ATTEMPTS {
        match download_once(&s3, &bucket, &key, &file_name).await {
            Ok((archive_path, etag)) => {
                info!("Downloaded {} to {}", uri, archive_path.display());
                let path = extract_zip(&archive_path)?;
                info!("Extracted asset to {}", path.display());
                return Ok(ExtractedAsset { path, etag });
            }
            Err(error) => {
                info!(
                    "Asset download failed (attempt {}/{}): {}",
                    attempt + 1,
                    DOWNLOAD_ATTEMPTS,
                    error
                );
                last_error = Some(error);

                if attempt + 1 < DOWNLOAD_ATTEMPTS {
                    tokio::time::sleep(DOWNLOAD_RETRY_INTERVAL).await;
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow!("Failed to download S3 asset: {uri}")))
}

async fn download_once(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    file_name: &str,
) -> Result<(PathBuf, String)> {
    let response = s3
        .get_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .context("GetObject failed")?;

    let etag = response
        .e_tag()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("S3 object has no ETag"))?;
    let data = response
        .body
        .collect()
        .await
        .context("Failed to read object body")?
        .into_bytes();

    let archive_path = std::env::temp_dir().join(file_name);
    let mut file = File::create(&archive_path).context("Failed to create asset file")?;
    file.write_all(&data).context("Failed to write asset file")?;

    Ok((archive_path, etag))
}

/// Extracts a zip archive to `<archive>-extracted` in the temp directory.
fn extract_zip(archive_path: &Path) -> Result<PathBuf> {
    let file_name = archive_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("archive");
    let target = std::env::temp_dir().join(format!("{file_name}-extracted"));

    let file = File::open(archive_path).context("Failed to open asset archive")?;
    let mut archive = zip::ZipArchive::new(file).context("Failed to read asset archive")?;
    archive
        .extract(&target)
        .context("Failed to extract asset archive")?;

    Ok(target)
}
