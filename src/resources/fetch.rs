//! Fetching asset files.
//!
//! Natively files are read from disk relative to the asset directory. On the
//! web they are requested relative to the page's URL. Embedded `data:` URIs
//! are decoded in place on both.

use anyhow::Context as _;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

#[cfg(not(target_arch = "wasm32"))]
const CHUNK_SIZE: usize = 64 * 1024;

/// Bytes received so far. `total` is unknown when the server sends no length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub loaded: u64,
    pub total: Option<u64>,
}

impl Progress {
    pub fn percent(&self) -> Option<f64> {
        self.total
            .filter(|&total| total > 0)
            .map(|total| self.loaded as f64 / total as f64 * 100.0)
    }
}

/// Halves round up, so 12.5% reads as 13%.
pub fn progress_message(progress: Progress) -> String {
    match progress.percent() {
        Some(percent) => format!("Loading {}%", percent.round()),
        None => format!("Loading {} bytes", progress.loaded),
    }
}

pub fn log_progress(progress: Progress) {
    log::info!("{}", progress_message(progress));
}

/// Payload of a `data:` URI. Base64 payloads are decoded, anything else is
/// percent-decoded.
pub fn decode_data_uri(uri: &str) -> anyhow::Result<Vec<u8>> {
    let rest = uri.strip_prefix("data:").context("Not a data URI")?;
    let (header, payload) = rest.split_once(',').context("Data URI has no payload")?;
    if header.ends_with(";base64") {
        BASE64
            .decode(payload.trim())
            .context("Data URI holds invalid base64")
    } else {
        Ok(urlencoding::decode_binary(payload.as_bytes()).into_owned())
    }
}

/// Read `uri` relative to `base`, reporting progress after every chunk.
pub async fn load_binary(
    base: &str,
    uri: &str,
    mut on_progress: impl FnMut(Progress),
) -> anyhow::Result<Vec<u8>> {
    if uri.starts_with("data:") {
        let data = decode_data_uri(uri)?;
        let size = data.len() as u64;
        on_progress(Progress {
            loaded: size,
            total: Some(size),
        });
        return Ok(data);
    }

    #[cfg(target_arch = "wasm32")]
    let data = {
        use futures::StreamExt;

        let url = format_url(base, uri)?;
        let response = reqwest::get(url.clone())
            .await
            .with_context(|| format!("Request for {url} failed"))?
            .error_for_status()?;
        let total = response.content_length();
        let mut data = Vec::with_capacity(total.unwrap_or(0) as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            data.extend_from_slice(&chunk?);
            on_progress(Progress {
                loaded: data.len() as u64,
                total,
            });
        }
        data
    };

    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        use tokio::io::AsyncReadExt;

        // glTF percent-encodes relative URIs
        let relative = urlencoding::decode(uri).with_context(|| format!("{uri} is not valid UTF-8"))?;
        let path = std::path::Path::new(base).join(relative.as_ref());
        let mut file = tokio::fs::File::open(&path)
            .await
            .with_context(|| format!("Cannot open {}", path.display()))?;
        let total = file.metadata().await.ok().map(|meta| meta.len());
        let mut data = Vec::with_capacity(total.unwrap_or(0) as usize);
        let mut chunk = vec![0; CHUNK_SIZE];
        loop {
            let read = file.read(&mut chunk).await?;
            if read == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..read]);
            on_progress(Progress {
                loaded: data.len() as u64,
                total,
            });
        }
        data
    };

    Ok(data)
}

#[cfg(target_arch = "wasm32")]
fn format_url(base: &str, uri: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().context("No window to resolve asset URLs against")?;
    let href = window
        .location()
        .href()
        .map_err(|e| anyhow::anyhow!("Cannot read the page URL: {e:?}"))?;
    let base = if base.is_empty() || base.ends_with('/') {
        base.to_string()
    } else {
        format!("{base}/")
    };
    Ok(reqwest::Url::parse(&href)?.join(&base)?.join(uri)?)
}
