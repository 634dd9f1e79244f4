//! Remote artifact fetching.
//!
//! Archives live in a flat artifact store under `<base>/<name>.tgz`. A fetch
//! downloads the archive and unpacks it into a destination directory. There
//! is no retry and no checksum: a failed download or a failed extraction is
//! reported as is, and a partially extracted tree is left in place.
//!
//! The base is normally an HTTP(S) URL. A `file://` URL or a plain path
//! selects a local mirror directory instead, which is how offline builds and
//! the tests serve artifacts.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Errors that can occur while fetching artifacts.
#[derive(Debug, Error)]
pub enum FetchError {
  /// HTTP request failed.
  #[error("fetch failed for {url}")]
  Request {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  /// The server answered with a non-success status.
  #[error("fetch failed for {url}: HTTP {status}")]
  Status { url: String, status: u16 },

  /// Reading from a local mirror failed.
  #[error("failed to read '{path}'")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// The archive could not be unpacked.
  #[error("failed to extract {name} into '{dest}'")]
  Extract {
    name: String,
    dest: PathBuf,
    #[source]
    source: io::Error,
  },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
  Http(String),
  Dir(PathBuf),
}

/// A flat store of `.tgz` archives and documents.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
  source: Source,
  client: reqwest::Client,
}

impl ArtifactStore {
  /// Create a store from a base URL or directory.
  pub fn new(base: &str) -> Self {
    let base = base.trim_end_matches('/');
    let source = if let Some(path) = base.strip_prefix("file://") {
      Source::Dir(PathBuf::from(path))
    } else if base.starts_with("http://") || base.starts_with("https://") {
      Source::Http(base.to_string())
    } else {
      Source::Dir(PathBuf::from(base))
    };
    Self {
      source,
      client: reqwest::Client::new(),
    }
  }

  /// Create a store backed by a local mirror directory.
  pub fn local(dir: impl Into<PathBuf>) -> Self {
    Self {
      source: Source::Dir(dir.into()),
      client: reqwest::Client::new(),
    }
  }

  /// Location of `file` in this store, as a URL or path string.
  pub fn location(&self, file: &str) -> String {
    match &self.source {
      Source::Http(base) => format!("{}/{}", base, file),
      Source::Dir(dir) => dir.join(file).display().to_string(),
    }
  }

  /// Download `<name>.tgz` and unpack it under `dest`.
  ///
  /// The archive is streamed into the extractor as it arrives; it is never
  /// held in memory whole. `dest` is created if it does not exist.
  pub async fn fetch(&self, name: &str, dest: &Path) -> Result<(), FetchError> {
    let file = format!("{}.tgz", name);
    info!(archive = %name, dest = %dest.display(), "fetching archive");

    let extract_err = |source| FetchError::Extract {
      name: name.to_string(),
      dest: dest.to_path_buf(),
      source,
    };
    let dest_buf = dest.to_path_buf();

    match &self.source {
      Source::Http(base) => {
        let url = format!("{}/{}", base, file);
        let mut response = self.get(&url).await?;

        let (tx, rx) = mpsc::channel(CHUNK_QUEUE);
        let extract = tokio::task::spawn_blocking(move || extract_tgz(ChunkReader::new(rx), &dest_buf));

        let mut downloaded = 0usize;
        let mut download = Ok(());
        loop {
          match response.chunk().await {
            Ok(Some(chunk)) => {
              downloaded += chunk.len();
              // A closed receiver means extraction already failed.
              if tx.send(chunk.to_vec()).await.is_err() {
                break;
              }
            }
            Ok(None) => break,
            Err(e) => {
              download = Err(FetchError::Request {
                url: url.clone(),
                source: e,
              });
              break;
            }
          }
        }
        drop(tx);

        let extracted = join_blocking(extract).await;
        download?;
        debug!(archive = %name, size = downloaded, "downloaded archive");
        extracted.map_err(extract_err)
      }
      Source::Dir(dir) => {
        let path = dir.join(&file);
        let archive = tokio::fs::File::open(&path)
          .await
          .map_err(|source| FetchError::Read { path, source })?
          .into_std()
          .await;
        join_blocking(tokio::task::spawn_blocking(move || extract_tgz(archive, &dest_buf)))
          .await
          .map_err(extract_err)
      }
    }
  }

  /// Download a single document (not an archive) and return its bytes.
  pub async fn fetch_document(&self, file: &str) -> Result<Vec<u8>, FetchError> {
    debug!(file, "fetching document");
    match &self.source {
      Source::Http(base) => {
        let url = format!("{}/{}", base, file);
        let response = self.get(&url).await?;
        let bytes = response.bytes().await.map_err(|e| FetchError::Request { url, source: e })?;
        Ok(bytes.to_vec())
      }
      Source::Dir(dir) => {
        let path = dir.join(file);
        tokio::fs::read(&path)
          .await
          .map_err(|source| FetchError::Read { path, source })
      }
    }
  }

  /// Send a GET request and check the status.
  async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
    let response = self.client.get(url).send().await.map_err(|e| FetchError::Request {
      url: url.to_string(),
      source: e,
    })?;

    if !response.status().is_success() {
      return Err(FetchError::Status {
        url: url.to_string(),
        status: response.status().as_u16(),
      });
    }
    Ok(response)
  }
}

/// Chunks buffered between the download and the extractor.
const CHUNK_QUEUE: usize = 16;

async fn join_blocking(task: tokio::task::JoinHandle<io::Result<()>>) -> io::Result<()> {
  task.await.map_err(io::Error::other).and_then(|r| r)
}

/// Blocking [`Read`] over chunks arriving on a channel.
///
/// Must only be read from a blocking thread. A closed channel reads as end of
/// stream.
struct ChunkReader {
  rx: mpsc::Receiver<Vec<u8>>,
  chunk: Vec<u8>,
  pos: usize,
}

impl ChunkReader {
  fn new(rx: mpsc::Receiver<Vec<u8>>) -> Self {
    Self {
      rx,
      chunk: Vec::new(),
      pos: 0,
    }
  }
}

impl Read for ChunkReader {
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    while self.pos == self.chunk.len() {
      match self.rx.blocking_recv() {
        Some(chunk) => {
          self.chunk = chunk;
          self.pos = 0;
        }
        None => return Ok(0),
      }
    }
    let n = buf.len().min(self.chunk.len() - self.pos);
    buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
    self.pos += n;
    Ok(n)
  }
}

/// Unpack a gzip-compressed tar stream into `dest`.
///
/// Entries keep their recorded permissions and overwrite existing files.
pub fn extract_tgz(reader: impl Read, dest: &Path) -> io::Result<()> {
  std::fs::create_dir_all(dest)?;
  let mut archive = Archive::new(GzDecoder::new(reader));
  archive.set_preserve_permissions(true);
  archive.set_overwrite(true);
  archive.unpack(dest)
}
