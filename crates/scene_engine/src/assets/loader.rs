//! File access and background loading

use super::AssetError;
use crate::config::AssetConfig;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Byte source used by resource constructors.
///
/// Failures are reported as `None`/`false`, never as panics.
pub trait FileLoader: Send + Sync {
    /// Size of the file in bytes, `None` when it cannot be found
    fn size(&self, path: &str) -> Option<u64>;

    /// Append the file contents to `buffer`
    fn read(&self, path: &str, buffer: &mut Vec<u8>) -> bool;

    /// Whether `path` can be read
    fn exists(&self, path: &str) -> bool {
        self.size(path).is_some()
    }
}

/// Read a whole file through `loader`
pub fn load_bytes(loader: &dyn FileLoader, path: &str) -> Result<Vec<u8>, AssetError> {
    let size = loader.size(path).ok_or_else(|| AssetError::NotFound(path.to_string()))?;
    let mut buffer = Vec::with_capacity(usize::try_from(size).unwrap_or(0));
    if loader.read(path, &mut buffer) {
        Ok(buffer)
    } else {
        Err(AssetError::ReadFailed(path.to_string()))
    }
}

/// Loads from the file system, trying each search path in order and then the
/// path as given
#[derive(Debug, Clone, Default)]
pub struct FsLoader {
    search_paths: Vec<PathBuf>,
}

impl FsLoader {
    /// Loader trying `search_paths` in order, then the path as given
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// Loader using the configured search paths
    pub fn from_config(config: &AssetConfig) -> Self {
        Self::new(config.search_paths.iter().map(PathBuf::from).collect())
    }

    /// First existing file for `path`
    pub fn resolve(&self, path: &str) -> Option<PathBuf> {
        self.search_paths
            .iter()
            .map(|base| base.join(path))
            .chain(std::iter::once(PathBuf::from(path)))
            .find(|candidate| candidate.is_file())
    }
}

impl FileLoader for FsLoader {
    fn size(&self, path: &str) -> Option<u64> {
        let resolved = self.resolve(path)?;
        fs::metadata(resolved).ok().map(|m| m.len())
    }

    fn read(&self, path: &str, buffer: &mut Vec<u8>) -> bool {
        let Some(resolved) = self.resolve(path) else {
            log::warn!("File not found: {}", path);
            return false;
        };
        match fs::read(&resolved) {
            Ok(bytes) => {
                buffer.extend_from_slice(&bytes);
                true
            }
            Err(err) => {
                log::warn!("Failed to read {}: {}", resolved.display(), err);
                false
            }
        }
    }
}

/// In-memory file table
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryLoader {
    /// Empty in-memory file set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file
    pub fn with_file(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.into(), bytes.into());
        self
    }
}

impl FileLoader for MemoryLoader {
    fn size(&self, path: &str) -> Option<u64> {
        self.files.get(path).map(|bytes| bytes.len() as u64)
    }

    fn read(&self, path: &str, buffer: &mut Vec<u8>) -> bool {
        match self.files.get(path) {
            Some(bytes) => {
                buffer.extend_from_slice(bytes);
                true
            }
            None => false,
        }
    }
}

/// Identifies one load request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadTicket(u64);

/// Result of a background load, handed out by [`AsyncLoader::poll`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadCompletion {
    /// Ticket returned by [`AsyncLoader::request`]
    pub ticket: LoadTicket,
    /// Requested path
    pub path: String,
    /// Whether the file was read
    pub success: bool,
    /// File contents, empty on failure
    pub data: Vec<u8>,
}

struct LoadRequest {
    ticket: LoadTicket,
    path: String,
}

/// Reads files on worker threads.
///
/// Completions queue up until the owner calls [`AsyncLoader::poll`], which the
/// engine does once per frame before updating the scene, so loaded data never
/// reaches the scene mid-frame.
pub struct AsyncLoader {
    requests: Option<Sender<LoadRequest>>,
    completions: Receiver<LoadCompletion>,
    workers: Vec<thread::JoinHandle<()>>,
    next_ticket: u64,
    in_flight: usize,
}

impl AsyncLoader {
    /// Start `worker_threads` workers reading through `loader`
    pub fn new(loader: Arc<dyn FileLoader>, worker_threads: usize) -> Self {
        let (request_tx, request_rx) = unbounded::<LoadRequest>();
        let (completion_tx, completion_rx) = unbounded();

        let workers = (0..worker_threads.max(1))
            .map(|_| {
                let requests = request_rx.clone();
                let completions = completion_tx.clone();
                let loader = Arc::clone(&loader);
                thread::spawn(move || {
                    for request in requests.iter() {
                        let mut data = Vec::new();
                        let success = loader.read(&request.path, &mut data);
                        if !success {
                            data.clear();
                        }
                        let done = LoadCompletion {
                            ticket: request.ticket,
                            path: request.path,
                            success,
                            data,
                        };
                        if completions.send(done).is_err() {
                            break;
                        }
                    }
                })
            })
            .collect();

        Self {
            requests: Some(request_tx),
            completions: completion_rx,
            workers,
            next_ticket: 0,
            in_flight: 0,
        }
    }

    /// Queue a file for loading
    pub fn request(&mut self, path: &str) -> Result<LoadTicket, AssetError> {
        let ticket = LoadTicket(self.next_ticket);
        let sender = self.requests.as_ref().ok_or(AssetError::LoaderStopped)?;
        sender
            .send(LoadRequest { ticket, path: path.to_string() })
            .map_err(|_| AssetError::LoaderStopped)?;
        self.next_ticket += 1;
        self.in_flight += 1;
        log::debug!("Queued load of {} ({:?})", path, ticket);
        Ok(ticket)
    }

    /// Requests not yet handed out by `poll`
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Completions that arrived since the last call
    pub fn poll(&mut self) -> Vec<LoadCompletion> {
        let done: Vec<LoadCompletion> = self.completions.try_iter().collect();
        self.in_flight -= done.len();
        done
    }

    /// Block until every request completed or `timeout` passed
    pub fn wait(&mut self, timeout: Duration) -> Vec<LoadCompletion> {
        let deadline = Instant::now() + timeout;
        let mut done = Vec::new();
        while done.len() < self.in_flight {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.completions.recv_timeout(remaining) {
                Ok(completion) => done.push(completion),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => break,
            }
        }
        self.in_flight -= done.len();
        done
    }
}

impl Drop for AsyncLoader {
    fn drop(&mut self) {
        self.requests = None;
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("Asset loader worker panicked");
            }
        }
    }
}
