//! Offline cache worker.
//!
//! The worker owns a [`CacheStorage`] and a live network client and runs on
//! its own thread. The rest of the app reaches it only through a
//! [`WorkerHandle`], which forwards requests over a channel and waits for the
//! reply. Lifecycle: install (precache the manifest, all or nothing), then
//! activate (purge every other bucket), then serve fetches cache-first.

pub mod cache;

use std::{
    sync::mpsc::{self, Sender},
    thread,
};

use tracing::{debug, error, info, warn};

pub use cache::{Cache, CacheStorage};

use crate::{
    error::{CacheError, FetchError},
    net::{Fetch, Origin, Request, Response},
};

/// Version tag of the current asset set.
pub const DEFAULT_CACHE_NAME: &str = "spe-tickets-v1";
/// Suffix of the bucket an install writes into before it goes live.
pub const STAGING_SUFFIX: &str = ".installing";
/// Served for failed page navigations while offline.
pub const OFFLINE_SHELL: &str = "./index.html";

/// Assets precached on install.
pub const DEFAULT_MANIFEST: &[&str] = &[
    "./",
    "./index.html",
    "./styles.css",
    "./app.js",
    "./manifest.json",
    "./tickets.json",
    "./icon-192.png",
    "./icon-512.png",
];

pub fn default_manifest() -> Vec<String> {
    DEFAULT_MANIFEST.iter().map(|s| s.to_string()).collect()
}

pub struct CacheWorker {
    name: String,
    manifest: Vec<String>,
    caches: CacheStorage,
    network: Box<dyn Fetch + Send>,
}

impl std::fmt::Debug for CacheWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheWorker")
            .field("name", &self.name)
            .field("manifest", &self.manifest)
            .field("caches", &self.caches)
            .finish_non_exhaustive()
    }
}

impl CacheWorker {
    pub fn new(
        name: impl Into<String>,
        manifest: Vec<String>,
        caches: CacheStorage,
        network: Box<dyn Fetch + Send>,
    ) -> Self {
        Self {
            name: name.into(),
            manifest,
            caches,
            network,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fetches every manifest asset and stores them in the current bucket.
    ///
    /// Nothing is written until every fetch has succeeded. Entries go into a
    /// staging bucket that replaces the live one only once it is complete, so
    /// a failed install leaves whatever was installed before untouched.
    pub fn install(&self) -> Result<(), CacheError> {
        let mut fetched = Vec::with_capacity(self.manifest.len());
        for url in &self.manifest {
            let resp = self
                .network
                .fetch(&Request::get(url.as_str()))
                .map_err(|source| CacheError::Fetch {
                    url: url.clone(),
                    source,
                })?;
            if !resp.ok() {
                return Err(CacheError::Status {
                    url: url.clone(),
                    status: resp.status,
                });
            }
            fetched.push((url, resp));
        }

        let staging = format!("{}{STAGING_SUFFIX}", self.name);
        self.caches.delete(&staging)?;
        let cache = self.caches.open(&staging)?;
        let written = fetched
            .iter()
            .try_for_each(|(url, resp)| cache.put(url, resp))
            .and_then(|()| self.caches.replace(&staging, &self.name));
        if let Err(e) = written {
            if let Err(cleanup) = self.caches.delete(&staging) {
                warn!(error = %cleanup, "failed to remove staging cache");
            }
            return Err(e);
        }
        info!(cache = %self.name, assets = fetched.len(), "cache installed");
        Ok(())
    }

    /// Startup lifecycle: installs unless the current bucket is already on
    /// disk from an earlier run, then activates.
    pub fn start(&self) -> Result<(), CacheError> {
        if self.caches.has(&self.name) {
            info!(cache = %self.name, "cache already installed");
        } else {
            self.install()?;
        }
        self.activate().map(drop)
    }

    /// Deletes every bucket except the current one. Returns the deleted names.
    pub fn activate(&self) -> Result<Vec<String>, CacheError> {
        let mut purged = Vec::new();
        for name in self.caches.keys()? {
            if name != self.name {
                self.caches.delete(&name)?;
                purged.push(name);
            }
        }
        if !purged.is_empty() {
            info!(?purged, "removed stale caches");
        }
        Ok(purged)
    }

    /// Cache-first lookup with an offline shell for page navigations.
    pub fn handle_fetch(&self, req: &Request) -> Result<Response, FetchError> {
        if let Some(resp) = self.cached(&req.url) {
            debug!(url = %req.url, "served from cache");
            return Ok(resp);
        }
        match self.network.fetch(req) {
            Ok(resp) => Ok(resp),
            Err(e) => {
                if req.accepts_html() {
                    if let Some(shell) = self.cached(OFFLINE_SHELL) {
                        debug!(url = %req.url, "offline, serving shell");
                        return Ok(shell);
                    }
                }
                Err(e)
            }
        }
    }

    fn cached(&self, url: &str) -> Option<Response> {
        let lookup = self
            .caches
            .get(&self.name)
            .and_then(|c| c.map_or(Ok(None), |c| c.lookup(url)));
        match lookup {
            Ok(resp) => resp,
            Err(e) => {
                warn!(url, error = %e, "cache lookup failed");
                None
            }
        }
    }

    /// Moves the worker onto its own thread, runs [`Self::start`] there and
    /// returns a handle once it is ready to serve.
    pub fn spawn(self) -> Result<WorkerHandle, CacheError> {
        let (tx, rx) = mpsc::channel::<Message>();
        let (ready_tx, ready_rx) = mpsc::channel();
        thread::Builder::new()
            .name("cache-worker".into())
            .spawn(move || {
                let ready = self.start();
                let failed = ready.is_err();
                let _ = ready_tx.send(ready);
                if failed {
                    return;
                }
                for msg in rx {
                    match msg {
                        Message::Fetch { request, reply } => {
                            let _ = reply.send(self.handle_fetch(&request));
                        }
                    }
                }
                debug!("cache worker stopped");
            })
            .map_err(CacheError::Spawn)?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(WorkerHandle { tx }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CacheError::WorkerStopped),
        }
    }
}

enum Message {
    Fetch {
        request: Request,
        reply: Sender<Result<Response, FetchError>>,
    },
}

/// The app's side of the worker boundary.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: Sender<Message>,
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WorkerHandle")
    }
}

impl Fetch for WorkerHandle {
    fn fetch(&self, req: &Request) -> Result<Response, FetchError> {
        let (reply, rx) = mpsc::channel();
        self.tx
            .send(Message::Fetch {
                request: req.clone(),
                reply,
            })
            .map_err(|_| FetchError::WorkerGone)?;
        rx.recv().map_err(|_| FetchError::WorkerGone)?
    }
}

/// Settings for [`register`].
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub cache_name: String,
    pub manifest: Vec<String>,
    pub cache_dir: std::path::PathBuf,
}

/// Starts the worker for `origin` and returns the fetcher the app should use.
///
/// If the worker cannot be installed the failure is logged and the app gets a
/// direct network client instead, so it keeps working online.
pub fn register(config: &WorkerConfig, origin: &Origin) -> Result<Box<dyn Fetch + Send>, FetchError> {
    let worker = CacheWorker::new(
        config.cache_name.clone(),
        config.manifest.clone(),
        CacheStorage::new(&config.cache_dir),
        origin.connect()?,
    );
    match worker.spawn() {
        Ok(handle) => {
            info!(cache = %config.cache_name, %origin, "cache worker registered");
            Ok(Box::new(handle))
        }
        Err(e) => {
            error!(error = %e, "cache worker registration failed, continuing online only");
            origin.connect()
        }
    }
}
