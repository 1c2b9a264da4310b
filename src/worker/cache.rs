//! Named cache buckets on disk.
//!
//! Layout: `<root>/<bucket name>/<blake3(url)>.body` holds the bytes and a
//! sibling `.meta.json` holds the URL, status and content type. An entry
//! counts as present only once its metadata file exists.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::CacheError, net::Response};

pub type Result<T> = std::result::Result<T, CacheError>;

fn io_err(path: &Path) -> impl Fn(io::Error) -> CacheError + '_ {
    move |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// All buckets under one root directory.
#[derive(Debug, Clone)]
pub struct CacheStorage {
    root: PathBuf,
}

impl CacheStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name == "." || name == ".." || name.contains(&['/', '\\'][..]) {
            return Err(CacheError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    /// Opens a bucket, creating it if needed.
    pub fn open(&self, name: &str) -> Result<Cache> {
        let dir = self.bucket_dir(name)?;
        fs::create_dir_all(&dir).map_err(io_err(&dir))?;
        Ok(Cache { dir })
    }

    /// Returns an existing bucket without creating one.
    pub fn get(&self, name: &str) -> Result<Option<Cache>> {
        let dir = self.bucket_dir(name)?;
        Ok(dir.is_dir().then_some(Cache { dir }))
    }

    pub fn has(&self, name: &str) -> bool {
        self.bucket_dir(name).is_ok_and(|d| d.is_dir())
    }

    /// Bucket names, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(&self.root)(e)),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(io_err(&self.root))?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Deletes a bucket. Returns whether it existed.
    pub fn delete(&self, name: &str) -> Result<bool> {
        let dir = self.bucket_dir(name)?;
        if !dir.is_dir() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir).map_err(io_err(&dir))?;
        Ok(true)
    }

    /// Moves bucket `from` into place as `to`, replacing any existing `to`.
    /// If the move fails the previous `to` is put back.
    pub fn replace(&self, from: &str, to: &str) -> Result<()> {
        let src = self.bucket_dir(from)?;
        let dst = self.bucket_dir(to)?;
        let retired = self.bucket_dir(&format!("{to}.retired"))?;
        if retired.is_dir() {
            fs::remove_dir_all(&retired).map_err(io_err(&retired))?;
        }
        let had_live = dst.is_dir();
        if had_live {
            fs::rename(&dst, &retired).map_err(io_err(&dst))?;
        }
        if let Err(e) = fs::rename(&src, &dst) {
            if had_live {
                let _ = fs::rename(&retired, &dst);
            }
            return Err(io_err(&src)(e));
        }
        if had_live {
            fs::remove_dir_all(&retired).map_err(io_err(&retired))?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    url: String,
    status: u16,
    #[serde(default)]
    content_type: Option<String>,
    cached_at: DateTime<Utc>,
}

/// One bucket: exact URL → stored response.
#[derive(Debug, Clone)]
pub struct Cache {
    dir: PathBuf,
}

impl Cache {
    fn paths(&self, url: &str) -> (PathBuf, PathBuf) {
        let key = blake3::hash(url.as_bytes()).to_hex();
        (
            self.dir.join(format!("{key}.body")),
            self.dir.join(format!("{key}.meta.json")),
        )
    }

    pub fn put(&self, url: &str, resp: &Response) -> Result<()> {
        let (body_path, meta_path) = self.paths(url);
        fs::write(&body_path, &resp.body).map_err(io_err(&body_path))?;
        let meta = EntryMeta {
            url: url.to_string(),
            status: resp.status,
            content_type: resp.content_type.clone(),
            cached_at: Utc::now(),
        };
        let json = serde_json::to_vec_pretty(&meta)?;
        fs::write(&meta_path, json).map_err(io_err(&meta_path))?;
        Ok(())
    }

    /// Exact match on `url`.
    pub fn lookup(&self, url: &str) -> Result<Option<Response>> {
        let (body_path, meta_path) = self.paths(url);
        let meta_raw = match fs::read(&meta_path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(&meta_path)(e)),
        };
        let meta: EntryMeta = serde_json::from_slice(&meta_raw)?;
        if meta.url != url {
            return Ok(None);
        }
        let body = fs::read(&body_path).map_err(io_err(&body_path))?;
        Ok(Some(Response::new(meta.status, meta.content_type, body)))
    }

    /// Stored URLs with their cache time, oldest first.
    pub fn entries(&self) -> Result<Vec<(String, DateTime<Utc>)>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(io_err(&self.dir))? {
            let path = entry.map_err(io_err(&self.dir))?.path();
            if !path.to_string_lossy().ends_with(".meta.json") {
                continue;
            }
            let raw = fs::read(&path).map_err(io_err(&path))?;
            let meta: EntryMeta = serde_json::from_slice(&raw)?;
            out.push((meta.url, meta.cached_at));
        }
        out.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_and_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let caches = CacheStorage::new(dir.path());
        let cache = caches.open("v1").unwrap();
        let resp = Response::new(200, Some("text/css".into()), vec![0, 159, 146, 150]);
        cache.put("./styles.css", &resp).unwrap();

        assert_eq!(cache.lookup("./styles.css").unwrap(), Some(resp));
        assert_eq!(cache.lookup("./styles.css?v=2").unwrap(), None);
        let entries = cache.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "./styles.css");
    }

    #[test]
    fn keys_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let caches = CacheStorage::new(dir.path().join("caches"));
        assert!(caches.keys().unwrap().is_empty());
        caches.open("b").unwrap();
        caches.open("a").unwrap();
        assert_eq!(caches.keys().unwrap(), vec!["a", "b"]);
        assert!(caches.delete("a").unwrap());
        assert!(!caches.delete("a").unwrap());
        assert!(!caches.has("a"));
        assert!(caches.get("a").unwrap().is_none());
        assert_eq!(caches.keys().unwrap(), vec!["b"]);
    }

    #[test]
    fn replace_swaps_buckets() {
        let dir = tempfile::tempdir().unwrap();
        let caches = CacheStorage::new(dir.path());
        let live = caches.open("v1").unwrap();
        live.put("./old.js", &Response::new(200, None, b"old".to_vec())).unwrap();
        let staged = caches.open("v1.installing").unwrap();
        staged.put("./new.js", &Response::new(200, None, b"new".to_vec())).unwrap();

        caches.replace("v1.installing", "v1").unwrap();
        assert_eq!(caches.keys().unwrap(), vec!["v1"]);
        let live = caches.get("v1").unwrap().unwrap();
        assert_eq!(live.lookup("./old.js").unwrap(), None);
        assert_eq!(live.lookup("./new.js").unwrap().unwrap().body, b"new");

        // missing source keeps the live bucket
        assert!(caches.replace("gone", "v1").is_err());
        assert!(caches.get("v1").unwrap().unwrap().lookup("./new.js").unwrap().is_some());
    }

    #[test]
    fn names_stay_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        let caches = CacheStorage::new(dir.path());
        for bad in ["", "..", "a/b", "a\\b"] {
            assert!(matches!(caches.open(bad), Err(CacheError::InvalidName(_))));
        }
    }
}
