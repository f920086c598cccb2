use anyhow::{Context, Result};
use fs2::FileExt;
use log::{debug, info};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::models::ProjectsStore;
use crate::normalizer;

/// How long to wait for another process to release the lock
const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Handles saving and loading projects from a YAML file with file locking
/// for rudimentary multi-process safety
pub struct Storage {
    file_path: PathBuf,
    lock_file_path: PathBuf,
}

impl Storage {
    /// Creates a new Storage instance
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        let file_path = file_path.as_ref().to_path_buf();
        let lock_file_path = file_path.with_extension("yaml.lock");
        Self {
            file_path,
            lock_file_path,
        }
    }

    /// Returns the path to the storage file
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Polls `try_lock` until it succeeds or the timeout expires
    fn wait_for_lock<F>(&self, lock_file: &File, try_lock: F) -> Result<()>
    where
        F: Fn(&File) -> std::io::Result<()>,
    {
        let start = Instant::now();
        loop {
            match try_lock(lock_file) {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if start.elapsed() > LOCK_TIMEOUT {
                        anyhow::bail!(
                            "Timeout waiting for file lock - another process may be writing: {:?}",
                            self.file_path
                        );
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to acquire lock on {:?}", self.lock_file_path)
                    })
                }
            }
        }
    }

    /// Acquire an exclusive lock for writing.
    /// The returned handle must be held for the duration of the write.
    fn acquire_write_lock(&self) -> Result<File> {
        if let Some(parent) = self.lock_file_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.lock_file_path)
            .with_context(|| format!("Failed to create lock file: {:?}", self.lock_file_path))?;

        self.wait_for_lock(&lock_file, |f| FileExt::try_lock_exclusive(f))?;

        // Lock holder info, for debugging only
        let _ = writeln!(
            lock_file,
            "Locked by PID {} at {}",
            std::process::id(),
            chrono::Utc::now().to_rfc3339()
        );

        Ok(lock_file)
    }

    /// Acquire a shared lock for reading
    fn acquire_read_lock(&self) -> Result<Option<File>> {
        if !self.lock_file_path.exists() {
            return Ok(None);
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .open(&self.lock_file_path)
            .with_context(|| format!("Failed to open lock file: {:?}", self.lock_file_path))?;

        self.wait_for_lock(&lock_file, |f| FileExt::try_lock_shared(f))?;
        Ok(Some(lock_file))
    }

    fn read_store(&self) -> Result<ProjectsStore> {
        let file = File::open(&self.file_path)
            .with_context(|| format!("Failed to open file: {:?}", self.file_path))?;
        let reader = BufReader::new(file);
        serde_yaml::from_reader(reader)
            .with_context(|| format!("Failed to parse YAML from {:?}", self.file_path))
    }

    fn write_store(&self, store: &ProjectsStore) -> Result<()> {
        let yaml = serde_yaml::to_string(store)?;
        fs::write(&self.file_path, yaml)
            .with_context(|| format!("Failed to write {:?}", self.file_path))
    }

    /// Loads projects from the YAML file with file locking.
    ///
    /// Projects written by older versions or edited by hand are brought into
    /// canonical form; if that changed anything the file is rewritten.
    pub fn load(&self) -> Result<ProjectsStore> {
        if !self.file_path.exists() {
            let default_store = ProjectsStore::new();
            self.save(&default_store)?;
            return Ok(default_store);
        }

        let lock = self.acquire_read_lock()?;
        let mut store = self.read_store()?;
        drop(lock);

        let mut migrated = 0;
        for project in &mut store.projects {
            let before = project.clone();
            normalizer::normalize(project);
            if *project != before {
                debug!("Normalized project '{}' on load", project.app_name);
                migrated += 1;
            }
        }

        if migrated > 0 {
            info!("Rewriting {:?}: {} project(s) normalized", self.file_path, migrated);
            self.save(&store)?;
        }

        Ok(store)
    }

    /// Saves projects to the YAML file with file locking
    pub fn save(&self, store: &ProjectsStore) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Lock is released when dropped
        let _lock = self.acquire_write_lock()?;
        self.write_store(store)
    }

    /// Reloads the store under an exclusive lock, applies `update_fn` and
    /// writes the result. Nothing is written if `update_fn` fails.
    pub fn update_atomically<T, F>(&self, update_fn: F) -> Result<T>
    where
        F: FnOnce(&mut ProjectsStore) -> Result<T>,
    {
        let _lock = self.acquire_write_lock()?;

        let mut store = if self.file_path.exists() {
            self.read_store()?
        } else {
            ProjectsStore::new()
        };

        let result = update_fn(&mut store)?;
        self.write_store(&store)?;
        Ok(result)
    }
}
