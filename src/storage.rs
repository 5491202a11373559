use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions, Permissions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use once_cell::sync::Lazy;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, TodoError};
use crate::models::Task;

/// One writer lock per backing file, shared by every `TaskStore` in the process.
static STORE_LOCKS: Lazy<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Returns the writer lock for `path`, keyed by its normalized form so that
/// `./tasks.json` and `/abs/dir/tasks.json` share a lock.
fn path_lock(path: &Path) -> Arc<Mutex<()>> {
    let key = normalize(path);
    let mut locks = STORE_LOCKS.lock().unwrap_or_else(PoisonError::into_inner);
    locks.entry(key).or_default().clone()
}

fn normalize(path: &Path) -> PathBuf {
    if let Ok(p) = fs::canonicalize(path) {
        return p;
    }
    // File not written yet: canonicalize the directory instead.
    match (path.parent(), path.file_name()) {
        (Some(dir), Some(name)) => {
            let dir = if dir.as_os_str().is_empty() { Path::new(".") } else { dir };
            fs::canonicalize(dir)
                .map(|d| d.join(name))
                .unwrap_or_else(|_| path.to_path_buf())
        }
        _ => path.to_path_buf(),
    }
}

/// Holds an exclusive advisory lock on `<task file>.lock` until dropped,
/// keeping other processes out of the read-modify-write window.
struct FileLockGuard {
    file: File,
}

impl FileLockGuard {
    fn acquire(target: &Path) -> Result<Self> {
        let mut name = target
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("tasks"));
        name.push(".lock");
        let lock_path = target.with_file_name(name);
        if let Some(dir) = lock_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| TodoError::io(dir, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| TodoError::io(&lock_path, e))?;
        file.lock().map_err(|e| TodoError::io(&lock_path, e))?;
        Ok(FileLockGuard { file })
    }
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Mode for a task file that does not exist yet.
#[cfg(unix)]
fn new_file_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<Permissions> {
    None
}

/// File-backed task list.
///
/// Every operation reads the whole JSON document, and every mutation rewrites
/// it. Mutations hold the per-path mutex (threads) and a lock file
/// (processes) for the full read-modify-write window, and replace the file
/// atomically, so readers never see a half-written list.
#[derive(Debug, Clone)]
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TaskStore { path: path.into() }
    }

    /// Location of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads all tasks in insertion order.
    ///
    /// A missing or empty file is an empty list.
    pub fn list(&self) -> Result<Vec<Task>> {
        self.load()
    }

    /// Appends a new task and returns it.
    pub fn add(&self, content: &str) -> Result<Task> {
        let content = content.trim();
        if content.is_empty() {
            return Err(TodoError::Validation("task content cannot be empty".into()));
        }
        self.update(|tasks| {
            let next_id = tasks
                .iter()
                .map(|t| t.id)
                .max()
                .unwrap_or(0)
                .checked_add(1)
                .ok_or_else(|| TodoError::Validation("no task ids left".into()))?;
            let task = Task::new(next_id, content);
            tasks.push(task.clone());
            Ok(task)
        })
    }

    /// Sets the completion flag of task `id`, returning the updated task.
    pub fn set_done(&self, id: u64, done: bool) -> Result<Task> {
        self.update(|tasks| {
            let task = tasks
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or(TodoError::NotFound(id))?;
            task.done = done;
            Ok(task.clone())
        })
    }

    /// Removes task `id`, returning it.
    pub fn delete(&self, id: u64) -> Result<Task> {
        self.update(|tasks| {
            let idx = tasks
                .iter()
                .position(|t| t.id == id)
                .ok_or(TodoError::NotFound(id))?;
            Ok(tasks.remove(idx))
        })
    }

    /// Discards every task. Does not look at the current contents, so it also
    /// recovers a corrupt file.
    pub fn clear(&self) -> Result<()> {
        let target = self.target();
        let lock = path_lock(&target);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let _file_lock = FileLockGuard::acquire(&target)?;
        self.save(&target, &[])
    }

    /// Load, mutate, save under both writer locks. Nothing is written when
    /// `f` fails.
    fn update<T>(&self, f: impl FnOnce(&mut Vec<Task>) -> Result<T>) -> Result<T> {
        let target = self.target();
        let lock = path_lock(&target);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let _file_lock = FileLockGuard::acquire(&target)?;
        let mut tasks = self.load()?;
        let out = f(&mut tasks)?;
        self.save(&target, &tasks)?;
        Ok(out)
    }

    /// The file actually written: a symlinked task file is followed so the
    /// link itself survives saves.
    fn target(&self) -> PathBuf {
        match fs::symlink_metadata(&self.path) {
            Ok(meta) if meta.file_type().is_symlink() => {
                fs::canonicalize(&self.path).unwrap_or_else(|_| self.path.clone())
            }
            _ => self.path.clone(),
        }
    }

    fn load(&self) -> Result<Vec<Task>> {
        let s = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no task file yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(TodoError::io(&self.path, e)),
        };
        if s.trim().is_empty() {
            return Ok(Vec::new());
        }
        let tasks: Vec<Task> = serde_json::from_str(&s).map_err(|source| TodoError::Decode {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), count = tasks.len(), "loaded tasks");
        Ok(tasks)
    }

    fn save(&self, target: &Path, tasks: &[Task]) -> Result<()> {
        let mut s = serde_json::to_string_pretty(tasks).map_err(TodoError::Encode)?;
        s.push('\n');
        let dir = match target.parent() {
            Some(d) if !d.as_os_str().is_empty() => d,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| TodoError::io(dir, e))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| TodoError::io(dir, e))?;
        if let Err(e) = tmp.write_all(s.as_bytes()) {
            return Err(TodoError::io(tmp.path(), e));
        }
        // Temp files start out 0600; keep the existing file's mode instead.
        let perms = match fs::metadata(target) {
            Ok(meta) => Some(meta.permissions()),
            Err(_) => new_file_permissions(),
        };
        if let Some(perms) = perms {
            if let Err(e) = tmp.as_file().set_permissions(perms) {
                return Err(TodoError::io(tmp.path(), e));
            }
        }
        tmp.persist(target)
            .map_err(|e| TodoError::io(target, e.error))?;
        debug!(path = %self.path.display(), count = tasks.len(), "saved tasks");
        Ok(())
    }
}
