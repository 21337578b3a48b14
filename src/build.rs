//! Incremental, parallel compilation of a directory of scripts.
//!
//! A build is planned against the modification time cache, the changed
//! scripts are compiled by a fixed pool of worker threads, and the new cache
//! snapshot is written once every worker is done.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use crossbeam::channel;
use log::*;

use crate::cache::{Cache, CacheEntry, CACHE_FILE_NAME};
use crate::compiler;
use crate::errors::{BuildError, CompileError};

pub const SCRIPT_EXTENSION: &str = "oud";
pub const ARTIFACT_EXTENSION: &str = "oudh";

const INFO: &str = "\x1b[0;36m";
const ARROW: &str = "\x1b[0;36m";
const INPUT: &str = "\x1b[0;33m";
const OUTPUT: &str = "\x1b[0;32m";
const COUNT: &str = "\x1b[0;35m";
const ERROR: &str = "\x1b[0;31m";
const NC: &str = "\x1b[0m";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub cache_dir: PathBuf,
    /// Worker threads to use, `0` for one per available core.
    pub jobs: usize,
    /// Record scripts that failed to compile in the cache as well. Such a
    /// script is then skipped until it is touched again.
    pub cache_failures: bool,
}

impl BuildConfig {
    pub fn new(
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            cache_dir: cache_dir.into(),
            jobs: 0,
            cache_failures: false,
        }
    }

    pub fn cache_path(&self) -> PathBuf {
        self.cache_dir.join(CACHE_FILE_NAME)
    }

    /// Where the artifact for `input` goes: `<output_dir>/<stem>.oudh`.
    pub fn artifact_path(&self, input: &Path) -> PathBuf {
        let mut name = input
            .file_stem()
            .unwrap_or_else(|| input.as_os_str())
            .to_os_string();
        name.push(".");
        name.push(ARTIFACT_EXTENSION);
        self.output_dir.join(name)
    }

    fn worker_count(&self, tasks: usize) -> usize {
        let jobs = if self.jobs == 0 {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            self.jobs
        };
        jobs.min(tasks).max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    pub input: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug)]
pub struct ProcessResult {
    pub input: PathBuf,
    pub output: PathBuf,
    pub error: Option<CompileError>,
}

impl ProcessResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// The scripts that need compiling, decided before any work starts.
#[derive(Debug)]
pub struct BuildPlan {
    config: BuildConfig,
    pub unchanged: Vec<PathBuf>,
    pub tasks: Vec<FileTask>,
    snapshot: Cache,
}

/// Every result of a build along with the cache snapshot to persist.
#[derive(Debug)]
pub struct BuildOutcome {
    config: BuildConfig,
    pub unchanged: Vec<PathBuf>,
    /// In completion order, not input order.
    pub results: Vec<ProcessResult>,
    snapshot: Cache,
}

/// Plans, executes, reports and persists a build.
pub fn run(config: &BuildConfig) -> Result<BuildOutcome, BuildError> {
    let outcome = plan(config)?.execute();
    outcome.report();
    outcome.persist()?;
    Ok(outcome)
}

/// Prepares the directories and works out which scripts changed.
pub fn plan(config: &BuildConfig) -> Result<BuildPlan, BuildError> {
    if !config.input_dir.is_dir() {
        return Err(BuildError::MissingInputDirectory(config.input_dir.clone()));
    }
    for dir in &[&config.output_dir, &config.cache_dir] {
        fs::create_dir_all(dir).map_err(|source| BuildError::Directory {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let scripts = discover_scripts(&config.input_dir)?;
    if scripts.is_empty() {
        return Err(BuildError::NoInputFiles {
            dir: config.input_dir.clone(),
            extension: SCRIPT_EXTENSION,
        });
    }

    let cache_path = config.cache_path();
    let previous = match Cache::load(&cache_path) {
        Ok(cache) => {
            debug!("Loaded {} cache entries from {}", cache.len(), cache_path.display());
            cache
        }
        Err(err) => {
            info!("No usable {} ({}), fresh run", CACHE_FILE_NAME, err);
            Cache::new()
        }
    };

    let mut unchanged = Vec::new();
    let mut tasks = Vec::new();
    let mut snapshot = Cache::new();
    for script in scripts {
        let file_name = match script.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => continue,
        };
        let modified = match fs::metadata(&script).and_then(|meta| meta.modified()) {
            Ok(modified) => CacheEntry::from_system_time(modified),
            Err(err) => {
                warn!("Error getting file info for {}: {}", script.display(), err);
                continue;
            }
        };

        let fresh = previous.is_fresh(&file_name, &modified);
        snapshot.insert(file_name, modified);
        if fresh {
            unchanged.push(script);
        } else {
            tasks.push(FileTask {
                output: config.artifact_path(&script),
                input: script,
            });
        }
    }

    Ok(BuildPlan {
        config: config.clone(),
        unchanged,
        tasks,
        snapshot,
    })
}

/// All `*.oud` files directly inside `dir`, sorted by path.
fn discover_scripts(dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
    let to_build_error = |source| BuildError::Directory {
        path: dir.to_path_buf(),
        source,
    };

    let mut scripts = Vec::new();
    for entry in fs::read_dir(dir).map_err(to_build_error)? {
        let path = entry.map_err(to_build_error)?.path();
        if path.is_file() && path.extension().map_or(false, |ext| ext == SCRIPT_EXTENSION) {
            scripts.push(path);
        }
    }
    scripts.sort();
    Ok(scripts)
}

impl BuildPlan {
    pub fn is_up_to_date(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Compiles every planned task. Failures are collected, never fatal.
    pub fn execute(self) -> BuildOutcome {
        let BuildPlan {
            config,
            unchanged,
            tasks,
            mut snapshot,
        } = self;

        let results = if tasks.is_empty() {
            Vec::new()
        } else {
            let workers = config.worker_count(tasks.len());
            info!("Compiling {} script(s) on {} worker(s)", tasks.len(), workers);
            compile_parallel(tasks, workers)
        };

        if !config.cache_failures {
            for result in results.iter().filter(|result| !result.is_ok()) {
                if let Some(name) = result.input.file_name() {
                    snapshot.remove(&name.to_string_lossy());
                }
            }
        }

        BuildOutcome {
            config,
            unchanged,
            results,
            snapshot,
        }
    }
}

/// Runs `tasks` on `workers` threads and returns one result per task.
///
/// The task queue is filled and closed before the workers start draining it,
/// and results are only read after every worker has exited.
pub fn compile_parallel(tasks: Vec<FileTask>, workers: usize) -> Vec<ProcessResult> {
    let (task_tx, task_rx) = channel::bounded(tasks.len());
    let (result_tx, result_rx) = channel::bounded(tasks.len());

    for task in tasks {
        // Capacity equals the task count, so this never blocks.
        let _ = task_tx.send(task);
    }
    drop(task_tx);

    thread::scope(|scope| {
        for id in 0..workers.max(1) {
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || worker(id, task_rx, result_tx));
        }
    });
    drop(result_tx);

    result_rx.try_iter().collect()
}

fn worker(
    id: usize,
    tasks: channel::Receiver<FileTask>,
    results: channel::Sender<ProcessResult>,
) {
    for task in tasks.iter() {
        trace!("Worker {} compiling {}", id, task.input.display());
        let error = compiler::compile_file(&task.input, &task.output).err();
        let _ = results.send(ProcessResult {
            input: task.input,
            output: task.output,
            error,
        });
    }
}

impl BuildOutcome {
    pub fn has_errors(&self) -> bool {
        self.results.iter().any(|result| !result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Path, &CompileError)> {
        self.results
            .iter()
            .filter_map(|result| result.error.as_ref().map(|err| (result.input.as_path(), err)))
    }

    pub fn compiled(&self) -> impl Iterator<Item = &ProcessResult> {
        self.results.iter().filter(|result| result.is_ok())
    }

    /// The cache that `persist` writes.
    pub fn snapshot(&self) -> &Cache {
        &self.snapshot
    }

    /// Prints the per-file status lines.
    pub fn report(&self) {
        for path in &self.unchanged {
            println!("{}Skipping {} (unchanged){}", INFO, display_path(path), NC);
        }

        if self.results.is_empty() {
            println!("{}All files are up to date{}", INFO, NC);
            return;
        }

        let total = self.results.len();
        for (i, result) in self.results.iter().enumerate() {
            match &result.error {
                Some(err) => eprintln!(
                    "{}Error processing {}: {}{}",
                    ERROR,
                    display_path(&result.input),
                    err,
                    NC
                ),
                None => println!(
                    "{}[{}/{}]{}  {}{}{} {}->{} {}{}{}",
                    COUNT,
                    i + 1,
                    total,
                    NC,
                    INPUT,
                    display_path(&result.input),
                    NC,
                    ARROW,
                    NC,
                    OUTPUT,
                    display_path(&result.output),
                    NC
                ),
            }
        }
    }

    /// Overwrites the cache file with this build's snapshot.
    pub fn persist(&self) -> Result<(), BuildError> {
        let path = self.config.cache_path();
        self.snapshot.save(&path)?;
        debug!("Saved {} cache entries to {}", self.snapshot.len(), path.display());
        Ok(())
    }
}

/// `path` relative to the working directory when it lives below it.
fn display_path(path: &Path) -> String {
    env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}
