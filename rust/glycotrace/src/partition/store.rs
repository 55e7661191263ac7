use super::WorkerPartial;
use crate::errors::{
    GlycoTraceError,
    Result,
};
use std::fs::File;
use std::io::BufReader;
use std::path::{
    Path,
    PathBuf,
};
use tracing::debug;
use zstd::stream::read::Decoder;
use zstd::stream::write::Encoder;

/// Outcome of looking up one worker's partial result.
#[derive(Debug)]
pub enum PartialResult {
    Present(Box<WorkerPartial>),
    Missing { worker: usize },
    Unreadable { worker: usize, reason: String },
}

/// Directory holding one compressed MessagePack blob per worker.
#[derive(Debug, Clone)]
pub struct PartialStore {
    dir: PathBuf,
}

impl PartialStore {
    /// Opens `dir`, creating it when needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| GlycoTraceError::io(e, &dir))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, worker: usize) -> PathBuf {
        self.dir.join(format!("partial_{}.msgpack.zst", worker))
    }

    pub fn is_present(&self, worker: usize) -> bool {
        self.path_for(worker).is_file()
    }

    /// Deletes any earlier partial of `worker`.
    pub fn remove(&self, worker: usize) -> Result<()> {
        let path = self.path_for(worker);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed stale partial result {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(GlycoTraceError::io(e, &path)),
        }
    }

    /// Writes the partial under a temporary name, then renames it into place.
    /// Readers never observe a half-written blob.
    pub fn write(&self, partial: &WorkerPartial) -> Result<PathBuf> {
        let path = self.path_for(partial.worker_index);
        let tmp = path.with_extension("zst.tmp");

        let file = File::create(&tmp).map_err(|e| GlycoTraceError::io(e, &tmp))?;
        let mut encoder = Encoder::new(file, 3).map_err(|e| GlycoTraceError::io(e, &tmp))?;
        rmp_serde::encode::write_named(&mut encoder, partial)
            .map_err(|e| GlycoTraceError::serialization(e, &tmp))?;
        encoder.finish().map_err(|e| GlycoTraceError::io(e, &tmp))?;

        std::fs::rename(&tmp, &path).map_err(|e| GlycoTraceError::io(e, &path))?;
        debug!("Wrote partial result of worker {} to {}", partial.worker_index, path.display());
        Ok(path)
    }

    pub fn read(&self, worker: usize) -> PartialResult {
        let path = self.path_for(worker);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return PartialResult::Missing { worker };
            }
            Err(e) => {
                return PartialResult::Unreadable {
                    worker,
                    reason: e.to_string(),
                };
            }
        };
        let decoded = Decoder::new(BufReader::new(file))
            .map_err(|e| e.to_string())
            .and_then(|d| rmp_serde::from_read::<_, WorkerPartial>(d).map_err(|e| e.to_string()));
        match decoded {
            Ok(partial) if partial.worker_index != worker => PartialResult::Unreadable {
                worker,
                reason: format!(
                    "file holds the result of worker {}",
                    partial.worker_index
                ),
            },
            Ok(partial) => PartialResult::Present(Box::new(partial)),
            Err(reason) => PartialResult::Unreadable { worker, reason },
        }
    }
}
