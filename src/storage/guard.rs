//! Storage guard - gates ingestion on free space of the working volume

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::ports::DiskPort;

/// Outcome of a capacity check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpaceCheck {
    pub enough: bool,
    /// Bytes the ingestion is projected to need, margin and reserve included
    pub required: u64,
    /// Free bytes on the working volume
    pub available: u64,
}

/// Compares candidate source sizes against free space on the working volume
pub struct StorageGuard {
    disk: Arc<dyn DiskPort>,
    work_dir: PathBuf,
    safety_margin: f64,
    reserve_bytes: u64,
}

impl StorageGuard {
    pub fn new(
        disk: Arc<dyn DiskPort>,
        work_dir: impl Into<PathBuf>,
        safety_margin: f64,
        reserve_bytes: u64,
    ) -> Self {
        Self {
            disk,
            work_dir: work_dir.into(),
            safety_margin: safety_margin.max(0.0),
            reserve_bytes,
        }
    }

    /// Bytes needed to ingest sources totalling `total` bytes
    ///
    /// The margin covers the concat manifest, container overhead and a
    /// possible re-encode pass; the reserve keeps the volume usable.
    pub fn required_for(&self, total: u64) -> u64 {
        // Integer math in parts per million keeps the result exact
        let margin_ppm = (self.safety_margin * 1_000_000.0).round() as u128;
        let extra = (total as u128 * margin_ppm).div_ceil(1_000_000);
        let with_margin = u64::try_from(total as u128 + extra).unwrap_or(u64::MAX);
        with_margin.saturating_add(self.reserve_bytes)
    }

    /// Measure sources and free space
    ///
    /// A source that cannot be measured or a volume that cannot be queried
    /// yields `enough == false`; the cause is logged.
    pub async fn check(&self, paths: &[PathBuf]) -> SpaceCheck {
        let mut total: u64 = 0;
        let mut measurable = true;
        for path in paths {
            match self.disk.file_size(path).await {
                Ok(size) => total = total.saturating_add(size),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot measure source file");
                    measurable = false;
                }
            }
        }

        let required = self.required_for(total);
        let available = match self.disk.available_space(&self.work_dir).await {
            Ok(free) => free,
            Err(e) => {
                warn!(work_dir = %self.work_dir.display(), error = %e, "Cannot query free space");
                return SpaceCheck {
                    enough: false,
                    required,
                    available: 0,
                };
            }
        };

        let enough = measurable && required <= available;
        debug!(
            sources = paths.len(),
            total, required, available, enough, "Storage check"
        );
        SpaceCheck {
            enough,
            required,
            available,
        }
    }

    /// `false` is a normal rejection, never an error
    pub async fn has_enough_remaining_space(&self, paths: &[PathBuf]) -> bool {
        self.check(paths).await.enough
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct FakeDisk {
        sizes: HashMap<PathBuf, u64>,
        free: Option<u64>,
    }

    #[async_trait]
    impl DiskPort for FakeDisk {
        async fn file_size(&self, path: &Path) -> std::io::Result<u64> {
            self.sizes
                .get(path)
                .copied()
                .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
        }

        async fn available_space(&self, _dir: &Path) -> std::io::Result<u64> {
            self.free
                .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::Other))
        }
    }

    fn make_guard(free: Option<u64>) -> StorageGuard {
        let mut sizes = HashMap::new();
        sizes.insert(PathBuf::from("a.mp4"), 1_000);
        sizes.insert(PathBuf::from("b.mp4"), 3_000);
        StorageGuard::new(Arc::new(FakeDisk { sizes, free }), "/work", 0.1, 100)
    }

    #[test]
    fn test_required_includes_margin_and_reserve() {
        let guard = make_guard(Some(0));
        assert_eq!(guard.required_for(4_000), 4_400 + 100);
        assert_eq!(guard.required_for(0), 100);
    }

    #[tokio::test]
    async fn test_enough_space() {
        let guard = make_guard(Some(4_500));
        let paths = vec![PathBuf::from("a.mp4"), PathBuf::from("b.mp4")];
        let check = guard.check(&paths).await;
        assert!(check.enough);
        assert_eq!(check.required, 4_500);
    }

    #[tokio::test]
    async fn test_not_enough_space_is_false_not_error() {
        let guard = make_guard(Some(4_499));
        let paths = vec![PathBuf::from("a.mp4"), PathBuf::from("b.mp4")];
        assert!(!guard.has_enough_remaining_space(&paths).await);
    }

    #[tokio::test]
    async fn test_unmeasurable_inputs_reject() {
        let guard = make_guard(Some(u64::MAX));
        assert!(
            !guard
                .has_enough_remaining_space(&[PathBuf::from("missing.mp4")])
                .await
        );

        let guard = make_guard(None);
        assert!(!guard.has_enough_remaining_space(&[PathBuf::from("a.mp4")]).await);
    }
}
