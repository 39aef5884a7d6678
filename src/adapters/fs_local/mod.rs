// Local filesystem adapter - File sizes and free space for the working volume

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sysinfo::Disks;
use tracing::debug;

use crate::ports::DiskPort;

/// Local disk adapter backed by `sysinfo`
pub struct LocalDiskAdapter;

impl LocalDiskAdapter {
    /// Create new local disk adapter
    pub fn new() -> Self {
        Self
    }

    /// Free space on the disk whose mount point is the longest prefix of `dir`
    fn available_space_blocking(dir: &Path) -> std::io::Result<u64> {
        let dir = nearest_existing_ancestor(dir).canonicalize()?;
        let disks = Disks::new_with_refreshed_list();

        disks
            .list()
            .iter()
            .filter(|disk| dir.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .map(|disk| {
                debug!(
                    mount_point = %disk.mount_point().display(),
                    available = disk.available_space(),
                    "Resolved working volume"
                );
                disk.available_space()
            })
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no mounted volume found for {}", dir.display()),
                )
            })
    }
}

impl Default for LocalDiskAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DiskPort for LocalDiskAdapter {
    async fn file_size(&self, path: &Path) -> std::io::Result<u64> {
        Ok(tokio::fs::metadata(path).await?.len())
    }

    async fn available_space(&self, dir: &Path) -> std::io::Result<u64> {
        let dir = dir.to_path_buf();
        tokio::task::spawn_blocking(move || Self::available_space_blocking(&dir))
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?
    }
}

/// The working root may not exist yet on first start
fn nearest_existing_ancestor(dir: &Path) -> PathBuf {
    dir.ancestors()
        .find(|p| p.exists())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
