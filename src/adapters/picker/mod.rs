//! Destination pickers for the command-line front end
//!
//! A desktop shell would open a native dialog here. The CLI either takes the
//! destination from an argument or asks on stdin, where an empty answer
//! dismisses the picker.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::ports::DestinationPicker;

/// Always answers with the same destination (or always cancels)
pub struct FixedDestinationPicker {
    destination: Option<PathBuf>,
}

impl FixedDestinationPicker {
    pub fn new(destination: Option<PathBuf>) -> Self {
        Self { destination }
    }

    pub fn cancelled() -> Self {
        Self { destination: None }
    }
}

#[async_trait]
impl DestinationPicker for FixedDestinationPicker {
    async fn pick_save_file(&self, suggested_name: &str) -> Option<PathBuf> {
        // A directory answer means "save under the suggested name in there"
        self.destination.as_ref().map(|dest| {
            if dest.is_dir() {
                dest.join(suggested_name)
            } else {
                dest.clone()
            }
        })
    }

    async fn pick_directory(&self) -> Option<PathBuf> {
        self.destination.clone()
    }
}

/// Prompts on the terminal, offering the downloads directory as default
pub struct PromptDestinationPicker {
    downloads_dir: PathBuf,
}

impl PromptDestinationPicker {
    pub fn new(downloads_dir: PathBuf) -> Self {
        Self { downloads_dir }
    }

    async fn ask(&self, question: &str, default: &PathBuf) -> Option<PathBuf> {
        let mut stderr = tokio::io::stderr();
        let prompt = format!(
            "{} [{}] (type '-' to use the default, empty to cancel): ",
            question,
            default.display()
        );
        stderr.write_all(prompt.as_bytes()).await.ok()?;
        stderr.flush().await.ok()?;

        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        let read = reader.read_line(&mut line).await.ok()?;
        let answer = line.trim();
        match (read, answer) {
            (0, _) | (_, "") => None,
            (_, "-") => Some(default.clone()),
            (_, path) => Some(PathBuf::from(path)),
        }
    }
}

#[async_trait]
impl DestinationPicker for PromptDestinationPicker {
    async fn pick_save_file(&self, suggested_name: &str) -> Option<PathBuf> {
        let default = self.downloads_dir.join(suggested_name);
        let chosen = self.ask("Save to", &default).await?;
        if chosen.is_dir() {
            Some(chosen.join(suggested_name))
        } else {
            Some(chosen)
        }
    }

    async fn pick_directory(&self) -> Option<PathBuf> {
        let default = self.downloads_dir.clone();
        self.ask("Export into directory", &default).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fixed_picker_joins_suggested_name_for_directories() {
        let dir = TempDir::new().unwrap();
        let picker = FixedDestinationPicker::new(Some(dir.path().to_path_buf()));
        assert_eq!(
            picker.pick_save_file("12.mp4").await,
            Some(dir.path().join("12.mp4"))
        );

        let file = dir.path().join("custom.mp4");
        let picker = FixedDestinationPicker::new(Some(file.clone()));
        assert_eq!(picker.pick_save_file("12.mp4").await, Some(file));
    }

    #[tokio::test]
    async fn test_cancelled_picker() {
        let picker = FixedDestinationPicker::cancelled();
        assert!(picker.pick_save_file("x.pdf").await.is_none());
        assert!(picker.pick_directory().await.is_none());
    }
}
