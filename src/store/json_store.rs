use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;

use crate::store::progress::ProgressBackend;

/// One JSON file per video under the data dir, written atomically so a
/// crash mid-write never leaves a torn record.
pub struct JsonFileBackend {
    base_dir: PathBuf,
}

impl JsonFileBackend {
    pub fn new() -> Result<Self> {
        let base_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mentor")
            .join("progress");
        Self::with_base_dir(base_dir)
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn file_path(&self, video_id: &str) -> PathBuf {
        self.base_dir
            .join(format!("progress_{}.json", Self::sanitize_key(video_id)))
    }

    fn sanitize_key(key: &str) -> String {
        key.chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl ProgressBackend for JsonFileBackend {
    fn read(&self, video_id: &str) -> Option<String> {
        fs::read_to_string(self.file_path(video_id)).ok()
    }

    fn write(&self, video_id: &str, content: &str) -> Result<()> {
        let path = self.file_path(video_id);
        let tmp_path = path.with_extension("tmp");

        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;

        fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_then_read_round_trips() {
        let dir = TempDir::new().unwrap();
        let backend = JsonFileBackend::with_base_dir(dir.path().to_path_buf()).unwrap();
        backend.write("dQw4w9WgXcQ", "{\"a\":1}").unwrap();
        assert_eq!(backend.read("dQw4w9WgXcQ").unwrap(), "{\"a\":1}");
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let backend = JsonFileBackend::with_base_dir(dir.path().to_path_buf()).unwrap();
        assert!(backend.read("nope").is_none());
    }

    #[test]
    fn hostile_video_ids_stay_inside_the_base_dir() {
        let dir = TempDir::new().unwrap();
        let backend = JsonFileBackend::with_base_dir(dir.path().to_path_buf()).unwrap();
        backend.write("../../etc/passwd", "{}").unwrap();
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn no_tmp_file_left_after_write() {
        let dir = TempDir::new().unwrap();
        let backend = JsonFileBackend::with_base_dir(dir.path().to_path_buf()).unwrap();
        backend.write("abc", "{}").unwrap();
        let tmp_files: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
            .collect();
        assert!(tmp_files.is_empty());
    }
}
