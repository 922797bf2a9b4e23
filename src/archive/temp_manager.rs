use crate::error::{ProcessingError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::ZipArchive;

/// Owns a scratch directory for extracted boundaries and downloaded grids
pub struct TempFileManager {
    temp_dir: TempDir,
    extracted_files: HashMap<String, PathBuf>,
}

impl TempFileManager {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new().map_err(|e| {
            ProcessingError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to create temporary directory: {}", e),
            ))
        })?;

        Ok(Self {
            temp_dir,
            extracted_files: HashMap::new(),
        })
    }

    pub fn temp_dir_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Extract every entry whose extension is in `extensions` (case-insensitive),
    /// keeping the archive's relative layout so shapefile sidecars stay together.
    pub fn extract_files_with_extensions(
        &mut self,
        zip_path: &Path,
        extensions: &[&str],
    ) -> Result<Vec<PathBuf>> {
        let file = File::open(zip_path)?;
        let mut archive = ZipArchive::new(file)?;
        let mut extracted_paths = Vec::new();

        for i in 0..archive.len() {
            let mut zip_file = archive.by_index(i)?;
            if zip_file.is_dir() {
                continue;
            }

            // Entries that would escape the scratch directory are ignored
            let relative = match zip_file.enclosed_name() {
                Some(path) => path.to_path_buf(),
                None => continue,
            };

            let wanted = relative
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
                .unwrap_or(false);
            if !wanted {
                continue;
            }

            let file_name = relative.to_string_lossy().to_string();
            if let Some(path) = self.extracted_files.get(&file_name) {
                extracted_paths.push(path.clone());
                continue;
            }

            // Shapefile readers look for lowercase sidecar extensions
            let dest_path = self.temp_dir.path().join(lowercase_extension(&relative));
            if let Some(parent) = dest_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let mut dest_file = File::create(&dest_path)?;
            let mut writer = BufWriter::new(&mut dest_file);
            std::io::copy(&mut zip_file, &mut writer)?;
            writer.flush()?;

            self.extracted_files.insert(file_name, dest_path.clone());
            extracted_paths.push(dest_path);
        }

        Ok(extracted_paths)
    }

    /// Write downloaded bytes to a named scratch file
    pub fn write_scratch(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let dest_path = self.temp_dir.path().join(file_name);
        let mut writer = BufWriter::new(File::create(&dest_path)?);
        writer.write_all(bytes)?;
        writer.flush()?;
        Ok(dest_path)
    }
}

fn lowercase_extension(path: &Path) -> PathBuf {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.bytes().any(|b| b.is_ascii_uppercase()) => {
            path.with_extension(ext.to_ascii_lowercase())
        }
        _ => path.to_path_buf(),
    }
}
