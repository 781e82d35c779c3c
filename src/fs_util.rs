use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::HarvestError;

/// Extracts a single named member of `zip_path` into `target_dir` and returns
/// the extracted file's path.
pub fn extract_member(
    zip_path: &Path,
    member: &str,
    target_dir: &Path,
) -> Result<PathBuf, HarvestError> {
    let file = fs::File::open(zip_path).map_err(|err| {
        HarvestError::Filesystem(format!("open zip {}: {err}", zip_path.display()))
    })?;
    let mut archive =
        ZipArchive::new(file).map_err(|err| HarvestError::InvalidArchive(err.to_string()))?;

    let mut entry = match archive.by_name(member) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => {
            return Err(HarvestError::MissingTaxaFile(zip_path.display().to_string()));
        }
        Err(err) => return Err(HarvestError::InvalidArchive(err.to_string())),
    };
    if entry.is_dir() {
        return Err(HarvestError::MissingTaxaFile(zip_path.display().to_string()));
    }
    let entry_path = match entry.enclosed_name() {
        Some(path) => target_dir.join(path),
        None => {
            return Err(HarvestError::InvalidArchive(
                "zip entry path traversal detected".to_string(),
            ));
        }
    };

    if let Some(parent) = entry_path.parent() {
        fs::create_dir_all(parent).map_err(|err| HarvestError::Filesystem(err.to_string()))?;
    }
    let mut outfile =
        fs::File::create(&entry_path).map_err(|err| HarvestError::Filesystem(err.to_string()))?;
    io::copy(&mut entry, &mut outfile)
        .map_err(|err| HarvestError::InvalidArchive(err.to_string()))?;
    Ok(entry_path)
}

/// Last path segment of a URL, without query or fragment.
pub fn url_basename(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basename_of_urls() {
        assert_eq!(url_basename("http://x/a.zip"), "a.zip");
        assert_eq!(url_basename("http://x/dwca/b.zip?format=zip"), "b.zip");
        assert_eq!(url_basename("http://x/dwca/"), "dwca");
    }
}
