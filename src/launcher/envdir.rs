//! Environment directories.
//!
//! Each regular, non-hidden file in an env dir defines one variable: the file
//! name is the key and the contents, minus trailing newlines, the value.

use crate::launcher::{LaunchError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Read env dirs in order into sorted `KEY=VALUE` entries. Later dirs win.
///
/// # Errors
///
/// Returns an IO error if a directory or file cannot be read and a validation
/// error for file names that are not valid variable names.
pub fn read_env_dirs<P: AsRef<Path>>(dirs: &[P]) -> Result<Vec<String>> {
    let mut vars = BTreeMap::new();

    for dir in dirs {
        let dir = dir.as_ref();
        debug!("Reading env dir {:?}", dir);

        let mut entries = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(key) = file_name.to_str() else {
                return Err(LaunchError::Validation(format!(
                    "Env file name {:?} in {:?} is not UTF-8",
                    file_name, dir
                )));
            };
            if key.starts_with('.') {
                continue;
            }
            if key.contains('=') {
                return Err(LaunchError::Validation(format!(
                    "Env file name '{}' in {:?} contains '='",
                    key, dir
                )));
            }

            let contents = fs::read_to_string(entry.path())?;
            let value = contents.trim_end_matches(['\n', '\r']);
            vars.insert(key.to_string(), value.to_string());
        }
    }

    Ok(vars
        .into_iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reads_variables_sorted() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("ZONE"), "east\n").unwrap();
        fs::write(dir.path().join("APP"), "web").unwrap();
        fs::write(dir.path().join(".hidden"), "skip").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let env = read_env_dirs(&[dir.path()]).unwrap();
        assert_eq!(env, vec!["APP=web".to_string(), "ZONE=east".to_string()]);
    }

    #[test]
    fn test_later_dirs_override() {
        let base = TempDir::new().unwrap();
        let extra = TempDir::new().unwrap();
        fs::write(base.path().join("LEVEL"), "info").unwrap();
        fs::write(base.path().join("KEEP"), "1").unwrap();
        fs::write(extra.path().join("LEVEL"), "debug\n\n").unwrap();

        let env = read_env_dirs(&[base.path(), extra.path()]).unwrap();
        assert_eq!(env, vec!["KEEP=1".to_string(), "LEVEL=debug".to_string()]);
    }

    #[test]
    fn test_multiline_values_keep_interior_newlines() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("CERT"), "a\nb\n").unwrap();

        let env = read_env_dirs(&[dir.path()]).unwrap();
        assert_eq!(env, vec!["CERT=a\nb".to_string()]);
    }

    #[test]
    fn test_missing_dir_is_io_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent");
        assert!(matches!(
            read_env_dirs(&[missing]),
            Err(LaunchError::Io(_))
        ));
    }
}
