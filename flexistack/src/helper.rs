//! Small utilities shared by the framework and its applications.

use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use crate::error::FlexiResult;

/// Normalize a path. Existing paths canonicalize through the filesystem;
/// non-existing ones get a lexical cleanup (`.` and `..` folded) so virtual
/// target paths still come out tidy.
pub fn resolve_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(Component::ParentDir);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Random alphanumeric string of the requested length.
pub fn generate_random_string(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Random number with the requested number of decimal digits (no leading
/// zero).
pub fn generate_random_number(digits: u32) -> u64 {
    if digits == 0 {
        return 0;
    }
    let low = 10u64.pow(digits.saturating_sub(1).min(18));
    let high = 10u64.pow(digits.min(19)).saturating_sub(1).max(low);
    rand::thread_rng().gen_range(low..=high)
}

/// SHA-256 of a file's contents, lowercase hex.
pub fn file_sha256(path: &Path) -> FlexiResult<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Logical CPU count.
pub fn total_cpus() -> usize {
    num_cpus::get()
}

/// Physical CPU count.
pub fn physical_cpus() -> usize {
    num_cpus::get_physical()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_string_has_requested_length() {
        assert_eq!(generate_random_string(12).len(), 12);
        assert!(generate_random_string(8).chars().all(|c| c.is_alphanumeric()));
    }

    #[test]
    fn random_number_has_requested_digits() {
        let n = generate_random_number(4);
        assert!((1000..=9999).contains(&n));
        assert_eq!(generate_random_number(0), 0);
    }

    #[test]
    fn lexical_normalization_folds_dot_segments() {
        let resolved = resolve_path(Path::new("/virtual/a/./b/../c"));
        assert_eq!(resolved, PathBuf::from("/virtual/a/c"));
    }

    #[test]
    fn hashes_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(
            file_sha256(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
