//! Whole-file content hashing for change detection (not security).

use memmap2::Mmap;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use xxhash_rust::xxh3::Xxh3;

/// Files above this size are memory-mapped instead of streamed (100 MB)
const MMAP_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Read chunk size for streamed hashing (64 KB)
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// 128-bit xxh3 of the file contents as 32 lowercase hex digits
pub fn content_hash(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    let size = file.metadata()?.len();
    let mut hasher = Xxh3::new();

    if size > MMAP_THRESHOLD {
        let mmap = unsafe { Mmap::map(&file)? };
        hasher.update(&mmap);
    } else {
        let mut reader = BufReader::with_capacity(READ_CHUNK_SIZE, file);
        let mut buffer = vec![0u8; READ_CHUNK_SIZE];
        loop {
            let n = reader.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
    }

    Ok(format!("{:032x}", hasher.digest128()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn identical_content_hashes_equal() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.jpg");
        let b = temp_dir.path().join("b.jpg");
        fs::write(&a, b"same panorama").unwrap();
        fs::write(&b, b"same panorama").unwrap();

        assert_eq!(content_hash(&a).unwrap(), content_hash(&b).unwrap());
    }

    #[test]
    fn changed_content_changes_hash() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.jpg");
        fs::write(&path, b"before").unwrap();
        let before = content_hash(&path).unwrap();
        fs::write(&path, b"after").unwrap();

        assert_ne!(before, content_hash(&path).unwrap());
    }

    #[test]
    fn multi_chunk_file_matches_one_shot_hash() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("big.tiff");
        let data: Vec<u8> = (0..READ_CHUNK_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &data).unwrap();

        let expected = format!("{:032x}", xxhash_rust::xxh3::xxh3_128(&data));
        assert_eq!(content_hash(&path).unwrap(), expected);
    }

    #[test]
    fn missing_file_is_error() {
        assert!(content_hash(Path::new("/nonexistent/pano.jpg")).is_err());
    }
}
