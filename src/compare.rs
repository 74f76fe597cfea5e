//! File comparison for round-trip checks.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

/// Offset of the first byte where the two files differ, `None` if identical.
///
/// When one file is a prefix of the other the offset is the shorter length.
pub fn first_difference(left: &Path, right: &Path) -> io::Result<Option<u64>> {
    let mut left = BufReader::new(File::open(left)?).bytes();
    let mut right = BufReader::new(File::open(right)?).bytes();
    let mut offset = 0u64;
    loop {
        match (left.next().transpose()?, right.next().transpose()?) {
            (None, None) => return Ok(None),
            (Some(a), Some(b)) if a == b => offset += 1,
            _ => return Ok(Some(offset)),
        }
    }
}

pub fn files_identical(left: &Path, right: &Path) -> io::Result<bool> {
    Ok(first_difference(left, right)?.is_none())
}

/// Hex SHA-256 of a file's contents.
pub fn file_digest(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::default();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect())
}
