//! Content-hash change detection.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

/// SHA-256 of a file's content, hex encoded. Reads in fixed-size chunks.
pub fn file_digest(path: &Path) -> io::Result<String> {
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
    Ok(hex::encode(hasher.finalize()))
}

/// True when `candidate` differs from `active`.
///
/// A file that cannot be read counts as changed: proceeding with an apply is
/// recoverable, silently running a stale config is not.
pub fn changed(candidate: &Path, active: &Path) -> bool {
    match (file_digest(candidate), file_digest(active)) {
        (Ok(new), Ok(current)) => new != current,
        (new, current) => {
            if let Err(e) = &new {
                tracing::warn!(path = ?candidate, error = %e, "Cannot hash candidate configuration");
            }
            if let Err(e) = &current {
                tracing::warn!(path = ?active, error = %e, "Cannot hash active configuration");
            }
            true
        }
    }
}
