/// Multi-pass in-place overwrite of a single file
///
/// Every pass rewrites the whole file from offset 0 and is synced to disk
/// before the next one starts. Earlier passes write a constant byte derived
/// from the pass number; the last pass writes fresh random bytes chunk by
/// chunk, so the final state on disk is never predictable.
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use rand::RngCore;

use super::{check_passes, MAX_BUFFER_SIZE};
use crate::error::{ShredError, Stage};

/// Fill `buf` with the content of pass `pass` out of `passes`
pub fn fill_pass(buf: &mut [u8], pass: u32, passes: u32, rng: &mut impl RngCore) {
    if pass == passes {
        rng.fill_bytes(buf);
    } else {
        buf.fill((pass % 256) as u8);
    }
}

/// Write buffer length for a file of `size` bytes; never zero, even where
/// `size` does not fit a `usize`
fn chunk_len(buffer_size: usize, size: u64) -> usize {
    let cap = usize::try_from(size).unwrap_or(usize::MAX).max(1);
    buffer_size.max(1).min(cap)
}

/// Overwrite `path` `passes` times, calling `progress(pass, passes)` after each synced pass
///
/// The file length is taken once at the start. Zero-length files still run
/// (and report) every pass, there is just nothing to write.
pub fn overwrite(
    path: &Path,
    passes: u32,
    buffer_size: usize,
    progress: &mut dyn FnMut(u64, u64),
) -> Result<(), ShredError> {
    check_passes(passes)?;
    let buffer_size = buffer_size.clamp(1, MAX_BUFFER_SIZE);

    let mut file = OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|e| ShredError::io(Stage::Open, path, e))?;

    let size = file
        .metadata()
        .map_err(|e| ShredError::io(Stage::Metadata, path, e))?
        .len();

    let mut rng = rand::rng();
    let mut buffer = vec![0u8; chunk_len(buffer_size, size)];

    for pass in 1..=passes {
        file.seek(SeekFrom::Start(0))
            .map_err(|e| ShredError::io(Stage::Write, path, e))?;

        let mut remaining = size;
        while remaining > 0 {
            let chunk = remaining.min(buffer.len() as u64) as usize;
            fill_pass(&mut buffer[..chunk], pass, passes, &mut rng);
            file.write_all(&buffer[..chunk])
                .map_err(|e| ShredError::io(Stage::Write, path, e))?;
            remaining -= chunk as u64;
        }

        file.flush()
            .map_err(|e| ShredError::io(Stage::Write, path, e))?;
        file.sync_all()
            .map_err(|e| ShredError::io(Stage::Sync, path, e))?;

        tracing::trace!(pass, passes, bytes = size, "overwrite pass synced");
        progress(pass as u64, passes as u64);
    }

    Ok(())
}
