/// Security module - Path checks, name scrambling, overwrite and shredding
pub mod destruct;
pub mod guard;
pub mod overwrite;
pub mod scramble;

pub use destruct::{shred_directory, shred_file, ShredOutcome, ShredRequest, Shredder};

use crate::error::ShredError;

pub const MIN_PASSES: u32 = 1;
pub const MAX_PASSES: u32 = 35;
pub const DEFAULT_PASSES: u32 = 3;

/// Overwrite chunk size (64 KiB)
pub const DEFAULT_BUFFER_SIZE: usize = 1 << 16;
pub const MIN_BUFFER_SIZE: usize = 4096;
pub const MAX_BUFFER_SIZE: usize = 16 << 20;

/// Reject pass counts outside 1..=35
pub fn check_passes(passes: u32) -> Result<(), ShredError> {
    if (MIN_PASSES..=MAX_PASSES).contains(&passes) {
        Ok(())
    } else {
        Err(ShredError::InvalidPassCount { passes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_bounds() {
        assert!(check_passes(1).is_ok());
        assert!(check_passes(35).is_ok());
        assert!(check_passes(0).is_err());
        assert!(check_passes(36).is_err());
    }
}
