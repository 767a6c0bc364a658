/// Best-effort rotational vs solid-state detection
///
/// Answers only "does this path look like it sits on non-rotational
/// storage?". Any failure to find out means `false`, which keeps callers on
/// the safer multi-pass path.
use std::path::Path;

use super::platform::{detect_platform, Platform};

/// Storage topology oracle
pub trait DeviceOracle: Send + Sync {
    /// Never blocks on anything but local metadata, never fails
    fn is_non_rotational(&self, path: &Path) -> bool;
}

/// Fallback oracle that always assumes a spinning disk
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeRotational;

impl DeviceOracle for AssumeRotational {
    fn is_non_rotational(&self, _path: &Path) -> bool {
        false
    }
}

/// Oracle for the running platform
pub fn platform_oracle() -> Box<dyn DeviceOracle> {
    let platform = detect_platform();
    if !platform.has_device_query() {
        return Box::new(AssumeRotational);
    }
    match platform {
        #[cfg(target_os = "linux")]
        Platform::Linux => Box::new(SysfsOracle),
        #[cfg(windows)]
        Platform::Windows => Box::new(SeekPenaltyOracle),
        _ => Box::new(AssumeRotational),
    }
}

/// Reads `queue/rotational` for the block device backing a path
#[cfg(target_os = "linux")]
#[derive(Debug, Default, Clone, Copy)]
pub struct SysfsOracle;

#[cfg(target_os = "linux")]
impl DeviceOracle for SysfsOracle {
    fn is_non_rotational(&self, path: &Path) -> bool {
        matches!(sysfs_rotational(Path::new("/sys/dev/block"), path), Some(false))
    }
}

/// `Some(true)` for spinning media, `None` when sysfs has no answer
#[cfg(target_os = "linux")]
fn sysfs_rotational(sys_block: &Path, path: &Path) -> Option<bool> {
    use std::os::unix::fs::MetadataExt;

    let dev = std::fs::metadata(path).ok()?.dev();
    #[allow(unused_unsafe)]
    let (major, minor) = unsafe { (libc::major(dev), libc::minor(dev)) };

    let device = std::fs::canonicalize(sys_block.join(format!("{major}:{minor}"))).ok()?;
    // partitions keep their queue on the parent disk
    [Some(device.as_path()), device.parent()]
        .into_iter()
        .flatten()
        .find_map(|dir| std::fs::read_to_string(dir.join("queue/rotational")).ok())
        .map(|flag| flag.trim() != "0")
}

/// Asks the volume whether it incurs a seek penalty
#[cfg(windows)]
#[derive(Debug, Default, Clone, Copy)]
pub struct SeekPenaltyOracle;

#[cfg(windows)]
impl DeviceOracle for SeekPenaltyOracle {
    fn is_non_rotational(&self, path: &Path) -> bool {
        matches!(seek_penalty(path), Some(false))
    }
}

#[cfg(windows)]
#[repr(C)]
struct SeekPenaltyDescriptor {
    version: u32,
    size: u32,
    incurs_seek_penalty: u8,
}

#[cfg(windows)]
fn seek_penalty(path: &Path) -> Option<bool> {
    use std::mem;
    use std::os::windows::ffi::OsStrExt;
    use std::path::{Component, Prefix};
    use std::ptr;

    use winapi::shared::minwindef::{DWORD, LPVOID};
    use winapi::um::fileapi::{CreateFileW, OPEN_EXISTING};
    use winapi::um::handleapi::{CloseHandle, INVALID_HANDLE_VALUE};
    use winapi::um::ioapiset::DeviceIoControl;
    use winapi::um::winioctl::{
        PropertyStandardQuery, StorageDeviceSeekPenaltyProperty, IOCTL_STORAGE_QUERY_PROPERTY,
        STORAGE_PROPERTY_QUERY,
    };
    use winapi::um::winnt::{FILE_SHARE_READ, FILE_SHARE_WRITE};

    let absolute = std::path::absolute(path).ok()?;
    let letter = match absolute.components().next()? {
        Component::Prefix(prefix) => match prefix.kind() {
            Prefix::Disk(letter) | Prefix::VerbatimDisk(letter) => letter as char,
            _ => return None,
        },
        _ => return None,
    };
    let volume: Vec<u16> = std::ffi::OsStr::new(&format!(r"\\.\{letter}:"))
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();

    unsafe {
        let handle = CreateFileW(
            volume.as_ptr(),
            0,
            FILE_SHARE_READ | FILE_SHARE_WRITE,
            ptr::null_mut(),
            OPEN_EXISTING,
            0,
            ptr::null_mut(),
        );
        if handle == INVALID_HANDLE_VALUE {
            return None;
        }

        let mut query: STORAGE_PROPERTY_QUERY = mem::zeroed();
        query.PropertyId = StorageDeviceSeekPenaltyProperty;
        query.QueryType = PropertyStandardQuery;
        let mut descriptor = SeekPenaltyDescriptor {
            version: 0,
            size: 0,
            incurs_seek_penalty: 1,
        };
        let mut returned: DWORD = 0;

        let ok = DeviceIoControl(
            handle,
            IOCTL_STORAGE_QUERY_PROPERTY,
            &mut query as *mut _ as LPVOID,
            mem::size_of::<STORAGE_PROPERTY_QUERY>() as DWORD,
            &mut descriptor as *mut _ as LPVOID,
            mem::size_of::<SeekPenaltyDescriptor>() as DWORD,
            &mut returned,
            ptr::null_mut(),
        );
        CloseHandle(handle);

        if ok == 0 {
            return None;
        }
        Some(descriptor.incurs_seek_penalty != 0)
    }
}
