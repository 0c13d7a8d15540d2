//! POSIX backend: `shm_open` + `mmap` via memmap2.

use std::fs::File;
use std::io;
use std::ptr::NonNull;
use std::thread;
use std::time::Duration;

use memmap2::{MmapMut, MmapOptions};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::mman::{shm_open, shm_unlink};
use nix::sys::stat::Mode;

use super::OpenMode;
use crate::errors::{ChannelError, Result};
use crate::layout::REGION_HEADER_SIZE;

/// An attacher can observe the object between `shm_open` and the creator's
/// `ftruncate`. Wait this long for it to be sized before giving up.
const SIZE_WAIT_ATTEMPTS: u32 = 50;
const SIZE_WAIT_SLEEP: Duration = Duration::from_millis(2);

#[derive(Debug)]
pub(super) struct Mapping {
    map: MmapMut,
    _file: File,
}

impl Mapping {
    pub(super) fn len(&self) -> usize {
        self.map.len()
    }
}

pub(super) fn open(os_name: &str, size: usize, mode: OpenMode) -> Result<(Mapping, NonNull<u8>, bool)> {
    let perms = Mode::S_IRUSR | Mode::S_IWUSR;

    let (fd, created) = match mode {
        OpenMode::OpenExisting => {
            let fd = shm_open(os_name, OFlag::O_RDWR, Mode::empty()).map_err(translate)?;
            (fd, false)
        }
        OpenMode::CreateNew => {
            let fd = shm_open(os_name, OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR, perms)
                .map_err(translate)?;
            (fd, true)
        }
        OpenMode::CreateOrOpen => {
            match shm_open(os_name, OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR, perms) {
                Ok(fd) => (fd, true),
                Err(Errno::EEXIST) => {
                    // Lost the creation race; attach to the winner's region.
                    let fd =
                        shm_open(os_name, OFlag::O_RDWR, Mode::empty()).map_err(translate)?;
                    (fd, false)
                }
                Err(errno) => return Err(translate(errno)),
            }
        }
    };

    let file = File::from(fd);

    let map_len = if created {
        // set_len both sizes the object and zero-fills it.
        if let Err(err) = file.set_len(size as u64) {
            let _ = shm_unlink(os_name);
            return Err(translate_io(err));
        }
        size
    } else {
        wait_for_sized(&file)?
    };

    let mut map = unsafe { MmapOptions::new().len(map_len).map_mut(&file) }
        .map_err(ChannelError::MappingFailed)?;

    let ptr = NonNull::new(map.as_mut_ptr()).ok_or_else(|| {
        ChannelError::SharedMemoryError("mmap returned a null pointer".to_string())
    })?;

    Ok((Mapping { map, _file: file }, ptr, created))
}

pub(super) fn unlink(os_name: &str) -> Result<()> {
    shm_unlink(os_name).map_err(translate)
}

/// Poll the object size until the creator's `ftruncate` lands. A region that
/// never grows past zero counts as "initialization in progress forever" and
/// is reported as not found.
fn wait_for_sized(file: &File) -> Result<usize> {
    for _ in 0..SIZE_WAIT_ATTEMPTS {
        let len = file.metadata().map_err(translate_io)?.len() as usize;
        if len >= REGION_HEADER_SIZE {
            return Ok(len);
        }
        thread::sleep(SIZE_WAIT_SLEEP);
    }
    Err(ChannelError::ChannelNotFound)
}

fn translate(errno: Errno) -> ChannelError {
    match errno {
        Errno::ENOENT => ChannelError::ChannelNotFound,
        Errno::EEXIST => ChannelError::ChannelAlreadyExists,
        Errno::EACCES | Errno::EPERM => ChannelError::PermissionDenied,
        Errno::ENOMEM => ChannelError::OutOfMemory,
        Errno::EBUSY => ChannelError::ResourceBusy,
        other => ChannelError::SystemError(other as i32),
    }
}

fn translate_io(err: io::Error) -> ChannelError {
    match err.raw_os_error() {
        Some(code) => translate(Errno::from_raw(code)),
        None => ChannelError::MappingFailed(err),
    }
}
