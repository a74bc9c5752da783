//! Binding to the real `DBWIN_*` objects.

use std::io;
use std::mem::ManuallyDrop;
use std::os::windows::io::{AsRawHandle, FromRawHandle, IntoRawHandle, OwnedHandle, RawHandle};
use std::ptr::{self, NonNull};
use std::time::Duration;

use parking_lot::RwLock;
use windows_sys::Win32::Foundation::{
    CloseHandle, ERROR_ALREADY_EXISTS, GetLastError, INVALID_HANDLE_VALUE, WAIT_FAILED,
    WAIT_OBJECT_0, WAIT_TIMEOUT,
};
use windows_sys::Win32::System::Memory::{
    CreateFileMappingW, FILE_MAP_READ, MEMORY_MAPPED_VIEW_ADDRESS, MapViewOfFile, PAGE_READWRITE,
    UnmapViewOfFile,
};
use windows_sys::Win32::System::Threading::{CreateEventW, SetEvent, WaitForSingleObject};

use super::{Mailbox, WaitOutcome};
use crate::codec::SEGMENT_SIZE;
use crate::config::{ChannelNames, ReceiverConfig, wait_millis};
use crate::error::{ReceiverError, Result};

fn wide(name: &str) -> Vec<u16> {
    name.encode_utf16().chain(std::iter::once(0)).collect()
}

/// A read-only view of the segment.
struct MappedView {
    base: NonNull<u8>,
}

// SAFETY: the view is plain shared memory owned by this process until unmapped;
// it is only read through `&self` and unmapped once through `self`.
unsafe impl Send for MappedView {}
// SAFETY: see above.
unsafe impl Sync for MappedView {}

impl MappedView {
    fn map(mapping: &OwnedHandle) -> io::Result<Self> {
        // SAFETY: `mapping` is a valid file-mapping handle of SEGMENT_SIZE bytes.
        let view = unsafe { MapViewOfFile(mapping.as_raw_handle(), FILE_MAP_READ, 0, 0, 0) };
        NonNull::new(view.Value.cast::<u8>())
            .map(|base| Self { base })
            .ok_or_else(io::Error::last_os_error)
    }

    fn unmap(self) -> io::Result<()> {
        let this = ManuallyDrop::new(self);
        unmap_raw(this.base)
    }
}

impl Drop for MappedView {
    fn drop(&mut self) {
        let _ = unmap_raw(self.base);
    }
}

fn unmap_raw(base: NonNull<u8>) -> io::Result<()> {
    let address = MEMORY_MAPPED_VIEW_ADDRESS {
        Value: base.as_ptr().cast(),
    };
    // SAFETY: `address` came from MapViewOfFile and is unmapped exactly once.
    if unsafe { UnmapViewOfFile(address) } == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn close_handle(handle: OwnedHandle) -> io::Result<()> {
    let raw = handle.into_raw_handle();
    // SAFETY: `raw` was owned and is closed exactly once.
    if unsafe { CloseHandle(raw) } == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn owned(raw: RawHandle) -> Option<OwnedHandle> {
    if raw.is_null() || raw == INVALID_HANDLE_VALUE {
        return None;
    }
    // SAFETY: `raw` is a freshly created handle owned by the caller.
    Some(unsafe { OwnedHandle::from_raw_handle(raw) })
}

fn create_event(name: &str) -> Result<OwnedHandle> {
    let name_w = wide(name);
    // SAFETY: `name_w` is NUL-terminated; default security; auto-reset, unsignaled.
    let raw = unsafe { CreateEventW(ptr::null(), 0, 0, name_w.as_ptr()) };
    owned(raw).ok_or_else(|| ReceiverError::resource_unavailable(name, io::Error::last_os_error()))
}

/// OS objects held while the segment is open.
struct Resources {
    mapping: OwnedHandle,
    view: MappedView,
    buffer_ready: OwnedHandle,
    data_ready: OwnedHandle,
}

impl Resources {
    /// Releases in reverse acquisition order, attempting every release.
    fn release(self) -> Result<()> {
        let results = [
            ("data_ready", close_handle(self.data_ready)),
            ("buffer_ready", close_handle(self.buffer_ready)),
            ("view", self.view.unmap()),
            ("mapping", close_handle(self.mapping)),
        ];

        let mut first = None;
        for (resource, result) in results {
            if let Err(e) = result {
                tracing::warn!(resource, error = %e, "failed to release mailbox object");
                first.get_or_insert_with(|| ReceiverError::resource_unavailable(resource, e));
            }
        }
        first.map_or(Ok(()), Err)
    }
}

/// The system-wide `DBWIN_BUFFER` segment and its two signals.
///
/// Acquisition is all-or-nothing: if any object cannot be created, the ones
/// already acquired are released before `open` returns.
pub struct SharedSegment {
    names: ChannelNames,
    resources: RwLock<Option<Resources>>,
}

impl SharedSegment {
    /// Creates or opens the segment and signals named by `config`.
    ///
    /// # Errors
    /// Returns [`ReceiverError::ResourceUnavailable`] if an object cannot be
    /// created or mapped, or if `config.exclusive` is set and another monitor
    /// already owns the segment.
    pub fn open(config: &ReceiverConfig) -> Result<Self> {
        config.validate()?;
        let names = config.resolved_names();

        let buffer_w = wide(&names.buffer);
        // SAFETY: pagefile-backed mapping; `buffer_w` is NUL-terminated.
        let raw = unsafe {
            CreateFileMappingW(
                INVALID_HANDLE_VALUE,
                ptr::null(),
                PAGE_READWRITE,
                0,
                SEGMENT_SIZE as u32,
                buffer_w.as_ptr(),
            )
        };
        // SAFETY: reads the calling thread's last-error value.
        let already_exists = unsafe { GetLastError() } == ERROR_ALREADY_EXISTS;
        let mapping = owned(raw).ok_or_else(|| {
            ReceiverError::resource_unavailable(&names.buffer, io::Error::last_os_error())
        })?;
        if already_exists && config.exclusive {
            return Err(ReceiverError::resource_unavailable(
                &names.buffer,
                io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "another debug monitor already owns the segment",
                ),
            ));
        }

        let view = MappedView::map(&mapping)
            .map_err(|e| ReceiverError::resource_unavailable(&names.buffer, e))?;
        let buffer_ready = create_event(&names.buffer_ready)?;
        let data_ready = create_event(&names.data_ready)?;

        tracing::debug!(
            buffer = %names.buffer,
            buffer_ready = %names.buffer_ready,
            data_ready = %names.data_ready,
            "opened debug output segment"
        );

        Ok(Self {
            names,
            resources: RwLock::new(Some(Resources {
                mapping,
                view,
                buffer_ready,
                data_ready,
            })),
        })
    }

    /// Returns the resolved object names.
    #[must_use]
    pub const fn names(&self) -> &ChannelNames {
        &self.names
    }

    fn released(operation: &'static str) -> ReceiverError {
        ReceiverError::signal_failure(operation, io::Error::other("segment already released"))
    }
}

impl Mailbox for SharedSegment {
    fn signal_ready(&self) -> Result<()> {
        let guard = self.resources.read();
        let resources = guard.as_ref().ok_or_else(|| Self::released("set"))?;
        // SAFETY: the event handle stays open while the read lock is held.
        if unsafe { SetEvent(resources.buffer_ready.as_raw_handle()) } == 0 {
            return Err(ReceiverError::signal_failure(
                "set",
                io::Error::last_os_error(),
            ));
        }
        Ok(())
    }

    fn wait_for_data(&self, timeout: Duration) -> Result<WaitOutcome> {
        let millis = wait_millis(timeout);
        let guard = self.resources.read();
        let resources = guard.as_ref().ok_or_else(|| Self::released("wait"))?;
        // SAFETY: the event handle stays open while the read lock is held.
        match unsafe { WaitForSingleObject(resources.data_ready.as_raw_handle(), millis) } {
            WAIT_OBJECT_0 => Ok(WaitOutcome::Signaled),
            WAIT_TIMEOUT => Ok(WaitOutcome::TimedOut),
            WAIT_FAILED => Err(ReceiverError::signal_failure(
                "wait",
                io::Error::last_os_error(),
            )),
            other => Err(ReceiverError::signal_failure(
                "wait",
                io::Error::other(format!("unexpected wait result {other:#x}")),
            )),
        }
    }

    fn read_segment(&self, buf: &mut [u8]) -> usize {
        let guard = self.resources.read();
        let Some(resources) = guard.as_ref() else {
            return 0;
        };
        let len = buf.len().min(SEGMENT_SIZE);
        // SAFETY: the view maps SEGMENT_SIZE readable bytes and stays mapped
        // while the read lock is held; producers only write before data-ready.
        unsafe {
            ptr::copy_nonoverlapping(resources.view.base.as_ptr(), buf.as_mut_ptr(), len);
        }
        len
    }

    fn release(&self) -> Result<()> {
        let Some(resources) = self.resources.write().take() else {
            return Ok(());
        };
        tracing::debug!(buffer = %self.names.buffer, "releasing debug output segment");
        resources.release()
    }
}

impl Drop for SharedSegment {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!(error = %e, "failed to release debug output segment on drop");
        }
    }
}

impl std::fmt::Debug for SharedSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSegment")
            .field("names", &self.names)
            .field("open", &self.resources.read().is_some())
            .finish()
    }
}
