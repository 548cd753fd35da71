use anyhow::{bail, Context, Result};
use scopeguard::defer;
use windows::Win32::{
    Foundation::{GetLastError, SetLastError, HWND, NO_ERROR, TRUE},
    System::{
        DataExchange::{CloseClipboard, GetClipboardData, IsClipboardFormatAvailable, OpenClipboard},
        Memory::{GlobalLock, GlobalUnlock},
        Ole::CF_UNICODETEXT,
    },
};

use crate::monitor::{ClipboardAccess, ClipboardSession};

/// The Win32 clipboard, opened without an owner window.
#[derive(Debug, Default)]
pub struct Win32Clipboard;

/// Holds the clipboard open; `CloseClipboard` runs on drop.
#[derive(Debug)]
pub struct Win32Session;

impl ClipboardAccess for Win32Clipboard {
    type Session<'a> = Win32Session;

    fn open(&mut self) -> Result<Win32Session> {
        unsafe {
            if OpenClipboard(HWND::default()) == TRUE {
                return Ok(Win32Session);
            }
            // ERROR_ACCESS_DENIED 0x80070005 while another process holds it
            log::warn!("OpenClipboard failed: {:?}", GetLastError().ok());
            SetLastError(NO_ERROR);
            if OpenClipboard(HWND::default()) == TRUE {
                return Ok(Win32Session);
            }
            GetLastError().ok().context("OpenClipboard")?;
            bail!("OpenClipboard failed")
        }
    }
}

impl ClipboardSession for Win32Session {
    fn has_text_format(&self) -> bool {
        unsafe { IsClipboardFormatAvailable(CF_UNICODETEXT.0 as _) == TRUE }
    }

    fn get_text(&self) -> Result<String> {
        unsafe {
            let handle =
                GetClipboardData(CF_UNICODETEXT.0 as _).context("GetClipboardData(CF_UNICODETEXT)")?;
            let ptr = GlobalLock(handle.0) as *const u16;
            if ptr.is_null() {
                bail!("GlobalLock failed: {:?}", GetLastError())
            }
            defer!({
                GlobalUnlock(handle.0);
            });

            let mut len = 0;
            while *ptr.add(len) != 0 {
                len += 1;
            }
            Ok(String::from_utf16_lossy(std::slice::from_raw_parts(ptr, len)))
        }
    }
}

impl Drop for Win32Session {
    fn drop(&mut self) {
        log::trace!("CloseClipboard");
        unsafe { CloseClipboard() };
    }
}
