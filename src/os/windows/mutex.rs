use anyhow::{bail, Result};
use windows::{
    core::HSTRING,
    Win32::{
        Foundation::{CloseHandle, GetLastError, ERROR_ALREADY_EXISTS, HANDLE},
        System::Threading::{CreateMutexW, ReleaseMutex},
    },
};

/// Named mutex held for as long as one monitor runs on this machine.
#[derive(Debug)]
pub struct AppMutex(HANDLE);

pub fn create_app_mutex(name: &str) -> Result<AppMutex> {
    unsafe {
        let mutex = CreateMutexW(None, true, &HSTRING::from(name))?;

        if GetLastError() == ERROR_ALREADY_EXISTS {
            CloseHandle(mutex);
            bail!("Already running")
        }
        log::debug!("AppMutex created: {:?}", mutex);
        Ok(AppMutex(mutex))
    }
}

impl Drop for AppMutex {
    fn drop(&mut self) {
        log::debug!("Release AppMutex: {:?}", self.0);
        unsafe {
            ReleaseMutex(self.0);
            CloseHandle(self.0);
        }
    }
}
