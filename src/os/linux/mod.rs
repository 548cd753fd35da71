mod clipboard;

use anyhow::Result;

use super::OsAbstractionLayer;
use crate::{monitor, os_stub};

#[derive(Debug, Default)]
pub struct LinuxOAL;

impl OsAbstractionLayer for LinuxOAL {
    fn init(&mut self, _args: &crate::Args) -> Result<()> {
        Ok(())
    }

    fn run_monitor(&self, daemon: bool) -> Result<()> {
        if daemon {
            os_stub!()
        }
        monitor::run_foreground(clipboard::X11Clipboard::new()?)
    }

    fn service_controller(&self) -> Result<Box<dyn super::SystemServiceController>> {
        os_stub!()
    }
}
