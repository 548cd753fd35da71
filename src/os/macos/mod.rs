mod clipboard;

use anyhow::Result;

use super::OsAbstractionLayer;
use crate::{monitor, os_stub};

#[derive(Debug, Default)]
pub struct MacOAL;

impl OsAbstractionLayer for MacOAL {
    fn init(&mut self, _args: &crate::Args) -> Result<()> {
        Ok(())
    }

    fn run_monitor(&self, daemon: bool) -> Result<()> {
        if daemon {
            os_stub!()
        }
        monitor::run_foreground(clipboard::OSXClipboard)
    }

    fn service_controller(&self) -> Result<Box<dyn super::SystemServiceController>> {
        os_stub!()
    }
}
