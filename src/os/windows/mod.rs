mod clipboard;
mod controller;
mod daemon;
mod mutex;

use std::path::PathBuf;

use anyhow::{Context, Result};
use windows_service::service::ServiceType;

use super::oal::*;
use crate::{
    data::constant::{SERVICE_DESCRIPTION, SERVICE_DISPLAY_NAME, SERVICE_NAME},
    monitor, Args, SubCommand,
};
use controller::WindowsServiceController;

const SERVICE_TYPE: ServiceType = ServiceType::OWN_PROCESS;

const MONITOR_MUTEX_NAME: &'static str = "Global\\ClipboardMonitor_InstanceMutex";

#[derive(Debug)]
pub struct WindowsOAL {
    service_name: String,
    service_type: ServiceType,
    display_name: String,
    service_description: String,
    service_uninstall_timeout: u64,
}

impl OsAbstractionLayer for WindowsOAL {
    fn init(&mut self, args: &Args) -> Result<()> {
        if let Some(SubCommand::Uninstall(args)) = &args.sub {
            self.service_uninstall_timeout = args.timeout;
        }
        Ok(())
    }

    fn run_monitor(&self, daemon: bool) -> Result<()> {
        if daemon {
            return daemon::DaemonMonitorDispatcher::run(self.service_name.as_str());
        }
        let _mutex = mutex::create_app_mutex(MONITOR_MUTEX_NAME)?;
        monitor::run_foreground(clipboard::Win32Clipboard)
    }

    fn service_controller(&self) -> Result<Box<dyn SystemServiceController>> {
        Ok(Box::new(WindowsServiceController::new(
            self.service_type,
            self.service_name.clone(),
            self.display_name.clone(),
            self.service_description.clone(),
            current_exe_path()?,
            self.service_uninstall_timeout,
        )))
    }
}

impl Default for WindowsOAL {
    fn default() -> Self {
        Self {
            service_name: SERVICE_NAME.into(),
            service_type: SERVICE_TYPE,
            display_name: SERVICE_DISPLAY_NAME.into(),
            service_description: SERVICE_DESCRIPTION.into(),
            service_uninstall_timeout: 5,
        }
    }
}

fn current_exe_path() -> Result<PathBuf> {
    std::env::current_exe().context("current_exe")
}
