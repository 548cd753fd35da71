mod browser;
mod clipboard;
mod lifecycle;
mod poller;
mod xml;

use std::time::Duration;

use anyhow::Result;

pub use browser::*;
pub use clipboard::*;
pub use lifecycle::*;
pub use poller::*;
pub use xml::{canonicalize, is_valid_xml};

use crate::data::constant::{MATCH_TEMPLATE, POLL_INTERVAL, TARGET_URL};

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub target_url: String,
    pub template: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            target_url: TARGET_URL.into(),
            template: MATCH_TEMPLATE.into(),
        }
    }
}

/// Runs the monitor in the current process until Ctrl-C or a worker failure.
pub fn run_foreground<C: ClipboardAccess>(clipboard: C) -> Result<()> {
    let poller = Poller::new(clipboard, SystemBrowser, MonitorConfig::default());
    let controller = Controller::new();

    let handle = controller.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        log::debug!("Exit by ctrlc");
        handle.stop();
    }) {
        log::warn!("Set ctrlc handler failed: {:?}", e);
    }

    controller.start(poller)?;
    controller.wait();

    match controller.take_failure() {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
