use std::sync::mpsc::{Receiver, RecvTimeoutError};

use anyhow::Result;

use super::{
    browser::BrowserLauncher,
    clipboard::{read_text, ClipboardAccess},
    xml::is_valid_xml,
    MonitorConfig,
};
use crate::AcquisitionError;

/// What one poll observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    /// The clipboard could not be read; the snapshot is untouched.
    Unavailable,
    Unchanged,
    /// New text that is not the expected document.
    Changed,
    /// New text matching the template; the browser was opened.
    Matched,
}

pub struct Poller<C, B> {
    clipboard: C,
    browser: B,
    config: MonitorConfig,
    snapshot: String,
}

impl<C: ClipboardAccess, B: BrowserLauncher> Poller<C, B> {
    pub fn new(clipboard: C, browser: B, config: MonitorConfig) -> Self {
        Self {
            clipboard,
            browser,
            config,
            snapshot: String::new(),
        }
    }

    pub fn snapshot(&self) -> &str {
        &self.snapshot
    }

    /// Polls until `stop` receives a message or its sender is dropped.
    ///
    /// The stop signal is only observed in the wait between two polls, so a poll that has
    /// started always runs to completion.
    pub fn run(&mut self, stop: &Receiver<()>) -> Result<()> {
        log::info!(
            "Monitor clipboard every {:?} for {}",
            self.config.poll_interval,
            self.config.template
        );
        loop {
            self.poll_once()?;
            match stop.recv_timeout(self.config.poll_interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        log::info!("Monitor clipboard exit");
        Ok(())
    }

    /// Reads the clipboard once and opens the target url if new text matches the template.
    ///
    /// Errors returned from here are not clipboard failures, those are logged and reported as
    /// [`Poll::Unavailable`].
    pub fn poll_once(&mut self) -> Result<Poll> {
        let text = match read_text(&mut self.clipboard) {
            Ok(t) => t,
            Err(e) => {
                log::error!("{}", AcquisitionError(e));
                return Ok(Poll::Unavailable);
            }
        };
        log::trace!("Clipboard content: {:?}", text);

        if text == self.snapshot {
            return Ok(Poll::Unchanged);
        }
        log::debug!("New clipboard content detected");
        self.snapshot = text;

        if !is_valid_xml(&self.snapshot, &self.config.template) {
            return Ok(Poll::Changed);
        }
        log::info!("Valid XML detected, opening {}", self.config.target_url);
        self.browser.open_url(&self.config.target_url)?;
        log::info!("Browser opened");
        Ok(Poll::Matched)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::mpsc, thread, time::Duration};

    use super::{Poll, Poller};
    use crate::{
        data::constant::{MATCH_TEMPLATE, TARGET_URL},
        monitor::{
            browser::fake::RecordingBrowser,
            clipboard::fake::{Read, ScriptedClipboard},
            MonitorConfig,
        },
    };

    fn poller(reads: Vec<Read>) -> (Poller<ScriptedClipboard, RecordingBrowser>, RecordingBrowser) {
        let browser = RecordingBrowser::default();
        let config = MonitorConfig {
            poll_interval: Duration::from_millis(5),
            ..Default::default()
        };
        (
            Poller::new(ScriptedClipboard::new(reads), browser.clone(), config),
            browser,
        )
    }

    #[test]
    fn fires_once_on_change_to_template() {
        let (mut poller, browser) = poller(vec![
            Read::Text(""),
            Read::Text("A"),
            Read::Text("A"),
            Read::Text(MATCH_TEMPLATE),
        ]);
        assert_eq!(poller.poll_once().unwrap(), Poll::Unchanged);
        assert_eq!(poller.poll_once().unwrap(), Poll::Changed);
        assert_eq!(poller.poll_once().unwrap(), Poll::Unchanged);
        assert_eq!(browser.count(), 0);
        assert_eq!(poller.poll_once().unwrap(), Poll::Matched);
        assert_eq!(*browser.opened.lock().unwrap(), vec![TARGET_URL.to_string()]);
    }

    #[test]
    fn same_value_never_refires() {
        let (mut poller, browser) = poller(vec![Read::Text(MATCH_TEMPLATE)]);
        assert_eq!(poller.poll_once().unwrap(), Poll::Matched);
        for _ in 0..5 {
            assert_eq!(poller.poll_once().unwrap(), Poll::Unchanged);
        }
        assert_eq!(browser.count(), 1);
    }

    #[test]
    fn refires_after_clipboard_changes_away_and_back() {
        let (mut poller, browser) = poller(vec![
            Read::Text(MATCH_TEMPLATE),
            Read::Text("other"),
            Read::Text(MATCH_TEMPLATE),
        ]);
        poller.poll_once().unwrap();
        poller.poll_once().unwrap();
        poller.poll_once().unwrap();
        assert_eq!(browser.count(), 2);
    }

    #[test]
    fn no_text_counts_as_empty() {
        let (mut poller, browser) = poller(vec![Read::Text("A"), Read::NoText]);
        assert_eq!(poller.poll_once().unwrap(), Poll::Changed);
        assert_eq!(poller.poll_once().unwrap(), Poll::Changed);
        assert_eq!(poller.snapshot(), "");
        assert_eq!(browser.count(), 0);
    }

    #[test]
    fn acquisition_failure_keeps_snapshot() {
        let (mut poller, browser) = poller(vec![
            Read::Text("A"),
            Read::OpenFails,
            Read::ReadFails,
            Read::Text("A"),
            Read::Text(MATCH_TEMPLATE),
        ]);
        assert_eq!(poller.poll_once().unwrap(), Poll::Changed);
        assert_eq!(poller.poll_once().unwrap(), Poll::Unavailable);
        assert_eq!(poller.snapshot(), "A");
        assert_eq!(poller.poll_once().unwrap(), Poll::Unavailable);
        assert_eq!(poller.snapshot(), "A");
        assert_eq!(poller.poll_once().unwrap(), Poll::Unchanged);
        assert_eq!(poller.poll_once().unwrap(), Poll::Matched);
        assert_eq!(browser.count(), 1);
    }

    #[test]
    fn near_miss_documents_do_not_fire() {
        let (mut poller, browser) = poller(vec![
            Read::Text("<root><element>Value</element></root>"),
            Read::Text("<root attr='x'><element>value</element></root>"),
            Read::Text("<root><element>value</element><extra/></root>"),
            Read::Text("<root><element>value</element>"),
        ]);
        for _ in 0..4 {
            assert_eq!(poller.poll_once().unwrap(), Poll::Changed);
        }
        assert_eq!(browser.count(), 0);
    }

    #[test]
    fn browser_failure_is_returned() {
        let mut poller = Poller::new(
            ScriptedClipboard::new(vec![Read::Text(MATCH_TEMPLATE)]),
            RecordingBrowser::failing(),
            MonitorConfig::default(),
        );
        assert!(poller.poll_once().is_err());
        assert_eq!(poller.snapshot(), MATCH_TEMPLATE);
    }

    #[test]
    fn run_exits_on_stop() {
        let (mut poller, browser) = poller(vec![Read::Text("A"), Read::Text(MATCH_TEMPLATE)]);
        let (stop_tx, stop_rx) = mpsc::channel();
        let worker = thread::spawn(move || poller.run(&stop_rx));
        thread::sleep(Duration::from_millis(100));
        stop_tx.send(()).unwrap();
        worker.join().unwrap().unwrap();
        assert_eq!(browser.count(), 1);
    }

    #[test]
    fn run_exits_when_sender_dropped() {
        let (mut poller, _) = poller(vec![Read::OpenFails]);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        drop(stop_tx);
        poller.run(&stop_rx).unwrap();
    }
}
