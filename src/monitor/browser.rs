use anyhow::{Context, Result};

pub trait BrowserLauncher: Send + 'static {
    fn open_url(&mut self, url: &str) -> Result<()>;
}

/// Opens urls with the user's default browser.
#[derive(Debug, Default)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open_url(&mut self, url: &str) -> Result<()> {
        open::that(url).with_context(|| format!("Error OS opening {}", url))
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::sync::{Arc, Mutex};

    use anyhow::{bail, Result};

    use super::BrowserLauncher;

    /// Records every url it is asked to open.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingBrowser {
        pub opened: Arc<Mutex<Vec<String>>>,
        pub fail: bool,
    }

    impl RecordingBrowser {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        pub fn count(&self) -> usize {
            self.opened.lock().unwrap().len()
        }
    }

    impl BrowserLauncher for RecordingBrowser {
        fn open_url(&mut self, url: &str) -> Result<()> {
            self.opened.lock().unwrap().push(url.to_owned());
            if self.fail {
                bail!("no browser available")
            }
            Ok(())
        }
    }
}
