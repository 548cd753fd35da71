use std::time::Duration;

use anyhow::{Context, Result};
use x11_clipboard::Clipboard;

use crate::monitor::{ClipboardAccess, ClipboardSession};

const LOAD_TIMEOUT: Duration = Duration::from_millis(500);

/// The X11 CLIPBOARD selection, read as UTF8_STRING.
pub struct X11Clipboard {
    clipboard: Clipboard,
}

impl X11Clipboard {
    pub fn new() -> Result<Self> {
        let clipboard = Clipboard::new().context("Connect to X server")?;
        log::debug!("atoms: {:?}", clipboard.getter.atoms);
        Ok(Self { clipboard })
    }
}

/// X11 has nothing to lock, the selection is converted once when the session opens.
pub struct X11Session {
    data: Vec<u8>,
}

impl ClipboardSession for X11Session {
    fn has_text_format(&self) -> bool {
        !self.data.is_empty()
    }

    fn get_text(&self) -> Result<String> {
        String::from_utf8(self.data.clone()).context("Clipboard is not UTF-8")
    }
}

impl ClipboardAccess for X11Clipboard {
    type Session<'a> = X11Session;

    fn open(&mut self) -> Result<X11Session> {
        let atoms = &self.clipboard.getter.atoms;
        let data = self
            .clipboard
            .load(atoms.clipboard, atoms.utf8_string, atoms.property, LOAD_TIMEOUT)
            .context("Load CLIPBOARD selection")?;
        log::trace!("Loaded {} bytes", data.len());
        Ok(X11Session { data })
    }
}
