use anyhow::Result;

/// An open handle on the system clipboard. Dropping it closes the clipboard.
pub trait ClipboardSession {
    fn has_text_format(&self) -> bool;
    fn get_text(&self) -> Result<String>;
}

/// Something that can grant short, exclusive access to a clipboard.
pub trait ClipboardAccess: Send + 'static {
    type Session<'a>: ClipboardSession
    where
        Self: 'a;

    fn open(&mut self) -> Result<Self::Session<'_>>;
}

/// Reads the clipboard as plain text: open, check for text, read, close.
///
/// No text on the clipboard reads as `""`. The session is closed on every path, including a
/// failed `get_text`.
pub fn read_text<C: ClipboardAccess>(access: &mut C) -> Result<String> {
    let session = access.open()?;
    if !session.has_text_format() {
        log::trace!("No text on clipboard");
        return Ok(String::new());
    }
    let text = session.get_text()?;
    drop(session);
    Ok(text)
}


#[cfg(test)]
mod tests {
    use super::{
        fake::{Read, ScriptedClipboard},
        read_text,
    };

    #[test]
    fn reads_text() {
        let mut clipboard = ScriptedClipboard::new(vec![Read::Text("abc")]);
        assert_eq!(read_text(&mut clipboard).unwrap(), "abc");
    }

    #[test]
    fn no_text_is_empty() {
        let mut clipboard = ScriptedClipboard::new(vec![Read::NoText]);
        assert_eq!(read_text(&mut clipboard).unwrap(), "");
    }

    #[test]
    fn closed_on_every_path() {
        let mut clipboard = ScriptedClipboard::new(vec![
            Read::Text("a"),
            Read::NoText,
            Read::ReadFails,
            Read::OpenFails,
        ]);
        assert!(read_text(&mut clipboard).is_ok());
        assert!(read_text(&mut clipboard).is_ok());
        assert!(read_text(&mut clipboard).is_err());
        assert!(read_text(&mut clipboard).is_err());
        let counters = clipboard.counters.lock().unwrap();
        assert_eq!(counters.opened, 3);
        assert_eq!(counters.closed, 3);
    }
}
