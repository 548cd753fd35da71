use std::mem::transmute;

use anyhow::{anyhow, bail, Result};
use objc::runtime::{Class, Object};
use objc_foundation::{INSArray, INSObject, INSString, NSArray, NSDictionary, NSObject, NSString};
use objc_id::Id;

use crate::monitor::{ClipboardAccess, ClipboardSession};

/// The general pasteboard. Each open looks it up again so nothing Cocoa crosses threads.
#[derive(Debug, Default)]
pub struct OSXClipboard;

pub struct OSXSession {
    text: Option<String>,
}

// required to bring NSPasteboard into the path of the class-resolver
#[link(name = "AppKit", kind = "framework")]
extern "C" {}

impl ClipboardAccess for OSXClipboard {
    type Session<'a> = OSXSession;

    fn open(&mut self) -> Result<OSXSession> {
        let cls = Class::get("NSPasteboard").ok_or(anyhow!("Failed to get NSPasteboard class"))?;
        let pasteboard: *mut Object = unsafe { msg_send![cls, generalPasteboard] };
        if pasteboard.is_null() {
            bail!("Failed to generalPasteboard")
        }
        let pasteboard: Id<Object> = unsafe { Id::from_ptr(pasteboard) };
        Ok(OSXSession {
            text: read_string(&pasteboard)?,
        })
    }
}

impl ClipboardSession for OSXSession {
    fn has_text_format(&self) -> bool {
        self.text.is_some()
    }

    fn get_text(&self) -> Result<String> {
        Ok(self.text.clone().unwrap_or_default())
    }
}

// https://github.com/aweinstock314/rust-clipboard/blob/master/src/osx_clipboard.rs
fn read_string(pasteboard: &Object) -> Result<Option<String>> {
    let string_class: Id<NSObject> = {
        let cls: Id<Class> = unsafe { Id::from_ptr(class("NSString")) };
        unsafe { transmute(cls) }
    };
    let classes = NSArray::from_vec(vec![string_class]);
    let options: Id<NSDictionary<NSObject, NSObject>> = NSDictionary::new();
    let string_array: Id<NSArray<NSString>> = unsafe {
        let obj: *mut NSArray<NSString> =
            msg_send![pasteboard, readObjectsForClasses: &*classes options: &*options];
        if obj.is_null() {
            bail!("Faild to readObjectsForClasses")
        }
        Id::from_ptr(obj)
    };
    if string_array.count() == 0 {
        return Ok(None);
    }
    Ok(Some(string_array[0].as_str().to_owned()))
}

#[inline]
fn class(name: &str) -> *mut Class {
    unsafe { transmute(Class::get(name)) }
}
