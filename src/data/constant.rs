use std::time::Duration;

macro_rules! constant {
    () => {};
    ($($i:ident => $v:expr),+$(,)?) => {
        $(
            pub const $i: &'static str = include_str!(concat!(env!("OUT_DIR"), "/", $v));
        )*
    };
}

constant! {
    BUILD_TIME => "BUILD_TIME",
    GIT_COMMIT_ID => "GIT_COMMIT_ID",
    GIT_DESCRIBE => "GIT_DESCRIBE",
    VERSION => "VERSION",
}

pub const SERVICE_NAME: &'static str = "ClipboardMonitorService";
pub const SERVICE_DISPLAY_NAME: &'static str = "Clipboard Monitoring Service";
pub const SERVICE_DESCRIPTION: &'static str =
    "Monitors the clipboard for specific XML content and opens a URL.";

/// Wait between two clipboard reads.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Opened when the clipboard holds [`MATCH_TEMPLATE`].
pub const TARGET_URL: &'static str = "http://google.com";
/// Canonical form a clipboard document must serialize to.
pub const MATCH_TEMPLATE: &'static str = "<root><element>value</element></root>";
