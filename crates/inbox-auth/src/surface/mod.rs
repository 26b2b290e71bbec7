//! Authorization surfaces backed by real browser windows

mod browser;

pub use browser::{BrowserWindow, BrowserWindowOpener};
