//! In-memory stand-ins for the system clipboard and input stream

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::platform::{PasteInjector, PlatformError, SystemClipboard};

#[derive(Debug, Default)]
struct ClipboardState {
    text: Option<String>,
    fail_writes: bool,
}

/// Shared clipboard; clones see the same contents
#[derive(Debug, Clone, Default)]
pub struct FakeClipboard {
    state: Arc<Mutex<ClipboardState>>,
}

impl FakeClipboard {
    pub fn set(&self, text: &str) {
        self.state.lock().unwrap().text = Some(text.to_owned());
    }

    pub fn empty(&self) {
        self.state.lock().unwrap().text = None;
    }

    pub fn text(&self) -> Option<String> {
        self.state.lock().unwrap().text.clone()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }
}

impl SystemClipboard for FakeClipboard {
    fn read_text(&mut self) -> Option<String> {
        self.text().filter(|t| !t.is_empty())
    }

    fn write_text(&mut self, text: &str) -> Result<(), PlatformError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(PlatformError::Clipboard("pasteboard locked".into()));
        }
        state.text = Some(text.to_owned());
        Ok(())
    }
}

/// Counts injected paste keystrokes
#[derive(Debug, Clone, Default)]
pub struct FakeInjector {
    count: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
}

impl FakeInjector {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl PasteInjector for FakeInjector {
    fn inject_paste(&self) -> Result<(), PlatformError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PlatformError::Injection("event source unavailable".into()));
        }
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
