//! Host-environment ports: colour-scheme preference, presentation classes and
//! the text clipboard.

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

use crate::error::PikPakError;

/// Presentation class toggled for dark mode
pub const DARK_CLASS: &str = "dark";

/// The UI surface the helpers can query and restyle
pub trait Appearance: Send + Sync {
    /// Whether the host asks for a dark colour scheme
    fn prefers_dark_color_scheme(&self) -> bool;
    /// Adds (`enabled == true`) or removes a presentation class on the document body
    fn toggle_class(&self, class: &str, enabled: bool);
}

/// Write-only text clipboard
pub trait Clipboard: Send + Sync {
    /// Replaces the clipboard contents with `text`
    fn write_text(&self, text: &str) -> Result<(), PikPakError>;
}

/// The host's dark colour-scheme preference as `"true"`/`"false"`
#[must_use]
pub fn is_dark_theme_preferred(host: &dyn Appearance) -> String {
    host.prefers_dark_color_scheme().to_string()
}

/// Copies `value` to the clipboard
pub fn write_to_clipboard(clipboard: &dyn Clipboard, value: &str) -> Result<(), PikPakError> {
    clipboard.write_text(value)
}

/// In-process [`Appearance`] with a fixed preference, recording applied classes
#[derive(Debug, Default)]
pub struct StaticAppearance {
    prefers_dark: bool,
    classes: Mutex<BTreeSet<String>>,
}

impl StaticAppearance {
    /// Host that reports `prefers_dark` as its colour-scheme preference
    #[must_use]
    pub fn new(prefers_dark: bool) -> Self {
        Self {
            prefers_dark,
            classes: Mutex::default(),
        }
    }

    /// Whether `class` is currently applied
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(class)
    }
}

impl Appearance for StaticAppearance {
    fn prefers_dark_color_scheme(&self) -> bool {
        self.prefers_dark
    }

    fn toggle_class(&self, class: &str, enabled: bool) {
        let mut classes = self.classes.lock().unwrap_or_else(PoisonError::into_inner);
        if enabled {
            classes.insert(class.to_string());
        } else {
            classes.remove(class);
        }
    }
}

/// In-process [`Clipboard`]
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    /// Empty clipboard
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last text written, if any
    #[must_use]
    pub fn contents(&self) -> Option<String> {
        self.contents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) -> Result<(), PikPakError> {
        *self.contents.lock().unwrap_or_else(PoisonError::into_inner) = Some(text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_adds_and_removes() {
        let host = StaticAppearance::new(false);
        host.toggle_class(DARK_CLASS, true);
        assert!(host.has_class(DARK_CLASS));
        host.toggle_class(DARK_CLASS, false);
        assert!(!host.has_class(DARK_CLASS));
    }

    #[test]
    fn dark_preference_as_string() {
        assert_eq!(is_dark_theme_preferred(&StaticAppearance::new(true)), "true");
        assert_eq!(is_dark_theme_preferred(&StaticAppearance::new(false)), "false");
    }

    #[test]
    fn clipboard_keeps_last_write() {
        let clipboard = MemoryClipboard::new();
        assert_eq!(clipboard.contents(), None);
        write_to_clipboard(&clipboard, "magnet:?xt=urn:btih:one").unwrap();
        write_to_clipboard(&clipboard, "magnet:?xt=urn:btih:two").unwrap();
        assert_eq!(
            clipboard.contents().as_deref(),
            Some("magnet:?xt=urn:btih:two")
        );
    }
}
