//! Panel visibility and fullscreen.

use sqlcoach_services::ServiceError;
use sqlcoach_types::{DataSource, LayoutFlags};

#[derive(Debug, Default)]
pub struct PanelLayoutController {
    flags: LayoutFlags,
    fullscreen: bool,
    fullscreen_pending: bool,
}

impl PanelLayoutController {
    #[must_use]
    pub fn new(flags: LayoutFlags) -> Self {
        Self {
            flags,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn flags(&self) -> LayoutFlags {
        self.flags
    }

    /// Last fullscreen state the platform confirmed.
    #[must_use]
    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Badge text for the data-source toggle.
    #[must_use]
    pub fn mode_label(&self) -> &'static str {
        if self.flags.demo_mode { "DEMO" } else { "MOCK" }
    }

    pub fn toggle_sidebar(&mut self) {
        self.flags.sidebar_visible = !self.flags.sidebar_visible;
    }

    pub fn toggle_chat(&mut self) {
        self.flags.chat_visible = !self.flags.chat_visible;
    }

    pub(crate) fn set_demo_mode(&mut self, demo: bool) -> DataSource {
        self.flags.demo_mode = demo;
        self.flags.data_source()
    }

    /// Returns the direction to request (`true` = enter), or `None` while a
    /// request is outstanding.
    pub(crate) fn toggle_fullscreen(&mut self) -> Option<bool> {
        if self.fullscreen_pending {
            return None;
        }
        self.fullscreen_pending = true;
        Some(!self.fullscreen)
    }

    pub(crate) fn apply_fullscreen(&mut self, enter: bool, result: Result<(), ServiceError>) {
        self.fullscreen_pending = false;
        match result {
            Ok(()) => self.fullscreen = enter,
            Err(e) => {
                let action = if enter { "enter" } else { "exit" };
                tracing::warn!("Failed to {action} fullscreen: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let layout = PanelLayoutController::default();
        let flags = layout.flags();
        assert!(flags.sidebar_visible);
        assert!(flags.chat_visible);
        assert!(!flags.demo_mode);
        assert_eq!(layout.mode_label(), "MOCK");
    }

    #[test]
    fn toggles_are_independent() {
        let mut layout = PanelLayoutController::default();
        layout.toggle_sidebar();
        assert!(!layout.flags().sidebar_visible);
        assert!(layout.flags().chat_visible);
        layout.toggle_chat();
        layout.toggle_sidebar();
        assert!(layout.flags().sidebar_visible);
        assert!(!layout.flags().chat_visible);
        assert!(!layout.flags().demo_mode);
    }

    #[test]
    fn demo_mode_maps_to_data_source() {
        let mut layout = PanelLayoutController::default();
        assert_eq!(layout.set_demo_mode(true), DataSource::Demo);
        assert_eq!(layout.mode_label(), "DEMO");
        assert_eq!(layout.set_demo_mode(false), DataSource::Mock);
    }

    #[test]
    fn fullscreen_tracks_confirmed_state() {
        let mut layout = PanelLayoutController::default();
        assert_eq!(layout.toggle_fullscreen(), Some(true));
        assert_eq!(layout.toggle_fullscreen(), None);
        layout.apply_fullscreen(true, Ok(()));
        assert!(layout.is_fullscreen());
        assert_eq!(layout.toggle_fullscreen(), Some(false));
        layout.apply_fullscreen(false, Err(ServiceError::Unsupported("fullscreen")));
        assert!(layout.is_fullscreen());
    }
}
