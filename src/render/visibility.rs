//! Visibility gate

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared "is my element displayed" flag for one subscription
///
/// The UI side keeps a clone and flips it; the connection reads it whenever a
/// render is about to happen. Visible by default.
#[derive(Debug, Clone)]
pub struct VisibilityFlag(Arc<AtomicBool>);

impl VisibilityFlag {
    /// Create a flag with the given initial visibility
    pub fn new(visible: bool) -> Self {
        Self(Arc::new(AtomicBool::new(visible)))
    }

    /// Mark the element as displayed
    pub fn show(&self) {
        self.set_visible(true);
    }

    /// Mark the element as hidden
    pub fn hide(&self) {
        self.set_visible(false);
    }

    /// Set visibility
    pub fn set_visible(&self, visible: bool) {
        self.0.store(visible, Ordering::Relaxed);
    }

    /// Current visibility
    pub fn is_visible(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for VisibilityFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Whether a subscription may render right now
///
/// True iff the page is not hidden, the subscription is not suspended, and
/// its visibility element (if any) is displayed.
pub fn should_render(page_hidden: bool, element: Option<&VisibilityFlag>, suspended: bool) -> bool {
    !page_hidden && !suspended && element.map_or(true, VisibilityFlag::is_visible)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_render_matrix() {
        let shown = VisibilityFlag::new(true);
        let hidden = VisibilityFlag::new(false);

        assert!(should_render(false, None, false));
        assert!(should_render(false, Some(&shown), false));
        assert!(!should_render(false, Some(&hidden), false));
        assert!(!should_render(true, Some(&shown), false));
        assert!(!should_render(true, None, false));
        assert!(!should_render(false, Some(&shown), true));
    }

    #[test]
    fn test_flag_shared_between_clones() {
        let flag = VisibilityFlag::default();
        let ui_side = flag.clone();

        assert!(flag.is_visible());
        ui_side.hide();
        assert!(!flag.is_visible());
        ui_side.show();
        assert!(flag.is_visible());
    }
}
