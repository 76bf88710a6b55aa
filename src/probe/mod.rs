//! Contains logic for observing the currently focused window on different
//! platforms. [GenericFocusProbe] is the main artifact of this module that
//! abstracts the operations.

#[cfg(feature = "win")]
pub mod win;
#[cfg(feature = "x11")]
pub mod x11;

#[cfg(feature = "win")]
extern crate windows;

#[cfg(feature = "x11")]
extern crate xcb;

use std::sync::Arc;

use anyhow::Result;

/// Title used when the platform reports a window with no usable name.
pub const UNKNOWN_TITLE: &str = "Unknown";

/// One observation of the foreground window.
#[derive(Debug, Clone)]
pub struct FocusSnapshot {
    /// Title of the window. For example 'Vibing in YouTube - Chrome'.
    pub title: Option<Arc<str>>,
    /// Name of the owning process. For example 'nvim'.
    pub owner_name: Option<Arc<str>>,
}

impl FocusSnapshot {
    /// Resolves the title the tracker attributes time to: the window title if
    /// present, the owning process name otherwise, a fixed sentinel as a last
    /// resort.
    pub fn display_title(&self) -> Arc<str> {
        self.title
            .clone()
            .or_else(|| self.owner_name.clone())
            .unwrap_or_else(|| UNKNOWN_TITLE.into())
    }
}

/// Contract every platform focus source must implement. A probe may return
/// `Ok(None)` when no window currently holds focus.
#[cfg_attr(test, mockall::automock)]
pub trait FocusProbe: Send {
    fn poll(&mut self) -> Result<Option<FocusSnapshot>>;
}

/// Serves as a cross-compatible [FocusProbe] implementation.
pub struct GenericFocusProbe {
    inner: Box<dyn FocusProbe>,
}

impl GenericFocusProbe {
    pub fn new() -> Result<Self> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "win")] {
                use win::WindowsFocusProbe;
                Ok(Self {
                    inner: Box::new(WindowsFocusProbe::new()),
                })
            }
            else if #[cfg(feature = "x11")] {
                use x11::X11FocusProbe;
                Ok(Self {
                    inner: Box::new(X11FocusProbe::new()?),
                })
            }
            else {
                Err(anyhow::anyhow!("no focus probe is available for this platform"))
            }
        }
    }
}

impl FocusProbe for GenericFocusProbe {
    fn poll(&mut self) -> Result<Option<FocusSnapshot>> {
        self.inner.poll()
    }
}

#[cfg(test)]
mod tests {
    use super::FocusSnapshot;

    #[test]
    fn display_title_prefers_title_over_owner() {
        let snapshot = FocusSnapshot {
            title: Some("report.pdf".into()),
            owner_name: Some("evince".into()),
        };
        assert_eq!(&*snapshot.display_title(), "report.pdf");
    }

    #[test]
    fn display_title_falls_back_to_owner_then_sentinel() {
        let snapshot = FocusSnapshot {
            title: None,
            owner_name: Some("evince".into()),
        };
        assert_eq!(&*snapshot.display_title(), "evince");

        let snapshot = FocusSnapshot {
            title: None,
            owner_name: None,
        };
        assert_eq!(&*snapshot.display_title(), "Unknown");
    }
}
