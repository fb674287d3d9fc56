//! Contains logic for extracting focus signals from different environments.
//! [GenericFocusMonitor] is the main artifact of this module that abstracts
//! the operations.

#[cfg(feature = "win")]
pub mod win;
#[cfg(feature = "x11")]
pub mod x11;

#[cfg(feature = "win")]
extern crate windows;

#[cfg(feature = "x11")]
extern crate xcb;

use anyhow::Result;

/// One probe of the window system: whether the tracked terminal window is the
/// active one, and how long the user has been idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusSample {
    pub focused: bool,
    /// Time since last user input in milliseconds.
    pub idle_ms: u32,
}

/// Intended to serve as a contract windows and linux systems must implement.
#[cfg_attr(test, mockall::automock)]
pub trait FocusMonitor: Send {
    fn sample(&mut self) -> Result<FocusSample>;
}

/// Serves as a cross-compatible FocusMonitor implementation.
pub struct GenericFocusMonitor {
    inner: Box<dyn FocusMonitor>,
}

impl GenericFocusMonitor {
    pub fn new() -> Result<Self> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "win")] {
                use win::WindowsFocusMonitor;
                Ok(Self {
                    inner: Box::new(WindowsFocusMonitor::new()),
                })
            }
            else if #[cfg(feature = "x11")] {
                use x11::X11FocusMonitor;
                Ok(Self {
                    inner: Box::new(X11FocusMonitor::new()?),
                })
            }
            else {
                Ok(Self {
                    inner: Box::new(AssumeActiveMonitor),
                })
            }
        }
    }
}

impl FocusMonitor for GenericFocusMonitor {
    fn sample(&mut self) -> Result<FocusSample> {
        self.inner.sample()
    }
}

/// Fallback when no window-system backend is compiled in. The terminal
/// session is taken as visible and focused for as long as the process runs,
/// so only pause and shutdown end a session.
pub struct AssumeActiveMonitor;

impl FocusMonitor for AssumeActiveMonitor {
    fn sample(&mut self) -> Result<FocusSample> {
        Ok(FocusSample {
            focused: true,
            idle_ms: 0,
        })
    }
}
