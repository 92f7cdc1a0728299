// src/driver/mod.rs
//! # Page driver capability
//!
//! Everything the engine knows about a live page goes through [`PageDriver`].
//! One driver is one stateful browser session: it is never shared between two
//! call paths, and every method blocks until the browser answered (or a
//! bounded timeout ran out).
//!
//! Implementations:
//! - [`memory::MemoryDriver`] – in-memory grid page with fault injection
//!   (offline runs, tests, benches).
//! - `webdriver::WebDriverSession` – fantoccini-backed browser session
//!   (feature `webdriver`).

use std::fmt;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

pub mod memory;
#[cfg(feature = "webdriver")]
pub mod webdriver;

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// How to find one element.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(sel: impl Into<String>) -> Self { Locator::Css(sel.into()) }
    pub fn xpath(expr: impl Into<String>) -> Self { Locator::XPath(expr.into()) }

    /// The parent of whatever element it is resolved against.
    pub fn parent() -> Self { Locator::XPath(s!("..")) }

    pub fn as_str(&self) -> &str {
        match self { Locator::Css(s) | Locator::XPath(s) => s }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css:{s}"),
            Locator::XPath(s) => write!(f, "xpath:{s}"),
        }
    }
}

/// Opaque handle to an element the driver handed out.
/// Only meaningful to the driver that produced it, and only until the next
/// navigation or [`PageDriver::page_changed`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ElementRef(pub u64);

/// Argument passed into a page script (`arguments[i]` on the JS side).
#[derive(Clone, Debug, PartialEq)]
pub enum ScriptArg {
    Element(ElementRef),
    Value(Value),
}

impl From<ElementRef> for ScriptArg {
    fn from(el: ElementRef) -> Self { ScriptArg::Element(el) }
}

impl From<&str> for ScriptArg {
    fn from(s: &str) -> Self { ScriptArg::Value(Value::String(s.to_string())) }
}

/// Condition polled by [`PageDriver::wait_until`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WaitCondition {
    Present(Locator),
    Absent(Locator),
    AnyPresent(Vec<Locator>),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("element click intercepted: {0}")]
    ClickIntercepted(String),

    #[error("stale element reference: {0:?}")]
    Stale(ElementRef),

    #[error("script failed: {0}")]
    Script(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    /// The browser session itself is gone (crashed, closed, disconnected).
    #[error("browser session lost: {0}")]
    Session(String),

    #[error("driver command failed: {0}")]
    Command(String),
}

impl DriverError {
    /// Errors after which no further command on this session can succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DriverError::Session(_) | DriverError::Navigation(_))
    }
}

/// Blocking page capability consumed by the engine.
pub trait PageDriver {
    fn navigate(&mut self, url: &str) -> DriverResult<()>;

    /// First match in the document, or `None`.
    fn find_one(&mut self, locator: &Locator) -> DriverResult<Option<ElementRef>>;

    /// All matches in the document, in document order.
    fn find_all(&mut self, locator: &Locator) -> DriverResult<Vec<ElementRef>>;

    /// All matches below (or relative to, for XPath) `parent`.
    fn find_within(&mut self, parent: ElementRef, locator: &Locator) -> DriverResult<Vec<ElementRef>>;

    fn read_text(&mut self, el: ElementRef) -> DriverResult<String>;
    fn read_attribute(&mut self, el: ElementRef, name: &str) -> DriverResult<Option<String>>;

    fn click(&mut self, el: ElementRef) -> DriverResult<()>;

    /// Select-by-value for `<select>`, clear-and-type for everything else.
    fn set_value(&mut self, el: ElementRef, value: &str) -> DriverResult<()>;

    fn scroll_into_view(&mut self, el: ElementRef) -> DriverResult<()>;

    fn run_script(&mut self, script: &str, args: &[ScriptArg]) -> DriverResult<Value>;

    /// Poll `condition` until it holds (`true`) or `timeout` elapses (`false`).
    fn wait_until(&mut self, condition: &WaitCondition, timeout: Duration) -> DriverResult<bool>;

    /// The page just re-rendered (next page, filter submit). Handles obtained
    /// before this call are not used again.
    fn page_changed(&mut self) {}

    /// Release the session. Must be safe to call more than once.
    fn close(&mut self) -> DriverResult<()> { Ok(()) }
}

/// Keeps a driver for the length of one run and closes it on every exit path,
/// unwinding included.
pub struct SessionGuard<D: PageDriver> {
    driver: Option<D>,
}

impl<D: PageDriver> SessionGuard<D> {
    pub fn new(driver: D) -> Self { Self { driver: Some(driver) } }

    pub fn driver(&mut self) -> Option<&mut D> { self.driver.as_mut() }

    /// Close now and surface the close error instead of logging it.
    pub fn release(mut self) -> DriverResult<()> {
        match self.driver.take() {
            Some(mut d) => d.close(),
            None => Ok(()),
        }
    }
}

impl<D: PageDriver> Drop for SessionGuard<D> {
    fn drop(&mut self) {
        if let Some(mut d) = self.driver.take() {
            if let Err(e) = d.close() {
                tracing::warn!(error = %e, "closing driver session failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Closing<'a> { closed: &'a std::cell::Cell<u32> }

    impl PageDriver for Closing<'_> {
        fn navigate(&mut self, _: &str) -> DriverResult<()> { Ok(()) }
        fn find_one(&mut self, _: &Locator) -> DriverResult<Option<ElementRef>> { Ok(None) }
        fn find_all(&mut self, _: &Locator) -> DriverResult<Vec<ElementRef>> { Ok(vec![]) }
        fn find_within(&mut self, _: ElementRef, _: &Locator) -> DriverResult<Vec<ElementRef>> { Ok(vec![]) }
        fn read_text(&mut self, _: ElementRef) -> DriverResult<String> { Ok(s!()) }
        fn read_attribute(&mut self, _: ElementRef, _: &str) -> DriverResult<Option<String>> { Ok(None) }
        fn click(&mut self, _: ElementRef) -> DriverResult<()> { Ok(()) }
        fn set_value(&mut self, _: ElementRef, _: &str) -> DriverResult<()> { Ok(()) }
        fn scroll_into_view(&mut self, _: ElementRef) -> DriverResult<()> { Ok(()) }
        fn run_script(&mut self, _: &str, _: &[ScriptArg]) -> DriverResult<Value> { Ok(Value::Null) }
        fn wait_until(&mut self, _: &WaitCondition, _: Duration) -> DriverResult<bool> { Ok(true) }
        fn close(&mut self) -> DriverResult<()> {
            self.closed.set(self.closed.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn guard_closes_on_drop_and_on_release_once() {
        let closed = std::cell::Cell::new(0);
        {
            let _g = SessionGuard::new(Closing { closed: &closed });
        }
        assert_eq!(closed.get(), 1);

        let g = SessionGuard::new(Closing { closed: &closed });
        g.release().unwrap();
        assert_eq!(closed.get(), 2);
    }

    #[test]
    fn guard_closes_when_run_panics() {
        let closed = std::cell::Cell::new(0);
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut g = SessionGuard::new(Closing { closed: &closed });
            let _ = g.driver();
            panic!("partition blew up");
        }));
        assert!(res.is_err());
        assert_eq!(closed.get(), 1);
    }

    #[test]
    fn fatal_errors() {
        assert!(DriverError::Session(s!("gone")).is_fatal());
        assert!(DriverError::Navigation(s!("dns")).is_fatal());
        assert!(!DriverError::ClickIntercepted(s!("overlay")).is_fatal());
    }
}
