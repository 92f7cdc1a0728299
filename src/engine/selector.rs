// src/engine/selector.rs
use crate::driver::{DriverResult, ElementRef, Locator, PageDriver};
use crate::error::{Result, ScrapeError};

/// Ordered fallback locators for one logical control.
/// Non-empty by construction: `from_parts` takes the first locator separately.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorSet {
    name: String,
    locators: Vec<Locator>,
}

/// A locator from the set that found something on the live page.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolved<'a> {
    pub element: ElementRef,
    pub locator: &'a Locator,
    pub position: usize,
}

impl SelectorSet {
    pub fn from_parts(name: impl Into<String>, first: Locator, rest: Vec<Locator>) -> Self {
        let mut locators = Vec::with_capacity(1 + rest.len());
        locators.push(first);
        locators.extend(rest);
        Self { name: name.into(), locators }
    }

    /// `None` for an empty list.
    pub fn new(name: impl Into<String>, locators: Vec<Locator>) -> Option<Self> {
        if locators.is_empty() { return None; }
        Some(Self { name: name.into(), locators })
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn locators(&self) -> &[Locator] { &self.locators }
    pub fn len(&self) -> usize { self.locators.len() }
    pub fn is_empty(&self) -> bool { self.locators.is_empty() }

    /// Try each locator in order; first hit wins.
    /// `Ok(None)` means every locator came back empty.
    pub fn try_resolve(&self, driver: &mut dyn PageDriver) -> DriverResult<Option<Resolved<'_>>> {
        for (position, locator) in self.locators.iter().enumerate() {
            if let Some(element) = driver.find_one(locator)? {
                if position > 0 {
                    tracing::debug!(control = %self.name, %locator, position, "resolved via fallback locator");
                }
                return Ok(Some(Resolved { element, locator, position }));
            }
        }
        Ok(None)
    }

    /// Like `try_resolve`, but exhaustion is an error.
    pub fn resolve(&self, driver: &mut dyn PageDriver) -> Result<Resolved<'_>> {
        self.try_resolve(driver)?
            .ok_or_else(|| ScrapeError::LocatorExhausted { control: self.name.clone(), tried: self.len() })
    }

    /// All matches for the first locator that matches anything.
    pub fn find_all(&self, driver: &mut dyn PageDriver) -> DriverResult<Vec<ElementRef>> {
        for locator in &self.locators {
            let found = driver.find_all(locator)?;
            if !found.is_empty() { return Ok(found); }
        }
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::memory::{MemoryDriver, MemorySite, Role};

    #[test]
    fn macro_keeps_order_and_is_never_empty() {
        let set = selectors!("status", css "select#status", xpath "//select[@name='status']");
        assert_eq!(set.len(), 2);
        assert_eq!(set.locators()[0], Locator::css("select#status"));
        assert_eq!(set.locators()[1], Locator::xpath("//select[@name='status']"));
        assert!(SelectorSet::new("none", vec![]).is_none());
    }

    #[test]
    fn resolves_first_live_locator() {
        let site = MemorySite::default();
        let mut driver = MemoryDriver::new(site);
        let set = selectors!("submit", css "button.gone", css "button.here");
        driver.bind(Locator::css("button.here"), Role::Submit);
        driver.navigate("about:blank").unwrap();

        let hit = set.resolve(&mut driver).unwrap();
        assert_eq!(hit.position, 1);
        assert_eq!(hit.locator, &Locator::css("button.here"));
    }

    #[test]
    fn exhausted_set_names_the_control() {
        let mut driver = MemoryDriver::new(MemorySite::default());
        driver.navigate("about:blank").unwrap();
        let set = selectors!("next page", css ".nope");
        match set.resolve(&mut driver) {
            Err(ScrapeError::LocatorExhausted { control, tried }) => {
                assert_eq!(control, "next page");
                assert_eq!(tried, 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
