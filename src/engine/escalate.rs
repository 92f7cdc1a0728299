// src/engine/escalate.rs
use std::fmt;

use crate::driver::{DriverError, DriverResult, ElementRef, PageDriver, ScriptArg};
use crate::engine::scripts;
use crate::error::{Result, ScrapeError};

/// Run `attempt` with each strategy in order and stop at the first `Ok`.
///
/// `Err` carries every failure in attempt order. An error for which `stop`
/// returns true ends the escalation early (it is still the last entry).
pub fn escalate<S, E>(
    strategies: &[S],
    mut attempt: impl FnMut(S) -> std::result::Result<(), E>,
    stop: impl Fn(&E) -> bool,
) -> std::result::Result<S, Vec<(S, E)>>
where
    S: Copy,
{
    let mut failures = Vec::with_capacity(strategies.len());
    for &strategy in strategies {
        match attempt(strategy) {
            Ok(()) => return Ok(strategy),
            Err(e) => {
                let done = stop(&e);
                failures.push((strategy, e));
                if done { break; }
            }
        }
    }
    Err(failures)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClickStrategy {
    /// Driver-level click (real hit test; overlays intercept it).
    Native,
    /// `element.click()` from a page script.
    Scripted,
    /// Synthetic pointer/mouse event sequence at the element's centre.
    Pointer,
}

impl ClickStrategy {
    pub const ALL: [ClickStrategy; 3] = [ClickStrategy::Native, ClickStrategy::Scripted, ClickStrategy::Pointer];

    pub fn perform(self, driver: &mut dyn PageDriver, el: ElementRef) -> DriverResult<()> {
        match self {
            ClickStrategy::Native => driver.click(el),
            ClickStrategy::Scripted => driver.run_script(scripts::SCRIPTED_CLICK, &[ScriptArg::Element(el)]).map(|_| ()),
            ClickStrategy::Pointer => driver.run_script(scripts::POINTER_CLICK, &[ScriptArg::Element(el)]).map(|_| ()),
        }
    }
}

impl fmt::Display for ClickStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClickStrategy::Native => "native",
            ClickStrategy::Scripted => "scripted",
            ClickStrategy::Pointer => "pointer",
        };
        f.write_str(s)
    }
}

/// Scroll `el` into view, then click it with `strategies` in order.
///
/// Returns the strategy that landed. Exhaustion is `ScrapeError::ClickIntercepted`;
/// a session-fatal driver error stops the escalation and is returned as is.
pub fn click_escalating(
    driver: &mut dyn PageDriver,
    el: ElementRef,
    control: &str,
    strategies: &[ClickStrategy],
) -> Result<ClickStrategy> {
    if let Err(e) = driver.scroll_into_view(el) {
        if e.is_fatal() { return Err(e.into()); }
        tracing::debug!(control, error = %e, "scroll into view failed");
    }

    let outcome = escalate(
        strategies,
        |strategy| {
            let res = strategy.perform(&mut *driver, el);
            if let Err(e) = &res {
                tracing::debug!(control, %strategy, error = %e, "click attempt failed");
            }
            res
        },
        DriverError::is_fatal,
    );

    match outcome {
        Ok(strategy) => {
            if strategy != strategies[0] {
                tracing::info!(control, %strategy, "click landed after escalation");
            }
            Ok(strategy)
        }
        Err(mut failures) => {
            let attempts = failures.len();
            match failures.pop() {
                Some((_, e)) if e.is_fatal() => Err(e.into()),
                Some((_, e)) => Err(ScrapeError::ClickIntercepted {
                    control: control.to_string(),
                    attempts,
                    last: e.to_string(),
                }),
                None => Err(ScrapeError::ClickIntercepted {
                    control: control.to_string(),
                    attempts: 0,
                    last: s!("no click strategy configured"),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_at_first_success() {
        let mut tried = Vec::new();
        let res = escalate(&[1, 2, 3], |n| { tried.push(n); if n == 2 { Ok(()) } else { Err(n) } }, |_| false);
        assert_eq!(res, Ok(2));
        assert_eq!(tried, vec![1, 2]);
    }

    #[test]
    fn exhaustion_keeps_every_failure_in_order() {
        let res: std::result::Result<u8, _> = escalate(&[1u8, 2, 3], |n| Err(format!("e{n}")), |_| false);
        let fails = res.unwrap_err();
        assert_eq!(fails.iter().map(|(s, _)| *s).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(fails[2].1, "e3");
    }

    #[test]
    fn stop_predicate_cuts_escalation_short() {
        let res: std::result::Result<u8, _> = escalate(&[1u8, 2, 3], |n| Err(n), |e| *e == 1);
        assert_eq!(res.unwrap_err().len(), 1);
    }
}
