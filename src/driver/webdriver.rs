// src/driver/webdriver.rs
//! Browser-backed [`PageDriver`] over a WebDriver endpoint (chromedriver).
//!
//! fantoccini is async; the engine is not. A current-thread tokio runtime owned
//! by the session drives each command to completion before returning.

use std::collections::HashMap;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder};
use serde_json::{Value, json};
use tokio::runtime::Runtime;

use super::{DriverError, DriverResult, ElementRef, Locator, PageDriver, ScriptArg, WaitCondition};
use crate::config::consts::{WEBDRIVER_URL, WINDOW_SIZE};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Launch options. These shape the browser, never the extraction.
#[derive(Clone, Debug)]
pub struct LaunchOptions {
    pub webdriver_url: String,
    pub headless: bool,
    /// Skip image loading ("fast" mode).
    pub disable_images: bool,
    /// Chrome profile holding an already-authenticated session.
    pub profile_dir: Option<PathBuf>,
    pub window_size: (u32, u32),
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            webdriver_url: s!(WEBDRIVER_URL),
            headless: false,
            disable_images: false,
            profile_dir: None,
            window_size: WINDOW_SIZE,
        }
    }
}

impl LaunchOptions {
    fn capabilities(&self) -> serde_json::Map<String, Value> {
        let mut args = vec![s!("--no-sandbox"), s!("--disable-dev-shm-usage")];
        if self.headless {
            args.push(s!("--headless=new"));
            args.push(s!("--disable-gpu"));
        }
        args.push(format!("--window-size={},{}", self.window_size.0, self.window_size.1));
        if let Some(dir) = &self.profile_dir {
            args.push(format!("--user-data-dir={}", dir.display()));
        }

        let mut chrome = serde_json::Map::new();
        chrome.insert(s!("args"), json!(args));
        if self.disable_images {
            chrome.insert(s!("prefs"), json!({ "profile.managed_default_content_settings.images": 2 }));
        }

        let mut caps = serde_json::Map::new();
        caps.insert(s!("goog:chromeOptions"), Value::Object(chrome));
        caps
    }
}

pub struct WebDriverSession {
    runtime: Runtime,
    client: Option<Client>,
    elements: HashMap<u64, Element>,
    next_id: u64,
}

impl WebDriverSession {
    pub fn connect(opts: &LaunchOptions) -> DriverResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DriverError::Session(format!("runtime: {e}")))?;

        tracing::debug!(url = %opts.webdriver_url, headless = opts.headless, "connecting to WebDriver");
        let client = runtime
            .block_on(ClientBuilder::native().capabilities(opts.capabilities()).connect(&opts.webdriver_url))
            .map_err(|e| DriverError::Session(format!("connect to {}: {e}", opts.webdriver_url)))?;

        Ok(Self { runtime, client: Some(client), elements: HashMap::new(), next_id: 1 })
    }

    fn client(&self) -> DriverResult<&Client> {
        self.client.as_ref().ok_or_else(|| DriverError::Session(s!("session closed")))
    }

    fn element(&self, el: ElementRef) -> DriverResult<&Element> {
        self.elements.get(&el.0).ok_or(DriverError::Stale(el))
    }

    fn keep(&mut self, found: Vec<Element>) -> Vec<ElementRef> {
        found.into_iter()
            .map(|e| {
                let id = self.next_id;
                self.next_id += 1;
                self.elements.insert(id, e);
                ElementRef(id)
            })
            .collect()
    }

    fn script_arg(&self, arg: &ScriptArg) -> DriverResult<Value> {
        match arg {
            ScriptArg::Value(v) => Ok(v.clone()),
            ScriptArg::Element(el) => serde_json::to_value(self.element(*el)?)
                .map_err(|e| DriverError::Script(e.to_string())),
        }
    }

    /// Existence check for `wait_until`; nothing is added to the handle arena.
    fn present(&mut self, locator: &Locator) -> DriverResult<bool> {
        let client = self.client()?.clone();
        let found = self.runtime
            .block_on(client.find_all(fantoccini_locator(locator)))
            .map_err(|e| classify(e, None))?;
        Ok(!found.is_empty())
    }
}

fn fantoccini_locator(l: &Locator) -> fantoccini::Locator<'_> {
    match l {
        Locator::Css(s) => fantoccini::Locator::Css(s),
        Locator::XPath(s) => fantoccini::Locator::XPath(s),
    }
}

/// Map a WebDriver failure onto the engine's taxonomy.
fn classify(e: CmdError, el: Option<ElementRef>) -> DriverError {
    let text = e.to_string();
    let lower = text.to_ascii_lowercase();
    if lower.contains("click intercepted") || lower.contains("not clickable") {
        DriverError::ClickIntercepted(text)
    } else if lower.contains("stale element") {
        match el {
            Some(r) => DriverError::Stale(r),
            None => DriverError::Command(text),
        }
    } else if lower.contains("invalid session id")
        || lower.contains("no such window")
        || lower.contains("session deleted")
        || lower.contains("disconnected")
    {
        DriverError::Session(text)
    } else if lower.contains("javascript error") {
        DriverError::Script(text)
    } else {
        DriverError::Command(text)
    }
}

impl PageDriver for WebDriverSession {
    fn navigate(&mut self, url: &str) -> DriverResult<()> {
        let client = self.client()?.clone();
        self.elements.clear();
        self.runtime
            .block_on(client.goto(url))
            .map_err(|e| match classify(e, None) {
                DriverError::Session(s) => DriverError::Session(s),
                other => DriverError::Navigation(format!("{url}: {other}")),
            })
    }

    fn find_one(&mut self, locator: &Locator) -> DriverResult<Option<ElementRef>> {
        let client = self.client()?.clone();
        match self.runtime.block_on(client.find(fantoccini_locator(locator))) {
            Ok(e) => Ok(self.keep(vec![e]).pop()),
            Err(e) if e.is_no_such_element() => Ok(None),
            Err(e) => Err(classify(e, None)),
        }
    }

    fn find_all(&mut self, locator: &Locator) -> DriverResult<Vec<ElementRef>> {
        let client = self.client()?.clone();
        let found = self.runtime
            .block_on(client.find_all(fantoccini_locator(locator)))
            .map_err(|e| classify(e, None))?;
        Ok(self.keep(found))
    }

    fn find_within(&mut self, parent: ElementRef, locator: &Locator) -> DriverResult<Vec<ElementRef>> {
        let el = self.element(parent)?.clone();
        let found = match self.runtime.block_on(el.find_all(fantoccini_locator(locator))) {
            Ok(v) => v,
            Err(e) if e.is_no_such_element() => Vec::new(),
            Err(e) => return Err(classify(e, Some(parent))),
        };
        Ok(self.keep(found))
    }

    fn read_text(&mut self, el: ElementRef) -> DriverResult<String> {
        let e = self.element(el)?.clone();
        self.runtime.block_on(e.text()).map_err(|err| classify(err, Some(el)))
    }

    fn read_attribute(&mut self, el: ElementRef, name: &str) -> DriverResult<Option<String>> {
        let e = self.element(el)?.clone();
        self.runtime.block_on(e.attr(name)).map_err(|err| classify(err, Some(el)))
    }

    fn click(&mut self, el: ElementRef) -> DriverResult<()> {
        let e = self.element(el)?.clone();
        self.runtime.block_on(e.click()).map_err(|err| classify(err, Some(el)))
    }

    fn set_value(&mut self, el: ElementRef, value: &str) -> DriverResult<()> {
        let e = self.element(el)?.clone();
        let res = self.runtime.block_on(async {
            let tag = e.prop("tagName").await?.unwrap_or_default();
            if tag.eq_ignore_ascii_case("select") {
                e.select_by_value(value).await
            } else {
                e.clear().await?;
                e.send_keys(value).await
            }
        });
        res.map_err(|err| classify(err, Some(el)))
    }

    fn scroll_into_view(&mut self, el: ElementRef) -> DriverResult<()> {
        let arg = self.script_arg(&ScriptArg::Element(el))?;
        let client = self.client()?.clone();
        self.runtime
            .block_on(client.execute("arguments[0].scrollIntoView({block: 'center'});", vec![arg]))
            .map(|_| ())
            .map_err(|e| classify(e, Some(el)))
    }

    fn run_script(&mut self, script: &str, args: &[ScriptArg]) -> DriverResult<Value> {
        let args = args.iter().map(|a| self.script_arg(a)).collect::<DriverResult<Vec<_>>>()?;
        let client = self.client()?.clone();
        self.runtime.block_on(client.execute(script, args)).map_err(|e| match classify(e, None) {
            DriverError::Command(s) => DriverError::Script(s),
            other => other,
        })
    }

    fn wait_until(&mut self, condition: &WaitCondition, timeout: Duration) -> DriverResult<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            let holds = match condition {
                WaitCondition::Present(l) => self.present(l)?,
                WaitCondition::Absent(l) => !self.present(l)?,
                WaitCondition::AnyPresent(ls) => {
                    let mut any = false;
                    for l in ls {
                        if self.present(l)? { any = true; break; }
                    }
                    any
                }
            };
            if holds { return Ok(true); }
            if Instant::now() >= deadline { return Ok(false); }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn page_changed(&mut self) {
        self.elements.clear();
    }

    fn close(&mut self) -> DriverResult<()> {
        self.elements.clear();
        match self.client.take() {
            Some(client) => self.runtime
                .block_on(client.close())
                .map_err(|e| DriverError::Session(e.to_string())),
            None => Ok(()),
        }
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        if self.client.is_some() {
            if let Err(e) = self.close() {
                tracing::debug!(error = %e, "closing WebDriver session on drop");
            }
        }
    }
}
