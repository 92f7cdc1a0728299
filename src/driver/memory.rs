// src/driver/memory.rs
//! In-memory payments grid behind the [`PageDriver`] capability.
//!
//! Locators mean nothing here until they are bound to a [`Role`]; `with_table`
//! binds the primary locator of every control in a [`SelectorTable`]. The page
//! reacts the way the live grid does: filter values are held by their controls,
//! a submit loads the grid for the selected partition, the next control walks
//! pages and its container turns `disabled` on the last one.
//!
//! Faults (hidden controls, failing click strategies, dead navigation, a busy
//! overlay that never clears) are injected per driver.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use serde_json::{Value, json};

use super::{DriverError, DriverResult, ElementRef, Locator, PageDriver, ScriptArg, WaitCondition};
use crate::config::consts::{BUSINESS_NAME_ATTR, DISABLED_MARKER, LOADING_PLACEHOLDER, PAYLOAD_ATTR};
use crate::config::SelectorTable;
use crate::engine::escalate::ClickStrategy;
use crate::engine::scripts;

/// What a bound locator stands for on the page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Extra,
    Partition,
    Status,
    DateRange,
    Submit,
    Busy,
    GridRows,
    GridEmpty,
    /// Row-relative.
    RowCells,
    /// Row-relative.
    RowAction,
    Pagination,
    ActivePage,
    PageLinks,
    Next,
    /// Relative to the next control.
    NextContainer,
}

impl Role {
    const FILTERS: [Role; 4] = [Role::Extra, Role::Partition, Role::Status, Role::DateRange];

    fn is_filter(self) -> bool { Self::FILTERS.contains(&self) }
}

/* ---------------- Site model ---------------- */

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryRow {
    pub cells: Vec<String>,
    pub payload: Option<String>,
    pub business_name: Option<String>,
}

impl MemoryRow {
    pub fn new(date: &str, id: &str, phone: &str, amount: &str, status: &str) -> Self {
        Self {
            cells: [date, id, phone, amount, status].iter().map(|c| c.to_string()).collect(),
            payload: None,
            business_name: None,
        }
    }

    /// Row still hydrating: every cell shows the loading placeholder.
    pub fn loading() -> Self {
        let p = format!("{LOADING_PLACEHOLDER}...");
        Self::new(&p, &p, &p, &p, &p)
    }

    pub fn with_payload(mut self, raw: impl Into<String>) -> Self {
        self.payload = Some(raw.into());
        self
    }

    pub fn with_business_name(mut self, name: impl Into<String>) -> Self {
        self.business_name = Some(name.into());
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryPage {
    pub rows: Vec<MemoryRow>,
}

impl MemoryPage {
    pub fn new(rows: Vec<MemoryRow>) -> Self { Self { rows } }
    pub fn empty() -> Self { Self::default() }
}

/// Grids keyed by the partition value selected at submit time.
#[derive(Clone, Debug, Default)]
pub struct MemorySite {
    grids: BTreeMap<String, Vec<MemoryPage>>,
    unfiltered: Vec<MemoryPage>,
}

impl MemorySite {
    pub fn new() -> Self { Self::default() }

    pub fn with_grid(mut self, partition: impl Into<String>, pages: Vec<MemoryPage>) -> Self {
        self.grids.insert(partition.into(), pages);
        self
    }

    /// Served when no partition value was selected.
    pub fn with_unfiltered(mut self, pages: Vec<MemoryPage>) -> Self {
        self.unfiltered = pages;
        self
    }

    fn pages(&self, key: Option<&str>) -> &[MemoryPage] {
        match key {
            Some(k) => self.grids.get(k).map(Vec::as_slice).unwrap_or(&[]),
            None => &self.unfiltered,
        }
    }
}

/// Everything the page saw, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Navigate(String),
    Set { role: Role, value: String, scripted: bool },
    Click { role: Role, strategy: ClickStrategy, ok: bool },
    /// The engine dropped its handles after a re-render.
    PageChanged,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Node {
    Control(Role),
    Row(usize),
    Cell(usize, usize),
    Action(usize),
    Link(String),
    Container,
}

#[derive(Clone, Debug)]
struct ActiveGrid {
    key: Option<String>,
    page: usize,
}

/* ---------------- Driver ---------------- */

pub struct MemoryDriver {
    site: MemorySite,
    bindings: HashMap<Locator, Role>,
    hints: HashMap<Role, String>,
    payload_attr: String,
    business_name_attr: String,
    disabled_marker: String,

    loaded: bool,
    values: BTreeMap<Role, String>,
    active: Option<ActiveGrid>,
    nodes: HashMap<u64, Node>,
    next_id: u64,
    closed: bool,
    actions: Vec<Action>,

    hidden: HashSet<(Role, Option<String>)>,
    removed: HashSet<Role>,
    click_faults: HashMap<(Role, ClickStrategy), u32>,
    navigations_left: Option<u32>,
    busy_stuck: bool,
    pager_frozen: bool,
}

impl MemoryDriver {
    pub fn new(site: MemorySite) -> Self {
        Self {
            site,
            bindings: HashMap::new(),
            hints: HashMap::new(),
            payload_attr: s!(PAYLOAD_ATTR),
            business_name_attr: s!(BUSINESS_NAME_ATTR),
            disabled_marker: s!(DISABLED_MARKER),
            loaded: false,
            values: BTreeMap::new(),
            active: None,
            nodes: HashMap::new(),
            next_id: 1,
            closed: false,
            actions: Vec::new(),
            hidden: HashSet::new(),
            removed: HashSet::new(),
            click_faults: HashMap::new(),
            navigations_left: None,
            busy_stuck: false,
            pager_frozen: false,
        }
    }

    /// Bind the primary locator of every control in `table`.
    pub fn with_table(site: MemorySite, table: &SelectorTable) -> Self {
        let mut d = Self::new(site);
        let controls = [
            (Role::Extra, &table.extra),
            (Role::Partition, &table.partition),
            (Role::Status, &table.status),
            (Role::DateRange, &table.date_range),
        ];
        for (role, control) in controls {
            d.bind(control.selectors.locators()[0].clone(), role);
            d.hints.insert(role, control.attr_hint.clone());
        }
        let sets = [
            (Role::Submit, &table.submit),
            (Role::GridRows, &table.grid_rows),
            (Role::GridEmpty, &table.grid_empty),
            (Role::Pagination, &table.pagination),
            (Role::ActivePage, &table.active_page),
            (Role::PageLinks, &table.page_links),
            (Role::Next, &table.next),
        ];
        for (role, set) in sets {
            d.bind(set.locators()[0].clone(), role);
        }
        d.bind(table.busy.clone(), Role::Busy);
        d.bind(table.row_cells.clone(), Role::RowCells);
        d.bind(table.row_action.clone(), Role::RowAction);
        d.bind(table.next_container.clone(), Role::NextContainer);
        d.payload_attr = table.payload_attr.clone();
        d.business_name_attr = table.business_name_attr.clone();
        d.disabled_marker = table.disabled_marker.clone();
        d
    }

    pub fn bind(&mut self, locator: Locator, role: Role) -> &mut Self {
        self.bindings.insert(locator, role);
        self
    }

    pub fn unbind(&mut self, locator: &Locator) -> &mut Self {
        self.bindings.remove(locator);
        self
    }

    /// Drop every locator bound to `role` (the control stays scriptable).
    pub fn unbind_role(&mut self, role: Role) -> &mut Self {
        self.bindings.retain(|_, r| *r != role);
        self
    }

    /* ----- faults ----- */

    /// Control not found by any locator.
    pub fn hide(&mut self, role: Role) -> &mut Self {
        self.hidden.insert((role, None));
        self
    }

    /// Control not found while `partition` is the selected partition value.
    pub fn hide_for(&mut self, role: Role, partition: impl Into<String>) -> &mut Self {
        self.hidden.insert((role, Some(partition.into())));
        self
    }

    /// Control gone from the page entirely, script lookups included.
    pub fn remove(&mut self, role: Role) -> &mut Self {
        self.removed.insert(role);
        self
    }

    /// The next `times` clicks on `role` with `strategy` fail.
    pub fn fail_clicks(&mut self, role: Role, strategy: ClickStrategy, times: u32) -> &mut Self {
        self.click_faults.insert((role, strategy), times);
        self
    }

    /// Navigation works `n` more times, then fails for good.
    pub fn fail_navigation_after(&mut self, n: u32) -> &mut Self {
        self.navigations_left = Some(n);
        self
    }

    /// Busy overlay shows up with the page and never clears.
    pub fn stick_busy(&mut self) -> &mut Self {
        self.busy_stuck = true;
        self
    }

    /// Next clicks land but the grid stays on its current page.
    pub fn freeze_pager(&mut self) -> &mut Self {
        self.pager_frozen = true;
        self
    }

    /* ----- inspection ----- */

    pub fn actions(&self) -> &[Action] { &self.actions }

    /// Click attempts on `role`, oldest first.
    pub fn clicks(&self, role: Role) -> Vec<(ClickStrategy, bool)> {
        self.actions.iter()
            .filter_map(|a| match a {
                Action::Click { role: r, strategy, ok } if *r == role => Some((*strategy, *ok)),
                _ => None,
            })
            .collect()
    }

    /// Value currently held by a filter control.
    pub fn value(&self, role: Role) -> Option<&str> { self.values.get(&role).map(String::as_str) }

    /// 1-based page of the loaded grid.
    pub fn current_page(&self) -> Option<usize> { self.active.as_ref().map(|a| a.page + 1) }

    pub fn is_closed(&self) -> bool { self.closed }

    /* ----- page model ----- */

    fn check_open(&self) -> DriverResult<()> {
        if self.closed { return Err(DriverError::Session(s!("session closed"))); }
        Ok(())
    }

    fn is_hidden(&self, role: Role) -> bool {
        if self.removed.contains(&role) || self.hidden.contains(&(role, None)) { return true; }
        match self.values.get(&Role::Partition) {
            Some(p) => self.hidden.contains(&(role, Some(p.clone()))),
            None => false,
        }
    }

    fn pages(&self) -> &[MemoryPage] {
        match &self.active {
            Some(a) => self.site.pages(a.key.as_deref()),
            None => &[],
        }
    }

    fn rows(&self) -> &[MemoryRow] {
        match &self.active {
            Some(a) => self.pages().get(a.page).map(|p| p.rows.as_slice()).unwrap_or(&[]),
            None => &[],
        }
    }

    fn paginated(&self) -> bool { self.active.is_some() && self.pages().len() > 1 }

    fn on_last_page(&self) -> bool {
        match &self.active {
            Some(a) => a.page + 1 >= self.pages().len(),
            None => true,
        }
    }

    /// Document-level matches for `locator`, without handing out refs.
    fn lookup(&self, locator: &Locator) -> Vec<Node> {
        let Some(&role) = self.bindings.get(locator) else { return Vec::new() };
        if !self.loaded || self.is_hidden(role) { return Vec::new(); }
        match role {
            Role::Extra | Role::Partition | Role::Status | Role::DateRange | Role::Submit => vec![Node::Control(role)],
            Role::Busy if self.busy_stuck => vec![Node::Control(role)],
            Role::GridRows => (0..self.rows().len()).map(Node::Row).collect(),
            Role::GridEmpty if self.active.is_some() && self.rows().is_empty() => vec![Node::Control(role)],
            Role::Pagination | Role::ActivePage | Role::Next if self.paginated() => vec![Node::Control(role)],
            Role::PageLinks if self.paginated() => {
                let mut links = vec![Node::Link(s!("‹"))];
                links.extend((1..=self.pages().len()).map(|n| Node::Link(n.to_string())));
                links.push(Node::Link(s!("›")));
                links
            }
            _ => Vec::new(),
        }
    }

    fn lookup_within(&self, parent: &Node, locator: &Locator) -> Vec<Node> {
        let Some(&role) = self.bindings.get(locator) else { return Vec::new() };
        if self.is_hidden(role) { return Vec::new(); }
        match (parent, role) {
            (Node::Row(i), Role::RowCells) => self.rows()
                .get(*i)
                .map(|r| (0..r.cells.len()).map(|j| Node::Cell(*i, j)).collect())
                .unwrap_or_default(),
            (Node::Row(i), Role::RowAction) => match self.rows().get(*i) {
                Some(r) if r.payload.is_some() || r.business_name.is_some() => vec![Node::Action(*i)],
                _ => Vec::new(),
            },
            (Node::Control(Role::Next), Role::NextContainer) => vec![Node::Container],
            _ => Vec::new(),
        }
    }

    fn issue(&mut self, nodes: Vec<Node>) -> Vec<ElementRef> {
        nodes.into_iter()
            .map(|n| {
                let id = self.next_id;
                self.next_id += 1;
                self.nodes.insert(id, n);
                ElementRef(id)
            })
            .collect()
    }

    fn node(&self, el: ElementRef) -> DriverResult<Node> {
        self.check_open()?;
        self.nodes.get(&el.0).cloned().ok_or(DriverError::Stale(el))
    }

    /// DOM re-rendered; every handed-out ref goes stale.
    fn rerender(&mut self) { self.nodes.clear(); }

    fn click_as(&mut self, el: ElementRef, strategy: ClickStrategy) -> DriverResult<()> {
        let Node::Control(role) = self.node(el)? else { return Ok(()) };

        if let Some(left) = self.click_faults.get_mut(&(role, strategy)) {
            if *left > 0 {
                *left -= 1;
                self.actions.push(Action::Click { role, strategy, ok: false });
                return Err(match strategy {
                    ClickStrategy::Native => DriverError::ClickIntercepted(format!("{role:?} covered by overlay")),
                    _ => DriverError::Script(format!("{strategy} click on {role:?} had no effect")),
                });
            }
        }
        self.actions.push(Action::Click { role, strategy, ok: true });

        match role {
            Role::Submit => {
                let key = self.values.get(&Role::Partition).cloned();
                self.active = Some(ActiveGrid { key, page: 0 });
                self.rerender();
            }
            Role::Next if !self.on_last_page() => {
                if !self.pager_frozen {
                    if let Some(a) = self.active.as_mut() { a.page += 1; }
                }
                self.rerender();
            }
            _ => {}
        }
        Ok(())
    }

    fn set_by_attribute(&mut self, args: &[ScriptArg]) -> DriverResult<Value> {
        let text = |i: usize| match args.get(i) {
            Some(ScriptArg::Value(Value::String(s))) => Ok(s.clone()),
            _ => Err(DriverError::Script(format!("argument {i} must be a string"))),
        };
        let hint = text(0)?.to_lowercase();
        let value = text(1)?;
        if !self.loaded { return Ok(json!(0)); }

        let targets: Vec<Role> = Role::FILTERS.into_iter()
            .filter(|r| !self.removed.contains(r))
            .filter(|r| self.hints.get(r).is_some_and(|h| h.to_lowercase().contains(&hint)))
            .collect();
        for &role in &targets {
            self.values.insert(role, value.clone());
            self.actions.push(Action::Set { role, value: value.clone(), scripted: true });
        }
        Ok(json!(targets.len()))
    }
}

impl PageDriver for MemoryDriver {
    fn navigate(&mut self, url: &str) -> DriverResult<()> {
        self.check_open()?;
        if let Some(left) = self.navigations_left.as_mut() {
            if *left == 0 {
                return Err(DriverError::Navigation(format!("net::ERR_CONNECTION_RESET at {url}")));
            }
            *left -= 1;
        }
        self.actions.push(Action::Navigate(url.to_string()));
        self.loaded = true;
        self.values.clear();
        self.active = None;
        self.rerender();
        Ok(())
    }

    fn find_one(&mut self, locator: &Locator) -> DriverResult<Option<ElementRef>> {
        self.check_open()?;
        let first = self.lookup(locator).into_iter().take(1).collect();
        Ok(self.issue(first).pop())
    }

    fn find_all(&mut self, locator: &Locator) -> DriverResult<Vec<ElementRef>> {
        self.check_open()?;
        let nodes = self.lookup(locator);
        Ok(self.issue(nodes))
    }

    fn find_within(&mut self, parent: ElementRef, locator: &Locator) -> DriverResult<Vec<ElementRef>> {
        let parent = self.node(parent)?;
        let nodes = self.lookup_within(&parent, locator);
        Ok(self.issue(nodes))
    }

    fn read_text(&mut self, el: ElementRef) -> DriverResult<String> {
        let text = match self.node(el)? {
            Node::Control(Role::ActivePage) => self.current_page().unwrap_or(1).to_string(),
            Node::Control(Role::Next) => s!("›"),
            Node::Control(Role::Submit) => s!("Search"),
            Node::Control(Role::GridEmpty) => s!("No data available"),
            Node::Control(r) if r.is_filter() => self.values.get(&r).cloned().unwrap_or_default(),
            Node::Row(i) => self.rows().get(i).map(|r| r.cells.join(" ")).unwrap_or_default(),
            Node::Cell(i, j) => self.rows().get(i).and_then(|r| r.cells.get(j)).cloned().unwrap_or_default(),
            Node::Link(label) => label,
            _ => s!(),
        };
        Ok(text)
    }

    fn read_attribute(&mut self, el: ElementRef, name: &str) -> DriverResult<Option<String>> {
        let attr = match self.node(el)? {
            Node::Action(i) => {
                let row = self.rows().get(i);
                if name == self.payload_attr {
                    row.and_then(|r| r.payload.clone())
                } else if name == self.business_name_attr {
                    row.and_then(|r| r.business_name.clone())
                } else if name == "class" {
                    Some(s!("payment-action"))
                } else {
                    None
                }
            }
            Node::Container if name == "class" => {
                if self.on_last_page() {
                    Some(format!("page-item {}", self.disabled_marker))
                } else {
                    Some(s!("page-item"))
                }
            }
            Node::Control(Role::Next) if name == "class" => Some(s!("page-link")),
            _ => None,
        };
        Ok(attr)
    }

    fn click(&mut self, el: ElementRef) -> DriverResult<()> {
        self.click_as(el, ClickStrategy::Native)
    }

    fn set_value(&mut self, el: ElementRef, value: &str) -> DriverResult<()> {
        match self.node(el)? {
            Node::Control(role) if role.is_filter() => {
                self.values.insert(role, value.to_string());
                self.actions.push(Action::Set { role, value: value.to_string(), scripted: false });
                Ok(())
            }
            other => Err(DriverError::Command(format!("{other:?} does not take a value"))),
        }
    }

    fn scroll_into_view(&mut self, el: ElementRef) -> DriverResult<()> {
        self.node(el).map(|_| ())
    }

    fn run_script(&mut self, script: &str, args: &[ScriptArg]) -> DriverResult<Value> {
        self.check_open()?;
        let strategy = if script == scripts::SCRIPTED_CLICK {
            ClickStrategy::Scripted
        } else if script == scripts::POINTER_CLICK {
            ClickStrategy::Pointer
        } else if script == scripts::SET_BY_ATTRIBUTE {
            return self.set_by_attribute(args);
        } else {
            return Err(DriverError::Script(s!("unsupported script")));
        };

        match args.first() {
            Some(ScriptArg::Element(el)) => {
                self.click_as(*el, strategy)?;
                Ok(Value::Bool(true))
            }
            _ => Err(DriverError::Script(s!("click script needs an element argument"))),
        }
    }

    fn wait_until(&mut self, condition: &WaitCondition, _timeout: Duration) -> DriverResult<bool> {
        self.check_open()?;
        let holds = match condition {
            WaitCondition::Present(l) => !self.lookup(l).is_empty(),
            WaitCondition::Absent(l) => self.lookup(l).is_empty(),
            WaitCondition::AnyPresent(ls) => ls.iter().any(|l| !self.lookup(l).is_empty()),
        };
        Ok(holds)
    }

    fn page_changed(&mut self) {
        self.actions.push(Action::PageChanged);
        self.rerender();
    }

    fn close(&mut self) -> DriverResult<()> {
        self.closed = true;
        self.loaded = false;
        self.nodes.clear();
        Ok(())
    }
}
