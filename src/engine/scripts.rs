// src/engine/scripts.rs
//! Page scripts run through `PageDriver::run_script`.
//! Drivers may recognise them by identity (the in-memory driver does).

/// `arguments[0]`: element. Element-level `click()`, bypasses hit testing.
pub const SCRIPTED_CLICK: &str = "arguments[0].click(); return true;";

/// `arguments[0]`: element. Full pointer sequence aimed at the element's centre.
pub const POINTER_CLICK: &str = r#"
const el = arguments[0];
el.scrollIntoView({block: 'center'});
const r = el.getBoundingClientRect();
const opts = {bubbles: true, cancelable: true, view: window,
              clientX: r.left + r.width / 2, clientY: r.top + r.height / 2};
for (const type of ['pointerover', 'mouseover', 'pointermove', 'mousemove',
                    'pointerdown', 'mousedown', 'pointerup', 'mouseup', 'click']) {
  const Ctor = type.startsWith('pointer') && window.PointerEvent ? PointerEvent : MouseEvent;
  el.dispatchEvent(new Ctor(type, opts));
}
return true;
"#;

/// `arguments`: `[hint, value, parts]`.
///
/// Finds `select`/`input` controls whose `id`, `name` or `wire:model*` attribute
/// contains `hint`, sets `value` and fires `input` + `change`. With two `parts`
/// and a pair of plain inputs (split start/end date layout), each input gets its part.
/// Returns the number of controls changed.
pub const SET_BY_ATTRIBUTE: &str = r#"
const [hint, value, parts] = arguments;
const needle = String(hint).toLowerCase();
const attrs = ['id', 'name', 'wire:model', 'wire:model.defer', 'wire:model.lazy', 'wire:model.live'];
const hits = Array.from(document.querySelectorAll('select, input')).filter(el =>
  attrs.some(a => (el.getAttribute(a) || '').toLowerCase().includes(needle)));
const fire = el => ['input', 'change'].forEach(t => el.dispatchEvent(new Event(t, {bubbles: true})));
if (Array.isArray(parts) && parts.length === 2 && hits.length >= 2
    && hits.every(el => el.tagName === 'INPUT')) {
  hits[0].value = parts[0]; fire(hits[0]);
  hits[1].value = parts[1]; fire(hits[1]);
  return 2;
}
let changed = 0;
for (const el of hits) {
  if (el.tagName === 'SELECT' && !Array.from(el.options).some(o => o.value === value)) continue;
  el.value = value;
  fire(el);
  changed += 1;
}
return changed;
"#;
