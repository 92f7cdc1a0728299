// src/macros.rs
#[macro_export]
macro_rules! s {
    // String shorthand!

    // Zero-arg → String::new()
    () => {
        ::std::string::String::new()
    };
    // Literal, const or binding
    ($expr:expr) => {
        ::std::string::String::from($expr)
    };
}

/// Fallback list shorthand. The grammar wants at least one locator, so the
/// resulting set can never be empty.
///
/// ```
/// use paygrid_scrape::selectors;
/// let set = selectors!("submit", css "button[type='submit']", xpath "//button[contains(., 'Valider')]");
/// assert_eq!(set.len(), 2);
/// ```
#[macro_export]
macro_rules! selectors {
    ($name:expr, $kind:ident $first:expr $(, $rest_kind:ident $rest:expr)* $(,)?) => {
        $crate::engine::selector::SelectorSet::from_parts(
            $name,
            $crate::driver::Locator::$kind($first),
            ::std::vec![$($crate::driver::Locator::$rest_kind($rest)),*],
        )
    };
}
