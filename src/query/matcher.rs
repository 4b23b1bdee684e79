use crate::perception::registry::ElementRegistry;
use crate::perception::types::Element;
use crate::query::types::{Attribute, Query};

/// Whether a single element satisfies every constraint of `query`.
pub fn element_matches(element: &Element, query: &Query) -> bool {
    let label_ok = query
        .get(Attribute::Label)
        .map_or(true, |qv| qv.matches(Some(&element.label)));
    let text_ok = query
        .get(Attribute::Text)
        .map_or(true, |qv| qv.matches(element.text.as_deref()));
    label_ok && text_ok
}

/// Lazily yields the elements of `registry` matching `query`, in registry order.
///
/// The iterator is `Clone`, so the same selection can be walked repeatedly.
pub fn match_elements<'a>(
    registry: &'a ElementRegistry,
    query: &'a Query,
) -> impl Iterator<Item = &'a Element> + Clone + 'a {
    registry.iter().filter(move |el| element_matches(el, query))
}

/// First match in registry order. Ambiguous queries resolve to the earliest element.
pub fn first_match<'a>(registry: &'a ElementRegistry, query: &'a Query) -> Option<&'a Element> {
    let mut matches = match_elements(registry, query);
    let first = matches.next();
    if first.is_some() {
        let extra = matches.count();
        if extra > 0 {
            tracing::debug!(query = %query, candidates = extra + 1, "ambiguous query, using first match");
        }
    }
    first
}
