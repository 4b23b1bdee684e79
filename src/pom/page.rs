use crate::errors::CvPomResult;
use crate::perception::registry::ElementRegistry;
use crate::perception::types::Element;
use crate::pom::element::DriverElement;
use crate::query::matcher::{first_match, match_elements};
use crate::query::types::Query;

/// Snapshot of one screen: the registry built from a single capture.
///
/// Pages never refresh; call `CvPomDriver::get_page` again for a new capture.
#[derive(Debug, Clone)]
pub struct Page {
    registry: ElementRegistry,
    screen_size: (u32, u32),
}

impl Page {
    pub fn new(registry: ElementRegistry, screen_size: (u32, u32)) -> Self {
        Self {
            registry,
            screen_size,
        }
    }

    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    /// Width and height of the screenshot the page was built from.
    pub fn screen_size(&self) -> (u32, u32) {
        self.screen_size
    }

    /// First element matching `query`, in registry order.
    pub fn element<'a>(&'a self, query: &'a Query) -> Option<&'a Element> {
        first_match(&self.registry, query)
    }

    pub fn elements<'a>(&'a self, query: &'a Query) -> impl Iterator<Item = &'a Element> + Clone + 'a {
        match_elements(&self.registry, query)
    }

    /// First match as a handle bound to `query`, ready for interactions.
    ///
    /// Unresolved when nothing on this page matches; the handle then waits
    /// for the query on its first interaction.
    pub fn driver_element(&self, query: &Query) -> DriverElement {
        DriverElement::new(query.clone(), first_match(&self.registry, query).cloned())
    }

    /// Every match as bound handles, in registry order.
    pub fn driver_elements(&self, query: &Query) -> Vec<DriverElement> {
        match_elements(&self.registry, query)
            .map(|el| DriverElement::new(query.clone(), Some(el.clone())))
            .collect()
    }

    pub fn to_json(&self) -> CvPomResult<String> {
        self.registry.to_json()
    }

    pub fn into_registry(self) -> ElementRegistry {
        self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use crate::testing::detection;

    fn page() -> Page {
        let registry = ElementRegistry::build(
            vec![
                detection("button", [0, 0, 40, 20]),
                detection("button", [100, 0, 140, 20]),
                detection("icon", [200, 0, 220, 20]),
            ],
            vec![],
            &RegistryConfig::default(),
        );
        Page::new(registry, (640, 480))
    }

    #[test]
    fn driver_element_keeps_query_and_first_match() {
        let page = page();
        let q = Query::label("button");
        let el = page.driver_element(&q);
        assert_eq!(el.query(), &q);
        assert_eq!(el.element(), page.element(&q));
        assert_eq!(el.element().map(|e| e.bbox.x1), Some(0));
    }

    #[test]
    fn driver_element_is_unresolved_without_match() {
        let el = page().driver_element(&Query::label("dialog"));
        assert!(!el.is_resolved());
        assert_eq!(el.query(), &Query::label("dialog"));
    }

    #[test]
    fn driver_elements_follow_registry_order() {
        let els = page().driver_elements(&Query::label("button"));
        let xs: Vec<_> = els.iter().filter_map(|e| e.element()).map(|e| e.bbox.x1).collect();
        assert_eq!(xs, vec![0, 100]);
    }
}
