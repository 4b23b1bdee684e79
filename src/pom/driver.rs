use std::time::Duration;

use crate::config::CvPomConfig;
use crate::driver::traits::{ClickSpec, Driver};
use crate::errors::CvPomResult;
use crate::executor::coordinator::{Destination, SwipeDirection, Target};
use crate::executor::dispatcher::InteractionDispatcher;
use crate::perception::pipeline::Perception;
use crate::perception::registry::ElementRegistry;
use crate::perception::traits::{Detector, TextRecognizer};
use crate::perception::types::Point;
use crate::pom::element::DriverElement;
use crate::pom::page::Page;
use crate::query::matcher::match_elements;
use crate::query::types::Query;
use crate::resolver::polling::PollingResolver;
use crate::resolver::state::{Resolution, WaitMode};

/// Binds a platform [`Driver`] to the perception pipeline, resolver and dispatcher.
///
/// Every lookup captures a new screenshot and builds a new registry.
/// Configuration is fixed at construction.
pub struct CvPomDriver<D> {
    driver: D,
    perception: Perception,
    dispatcher: InteractionDispatcher,
    resolver: PollingResolver,
    config: CvPomConfig,
    last_screen_size: Option<(u32, u32)>,
}

impl<D: Driver> CvPomDriver<D> {
    /// Fails with `Config` when `config` does not validate.
    pub fn new(driver: D, detector: Box<dyn Detector>, config: CvPomConfig) -> CvPomResult<Self> {
        config.validate()?;
        let perception = Perception::new(detector, config.registry.clone());
        Ok(Self {
            driver,
            perception,
            dispatcher: InteractionDispatcher::from_config(&config.interaction),
            resolver: PollingResolver::from_config(&config.resolver),
            config,
            last_screen_size: None,
        })
    }

    pub fn with_text_recognizer(mut self, recognizer: Box<dyn TextRecognizer>) -> Self {
        self.perception = self
            .perception
            .with_text_recognizer(recognizer, self.config.ocr.clone());
        self
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn config(&self) -> &CvPomConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &InteractionDispatcher {
        &self.dispatcher
    }

    pub fn resolver(&self) -> &PollingResolver {
        &self.resolver
    }

    fn timeout_or_default(&self, timeout: Option<Duration>) -> Duration {
        timeout.unwrap_or_else(|| self.resolver.timeout())
    }

    fn wants_text(&self, query: &Query) -> bool {
        query.needs_text(&self.config.registry.text_label)
    }

    pub(crate) fn default_click_interval(&self) -> Duration {
        Duration::from_millis(self.config.interaction.click_interval_ms)
    }

    /// Capture → registry. OCR runs only when `with_text`.
    fn snapshot(&mut self, with_text: bool) -> CvPomResult<ElementRegistry> {
        let image = self.driver.capture_screenshot()?;
        self.last_screen_size = Some((image.width(), image.height()));
        self.perception.build_registry(&image, with_text)
    }

    /// Full page snapshot; text recognition follows `[ocr].enabled`.
    pub fn get_page(&mut self) -> CvPomResult<Page> {
        let registry = self.snapshot(self.config.ocr.enabled)?;
        let size = self.last_screen_size.unwrap_or_default();
        tracing::info!(elements = registry.len(), width = size.0, height = size.1, "page captured");
        Ok(Page::new(registry, size))
    }

    /// Single capture, no waiting. The returned element may be unresolved;
    /// it resolves itself on first interaction.
    pub fn element(&mut self, query: &Query) -> CvPomResult<DriverElement> {
        let registry = self.snapshot(self.wants_text(query))?;
        let found = match_elements(&registry, query).next().cloned();
        Ok(DriverElement::new(query.clone(), found))
    }

    /// Single capture, every match in registry order.
    pub fn elements(&mut self, query: &Query) -> CvPomResult<Vec<DriverElement>> {
        let registry = self.snapshot(self.wants_text(query))?;
        Ok(match_elements(&registry, query)
            .cloned()
            .map(|el| DriverElement::new(query.clone(), Some(el)))
            .collect())
    }

    /// Poll until `query` matches; `ElementNotFound` at the deadline.
    pub fn find(&mut self, query: &Query, timeout: Option<Duration>) -> CvPomResult<DriverElement> {
        let resolution = self.wait_until(query, WaitMode::Present, timeout)?;
        Ok(DriverElement::new(query.clone(), resolution.into_first()))
    }

    /// Poll until `query` matches at least once and return every match of that poll.
    pub fn find_all(
        &mut self,
        query: &Query,
        timeout: Option<Duration>,
    ) -> CvPomResult<Vec<DriverElement>> {
        let resolution = self.wait_until(query, WaitMode::Present, timeout)?;
        Ok(resolution
            .matches
            .into_iter()
            .map(|el| DriverElement::new(query.clone(), Some(el)))
            .collect())
    }

    /// Poll until `query`'s match state satisfies `mode`.
    pub fn wait_until(
        &mut self,
        query: &Query,
        mode: WaitMode,
        timeout: Option<Duration>,
    ) -> CvPomResult<Resolution> {
        let resolver = self.resolver.with_timeout(self.timeout_or_default(timeout));
        let with_text = self.wants_text(query);
        resolver.resolve(query, mode, || self.snapshot(with_text))
    }

    pub fn click_at(&mut self, at: Point, click: &ClickSpec) -> CvPomResult<Point> {
        self.dispatcher
            .click(&mut self.driver, Target::Coords(at), (0, 0), click)
    }

    pub fn hover_at(&mut self, at: Point) -> CvPomResult<Point> {
        self.dispatcher.hover(&mut self.driver, Target::Coords(at), (0, 0))
    }

    pub fn swipe_coords(
        &mut self,
        from: Point,
        to: Point,
        duration: Option<Duration>,
    ) -> CvPomResult<(Point, Point)> {
        self.dispatcher
            .swipe_coords(&mut self.driver, from, to, duration)
    }

    /// Swipe from the screen center in `direction` by the configured magnitude.
    pub fn swipe_screen(
        &mut self,
        direction: SwipeDirection,
        duration: Option<Duration>,
    ) -> CvPomResult<(Point, Point)> {
        let size = match self.last_screen_size {
            Some(size) => size,
            None => {
                let image = self.driver.capture_screenshot()?;
                let size = (image.width(), image.height());
                self.last_screen_size = Some(size);
                size
            }
        };
        self.dispatcher
            .swipe_screen(&mut self.driver, size, direction, duration)
    }

    pub(crate) fn dispatch_click(
        &mut self,
        target: Target<'_>,
        offset: (i32, i32),
        click: &ClickSpec,
    ) -> CvPomResult<Point> {
        self.dispatcher.click(&mut self.driver, target, offset, click)
    }

    pub(crate) fn dispatch_hover(&mut self, target: Target<'_>, offset: (i32, i32)) -> CvPomResult<Point> {
        self.dispatcher.hover(&mut self.driver, target, offset)
    }

    pub(crate) fn dispatch_send_keys(
        &mut self,
        target: &crate::perception::types::Element,
        text: &str,
        offset: (i32, i32),
    ) -> CvPomResult<Point> {
        self.dispatcher
            .send_keys(&mut self.driver, target, text, offset)
    }

    pub(crate) fn dispatch_swipe(
        &mut self,
        from: Target<'_>,
        to: Destination<'_>,
        duration: Option<Duration>,
    ) -> CvPomResult<(Point, Point)> {
        self.dispatcher.swipe(&mut self.driver, from, to, duration)
    }

    pub(crate) fn dispatch_drag_drop(
        &mut self,
        from: Target<'_>,
        to: Destination<'_>,
        duration: Option<Duration>,
    ) -> CvPomResult<(Point, Point)> {
        self.dispatcher
            .drag_drop(&mut self.driver, from, to, duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InteractionConfig;
    use crate::errors::CvPomError;
    use crate::testing::{detection, text_region, DriverCall, FixedText, RecordingDriver, ScriptedDetector};

    fn fast_config() -> CvPomConfig {
        let mut config = CvPomConfig::default();
        config.resolver.timeout_ms = 300;
        config.resolver.poll_interval_ms = 20;
        config
    }

    #[test]
    fn get_page_builds_registry_with_text() {
        let text = FixedText::new(vec![text_region("Sign in", [10, 10, 90, 30])]);
        let mut pom = CvPomDriver::new(
            RecordingDriver::new(640, 480),
            Box::new(ScriptedDetector::fixed(vec![detection("button", [0, 0, 100, 40])])),
            fast_config(),
        )
        .unwrap()
        .with_text_recognizer(Box::new(text));

        let page = pom.get_page().unwrap();
        assert_eq!(page.screen_size(), (640, 480));
        let q = Query::text("Sign in");
        assert_eq!(page.element(&q).unwrap().label, "button");
        assert_eq!(page.elements(&Query::all()).count(), 1);
    }

    #[test]
    fn get_page_skips_ocr_when_disabled() {
        let text = FixedText::new(vec![text_region("Sign in", [10, 10, 90, 30])]);
        let ocr_calls = text.call_counter();
        let mut config = fast_config();
        config.ocr.enabled = false;
        let mut pom = CvPomDriver::new(
            RecordingDriver::new(640, 480),
            Box::new(ScriptedDetector::fixed(vec![detection("button", [0, 0, 100, 40])])),
            config,
        )
        .unwrap()
        .with_text_recognizer(Box::new(text));

        let page = pom.get_page().unwrap();
        assert_eq!(ocr_calls.get(), 0);
        assert_eq!(page.registry().len(), 1);
        assert_eq!(page.registry().elements()[0].text, None);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut negative_resize = fast_config();
        negative_resize.interaction.resize = -1.0;
        let mut overlap_too_big = fast_config();
        overlap_too_big.registry.min_overlap = 2.0;

        for config in [negative_resize, overlap_too_big] {
            let result = CvPomDriver::new(
                RecordingDriver::new(640, 480),
                Box::new(ScriptedDetector::fixed(vec![])),
                config,
            );
            assert!(matches!(result, Err(CvPomError::Config(_))));
        }
    }

    #[test]
    fn page_elements_bind_to_driver() {
        let mut pom = CvPomDriver::new(
            RecordingDriver::new(640, 480),
            Box::new(ScriptedDetector::fixed(vec![detection("button", [0, 0, 100, 40])])),
            fast_config(),
        )
        .unwrap();
        let page = pom.get_page().unwrap();
        let mut button = page.driver_element(&Query::label("button"));
        assert!(button.is_resolved());

        button
            .click(&mut pom, &crate::pom::element::ClickOptions::default())
            .unwrap();
        assert_eq!(pom.driver().screenshots, 1);
        assert_eq!(
            pom.driver().calls,
            vec![DriverCall::Click {
                at: Point::new(50, 20),
                click: ClickSpec::default()
            }]
        );
    }

    #[test]
    fn label_queries_skip_ocr() {
        let text = FixedText::new(vec![text_region("Sign in", [10, 10, 90, 30])]);
        let ocr_calls = text.call_counter();
        let mut pom = CvPomDriver::new(
            RecordingDriver::new(640, 480),
            Box::new(ScriptedDetector::fixed(vec![detection("button", [0, 0, 100, 40])])),
            fast_config(),
        )
        .unwrap()
        .with_text_recognizer(Box::new(text));

        let el = pom.element(&Query::label("button")).unwrap();
        assert!(el.is_resolved());
        assert_eq!(ocr_calls.get(), 0);

        let by_text = pom.element(&Query::text("Sign in")).unwrap();
        assert!(by_text.is_resolved());
        assert_eq!(ocr_calls.get(), 1);
    }

    #[test]
    fn element_may_be_unresolved() {
        let mut pom = CvPomDriver::new(
            RecordingDriver::new(640, 480),
            Box::new(ScriptedDetector::fixed(vec![])),
            fast_config(),
        )
        .unwrap();
        let el = pom.element(&Query::label("button")).unwrap();
        assert!(!el.is_resolved());
        assert!(pom.elements(&Query::label("button")).unwrap().is_empty());
    }

    #[test]
    fn find_polls_fresh_screenshots_until_present() {
        let detector = ScriptedDetector::new(vec![
            vec![],
            vec![],
            vec![detection("dialog", [0, 0, 200, 100])],
        ]);
        let calls = detector.call_counter();
        let mut pom = CvPomDriver::new(RecordingDriver::new(640, 480), Box::new(detector), fast_config()).unwrap();

        let el = pom.find(&Query::label("dialog"), None).unwrap();
        assert_eq!(el.element().unwrap().label, "dialog");
        assert_eq!(calls.get(), 3);
        assert_eq!(pom.driver().screenshots, 3);
    }

    #[test]
    fn find_times_out() {
        let mut pom = CvPomDriver::new(
            RecordingDriver::new(640, 480),
            Box::new(ScriptedDetector::fixed(vec![detection("button", [0, 0, 10, 10])])),
            fast_config(),
        )
        .unwrap();
        let err = pom
            .find(&Query::label("missing"), Some(Duration::from_millis(100)))
            .unwrap_err();
        assert!(matches!(err, CvPomError::ElementNotFound { .. }));
    }

    #[test]
    fn coordinate_actions_are_scaled() {
        let mut config = fast_config();
        config.interaction = InteractionConfig {
            resize: 0.5,
            ..InteractionConfig::default()
        };
        let mut pom = CvPomDriver::new(
            RecordingDriver::new(640, 480),
            Box::new(ScriptedDetector::fixed(vec![])),
            config,
        )
        .unwrap();
        pom.click_at(Point::new(400, 300), &ClickSpec::default()).unwrap();
        pom.hover_at(Point::new(10, 10)).unwrap();
        assert_eq!(
            pom.driver().calls,
            vec![
                DriverCall::Click {
                    at: Point::new(200, 150),
                    click: ClickSpec::default()
                },
                DriverCall::Hover(Point::new(5, 5)),
            ]
        );
    }

    #[test]
    fn screen_swipe_captures_size_when_unknown() {
        let mut config = fast_config();
        config.interaction.swipe_magnitude = 100;
        let mut pom = CvPomDriver::new(
            RecordingDriver::new(640, 480),
            Box::new(ScriptedDetector::fixed(vec![])),
            config,
        )
        .unwrap();
        pom.swipe_screen(SwipeDirection::Left, None).unwrap();
        assert_eq!(pom.driver().screenshots, 1);
        assert_eq!(
            pom.driver().calls,
            vec![DriverCall::Swipe {
                from: Point::new(320, 240),
                to: Point::new(220, 240),
                duration: Duration::from_millis(100),
            }]
        );
    }
}
