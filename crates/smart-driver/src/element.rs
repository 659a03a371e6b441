//! Elements handed back by the resolver.
//!
//! A [`ClassifiedElement`] stands in for an element the native driver could
//! not find. It has no handle on the device side: every interaction is
//! replayed as a tap or key event through the driver at the element's
//! logical click point.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::driver::{AutomationDriver, Element};
use crate::geometry::{LogicalRect, Point, Rect, Size};
use crate::result::DriverResult;

/// Proxy for an element located by classification
pub struct ClassifiedElement<D> {
    driver: Arc<D>,
    text: String,
    tag_name: String,
    geometry: LogicalRect,
}

impl<D> ClassifiedElement<D> {
    /// Create a proxy over `driver`
    #[must_use]
    pub fn new(
        driver: Arc<D>,
        text: impl Into<String>,
        tag_name: impl Into<String>,
        geometry: LogicalRect,
    ) -> Self {
        Self {
            driver,
            text: text.into(),
            tag_name: tag_name.into(),
            geometry,
        }
    }

    /// Logical geometry
    #[must_use]
    pub const fn geometry(&self) -> LogicalRect {
        self.geometry
    }

    /// Where taps land
    #[must_use]
    pub const fn click_point(&self) -> Point {
        self.geometry.click_point
    }
}

impl<D: AutomationDriver> ClassifiedElement<D> {
    /// Type `keys`, optionally tapping the element first to focus it
    pub async fn send_keys_with(&self, keys: &str, click_first: bool) -> DriverResult<()> {
        if click_first {
            self.driver.tap(self.geometry.click_point).await?;
        }
        self.driver.send_keys(keys).await
    }
}

impl<D> Clone for ClassifiedElement<D> {
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
            text: self.text.clone(),
            tag_name: self.tag_name.clone(),
            geometry: self.geometry,
        }
    }
}

impl<D> fmt::Debug for ClassifiedElement<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifiedElement")
            .field("text", &self.text)
            .field("tag_name", &self.tag_name)
            .field("geometry", &self.geometry)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<D: AutomationDriver> Element for ClassifiedElement<D> {
    async fn text(&self) -> DriverResult<String> {
        Ok(self.text.clone())
    }

    async fn tag_name(&self) -> DriverResult<String> {
        Ok(self.tag_name.clone())
    }

    async fn rect(&self) -> DriverResult<Rect> {
        Ok(self.geometry.rect())
    }

    async fn location(&self) -> DriverResult<Point> {
        Ok(self.geometry.location)
    }

    async fn size(&self) -> DriverResult<Size> {
        Ok(self.geometry.size)
    }

    async fn click(&self) -> DriverResult<()> {
        self.driver.tap(self.geometry.click_point).await
    }

    async fn send_keys(&self, keys: &str) -> DriverResult<()> {
        self.send_keys_with(keys, true).await
    }

    async fn submit(&self) -> DriverResult<()> {
        self.send_keys_with("\n", false).await
    }
}

/// Element returned by a successful resolve
pub enum Located<D: AutomationDriver> {
    /// Found by the native driver
    Native(D::Element),
    /// Found by classification
    Classified(ClassifiedElement<D>),
}

impl<D: AutomationDriver> Located<D> {
    /// Check if the native driver found the element
    #[must_use]
    pub const fn is_native(&self) -> bool {
        matches!(self, Self::Native(_))
    }

    /// Native element, if any
    #[must_use]
    pub const fn as_native(&self) -> Option<&D::Element> {
        match self {
            Self::Native(element) => Some(element),
            Self::Classified(_) => None,
        }
    }

    /// Classified proxy, if any
    #[must_use]
    pub const fn as_classified(&self) -> Option<&ClassifiedElement<D>> {
        match self {
            Self::Native(_) => None,
            Self::Classified(element) => Some(element),
        }
    }

    fn inner(&self) -> &dyn Element {
        match self {
            Self::Native(element) => element,
            Self::Classified(element) => element,
        }
    }
}

impl<D: AutomationDriver> Clone for Located<D>
where
    D::Element: Clone,
{
    fn clone(&self) -> Self {
        match self {
            Self::Native(element) => Self::Native(element.clone()),
            Self::Classified(element) => Self::Classified(element.clone()),
        }
    }
}

impl<D: AutomationDriver> fmt::Debug for Located<D>
where
    D::Element: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(element) => f.debug_tuple("Native").field(element).finish(),
            Self::Classified(element) => f.debug_tuple("Classified").field(element).finish(),
        }
    }
}

#[async_trait]
impl<D: AutomationDriver> Element for Located<D> {
    async fn text(&self) -> DriverResult<String> {
        self.inner().text().await
    }

    async fn tag_name(&self) -> DriverResult<String> {
        self.inner().tag_name().await
    }

    async fn rect(&self) -> DriverResult<Rect> {
        self.inner().rect().await
    }

    async fn location(&self) -> DriverResult<Point> {
        self.inner().location().await
    }

    async fn size(&self) -> DriverResult<Size> {
        self.inner().size().await
    }

    async fn click(&self) -> DriverResult<()> {
        self.inner().click().await
    }

    async fn send_keys(&self, keys: &str) -> DriverResult<()> {
        self.inner().send_keys(keys).await
    }

    async fn submit(&self) -> DriverResult<()> {
        self.inner().submit().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockElement};
    use crate::geometry::{normalize, DensityMultiplier};

    fn proxy(driver: &Arc<MockDriver>) -> ClassifiedElement<MockDriver> {
        let geometry = normalize(
            Rect::new(100, 200, 50, 30),
            DensityMultiplier::new(2.0).unwrap(),
        );
        ClassifiedElement::new(Arc::clone(driver), "Login", "button", geometry)
    }

    mod classified_tests {
        use super::*;

        #[tokio::test]
        async fn test_reads_stored_data() {
            let driver = Arc::new(MockDriver::new());
            let element = proxy(&driver);

            assert_eq!(element.text().await.unwrap(), "Login");
            assert_eq!(element.tag_name().await.unwrap(), "button");
            assert_eq!(element.location().await.unwrap(), Point::new(50, 100));
            assert_eq!(element.size().await.unwrap(), Size::new(25, 15));
            assert_eq!(element.rect().await.unwrap(), Rect::new(50, 100, 25, 15));
            assert!(driver.history().is_empty());
        }

        #[tokio::test]
        async fn test_click_taps_click_point() {
            let driver = Arc::new(MockDriver::new());
            proxy(&driver).click().await.unwrap();
            assert_eq!(driver.history(), vec!["tap:62,107"]);
        }

        #[tokio::test]
        async fn test_send_keys_clicks_first() {
            let driver = Arc::new(MockDriver::new());
            proxy(&driver).send_keys("hunter2").await.unwrap();
            assert_eq!(driver.history(), vec!["tap:62,107", "send_keys:hunter2"]);
        }

        #[tokio::test]
        async fn test_send_keys_without_click() {
            let driver = Arc::new(MockDriver::new());
            proxy(&driver).send_keys_with("abc", false).await.unwrap();
            assert_eq!(driver.history(), vec!["send_keys:abc"]);
        }

        #[tokio::test]
        async fn test_submit_sends_newline_only() {
            let driver = Arc::new(MockDriver::new());
            proxy(&driver).submit().await.unwrap();
            assert_eq!(driver.history(), vec!["send_keys:\n"]);
        }

        #[tokio::test]
        async fn test_clone_shares_driver() {
            let driver = Arc::new(MockDriver::new());
            let element = proxy(&driver);
            let copy = element.clone();
            copy.click().await.unwrap();
            element.click().await.unwrap();
            assert_eq!(driver.call_count("tap"), 2);
            assert_eq!(copy.click_point(), element.click_point());
        }

        #[test]
        fn test_debug_omits_driver() {
            let driver = Arc::new(MockDriver::new());
            let rendered = format!("{:?}", proxy(&driver));
            assert!(rendered.starts_with("ClassifiedElement"));
            assert!(!rendered.contains("call_history"));
        }
    }

    mod located_tests {
        use super::*;

        #[tokio::test]
        async fn test_native_delegates() {
            let located: Located<MockDriver> = Located::Native(
                MockElement::new("e", "input")
                    .with_text("hi")
                    .with_rect(Rect::new(1, 2, 3, 4)),
            );
            assert!(located.is_native());
            assert!(located.as_classified().is_none());
            assert_eq!(located.as_native().map(|e| e.id.as_str()), Some("e"));
            assert_eq!(located.text().await.unwrap(), "hi");
            assert_eq!(located.rect().await.unwrap(), Rect::new(1, 2, 3, 4));
        }

        #[tokio::test]
        async fn test_classified_delegates() {
            let driver = Arc::new(MockDriver::new());
            let located = Located::Classified(proxy(&driver));
            assert!(!located.is_native());
            assert!(located.as_native().is_none());
            located.click().await.unwrap();
            assert!(driver.was_called("tap:62,107"));
        }
    }
}
