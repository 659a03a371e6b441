//! AutomationDriver - the capability set consumed from the wrapped driver
//!
//! smart-driver never talks to a device itself. Everything it needs from the
//! underlying automation driver (Appium, WebDriver, an in-process fake) goes
//! through [`AutomationDriver`]:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  SmartDriver<D: AutomationDriver>                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  find_by(strategy, selector)     native lookup               │
//! │  page_source / screenshot_base64 classification inputs       │
//! │  window_width / screenshot px    density multiplier          │
//! │  tap / send_keys                 input for classified proxies │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use base64::Engine as _;

use crate::geometry::{Point, Rect, Size};
use crate::result::{DriverError, DriverResult};
use crate::strategy::Strategy;

/// Message used by drivers when nothing matches
pub const NO_SUCH_ELEMENT_MESSAGE: &str =
    "An element could not be located on the page using the given search parameters.";

/// An element the caller can read and interact with
#[async_trait]
pub trait Element: Send + Sync {
    /// Visible text
    async fn text(&self) -> DriverResult<String>;

    /// Tag / class name
    async fn tag_name(&self) -> DriverResult<String>;

    /// Bounding rectangle in logical units
    async fn rect(&self) -> DriverResult<Rect>;

    /// Top-left corner
    async fn location(&self) -> DriverResult<Point> {
        Ok(self.rect().await?.location())
    }

    /// Width and height
    async fn size(&self) -> DriverResult<Size> {
        Ok(self.rect().await?.size())
    }

    /// Tap / click the element
    async fn click(&self) -> DriverResult<()>;

    /// Type into the element
    async fn send_keys(&self, keys: &str) -> DriverResult<()>;

    /// Submit (e.g. press enter in a form field)
    async fn submit(&self) -> DriverResult<()>;
}

/// Abstract automation driver.
///
/// # Implementations
///
/// - Real drivers wrap an Appium / WebDriver session
/// - [`MockDriver`] - for unit testing
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    /// Element type returned by native lookups
    type Element: Element;

    /// Native lookup with one strategy
    async fn find_by(&self, strategy: Strategy, selector: &str) -> DriverResult<Self::Element>;

    /// Page source / view hierarchy dump
    async fn page_source(&self) -> DriverResult<String>;

    /// Screenshot, base64 encoded
    async fn screenshot_base64(&self) -> DriverResult<String>;

    /// Logical window width
    async fn window_width(&self) -> DriverResult<u32>;

    /// Screenshot width in raw pixels.
    ///
    /// Defaults to decoding [`Self::screenshot_base64`].
    async fn screenshot_pixel_width(&self) -> DriverResult<u32> {
        let encoded = self.screenshot_base64().await?;
        screenshot_width(&encoded)
    }

    /// Tap at a logical point
    async fn tap(&self, point: Point) -> DriverResult<()>;

    /// Inject key events into whatever has focus
    async fn send_keys(&self, text: &str) -> DriverResult<()>;
}

/// Decode a base64 screenshot and return its pixel width.
///
/// Line breaks and other whitespace (MIME style encodings) are ignored.
pub fn screenshot_width(encoded: &str) -> DriverResult<u32> {
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| DriverError::Screenshot {
            message: format!("screenshot is not valid base64: {e}"),
        })?;
    let image = image::load_from_memory(&bytes).map_err(|e| DriverError::Screenshot {
        message: format!("screenshot could not be decoded: {e}"),
    })?;
    Ok(image.width())
}

/// Element served by [`MockDriver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockElement {
    /// Identifier for assertions
    pub id: String,
    /// Element text
    pub text: String,
    /// Tag name
    pub tag_name: String,
    /// Bounding rectangle; `None` makes `rect()` fail
    pub rect: Option<Rect>,
}

impl MockElement {
    /// Create a new mock element
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: String::new(),
            tag_name: tag_name.into(),
            rect: Some(Rect::default()),
        }
    }

    /// Set text
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set rectangle
    #[must_use]
    pub const fn with_rect(mut self, rect: Rect) -> Self {
        self.rect = Some(rect);
        self
    }

    /// Make `rect()` fail
    #[must_use]
    pub const fn without_rect(mut self) -> Self {
        self.rect = None;
        self
    }
}

#[async_trait]
impl Element for MockElement {
    async fn text(&self) -> DriverResult<String> {
        Ok(self.text.clone())
    }

    async fn tag_name(&self) -> DriverResult<String> {
        Ok(self.tag_name.clone())
    }

    async fn rect(&self) -> DriverResult<Rect> {
        self.rect.ok_or_else(|| DriverError::Session {
            message: format!("element {} is stale", self.id),
        })
    }

    async fn click(&self) -> DriverResult<()> {
        Ok(())
    }

    async fn send_keys(&self, _keys: &str) -> DriverResult<()> {
        Ok(())
    }

    async fn submit(&self) -> DriverResult<()> {
        Ok(())
    }
}

/// Placeholder screenshot payload served by default
pub const MOCK_SCREENSHOT_BASE64: &str = "iVBORw0KGgo=";

/// Mock driver for unit testing
#[derive(Debug)]
pub struct MockDriver {
    /// Elements keyed by strategy and selector
    pub elements: HashMap<(Strategy, String), MockElement>,
    /// Page source; `None` makes capture fail
    pub page_source: Option<String>,
    /// Base64 screenshot; `None` makes capture fail
    pub screenshot: Option<String>,
    /// Logical window width
    pub window_width: u32,
    /// Raw screenshot width; `None` decodes `screenshot` instead
    pub screenshot_pixel_width: Option<u32>,
    /// Call history for verification
    call_history: Mutex<Vec<String>>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self {
            elements: HashMap::new(),
            page_source: Some("<hierarchy/>".to_string()),
            screenshot: Some(MOCK_SCREENSHOT_BASE64.to_string()),
            window_width: 400,
            screenshot_pixel_width: Some(800),
            call_history: Mutex::new(Vec::new()),
        }
    }
}

impl MockDriver {
    /// Create new mock driver (400 logical units, 800 px screenshots)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mock element reachable through `strategy` and `selector`
    #[must_use]
    pub fn with_element(
        mut self,
        strategy: Strategy,
        selector: impl Into<String>,
        element: MockElement,
    ) -> Self {
        self.elements.insert((strategy, selector.into()), element);
        self
    }

    /// Set page source; `None` makes capture fail
    #[must_use]
    pub fn with_page_source(mut self, source: Option<&str>) -> Self {
        self.page_source = source.map(str::to_string);
        self
    }

    /// Set screenshot; `None` makes capture fail
    #[must_use]
    pub fn with_screenshot(mut self, screenshot: Option<&str>) -> Self {
        self.screenshot = screenshot.map(str::to_string);
        self
    }

    /// Set screen geometry
    #[must_use]
    pub const fn with_screen(mut self, window_width: u32, pixel_width: Option<u32>) -> Self {
        self.window_width = window_width;
        self.screenshot_pixel_width = pixel_width;
        self
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.call_history
            .lock()
            .map(|h| h.clone())
            .unwrap_or_default()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.history().iter().any(|c| c.starts_with(method))
    }

    /// Count calls starting with `method`
    #[must_use]
    pub fn call_count(&self, method: &str) -> usize {
        self.history()
            .iter()
            .filter(|c| c.starts_with(method))
            .count()
    }

    fn record(&self, call: String) {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(call);
        }
    }
}

#[async_trait]
impl AutomationDriver for MockDriver {
    type Element = MockElement;

    async fn find_by(&self, strategy: Strategy, selector: &str) -> DriverResult<MockElement> {
        self.record(format!("find_by:{strategy}:{selector}"));
        self.elements
            .get(&(strategy, selector.to_string()))
            .cloned()
            .ok_or_else(|| DriverError::no_such_element(strategy, selector, NO_SUCH_ELEMENT_MESSAGE))
    }

    async fn page_source(&self) -> DriverResult<String> {
        self.record("page_source".to_string());
        self.page_source.clone().ok_or_else(|| DriverError::PageSource {
            message: "No mock page source set".to_string(),
        })
    }

    async fn screenshot_base64(&self) -> DriverResult<String> {
        self.record("screenshot".to_string());
        self.screenshot.clone().ok_or_else(|| DriverError::Screenshot {
            message: "No mock screenshot set".to_string(),
        })
    }

    async fn window_width(&self) -> DriverResult<u32> {
        self.record("window_width".to_string());
        Ok(self.window_width)
    }

    async fn screenshot_pixel_width(&self) -> DriverResult<u32> {
        match self.screenshot_pixel_width {
            Some(width) => Ok(width),
            None => {
                let encoded = self.screenshot_base64().await?;
                screenshot_width(&encoded)
            }
        }
    }

    async fn tap(&self, point: Point) -> DriverResult<()> {
        self.record(format!("tap:{},{}", point.x, point.y));
        Ok(())
    }

    async fn send_keys(&self, text: &str) -> DriverResult<()> {
        self.record(format!("send_keys:{text}"));
        Ok(())
    }
}
