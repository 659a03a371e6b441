//! Element resolution with a classification fallback.
//!
//! Every lookup walks the same path:
//!
//! ```text
//! native find_by ──ok──▶ classify (for the training key) ─▶ usage report ─▶ Native
//!       │
//!       └──err──▶ classify ──found──▶ Classified proxy
//!                     └──not found──▶ original native error
//! ```
//!
//! Nothing on the classification side can turn a native success into a
//! failure, and a double failure always surfaces the driver's own error.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::client::{ClassificationClient, UsageReport};
use crate::driver::{AutomationDriver, Element};
use crate::element::{ClassifiedElement, Located};
use crate::geometry::normalize;
use crate::outcome::{Classification, ClassificationOutcome};
use crate::result::{BestEffort, DriverError, DriverResult, SmartResult};
use crate::session::{Session, SessionConfig};
use crate::strategy::{normalize_label, LocateRequest, Strategy};

/// Wraps an [`AutomationDriver`] and falls back to visual classification
/// when native lookups fail.
pub struct SmartDriver<D> {
    driver: Arc<D>,
    session: Session,
    client: ClassificationClient,
}

impl<D> fmt::Debug for SmartDriver<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmartDriver")
            .field("session", &self.session)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl<D: AutomationDriver> SmartDriver<D> {
    /// Wrap `driver`, measuring the screen and building the HTTP client
    /// from `config`.
    pub async fn new(driver: D, config: SessionConfig) -> SmartResult<Self> {
        let http = config.http_client()?;
        Self::with_http_client(driver, config, http).await
    }

    /// Wrap `driver` using a caller supplied HTTP client (timeouts, proxies).
    pub async fn with_http_client(
        driver: D,
        config: SessionConfig,
        http: reqwest::Client,
    ) -> SmartResult<Self> {
        let session = Session::establish(&driver, &config).await?;
        let client = ClassificationClient::with_client(
            session.server_url(),
            session.api_key(),
            session.run_id(),
            http,
        );
        Ok(Self {
            driver: Arc::new(driver),
            session,
            client,
        })
    }

    /// Session data fixed at construction
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Wrapped driver
    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Resolve an element, falling back to classification.
    pub async fn find_element(&self, request: &LocateRequest) -> DriverResult<Located<D>> {
        let label = request.effective_label();
        debug!(
            "Resolving {label} natively by {}: {}",
            request.strategy, request.selector
        );

        match self.driver.find_by(request.strategy, &request.selector).await {
            Ok(element) => {
                let Some(outcome) = self.classify(&label).await else {
                    return Err(self.interactive_error(
                        request.strategy,
                        &request.selector,
                        &label,
                    ));
                };
                self.update_element(&element, outcome.training_key(), &label, true)
                    .await;
                Ok(Located::Native(element))
            }
            Err(native_error) => {
                info!(
                    "Native lookup for {label} failed ({native_error}), trying classification"
                );
                match self.classify(&label).await {
                    Some(ClassificationOutcome::Found(found)) => {
                        Ok(Located::Classified(self.proxy(found)))
                    }
                    Some(ClassificationOutcome::NotFound { .. }) | None => {
                        error!("Element {label} was not found natively or by classification");
                        Err(native_error)
                    }
                }
            }
        }
    }

    /// Resolve with an explicit strategy and optional label
    pub async fn find_element_by(
        &self,
        strategy: Strategy,
        selector: &str,
        label: Option<&str>,
    ) -> DriverResult<Located<D>> {
        let mut request = LocateRequest::new(strategy, selector);
        if let Some(label) = label {
            request = request.with_label(label);
        }
        self.find_element(&request).await
    }

    /// Resolve by accessibility id
    pub async fn find_element_by_accessibility_id(
        &self,
        selector: &str,
        label: Option<&str>,
    ) -> DriverResult<Located<D>> {
        self.find_element_by(Strategy::AccessibilityId, selector, label)
            .await
    }

    /// Resolve by class name
    pub async fn find_element_by_class_name(
        &self,
        selector: &str,
        label: Option<&str>,
    ) -> DriverResult<Located<D>> {
        self.find_element_by(Strategy::ClassName, selector, label)
            .await
    }

    /// Resolve by CSS selector
    pub async fn find_element_by_css_selector(
        &self,
        selector: &str,
        label: Option<&str>,
    ) -> DriverResult<Located<D>> {
        self.find_element_by(Strategy::CssSelector, selector, label)
            .await
    }

    /// Resolve by id
    pub async fn find_element_by_id(
        &self,
        selector: &str,
        label: Option<&str>,
    ) -> DriverResult<Located<D>> {
        self.find_element_by(Strategy::Id, selector, label).await
    }

    /// Resolve by exact link text
    pub async fn find_element_by_link_text(
        &self,
        selector: &str,
        label: Option<&str>,
    ) -> DriverResult<Located<D>> {
        self.find_element_by(Strategy::LinkText, selector, label)
            .await
    }

    /// Resolve by name
    pub async fn find_element_by_name(
        &self,
        selector: &str,
        label: Option<&str>,
    ) -> DriverResult<Located<D>> {
        self.find_element_by(Strategy::Name, selector, label).await
    }

    /// Resolve by partial link text
    pub async fn find_element_by_partial_link_text(
        &self,
        selector: &str,
        label: Option<&str>,
    ) -> DriverResult<Located<D>> {
        self.find_element_by(Strategy::PartialLinkText, selector, label)
            .await
    }

    /// Resolve by tag name
    pub async fn find_element_by_tag_name(
        &self,
        selector: &str,
        label: Option<&str>,
    ) -> DriverResult<Located<D>> {
        self.find_element_by(Strategy::TagName, selector, label)
            .await
    }

    /// Resolve by XPath
    pub async fn find_element_by_xpath(
        &self,
        selector: &str,
        label: Option<&str>,
    ) -> DriverResult<Located<D>> {
        self.find_element_by(Strategy::XPath, selector, label).await
    }

    /// Locate an element by label through classification alone.
    ///
    /// # Errors
    ///
    /// [`DriverError::ElementNotFound`] with the service's diagnostic when
    /// the element cannot be placed.
    pub async fn find_by_element_name(&self, label: &str) -> DriverResult<ClassifiedElement<D>> {
        let label = normalize_label(label);
        match self.classify(&label).await {
            Some(ClassificationOutcome::Found(found)) => Ok(self.proxy(found)),
            Some(ClassificationOutcome::NotFound { message, .. }) => {
                Err(DriverError::ElementNotFound { label, message })
            }
            None => Err(DriverError::ElementNotFound {
                message: self.interactive_message(&label),
                label,
            }),
        }
    }

    /// Ask the service to locate `label` on the current screen.
    ///
    /// Returns `None` in interactive mode, without any network traffic.
    /// Service and capture failures come back as
    /// [`ClassificationOutcome::NotFound`], never as errors.
    pub async fn classify(&self, label: &str) -> Option<ClassificationOutcome> {
        if self.session.is_interactive() {
            debug!("Interactive mode, skipping classification of {label}");
            return None;
        }

        let source = self
            .driver
            .page_source()
            .await
            .best_effort("page source capture")
            .unwrap_or_default();

        let screenshot = match self.driver.screenshot_base64().await {
            Ok(screenshot) => screenshot,
            Err(e) => {
                warn!(error = %e, "Screenshot capture failed, cannot classify {label}");
                return Some(ClassificationOutcome::unavailable());
            }
        };

        let outcome = match self.client.classify(label, &screenshot, &source).await {
            Ok(reply) => ClassificationOutcome::from_reply(reply, label, self.session.server_url()),
            Err(e) => {
                warn!(error = %e, "Classification request for {label} failed");
                ClassificationOutcome::unavailable()
            }
        };

        match &outcome {
            ClassificationOutcome::Found(found) => info!(
                "Classified {label} as {} at {:?}",
                found.tag_name, found.rect
            ),
            ClassificationOutcome::NotFound { message, .. } => warn!("{message}"),
        }
        Some(outcome)
    }

    /// Report that a natively found element was used. Never fails.
    async fn update_element(
        &self,
        element: &D::Element,
        key: Option<&str>,
        label: &str,
        train_if_necessary: bool,
    ) {
        let Some(rect) = element.rect().await.best_effort("native element rect") else {
            return;
        };
        let report = UsageReport {
            key: key.map(str::to_string),
            rect,
            multiplier: self.session.multiplier().value(),
            train_if_necessary,
        };
        if self
            .client
            .record_usage(&report)
            .await
            .best_effort("usage report")
            .is_some()
        {
            debug!("Recorded usage of {label} at {rect:?}");
        }
    }

    fn proxy(&self, found: Classification) -> ClassifiedElement<D> {
        let geometry = normalize(found.rect, self.session.multiplier());
        ClassifiedElement::new(Arc::clone(&self.driver), found.text, found.tag_name, geometry)
    }

    fn interactive_message(&self, label: &str) -> String {
        format!(
            "Interactive mode is not implemented: test case {} cannot resolve {label}",
            self.session.test_case_name().unwrap_or_default()
        )
    }

    fn interactive_error(&self, strategy: Strategy, selector: &str, label: &str) -> DriverError {
        warn!("Element {label} was found natively but interactive mode cannot confirm it");
        DriverError::no_such_element(strategy, selector, self.interactive_message(label))
    }
}
