//! smart-driver: resilient element lookup for automation drivers
//!
//! Wraps any [`AutomationDriver`] (Appium, WebDriver, or a test double) and
//! adds a second chance to every element lookup. When the native locator
//! misses, a screenshot and the page source are sent to a remote
//! classification service that locates the element visually; the caller
//! gets a [`ClassifiedElement`] that taps and types at its on-screen
//! position. When the native locator hits, the service is told where the
//! element was, so it can keep learning.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    smart-driver                              │
//! ├──────────────────────────────────────────────────────────────┤
//! │  LocateRequest ──► SmartDriver ──► AutomationDriver::find_by  │
//! │                        │                                     │
//! │                        ├──► ClassificationClient (/classify)  │
//! │                        │         └─► ClassificationOutcome    │
//! │                        ├──► geometry::normalize              │
//! │                        └──► ClassificationClient (/add_action)│
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use smart_driver::{LocateRequest, MockDriver, SessionConfig, SmartDriver};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SessionConfig::new("my-api-key");
//! let smart = SmartDriver::new(MockDriver::new(), config).await?;
//! let _login = smart
//!     .find_element(&LocateRequest::xpath("//button[@name='login']").with_label("login button"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod client;
mod driver;
mod element;
mod geometry;
pub mod logging;
mod outcome;
mod resolver;
mod result;
mod session;
mod strategy;

pub use client::{
    ClassificationClient, ServiceElement, ServiceReply, UsageReport, DEFAULT_SERVER_URL,
};
pub use driver::{
    screenshot_width, AutomationDriver, Element, MockDriver, MockElement,
    MOCK_SCREENSHOT_BASE64, NO_SUCH_ELEMENT_MESSAGE,
};
pub use element::{ClassifiedElement, Located};
pub use geometry::{normalize, DensityMultiplier, LogicalRect, Point, Rect, Size};
pub use outcome::{
    diagnostic, reason_for, Classification, ClassificationOutcome, ReasonCode, GENERIC_FAILURE,
};
pub use resolver::SmartDriver;
pub use result::{BestEffort, ClientError, DriverError, DriverResult, SmartError, SmartResult};
pub use session::{resolve_server_url, Session, SessionConfig, SERVER_URL_ENV};
pub use strategy::{derive_label, normalize_label, LocateRequest, Strategy, LABEL_PREFIX};
