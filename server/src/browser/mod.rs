pub mod driver;
pub mod error;
pub mod locator;
pub mod session;

pub use driver::create_webdriver_client;
pub use error::BrowserError;
pub use locator::Locator;
pub use session::{BrowserSession, Navigator};
