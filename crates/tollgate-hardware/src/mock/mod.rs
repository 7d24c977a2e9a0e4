//! Mock ports for testing and development.
//!
//! Each mock comes with a handle: input mocks (button, scanner) are fed
//! through their handle, output mocks (relay, printer) record what was
//! written and can be told to fail.

pub mod button;
pub mod printer;
pub mod relay;
pub mod scanner;

pub use button::{MockButton, MockButtonHandle};
pub use printer::{MockPrinter, MockPrinterHandle};
pub use relay::{MockRelay, MockRelayHandle};
pub use scanner::{MockScanner, MockScannerHandle};

use std::time::Duration;

/// Read timeout of input mocks unless overridden.
pub const MOCK_READ_TIMEOUT: Duration = Duration::from_millis(50);
