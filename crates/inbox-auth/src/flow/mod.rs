//! Authentication flow state machine and the sequential driver
//!
//! One attempt walks `Opening → Polling → Settling → Reconciling` and ends
//! in `Succeeded`, `Failed` or `TimedOut`. A deadline and a cancellation
//! token race the whole pipeline; whichever finishes first decides the
//! outcome and the surface is released on every path.

mod attempt;
mod controller;
mod driver;
mod timing;

pub use attempt::FlowTask;
pub use controller::AuthFlowController;
pub use driver::DriverReport;
pub use timing::{FlowTiming, MAX_INTERVAL};
