// CV summary form: state machine, controller and the per-instance registry.
// The HTTP layer only talks to `SummaryForm`; nothing mutates `FormState` directly.

pub mod controller;
pub mod handlers;
pub mod registry;
pub mod state;

pub use controller::SummaryForm;
pub use registry::FormRegistry;
pub use state::{FormState, FormView, EMPTY_CV_MESSAGE};
