pub mod navigator;
pub mod steps;
pub mod validation;

pub use navigator::{can_transition, Progress, StepStatus};
pub use steps::WizardStep;
pub use validation::{ensure_publishable, is_step_valid, missing_fields};
