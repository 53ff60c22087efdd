//! Promotion management model.
//!
//! Filter state for targeting customers, saved presets, and the admin forms
//! that create custom filters, new policies and promotion requests.

pub mod filters;
pub mod forms;
pub mod presets;

pub use filters::*;
pub use forms::*;
pub use presets::*;
