//! Maps `Box<dyn Error>` from trait boundaries to typed `StainerError`.
//!
//! The traits in `stainer_traits` use `Box<dyn Error + Send + Sync>` for maximum
//! flexibility; this module converts those to our typed error enum, with an
//! optional feature-gated path for `stainer_hardware::HwError` downcasting.

use crate::error::StainerError;

/// Map a trait-boundary error to a typed `StainerError`.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> StainerError {
    #[cfg(feature = "hardware-errors")]
    {
        use stainer_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                // Wiring table and backend disagree: fix the config, not the rig.
                HwError::UnknownPin(_) | HwError::NotAnOutput(_) => {
                    StainerError::Config(hw.to_string())
                }
                other => StainerError::Hardware(other.to_string()),
            };
        }
    }

    StainerError::Hardware(e.to_string())
}
