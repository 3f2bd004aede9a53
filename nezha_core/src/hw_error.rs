//! Maps `Box<dyn Error>` from the `Bus` boundary to typed `NezhaError`.
//!
//! With the `hardware-errors` feature, `nezha_hardware::HwError` is
//! downcast so short reads keep their byte counts.

use crate::error::NezhaError;

pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> NezhaError {
    #[cfg(feature = "hardware-errors")]
    {
        use nezha_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::ShortRead { expected, got } => NezhaError::ShortRead {
                    expected: *expected,
                    got: *got,
                },
                other => NezhaError::Transport(other.to_string()),
            };
        }
    }

    if let Some(ne) = e.downcast_ref::<NezhaError>() {
        return ne.clone();
    }
    NezhaError::Transport(e.to_string())
}
