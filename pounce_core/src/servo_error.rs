//! Maps `Box<dyn Error>` from the servo trait boundary to typed
//! `ManeuverError`, with a feature-gated downcast for
//! `pounce_hardware::HwError`.

use crate::error::ManeuverError;

/// Map a trait-boundary error to a typed `ManeuverError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_servo_error(e: &(dyn std::error::Error + 'static)) -> ManeuverError {
    // Feature-gated: try to downcast to HwError for precise mapping
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<pounce_hardware::error::HwError>() {
            return match hw {
                pounce_hardware::error::HwError::Timeout => ManeuverError::Timeout,
                pounce_hardware::error::HwError::Fault { .. } => {
                    ManeuverError::ServoFault(hw.to_string())
                }
                other => ManeuverError::Servo(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        ManeuverError::Timeout
    } else {
        ManeuverError::Servo(s)
    }
}
