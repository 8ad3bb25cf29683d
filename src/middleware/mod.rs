mod error_handler;
mod gate;

pub use error_handler::log_errors;
pub use gate::{API_KEY_HEADER, Admission, AdmissionDecision, RequestGate, api_key_gate};
