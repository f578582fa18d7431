pub mod alerts;
pub mod analyzer;
pub mod correction;
pub mod forbidden;

pub use alerts::record_alert_if_needed;
pub use analyzer::{analyze, classify_severity, DriftAnalysis, Severity};
pub use correction::generate_correction;
pub use forbidden::UNIVERSAL_FORBIDDEN_PHRASES;
