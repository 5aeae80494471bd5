//! PostgreSQL functions emitted by the translator.

pub const JSONB_ARRAY_ELEMENTS_TEXT: &str = "jsonb_array_elements_text";
pub const JSONB_SET: &str = "jsonb_set";
pub const TO_JSONB: &str = "to_jsonb";
pub const ARRAY_LENGTH: &str = "array_length";
pub const ARRAY_AGG: &str = "array_agg";
pub const LOCAL_TIMESTAMP: &str = "localtimestamp";
pub const LOCAL_TIME: &str = "localtime";
pub const CURRENT_TIME: &str = "current_time";
pub const CURRENT_DATE: &str = "current_date";
pub const NOW: &str = "now";
pub const LOWER: &str = "lower";
pub const UPPER: &str = "upper";
