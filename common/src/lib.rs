//! photo-lens Common Library
//!
//! CLIと対話セッションで共有される型・履歴・ユーティリティ

pub mod types;
pub mod history;
pub mod layout;
pub mod error;
pub mod parser;
pub mod prompts;

pub use types::{
    ClassificationRecord, ClassificationTag, EditedImage, GeoPoint, ImageData, ResultEntry,
    ResultPayload, ThreatLevel,
};
pub use history::{History, ResetPolicy};
pub use layout::{ReportField, ReportLayout};
pub use error::{Error, Result};
pub use parser::{extract_json, normalize_confidence, parse_classification_response};
pub use prompts::{
    classification_response_schema, validate_instruction, IDENTIFY_SYSTEM_INSTRUCTION,
    IDENTIFY_USER_PROMPT,
};
