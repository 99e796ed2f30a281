//! Stamp AI Common Library
//!
//! CLIと解析パイプラインで共有される型とユーティリティ（I/Oなし）

pub mod types;
pub mod error;
pub mod parser;
pub mod prompts;

pub use types::{CollectedStamp, Citation, Rarity, StampRecord, MAX_DESCRIPTION_CHARS};
pub use error::{Error, Result};
pub use parser::{
    dedup_urls, extract_source_urls, find_balanced_object, parse_identification,
    record_from_object, strip_code_fence, ParseOutcome,
};
pub use prompts::{build_identification_prompt, build_visual_prompt};
