/// Account-notification extraction: access codes and household updates
pub mod extractor;
pub mod html;
pub mod processor;

pub use extractor::{EmailType, ExtractionRules, FieldSet, LinkText};
pub use processor::{EmailInfo, EmailInfoPipeline};
