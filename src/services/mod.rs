pub mod field_extractor;
pub mod history_navigator;
pub mod key_value_parser;
pub mod link_collector;
pub mod observer;
pub mod persist;

pub use field_extractor::FieldExtractor;
pub use history_navigator::{HistoryNavigator, HistoryOutcome};
pub use key_value_parser::{normalize_column, normalize_key, KeyValueTableParser};
pub use link_collector::LinkCollector;
pub use observer::{ScrapeObserver, TracingObserver};
pub use persist::{write_history, OutputFormat, PersistReport, Persister};
