pub mod layout;
pub mod loaders;
pub mod record;

pub use layout::{FieldSchema, FieldSpec, HistoryLayout, IndexLayout, PageLayout};
pub use loaders::{load_layout, load_layout_or_default};
pub use record::{Dataset, EntityRecord, HistoryRecord, RecordView};
