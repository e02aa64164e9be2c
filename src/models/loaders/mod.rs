pub mod toml_loader;

pub use toml_loader::{load_layout, load_layout_or_default};
