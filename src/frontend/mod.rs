//! Terminal front end: program selection, live progress and the bin picker

pub mod picker;
pub mod progress;
pub mod runner;
pub mod selector;

pub use picker::{BinPicker, PickerOutcome, pick_bins};
pub use progress::{ProgressBoard, Tally, status_line};
pub use runner::run_install;
pub use selector::{filter_only, prompt_programs};
