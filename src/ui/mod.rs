pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{
    added, banner, command, dim, error, item, skipped, step, success,
    summary_row, warn,
};
pub use progress::Spinner;
pub use table::{summary_table, TableBuilder};
pub use theme::{theme, Theme};
