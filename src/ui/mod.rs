pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{
    check_fail, check_pass, dim, domain_label, error, header, muted, section, status, success,
    summary_row, warn,
};
pub use progress::Spinner;
pub use table::{domains_table, inventions_table, search_table, stats_table};
pub use theme::{Theme, theme};
