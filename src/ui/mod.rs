pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{
    commit_line, dim, error, function_hit, header, human_bytes, index_warning, info, muted,
    related_file, section, status, success, timing, warn,
};
pub use table::{TableBuilder, db_stats_table, overview_table};
pub use theme::{Theme, theme};
