pub mod types;
pub mod time_utils;
pub mod csv_source;
pub mod nicknames;

pub use types::{Course, CourseCatalog, Event, Faculty, Group};
pub use csv_source::{load_catalog, read_catalog, CsvCatalogSource};
pub use nicknames::NicknameTable;
