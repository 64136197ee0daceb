pub mod data_line;
pub mod exporter;
pub mod identifier;
pub mod line_data;

pub use data_line::*;
pub use exporter::*;
pub use identifier::*;
pub use line_data::*;
