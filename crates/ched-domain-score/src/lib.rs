pub mod bar_index;
pub mod events;
pub mod model;
pub mod notes;
pub mod time;

pub use bar_index::*;
pub use events::*;
pub use model::*;
pub use notes::*;
pub use time::*;
