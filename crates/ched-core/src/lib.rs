pub mod diagnostics;
pub mod pipeline;
pub mod plugin;
pub mod timeline;

pub use diagnostics::*;
pub use pipeline::*;
pub use plugin::*;
pub use timeline::*;
