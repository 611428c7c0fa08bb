pub mod buffer_pool;
pub mod desaturate;
pub mod stage;

pub use buffer_pool::BufferPool;
pub use desaturate::{Desaturator, FilterState};
pub use stage::DesaturationStage;
