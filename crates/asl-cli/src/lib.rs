pub mod predict;
pub mod train;
pub mod util;
