pub mod migrate;
pub mod util;
pub mod workspace;
