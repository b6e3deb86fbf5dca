mod backend;
mod errors;
mod feed;
mod geo;
mod ids;
mod page;
mod records;

pub use backend::*;
pub use errors::*;
pub use feed::*;
pub use geo::*;
pub use ids::*;
pub use page::*;
pub use records::*;
