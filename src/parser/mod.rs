//! Parsers for genomic file formats.

pub mod bed;
pub mod gtf;
pub mod stream;
pub mod util;

pub use bed::BedReader;
pub use gtf::GtfReader;
pub use stream::RecordStream;
pub use util::open_input;
