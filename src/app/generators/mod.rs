pub mod demul;
pub mod mesen;

pub use demul::DemulGenerator;
pub use mesen::MesenGenerator;
