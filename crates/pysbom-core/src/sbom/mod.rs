pub mod cyclonedx;
pub mod generate;
pub mod inspect;
pub mod model;
pub mod validate;

pub use generate::SbomGenerator;
pub use validate::SbomValidator;
