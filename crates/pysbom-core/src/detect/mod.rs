pub mod manager;
pub mod probe;
pub mod rules;

pub use manager::DetectedManager;
pub use probe::FileProbe;
pub use rules::{Detection, detect};
