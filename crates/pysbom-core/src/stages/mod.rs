pub mod install;
pub mod tool;

pub use install::DependencyInstaller;
pub use tool::ToolInstaller;
