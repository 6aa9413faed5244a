mod command_to_string;
mod detect_software;
mod expand_and_resolve_path;
mod publish;

pub use command_to_string::command_to_string;
pub use command_to_string::shell_quote;

pub use detect_software::check_executable;
pub use detect_software::find_executable;

pub use expand_and_resolve_path::expand_and_resolve_path;

pub use publish::publish;
pub use publish::remove_if_exists;
pub use publish::staging_path;
