//! One module per subcommand, each exposing `execute`.

pub mod add;
pub mod change_password;
pub mod completions;
pub mod delete;
pub mod export;
pub mod get;
pub mod init;
pub mod interactive;
pub mod list;
pub mod providers;
pub mod serve;
