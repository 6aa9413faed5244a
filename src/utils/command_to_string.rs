use std::ffi::OsStr;

use itertools::Itertools;

/// Render a command the way it would be typed into a shell
pub fn command_to_string(cmd: &std::process::Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(shell_quote)
        .join(" ")
}

/// Single-quote an argument unless it only holds characters the shell leaves alone
pub fn shell_quote<S: AsRef<OsStr>>(arg: S) -> String {
    let arg = arg.as_ref().to_string_lossy();
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        arg.into_owned()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
