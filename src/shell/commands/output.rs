//! Output helpers for shell commands.
//!
//! Output piped to a command like `head` may be closed early. A closed pipe
//! ends the command quietly with `Ok(())` instead of an error.

/// Write a line to `$out`, returning `Ok(())` from the caller on BrokenPipe.
/// Other I/O errors are propagated.
#[macro_export]
macro_rules! print_line {
    ($out:expr, $($arg:tt)*) => {{
        match ::std::io::Write::write_fmt(
            &mut *$out,
            format_args!("{}\n", format_args!($($arg)*)),
        ) {
            Ok(()) => {}
            Err(e) if e.kind() == ::std::io::ErrorKind::BrokenPipe => {
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    }};
}

/// Like [`print_line!`] without the trailing newline
#[macro_export]
macro_rules! print_str {
    ($out:expr, $($arg:tt)*) => {{
        match ::std::io::Write::write_fmt(&mut *$out, format_args!($($arg)*)) {
            Ok(()) => {}
            Err(e) if e.kind() == ::std::io::ErrorKind::BrokenPipe => {
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    }};
}
