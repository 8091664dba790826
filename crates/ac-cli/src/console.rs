use std::io::{self, BufRead, Write};

use ac_api::Application;
use ac_core::AdminResult;

use crate::{execute_as, map_console_io};

pub(crate) fn run_console(application: &Application, user: Option<&str>) -> AdminResult<i32> {
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut writer = io::stdout();
    run_console_with_io(application, user, &mut reader, &mut writer)
}

/// Reads lines until end of input or until a command stops the application.
pub(crate) fn run_console_with_io(
    application: &Application,
    user: Option<&str>,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> AdminResult<i32> {
    writeln!(writer, "{} console", application.settings().console_name).map_err(map_console_io)?;
    writeln!(writer, "type 'help' for commands, 'quit' to leave").map_err(map_console_io)?;

    while application.is_running() {
        let Some(line) = prompt_input_from("> ", reader, writer)? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let response = execute_as(application, user, line)?;
        for message in &response.messages {
            writeln!(writer, "{}", message).map_err(map_console_io)?;
        }
        if !response.succeeded && response.messages.is_empty() {
            writeln!(writer, "Command failed.").map_err(map_console_io)?;
        }
    }
    Ok(0)
}

/// `None` at end of input.
pub(crate) fn prompt_input_from(
    prefix: &str,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> AdminResult<Option<String>> {
    write!(writer, "{}", prefix).map_err(map_console_io)?;
    writer.flush().map_err(map_console_io)?;
    let mut input = String::new();
    let read = reader.read_line(&mut input).map_err(map_console_io)?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim_end_matches(&['\r', '\n'][..]).to_string()))
}
