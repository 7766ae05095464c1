//! Interactive mode.
//!
//! Lines accumulate into a program buffer; a blank line compiles the buffer
//! and echoes every phase. A compile error prints its diagnostic and keeps
//! the session alive. Ctrl-C drops the current buffer, Ctrl-D exits.

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::{compile, render_phases, CompileOptions};

pub fn run(options: &CompileOptions) -> Result<()> {
    println!("NanoC {}", env!("CARGO_PKG_VERSION"));
    println!("Enter a program; a blank line compiles it. Ctrl-D exits.");

    let mut editor = DefaultEditor::new()?;
    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() { "nanoc> " } else { "  ...> " };
        match editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    buffer.push_str(&line);
                    buffer.push('\n');
                    continue;
                }
                if buffer.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(buffer.trim_end().replace('\n', " "));
                match compile(&buffer, options) {
                    Ok(result) => print!("{}", render_phases(&result)),
                    Err(err) => eprintln!("{err}"),
                }
                buffer.clear();
            }
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
                println!("(input discarded)");
            }
            Err(ReadlineError::Eof) => return Ok(()),
            Err(err) => return Err(err.into()),
        }
    }
}
