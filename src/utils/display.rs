use crate::core::message::{Role, WireMessage};
use colored::*;
use std::io::{self, Write};

pub fn print_header(text: &str) {
    println!("\n{}", text.bright_cyan().bold());
    println!("{}", "=".repeat(text.len()).bright_cyan());
}

pub fn print_success(text: &str) {
    println!("{}", text.green());
}

pub fn print_error(text: &str) {
    eprintln!("{}", text.red().bold());
}

pub fn print_info(text: &str) {
    println!("{}", text.blue());
}

pub fn print_prompt(text: &str) {
    let _ = write_prompt(&mut io::stdout(), text);
}

/// Prompts have no trailing newline, so flush to show them before input
fn write_prompt(out: &mut impl Write, text: &str) -> io::Result<()> {
    write!(out, "{}", text.yellow().bold())?;
    out.flush()
}

/// Render one transcript line, labelled by speaker
pub fn print_message(message: &WireMessage) {
    let label = match Role::parse(&message.kind) {
        Some(Role::Ai) => "Assistant:".magenta().bold(),
        Some(Role::System) => "System:".dimmed(),
        _ => "You:".yellow().bold(),
    };
    println!("{} {}", label, message.content);
}

pub fn print_summary(summary: &str) {
    if summary.is_empty() {
        println!("{}", "(no summary yet)".dimmed());
    } else {
        println!("{} {}", "Summary:".bright_cyan().bold(), summary.italic());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingWriter {
        written: Vec<u8>,
        flushed: usize,
    }

    impl Write for RecordingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushed = self.written.len();
            Ok(())
        }
    }

    #[test]
    fn test_prompt_is_flushed() {
        let mut out = RecordingWriter::default();

        write_prompt(&mut out, "You: ").unwrap();

        assert!(String::from_utf8_lossy(&out.written).contains("You: "));
        assert_eq!(out.flushed, out.written.len());
    }
}
