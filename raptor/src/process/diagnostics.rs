use crate::diagnostic::{Diagnostic, DiagnosticLevel, Diagnostics};
use regex::Regex;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::OnceLock;

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^rapper: (Error|Warning|Fatal error) - (?:(?:URI|file) (\S+?)(?::(\d+))?(?: column (\d+))?)? - (.*)$",
        )
        .expect("the rapper diagnostic pattern is valid")
    })
}

/// Parses one line `rapper` wrote on stderr.
pub(crate) fn parse_line(line: &str) -> Option<Diagnostic> {
    let captures = pattern().captures(line.trim_end())?;
    let level = match &captures[1] {
        "Warning" => DiagnosticLevel::Warning,
        "Fatal error" => DiagnosticLevel::Fatal,
        _ => DiagnosticLevel::Error,
    };
    let number = |i: usize| captures.get(i).and_then(|m| m.as_str().parse::<u64>().ok());
    let line = number(3);
    Some(Diagnostic {
        level,
        message: captures[5].to_owned(),
        line,
        column: line.and(number(4)),
    })
}

/// Reads back everything the process wrote on stderr.
pub(crate) fn collect(stderr: &mut File, diagnostics: &mut Diagnostics) -> io::Result<()> {
    stderr.seek(SeekFrom::Start(0))?;
    let mut buffer = Vec::new();
    stderr.read_to_end(&mut buffer)?;
    for line in String::from_utf8_lossy(&buffer).lines() {
        match parse_line(line) {
            Some(diagnostic) => {
                diagnostics.record(diagnostic);
            }
            None if !line.trim().is_empty() => tracing::debug!("rapper: {}", line),
            None => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn located_errors() {
        let diagnostic = parse_line(
            "rapper: Error - URI file:///dev/stdin:3 column 12 - syntax error at '.'",
        )
        .unwrap();
        assert_eq!(diagnostic.level, DiagnosticLevel::Error);
        assert_eq!(diagnostic.line, Some(3));
        assert_eq!(diagnostic.column, Some(12));
        assert_eq!(diagnostic.message, "syntax error at '.'");
    }

    #[test]
    fn warnings_without_column() {
        let diagnostic =
            parse_line("rapper: Warning - URI http://example.com/doc.rdf:7 - unknown attribute")
                .unwrap();
        assert_eq!(diagnostic.level, DiagnosticLevel::Warning);
        assert_eq!(diagnostic.line, Some(7));
        assert_eq!(diagnostic.column, None);
    }

    #[test]
    fn errors_without_locator() {
        let diagnostic = parse_line("rapper: Error -  - cannot open the file").unwrap();
        assert_eq!(diagnostic.line, None);
        assert_eq!(diagnostic.message, "cannot open the file");
    }

    #[test]
    fn other_lines_are_ignored() {
        assert!(parse_line("rapper: Parsing URI file:///dev/stdin").is_none());
        assert!(parse_line("").is_none());
    }

    #[test]
    fn collects_from_a_file() {
        use std::io::Write;

        let mut file = tempfile::tempfile().unwrap();
        writeln!(file, "rapper: Warning - URI file:///dev/stdin:1 - odd").unwrap();
        writeln!(file, "rapper: Error - URI file:///dev/stdin:2 column 1 - bad").unwrap();
        let mut diagnostics = Diagnostics::default();
        collect(&mut file, &mut diagnostics).unwrap();
        assert_eq!(diagnostics.warnings.len(), 1);
        assert_eq!(diagnostics.take_error().unwrap().line, Some(2));
    }
}
