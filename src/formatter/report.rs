use crate::error::Diagnostic;

/// Source excerpt renderer for one file.
///
/// ```text
/// error: unknown function 'vent'
///   --> station.stage:2:3
///   1 | rule leak on tick:
/// > 2 |   vent()
///         ^^^^
///   3 |   set $o2 = 1
///
/// hint: declare it with `function <name>(...)` or check the builtin name
/// ```
#[derive(Debug, Clone)]
pub struct ErrorReport<'a> {
    file: &'a str,
    lines: Vec<&'a str>,
}

impl<'a> ErrorReport<'a> {
    pub fn new(file: &'a str, source: &'a str) -> Self {
        Self {
            file,
            lines: source.lines().collect(),
        }
    }

    pub fn render(&self, diagnostic: &dyn Diagnostic) -> String {
        let mut out = format!("error: {}\n", diagnostic.message());

        if let Some(location) = diagnostic.location() {
            out.push_str(&format!(
                "  --> {}:{}:{}\n",
                self.file, location.line, location.column
            ));
            out.push_str(&self.excerpt(location.line, location.column));
        }

        if let Some(hint) = diagnostic.hint() {
            out.push_str(&format!("\nhint: {}\n", hint));
        }
        out
    }

    /// Context lines around `line` with carets under `column`.
    fn excerpt(&self, line: usize, column: usize) -> String {
        let first = line.saturating_sub(1).max(1);
        let last = (line + 1).min(self.lines.len());
        let width = last.max(line).to_string().len();

        let mut out = String::new();
        for number in first..=last.max(line) {
            let Some(text) = self.line(number) else {
                continue;
            };
            let marker = if number == line { "> " } else { "  " };
            out.push_str(&format!("{}{:<width$} | {}\n", marker, number, text, width = width));
            if number == line {
                let pad = 2 + width + 3 + column.saturating_sub(1);
                let carets = span_length(text, column);
                out.push_str(&format!("{}{}\n", " ".repeat(pad), "^".repeat(carets)));
            }
        }
        out
    }

    /// Renders each diagnostic and joins the blocks with a blank line.
    pub fn render_all(&self, diagnostics: &[&dyn Diagnostic]) -> String {
        diagnostics
            .iter()
            .map(|d| self.render(*d))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn line(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|index| self.lines.get(index))
            .copied()
    }
}

/// Length of the identifier or number run starting at `column`, at least 1.
fn span_length(text: &str, column: usize) -> usize {
    let run = text
        .chars()
        .skip(column.saturating_sub(1))
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '.')
        .count();
    run.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Location;
    use pretty_assertions::assert_eq;

    struct Sample {
        location: Option<Location>,
        hint: Option<&'static str>,
    }

    impl Diagnostic for Sample {
        fn message(&self) -> String {
            "unexpected token".to_string()
        }

        fn location(&self) -> Option<Location> {
            self.location
        }

        fn hint(&self) -> Option<String> {
            self.hint.map(str::to_string)
        }
    }

    const SOURCE: &str = "rule a on tick:\n  set $x = foo + 1\n  emit done\n";

    #[test]
    fn test_render_with_context_and_hint() {
        let report = ErrorReport::new("main.stage", SOURCE);
        let rendered = report.render(&Sample {
            location: Some(Location::new(2, 12)),
            hint: Some("check the name"),
        });
        let expected = "error: unexpected token\n  --> main.stage:2:12\n  1 | rule a on tick:\n> 2 |   set $x = foo + 1\n                 ^^^\n  3 |   emit done\n\nhint: check the name\n";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_first_line_has_no_previous_context() {
        let report = ErrorReport::new("main.stage", SOURCE);
        let rendered = report.render(&Sample {
            location: Some(Location::new(1, 1)),
            hint: None,
        });
        let expected =
            "error: unexpected token\n  --> main.stage:1:1\n> 1 | rule a on tick:\n      ^^^^\n  2 |   set $x = foo + 1\n";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_caret_minimum_and_width() {
        let source = (1..=10).map(|i| format!("line{}", i)).collect::<Vec<_>>().join("\n");
        let report = ErrorReport::new("f", &source);
        let rendered = report.render(&Sample {
            location: Some(Location::new(9, 6)),
            hint: None,
        });
        assert!(rendered.contains("  8  | line8\n"));
        assert!(rendered.contains("> 9  | line9\n"));
        assert!(rendered.contains("  10 | line10\n"));
        // Past the end of the line still gets one caret.
        assert!(rendered.contains(&format!("{}^\n", " ".repeat(2 + 2 + 3 + 5))));
    }

    #[test]
    fn test_without_location() {
        let report = ErrorReport::new("f", SOURCE);
        let rendered = report.render(&Sample {
            location: None,
            hint: Some("h"),
        });
        assert_eq!(rendered, "error: unexpected token\n\nhint: h\n");
    }

    #[test]
    fn test_render_all_joins_with_blank_line() {
        let report = ErrorReport::new("f", SOURCE);
        let a = Sample {
            location: None,
            hint: None,
        };
        let b = Sample {
            location: None,
            hint: None,
        };
        assert_eq!(
            report.render_all(&[&a, &b]),
            "error: unexpected token\n\nerror: unexpected token\n"
        );
    }

    #[test]
    fn test_eval_error_message_has_no_position_suffix() {
        use crate::eval::EvalError;

        let source = "rule leak on tick:\n  vent()\n  set $o2 = 1\n";
        let error = EvalError::UnknownFunction {
            name: "vent".to_string(),
            location: Location::new(2, 3),
        };
        let rendered = ErrorReport::new("station.stage", source).render(&error);
        let expected = "error: unknown function 'vent'\n  --> station.stage:2:3\n  1 | rule leak on tick:\n> 2 |   vent()\n        ^^^^\n  3 |   set $o2 = 1\n\nhint: declare it with `function <name>(...)` or check the builtin name\n";
        assert_eq!(rendered, expected);
    }
}
