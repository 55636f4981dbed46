//! Artifact dialect lowering.
//!
//! Author source is Luau extended with two pieces of modern syntax:
//! `export default` (expression and function-declaration forms) and inline
//! element tags (`<button id="b">Hi</button>`). This pass lowers both to
//! plain Luau (`exports.default = ...` assignments and
//! `ui.element(tag, props, children)` calls) so the evaluator can run the
//! chunk without any build step. `import X from "mod"` is lowered to
//! `local X = require("mod")`; the scope blocks `require`, so imports fail
//! at evaluation, not here.
//!
//! The scanner respects Luau strings (short and long form) and comments,
//! and leaves `<` in ordinary expression position untouched.

use crate::error::CompileError;

/// The lowered form of one artifact source. Created fresh per render
/// attempt, never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledModule {
    pub chunk: String,
}

/// Lower artifact source to a plain Luau chunk.
pub fn lower(source: &str) -> Result<CompiledModule, CompileError> {
    let mut lowerer = Lowerer::new(source);
    lowerer.lower_block(BlockStop::Eof)?;
    if let DefaultExport::Named { name, .. } = &lowerer.default_export {
        let assignment = format!("\nexports.default = {name}\n");
        lowerer.out.push_str(&assignment);
    }
    Ok(CompiledModule { chunk: lowerer.out })
}

#[derive(Debug, Clone, PartialEq)]
enum DefaultExport {
    None,
    /// `export default <expr>` or anonymous function form.
    Expr { line: usize },
    /// `export default function Name ...`; the assignment is appended at
    /// the end of the chunk.
    Named { name: String, line: usize },
}

impl DefaultExport {
    fn line(&self) -> Option<usize> {
        match self {
            DefaultExport::None => None,
            DefaultExport::Expr { line } | DefaultExport::Named { line, .. } => Some(*line),
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum BlockStop {
    /// Lower until end of input.
    Eof,
    /// Lower until the brace that closes an already-open `{` (not emitted).
    Brace,
}

struct Lowerer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    out: String,
    /// True when the next token sits in operand position, which is where
    /// an element tag may start. After an operand, `<` is a comparison.
    expect_operand: bool,
    default_export: DefaultExport,
}

impl Lowerer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            out: String::with_capacity(source.len() + 64),
            expect_operand: true,
            default_export: DefaultExport::None,
        }
    }

    // --- Low-level scanning ---------------------------------------------

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn copy(&mut self) {
        if let Some(c) = self.bump() {
            self.out.push(c);
        }
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::Parse {
            line: self.line,
            column: self.col,
            message: message.into(),
        }
    }

    fn checkpoint(&self) -> (usize, usize, usize) {
        (self.pos, self.line, self.col)
    }

    fn restore(&mut self, cp: (usize, usize, usize)) {
        self.pos = cp.0;
        self.line = cp.1;
        self.col = cp.2;
    }

    /// Skip whitespace without emitting; returns how many newlines passed.
    fn skip_ws(&mut self) -> usize {
        let mut newlines = 0;
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            if c == '\n' {
                newlines += 1;
            }
            self.bump();
        }
        newlines
    }

    fn read_ident(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }
        word
    }

    // --- Main pass -------------------------------------------------------

    fn lower_block(&mut self, stop: BlockStop) -> Result<(), CompileError> {
        let mut brace_depth: usize = if stop == BlockStop::Brace { 1 } else { 0 };
        loop {
            let Some(c) = self.peek() else {
                if stop == BlockStop::Brace {
                    return Err(self.error("unexpected end of input inside '{...}' expression"));
                }
                return Ok(());
            };
            match c {
                '-' if self.peek_at(1) == Some('-') => self.copy_comment(),
                '"' | '\'' => {
                    self.copy_quoted_string();
                    self.expect_operand = false;
                }
                '[' if self.long_bracket_level().is_some() => {
                    self.copy_long_string();
                    self.expect_operand = false;
                }
                '{' => {
                    if stop == BlockStop::Brace {
                        brace_depth += 1;
                    }
                    self.copy();
                    self.expect_operand = true;
                }
                '}' => {
                    if stop == BlockStop::Brace {
                        brace_depth -= 1;
                        if brace_depth == 0 {
                            self.bump();
                            return Ok(());
                        }
                    }
                    self.copy();
                    self.expect_operand = false;
                }
                '<' => {
                    let starts_tag = self.expect_operand
                        && self.peek_at(1).is_some_and(|c| c.is_ascii_alphabetic());
                    if starts_tag {
                        let element = self.parse_element()?;
                        self.out.push_str(&element);
                        self.expect_operand = false;
                    } else {
                        self.copy();
                        self.expect_operand = true;
                    }
                }
                c if c.is_ascii_alphabetic() || c == '_' => self.lower_word()?,
                c if c.is_ascii_digit() => {
                    while let Some(c) = self.peek() {
                        if c.is_ascii_alphanumeric() || c == '.' {
                            self.copy();
                        } else {
                            break;
                        }
                    }
                    self.expect_operand = false;
                }
                ')' | ']' => {
                    self.copy();
                    self.expect_operand = false;
                }
                c if c.is_whitespace() => self.copy(),
                _ => {
                    self.copy();
                    self.expect_operand = true;
                }
            }
        }
    }

    fn lower_word(&mut self) -> Result<(), CompileError> {
        let word_line = self.line;
        let word = self.read_ident();
        match word.as_str() {
            "import" => {
                if !self.try_lower_import() {
                    self.out.push_str(&word);
                    self.expect_operand = false;
                }
                Ok(())
            }
            "export" => {
                let cp = self.checkpoint();
                let newlines = self.skip_ws();
                let next = self.read_ident();
                if next == "default" {
                    self.lower_export_default(word_line, newlines)
                } else {
                    self.restore(cp);
                    self.out.push_str(&word);
                    self.expect_operand = false;
                    Ok(())
                }
            }
            _ => {
                self.out.push_str(&word);
                self.expect_operand = keyword_expects_operand(&word);
                Ok(())
            }
        }
    }

    /// `import Name from "mod"` -> `local Name = require("mod")`;
    /// `import "mod"` -> `require("mod")`. Anything else leaves the word
    /// untouched (it is then an ordinary identifier).
    fn try_lower_import(&mut self) -> bool {
        let cp = self.checkpoint();
        let mut newlines = self.skip_ws();
        if matches!(self.peek(), Some('"') | Some('\'')) {
            let Some(module) = self.read_quoted_raw() else {
                self.restore(cp);
                return false;
            };
            self.out.push_str("require(");
            self.out.push_str(&module);
            self.out.push(')');
            self.push_newlines(newlines);
            self.expect_operand = true;
            return true;
        }
        let name = self.read_ident();
        if name.is_empty() {
            self.restore(cp);
            return false;
        }
        newlines += self.skip_ws();
        let from = self.read_ident();
        if from != "from" {
            self.restore(cp);
            return false;
        }
        newlines += self.skip_ws();
        let Some(module) = self.read_quoted_raw() else {
            self.restore(cp);
            return false;
        };
        self.out.push_str("local ");
        self.out.push_str(&name);
        self.out.push_str(" = require(");
        self.out.push_str(&module);
        self.out.push(')');
        self.push_newlines(newlines);
        self.expect_operand = true;
        true
    }

    fn lower_export_default(
        &mut self,
        line: usize,
        mut newlines: usize,
    ) -> Result<(), CompileError> {
        if let Some(first) = self.default_export.line() {
            return Err(CompileError::DuplicateDefaultExport {
                line: first.max(line),
            });
        }
        newlines += self.skip_ws();
        self.push_newlines(newlines);

        let cp = self.checkpoint();
        let word = self.read_ident();
        if word == "function" {
            let ws = self.skip_ws();
            if self.peek().is_some_and(|c| c.is_ascii_alphabetic() || c == '_') {
                let name = self.read_ident();
                self.out.push_str("local function ");
                self.out.push_str(&name);
                self.push_newlines(ws);
                self.default_export = DefaultExport::Named { name, line };
            } else {
                self.out.push_str("exports.default = function");
                self.push_newlines(ws);
                self.default_export = DefaultExport::Expr { line };
            }
        } else {
            self.restore(cp);
            self.out.push_str("exports.default = ");
            self.default_export = DefaultExport::Expr { line };
        }
        self.expect_operand = true;
        Ok(())
    }

    fn push_newlines(&mut self, n: usize) {
        for _ in 0..n {
            self.out.push('\n');
        }
    }

    // --- Strings and comments ---------------------------------------------

    fn copy_comment(&mut self) {
        self.copy();
        self.copy();
        if let Some(level) = self.long_bracket_level() {
            self.copy_long_bracketed(level);
            return;
        }
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.copy();
        }
    }

    fn copy_quoted_string(&mut self) {
        let quote = self.peek().unwrap_or('"');
        self.copy();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.copy();
                self.copy();
                continue;
            }
            let done = c == quote || c == '\n';
            self.copy();
            if done {
                break;
            }
        }
    }

    /// Level of a long-bracket opener (`[[`, `[=[`, ...) at the cursor.
    fn long_bracket_level(&self) -> Option<usize> {
        if self.peek() != Some('[') {
            return None;
        }
        let mut level = 0;
        while self.peek_at(1 + level) == Some('=') {
            level += 1;
        }
        (self.peek_at(1 + level) == Some('[')).then_some(level)
    }

    fn copy_long_string(&mut self) {
        if let Some(level) = self.long_bracket_level() {
            self.copy_long_bracketed(level);
        }
    }

    fn copy_long_bracketed(&mut self, level: usize) {
        for _ in 0..level + 2 {
            self.copy();
        }
        while self.peek().is_some() {
            if self.peek() == Some(']') {
                let mut n = 0;
                while self.peek_at(1 + n) == Some('=') {
                    n += 1;
                }
                if n == level && self.peek_at(1 + n) == Some(']') {
                    for _ in 0..level + 2 {
                        self.copy();
                    }
                    return;
                }
            }
            self.copy();
        }
    }

    /// Read a quoted string and return its raw text, quotes included.
    /// Returns None when the string is unterminated.
    fn read_quoted_raw(&mut self) -> Option<String> {
        let quote = self.peek()?;
        if quote != '"' && quote != '\'' {
            return None;
        }
        let mut raw = String::new();
        raw.push(self.bump()?);
        while let Some(c) = self.peek() {
            if c == '\\' {
                raw.push(self.bump()?);
                if let Some(next) = self.bump() {
                    raw.push(next);
                }
                continue;
            }
            if c == '\n' {
                return None;
            }
            raw.push(self.bump()?);
            if c == quote {
                return Some(raw);
            }
        }
        None
    }

    // --- Element tags -----------------------------------------------------

    /// Parse `<tag attr=... >children</tag>` (or self-closing) at the
    /// cursor and return the lowered `ui.element(...)` call, padded with
    /// the newlines the element spanned so later line numbers stay true.
    fn parse_element(&mut self) -> Result<String, CompileError> {
        let start_line = self.line;
        self.bump(); // '<'
        let tag = self.read_ident().to_ascii_lowercase();
        if tag.is_empty() {
            return Err(self.error("expected an element tag after '<'"));
        }

        let mut props: Vec<(String, String)> = Vec::new();
        let mut children: Vec<String> = Vec::new();
        let mut self_closing = false;

        loop {
            self.skip_ws();
            match self.peek() {
                Some('/') => {
                    self.bump();
                    if self.peek() != Some('>') {
                        return Err(self.error(format!("expected '>' after '/' in <{tag}>")));
                    }
                    self.bump();
                    self_closing = true;
                    break;
                }
                Some('>') => {
                    self.bump();
                    break;
                }
                Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                    let (name, value) = self.parse_attribute(&tag)?;
                    props.push((name, value));
                }
                Some(c) => {
                    return Err(self.error(format!("unexpected '{c}' in <{tag}> attributes")));
                }
                None => return Err(self.error(format!("unclosed element <{tag}>"))),
            }
        }

        if !self_closing {
            self.parse_children(&tag, &mut children)?;
        }

        let mut call = String::new();
        call.push_str("ui.element(\"");
        call.push_str(&tag);
        call.push_str("\", {");
        for (i, (name, value)) in props.iter().enumerate() {
            if i > 0 {
                call.push(',');
            }
            call.push_str(" [\"");
            call.push_str(name);
            call.push_str("\"] = ");
            call.push_str(value);
        }
        call.push_str(if props.is_empty() { "}, {" } else { " }, {" });
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                call.push(',');
            }
            call.push(' ');
            call.push_str(child);
        }
        call.push_str(if children.is_empty() { "})" } else { " })" });
        // Pad with the newlines the element spanned (minus any already
        // embedded by nested elements) so later line numbers stay true.
        let spanned = self.line - start_line;
        let embedded = call.matches('\n').count();
        for _ in 0..spanned.saturating_sub(embedded) {
            call.push('\n');
        }
        Ok(call)
    }

    fn parse_attribute(&mut self, tag: &str) -> Result<(String, String), CompileError> {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        self.skip_ws();
        if self.peek() != Some('=') {
            // Bare attribute: `<button disabled>`.
            return Ok((name, "true".to_string()));
        }
        self.bump();
        self.skip_ws();
        match self.peek() {
            Some('"') | Some('\'') => {
                let raw = self.read_quoted_raw().ok_or_else(|| {
                    self.error(format!("unterminated string for attribute '{name}' in <{tag}>"))
                })?;
                Ok((name, raw))
            }
            Some('{') => {
                self.bump();
                let expr = self.lower_braced_expr()?;
                if expr.trim().is_empty() {
                    return Err(
                        self.error(format!("empty expression for attribute '{name}' in <{tag}>"))
                    );
                }
                Ok((name, format!("({})", expr.trim())))
            }
            _ => Err(self.error(format!("expected a value for attribute '{name}' in <{tag}>"))),
        }
    }

    fn parse_children(
        &mut self,
        tag: &str,
        children: &mut Vec<String>,
    ) -> Result<(), CompileError> {
        let mut text = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error(format!("unclosed element <{tag}>"))),
                Some('<') => {
                    flush_text(&mut text, children);
                    if self.peek_at(1) == Some('/') {
                        self.bump();
                        self.bump();
                        let close = self.read_ident().to_ascii_lowercase();
                        self.skip_ws();
                        if self.peek() != Some('>') {
                            return Err(self.error(format!("expected '>' to close </{close}")));
                        }
                        self.bump();
                        if close != tag {
                            return Err(self.error(format!(
                                "mismatched closing tag </{close}>, expected </{tag}>"
                            )));
                        }
                        return Ok(());
                    }
                    if self.peek_at(1).is_some_and(|c| c.is_ascii_alphabetic()) {
                        let nested = self.parse_element()?;
                        children.push(nested);
                    } else {
                        return Err(
                            self.error(format!("unexpected '<' in children of <{tag}>"))
                        );
                    }
                }
                Some('{') => {
                    flush_text(&mut text, children);
                    self.bump();
                    let expr = self.lower_braced_expr()?;
                    if !expr.trim().is_empty() {
                        children.push(format!("({})", expr.trim()));
                    }
                }
                Some(c) => {
                    if c.is_whitespace() {
                        if !text.is_empty() && !text.ends_with(' ') {
                            text.push(' ');
                        }
                        self.bump();
                    } else {
                        text.push(c);
                        self.bump();
                    }
                }
            }
        }
    }

    /// Lower a `{...}` expression (already past the opening brace), reusing
    /// the main pass so nested tags, strings and comments are handled.
    fn lower_braced_expr(&mut self) -> Result<String, CompileError> {
        let mark = self.out.len();
        let saved = self.expect_operand;
        self.expect_operand = true;
        self.lower_block(BlockStop::Brace)?;
        self.expect_operand = saved;
        Ok(self.out.split_off(mark))
    }
}

fn flush_text(text: &mut String, children: &mut Vec<String>) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        children.push(lua_quote(trimmed));
    }
    text.clear();
}

fn lua_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Whether an identifier keeps the scanner in operand position. Keywords
/// like `return` expect an expression next; value keywords and `end` do
/// not. Ordinary identifiers are operands themselves.
fn keyword_expects_operand(word: &str) -> bool {
    matches!(
        word,
        "and"
            | "break"
            | "continue"
            | "do"
            | "else"
            | "elseif"
            | "for"
            | "function"
            | "if"
            | "in"
            | "local"
            | "not"
            | "or"
            | "repeat"
            | "return"
            | "then"
            | "until"
            | "while"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn chunk(source: &str) -> String {
        lower(source).expect("lowering failed").chunk
    }

    #[test]
    fn lowers_default_export_function() {
        let out = chunk("export default function Hello() return 1 end");
        assert_eq!(
            out,
            "local function Hello() return 1 end\nexports.default = Hello\n"
        );
    }

    #[test]
    fn lowers_anonymous_default_export() {
        let out = chunk("export default function() return 1 end");
        assert_eq!(out, "exports.default = function() return 1 end");
    }

    #[test]
    fn lowers_default_export_expression() {
        let out = chunk("local f = 1\nexport default f");
        assert_eq!(out, "local f = 1\nexports.default = f");
    }

    #[test]
    fn rejects_duplicate_default_export() {
        let err = lower("export default function A() end\nexport default function B() end")
            .unwrap_err();
        assert!(matches!(err, CompileError::DuplicateDefaultExport { .. }));
    }

    #[test]
    fn lowers_self_closing_element() {
        let out = chunk("return <input value=\"x\" />");
        assert_eq!(out, "return ui.element(\"input\", { [\"value\"] = \"x\" }, {})");
    }

    #[test]
    fn lowers_element_with_text_child() {
        let out = chunk("return <button>Hi</button>");
        assert_eq!(out, "return ui.element(\"button\", {}, { \"Hi\" })");
    }

    #[test]
    fn lowers_nested_elements_and_expressions() {
        let out = chunk("return <stack gap={4}><text>{greeting()}</text></stack>");
        assert_eq!(
            out,
            "return ui.element(\"stack\", { [\"gap\"] = (4) }, \
             { ui.element(\"text\", {}, { (greeting()) }) })"
        );
    }

    #[test]
    fn bare_attribute_becomes_true() {
        let out = chunk("return <button disabled>Hi</button>");
        assert_eq!(
            out,
            "return ui.element(\"button\", { [\"disabled\"] = true }, { \"Hi\" })"
        );
    }

    #[test]
    fn tags_are_case_insensitive() {
        let out = chunk("return <Button>Hi</Button>");
        assert_eq!(out, "return ui.element(\"button\", {}, { \"Hi\" })");
    }

    #[test]
    fn comparison_less_than_is_untouched() {
        let out = chunk("local ok = a < b\nreturn ok");
        assert_eq!(out, "local ok = a < b\nreturn ok");
    }

    #[test]
    fn strings_and_comments_are_verbatim() {
        let src = "-- a <button> in a comment\nlocal s = \"<input />\"\nreturn s";
        assert_eq!(chunk(src), src);
    }

    #[test]
    fn lowers_import_to_blocked_require() {
        let out = chunk("import fs from \"fs\"\nreturn fs");
        assert_eq!(out, "local fs = require(\"fs\")\nreturn fs");
    }

    #[test]
    fn side_effect_import_form() {
        let out = chunk("import \"polyfill\"");
        assert_eq!(out, "require(\"polyfill\")");
    }

    #[test]
    fn import_as_plain_identifier_is_untouched() {
        let out = chunk("local import = 1\nreturn import + 1");
        assert_eq!(out, "local import = 1\nreturn import + 1");
    }

    #[test]
    fn multiline_element_preserves_line_count() {
        let src = "return <stack>\n  <text>hey</text>\n</stack>\nlocal x = 1";
        let out = chunk(src);
        assert_eq!(out.matches('\n').count(), src.matches('\n').count());
        assert!(out.ends_with("local x = 1"));
    }

    #[test]
    fn unclosed_element_is_a_parse_error() {
        let err = lower("return <button>Hi").unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));
        assert!(err.to_string().contains("unclosed element"));
    }

    #[test]
    fn mismatched_close_tag_is_a_parse_error() {
        let err = lower("return <button>Hi</stack>").unwrap_err();
        assert!(err.to_string().contains("mismatched closing tag"));
    }

    #[test]
    fn braces_in_attribute_expressions_balance() {
        let out = chunk("return <text label={ ({ a = 1 }).a }>x</text>");
        assert_eq!(
            out,
            "return ui.element(\"text\", { [\"label\"] = (({ a = 1 }).a) }, { \"x\" })"
        );
    }

    #[test]
    fn elements_nest_inside_braced_expressions() {
        let out = chunk("return <stack>{ cond and <text>a</text> or <text>b</text> }</stack>");
        assert_eq!(
            out,
            "return ui.element(\"stack\", {}, { (cond and ui.element(\"text\", {}, { \"a\" }) \
             or ui.element(\"text\", {}, { \"b\" })) })"
        );
    }
}
