//! Tokenizer for the `type:value` argument list of a call descriptor.

use notification_store::TypedValue;

use crate::DescriptorError;

/// Parse a whitespace separated list of `type:value` arguments.
pub fn parse_args(input: &str) -> Result<Vec<TypedValue>, DescriptorError> {
    let mut cursor = Cursor { rest: input };
    let mut args = Vec::new();

    while !cursor.skip_whitespace() {
        let kind = cursor.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
        if kind.is_empty() {
            return Err(DescriptorError::UnknownArgType(cursor.word().to_string()));
        }
        if !cursor.eat(':') {
            let token = format!("{kind}{}", cursor.word());
            return match kind {
                "string" | "int" | "double" => Err(DescriptorError::MissingColon { token }),
                _ => Err(DescriptorError::UnknownArgType(token)),
            };
        }

        let (arg, label) = match kind {
            "string" => (TypedValue::String(cursor.quoted()?), "string"),
            "int" => {
                let text = cursor.word();
                let value = text.parse().map_err(|_| malformed("int", text))?;
                (TypedValue::Int32(value), "int")
            }
            "double" => {
                let text = cursor.word();
                let value: f64 = text.parse().map_err(|_| malformed("double", text))?;
                if !value.is_finite() {
                    return Err(malformed("double", text));
                }
                (TypedValue::Float(value), "double")
            }
            other => return Err(DescriptorError::UnknownArgType(other.to_string())),
        };
        if !cursor.at_boundary() {
            return Err(malformed(label, cursor.word()));
        }
        args.push(arg);
    }
    Ok(args)
}

fn malformed(kind: &'static str, value: &str) -> DescriptorError {
    DescriptorError::MalformedValue {
        kind,
        value: value.to_string(),
    }
}

struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    /// Returns `true` once the input is exhausted.
    fn skip_whitespace(&mut self) -> bool {
        self.rest = self.rest.trim_start();
        self.rest.is_empty()
    }

    fn at_boundary(&self) -> bool {
        self.rest.is_empty() || self.rest.starts_with(char::is_whitespace)
    }

    fn eat(&mut self, c: char) -> bool {
        match self.rest.strip_prefix(c) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let end = self
            .rest
            .char_indices()
            .find(|&(_, c)| !pred(c))
            .map_or(self.rest.len(), |(i, _)| i);
        let (taken, rest) = self.rest.split_at(end);
        self.rest = rest;
        taken
    }

    fn word(&mut self) -> &'a str {
        self.take_while(|c| !c.is_whitespace())
    }

    /// A single or double quoted string. Double quoted strings understand
    /// `\"`, `\\`, `\n` and `\t`; single quoted ones are taken literally.
    fn quoted(&mut self) -> Result<String, DescriptorError> {
        let quote = match self.rest.chars().next() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(malformed("string", self.word())),
        };
        self.rest = &self.rest[1..];

        let mut out = String::new();
        let mut chars = self.rest.char_indices();
        while let Some((i, c)) = chars.next() {
            if c == quote {
                self.rest = &self.rest[i + 1..];
                return Ok(out);
            }
            if c == '\\' && quote == '"' {
                match chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, escaped)) => out.push(escaped),
                    None => break,
                }
            } else {
                out.push(c);
            }
        }
        Err(DescriptorError::UnterminatedString)
    }
}
