//! Textual descriptions of outbound bus calls.
//!
//! A descriptor reads `<service> <path> <interface> <member> [args]`, where the
//! optional argument list is a whitespace separated sequence of `type:value`
//! tokens (`string:"..."`, `int:N`, `double:N`). Category configuration and
//! `dbus-callback-<action>` hints both use this format.

mod tokenizer;

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use notification_store::TypedValue;
use regex::Regex;
use serde::Serialize;

pub use tokenizer::parse_args;

static RE_BUS_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(:[A-Za-z0-9_-]+(\.[A-Za-z0-9_-]+)+|[A-Za-z_-][A-Za-z0-9_-]*(\.[A-Za-z_-][A-Za-z0-9_-]*)+)$")
        .unwrap()
});
static RE_OBJECT_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/([A-Za-z0-9_]+(/[A-Za-z0-9_]+)*)?$").unwrap());
static RE_INTERFACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)+$").unwrap()
});
static RE_MEMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// A method call to dispatch without waiting for a reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallDescriptor {
    pub service: String,
    pub path: String,
    pub interface: String,
    pub member: String,
    pub args: Vec<TypedValue>,
}

impl CallDescriptor {
    pub fn parse(desc: &str) -> Result<Self, DescriptorError> {
        let desc = desc.trim();
        let mut rest = desc;
        let mut head = Vec::with_capacity(4);
        while head.len() < 4 {
            let Some((word, tail)) = next_word(rest) else {
                return Err(DescriptorError::TooFewElements(head.len()));
            };
            head.push(word);
            rest = tail;
        }

        let [service, path, interface, member] = [head[0], head[1], head[2], head[3]];
        if !RE_BUS_NAME.is_match(service) {
            return Err(DescriptorError::InvalidService(service.to_string()));
        }
        if !RE_OBJECT_PATH.is_match(path) {
            return Err(DescriptorError::InvalidPath(path.to_string()));
        }
        if !RE_INTERFACE.is_match(interface) {
            return Err(DescriptorError::InvalidInterface(interface.to_string()));
        }
        if !RE_MEMBER.is_match(member) {
            return Err(DescriptorError::InvalidMember(member.to_string()));
        }

        Ok(Self {
            service: service.to_string(),
            path: path.to_string(),
            interface: interface.to_string(),
            member: member.to_string(),
            args: parse_args(rest)?,
        })
    }

    /// Append one more literal argument, e.g. the account a group collapsed to.
    pub fn with_arg(mut self, arg: impl Into<TypedValue>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl FromStr for CallDescriptor {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Writes the descriptor in the text form [`CallDescriptor::parse`] reads.
///
/// `Byte` and in-range `Int64` arguments are written as `int:`, so they parse
/// back as `Int32`. `None` and `Int64` values outside the `int` range have no
/// text form and are left out.
impl fmt::Display for CallDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.service, self.path, self.interface, self.member
        )?;
        for arg in &self.args {
            match arg {
                TypedValue::String(s) => {
                    let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
                    write!(f, " string:\"{escaped}\"")?;
                }
                TypedValue::Float(v) => write!(f, " double:{v:?}")?,
                TypedValue::Int32(v) => write!(f, " int:{v}")?,
                TypedValue::Byte(v) => write!(f, " int:{v}")?,
                TypedValue::Int64(v) => {
                    if let Ok(v) = i32::try_from(*v) {
                        write!(f, " int:{v}")?;
                    }
                }
                TypedValue::None => {}
            }
        }
        Ok(())
    }
}

fn next_word(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }
    let end = input.find(char::is_whitespace).unwrap_or(input.len());
    Some((&input[..end], &input[end..]))
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("expected service, path, interface and member, found {0} element(s)")]
    TooFewElements(usize),
    #[error("invalid bus name: {0}")]
    InvalidService(String),
    #[error("invalid object path: {0}")]
    InvalidPath(String),
    #[error("invalid interface name: {0}")]
    InvalidInterface(String),
    #[error("invalid member name: {0}")]
    InvalidMember(String),
    #[error("unknown argument type {0:?} (expected string, int or double)")]
    UnknownArgType(String),
    #[error("argument {token:?} is missing ':' after its type")]
    MissingColon { token: String },
    #[error("malformed {kind} value: {value:?}")]
    MalformedValue { kind: &'static str, value: String },
    #[error("unterminated string argument")]
    UnterminatedString,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_without_args() {
        let d = CallDescriptor::parse(
            "com.nokia.osso_addressbook /com/nokia/osso_addressbook com.nokia.osso_addressbook top_application",
        )
        .unwrap();
        assert_eq!(d.service, "com.nokia.osso_addressbook");
        assert_eq!(d.path, "/com/nokia/osso_addressbook");
        assert_eq!(d.interface, "com.nokia.osso_addressbook");
        assert_eq!(d.member, "top_application");
        assert!(d.args.is_empty());
    }

    #[test]
    fn test_parse_with_args() {
        let d: CallDescriptor = r#"org.example.Chat /org/example/Chat org.example.Chat Open string:"hello world" int:-3 double:2.5"#
            .parse()
            .unwrap();
        assert_eq!(
            d.args,
            vec![
                TypedValue::String("hello world".into()),
                TypedValue::Int32(-3),
                TypedValue::Float(2.5),
            ]
        );
    }

    #[test]
    fn test_display_writes_only_int_range_integers() {
        let d = CallDescriptor::parse("org.a.B /a org.a.B M")
            .unwrap()
            .with_arg(TypedValue::Int64(7))
            .with_arg(TypedValue::Byte(2))
            .with_arg(TypedValue::Int64(i64::MAX))
            .with_arg(TypedValue::None);
        let text = d.to_string();
        assert_eq!(text, "org.a.B /a org.a.B M int:7 int:2");
        assert_eq!(
            CallDescriptor::parse(&text).unwrap().args,
            vec![TypedValue::Int32(7), TypedValue::Int32(2)]
        );
    }

    #[test]
    fn test_extra_whitespace_between_elements() {
        let d = CallDescriptor::parse("  org.a.B   /   org.a.B   Ping  ").unwrap();
        assert_eq!(d.path, "/");
        assert_eq!(d.member, "Ping");
    }

    #[test]
    fn test_too_few_elements() {
        assert_eq!(
            CallDescriptor::parse("org.a.B /org/a org.a.B"),
            Err(DescriptorError::TooFewElements(3))
        );
        assert_eq!(
            CallDescriptor::parse(""),
            Err(DescriptorError::TooFewElements(0))
        );
    }

    #[test]
    fn test_invalid_names() {
        assert!(matches!(
            CallDescriptor::parse("nodots /a org.a.B M"),
            Err(DescriptorError::InvalidService(_))
        ));
        assert!(matches!(
            CallDescriptor::parse("org.a.B a/b org.a.B M"),
            Err(DescriptorError::InvalidPath(_))
        ));
        assert!(matches!(
            CallDescriptor::parse("org.a.B /a/ org.a.B M"),
            Err(DescriptorError::InvalidPath(_))
        ));
        assert!(matches!(
            CallDescriptor::parse("org.a.B /a Iface M"),
            Err(DescriptorError::InvalidInterface(_))
        ));
        assert!(matches!(
            CallDescriptor::parse("org.a.B /a org.a.B 1M"),
            Err(DescriptorError::InvalidMember(_))
        ));
    }

    #[test]
    fn test_unique_name_service() {
        let d = CallDescriptor::parse(":1.42 /a org.a.B M").unwrap();
        assert_eq!(d.service, ":1.42");
    }

    #[test]
    fn test_display_reparses() {
        let d = CallDescriptor::parse(r#"org.a.B /a org.a.B M string:"say \"hi\"" double:1"#)
            .unwrap()
            .with_arg("account-1");
        let again = CallDescriptor::parse(&d.to_string()).unwrap();
        assert_eq!(again, d);
    }
}
