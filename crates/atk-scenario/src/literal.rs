//! Literal values inside step text
//!
//! Step arguments are written as data literals: dicts, lists, tuples,
//! quoted strings, numbers and the constants `True`, `False` and `None`
//! (lowercase JSON spellings are accepted too). Tuples become arrays.

use crate::error::StepError;
use atk_core::Value;
use serde_json::{Map, Number};

/// Parse one literal into a JSON value
///
/// # Errors
/// `StepError::Literal` (line 0) on malformed input or trailing text.
pub fn parse_literal(text: &str) -> Result<Value, StepError> {
    let mut parser = LiteralParser::new(text);
    let value = parser.value().map_err(|message| parser.error(message))?;
    parser.skip_ws();
    if parser.pos < parser.chars.len() {
        return Err(parser.error(format!("unexpected trailing input at offset {}", parser.pos)));
    }
    Ok(value)
}

struct LiteralParser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, message: String) -> StepError {
        StepError::Literal {
            line: 0,
            literal: self.source.to_string(),
            message,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, wanted: char) -> Result<(), String> {
        self.skip_ws();
        match self.bump() {
            Some(c) if c == wanted => Ok(()),
            Some(c) => Err(format!("expected '{wanted}', found '{c}' at offset {}", self.pos - 1)),
            None => Err(format!("expected '{wanted}', found end of input")),
        }
    }

    fn value(&mut self) -> Result<Value, String> {
        self.skip_ws();
        match self.peek() {
            Some('{') => self.dict(),
            Some('[') => self.sequence('[', ']'),
            Some('(') => self.sequence('(', ')'),
            Some(quote @ ('\'' | '"')) => self.string(quote).map(Value::String),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_alphabetic() => self.constant(),
            Some(c) => Err(format!("unexpected '{c}' at offset {}", self.pos)),
            None => Err("empty literal".to_string()),
        }
    }

    fn dict(&mut self) -> Result<Value, String> {
        self.expect('{')?;
        let mut map = Map::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(Value::Object(map));
            }
            let key = match self.value()? {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => return Err(format!("unsupported dict key {other}")),
            };
            self.expect(':')?;
            let value = self.value()?;
            map.insert(key, value);
            if !self.separator('}')? {
                return Ok(Value::Object(map));
            }
        }
    }

    fn sequence(&mut self, open: char, close: char) -> Result<Value, String> {
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(Value::Array(items));
            }
            items.push(self.value()?);
            if !self.separator(close)? {
                return Ok(Value::Array(items));
            }
        }
    }

    /// Consume `,` (returns true, more may follow) or `close` (returns false)
    fn separator(&mut self, close: char) -> Result<bool, String> {
        self.skip_ws();
        match self.bump() {
            Some(',') => Ok(true),
            Some(c) if c == close => Ok(false),
            Some(c) => Err(format!("expected ',' or '{close}', found '{c}' at offset {}", self.pos - 1)),
            None => Err(format!("unterminated literal, expected '{close}'")),
        }
    }

    fn string(&mut self, quote: char) -> Result<String, String> {
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err("unterminated string".to_string()),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('0') => out.push('\0'),
                    Some('u') => out.push(self.unicode_escape()?),
                    Some(c @ ('\\' | '\'' | '"')) => out.push(c),
                    Some(c) => {
                        out.push('\\');
                        out.push(c);
                    }
                    None => return Err("unterminated escape".to_string()),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn unicode_escape(&mut self) -> Result<char, String> {
        let digits: String = (0..4).filter_map(|_| self.bump()).collect();
        u32::from_str_radix(&digits, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| format!("invalid unicode escape '\\u{digits}'"))
    }

    fn number(&mut self) -> Result<Value, String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E' | '_'))
        {
            self.pos += 1;
        }
        let raw: String = self.chars[start..self.pos]
            .iter()
            .filter(|c| **c != '_')
            .collect();
        let raw = raw.strip_prefix('+').unwrap_or(&raw);
        if let Ok(int) = raw.parse::<i64>() {
            return Ok(Value::Number(int.into()));
        }
        if let Ok(int) = raw.parse::<u64>() {
            return Ok(Value::Number(int.into()));
        }
        let digits = raw.strip_prefix('-').unwrap_or(raw);
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("integer '{raw}' is out of range"));
        }
        raw.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| format!("invalid number '{raw}'"))
    }

    fn constant(&mut self) -> Result<Value, String> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            other => Err(format!("unknown name '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn nested_dict_with_single_quotes() {
        let value = parse_literal("{'messages': [{'role': 'user', 'content': 'hi'}]}").unwrap();
        assert_eq!(value, json!({"messages": [{"role": "user", "content": "hi"}]}));
    }

    #[test]
    fn constants_and_numbers() {
        let value = parse_literal("[True, False, None, -3, 2.5, 1_000, true, null]").unwrap();
        assert_eq!(value, json!([true, false, null, -3, 2.5, 1000, true, null]));
    }

    #[test]
    fn large_integers_stay_exact() {
        assert_eq!(
            parse_literal("18446744073709551615").unwrap(),
            json!(u64::MAX)
        );
        assert_eq!(parse_literal("-9223372036854775808").unwrap(), json!(i64::MIN));
        let err = parse_literal("18446744073709551616").unwrap_err();
        assert!(err.to_string().contains("out of range"), "{err}");
        assert_eq!(parse_literal("1e20").unwrap(), json!(1e20));
    }

    #[test]
    fn tuples_become_arrays() {
        assert_eq!(parse_literal("(1, 'a',)").unwrap(), json!([1, "a"]));
        assert_eq!(parse_literal("()").unwrap(), json!([]));
    }

    #[test]
    fn escapes_in_strings() {
        assert_eq!(
            parse_literal(r#""it's \"quoted\"\n""#).unwrap(),
            json!("it's \"quoted\"\n")
        );
        assert_eq!(parse_literal(r"'don\'t'").unwrap(), json!("don't"));
        assert_eq!(parse_literal(r"'caf\u00e9'").unwrap(), json!("café"));
    }

    #[test]
    fn json_input_is_accepted() {
        let value = parse_literal(r#"{"status": 200, "ok": true}"#).unwrap();
        assert_eq!(value, json!({"status": 200, "ok": true}));
    }

    #[test]
    fn malformed_literals_are_rejected() {
        for text in ["", "{'a': }", "[1, 2", "'open", "{'a': 1} extra", "undefined"] {
            let err = parse_literal(text).unwrap_err();
            assert!(matches!(err, StepError::Literal { .. }), "{text}");
        }
    }
}
