/// parse document with structure like " title1 key1: value1, value2 key2: value2 title2 key3:value3, value4" which has titles and
/// pairs key-vector of values. Lines starting with //, #, % or ; are comments.
///
/// The run configuration of the comparison is written in this format, see
/// [`crate::numerical::Comparison_api::ComparisonConfig::from_document`].
use crate::numerical::solver_errors::{CorneaError, CorneaResult};
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alpha1, alphanumeric1, multispace0, space0},
    combinator::{map, map_res, recognize},
    multi::{many0, many1, separated_list1},
    sequence::{delimited, pair, separated_pair, terminated},
};
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

pub type SectionMap = HashMap<String, Vec<Value>>;
pub type DocumentMap = HashMap<String, SectionMap>;

/// enum to represent different value types:
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Float(f64),
    Integer(i64),
    Boolean(bool),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        if let Value::String(s) = self {
            Some(s)
        } else {
            None
        }
    }
    /// integers are accepted where a float is expected
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
    pub fn as_usize(&self) -> Option<usize> {
        match self {
            Value::Integer(i) if *i >= 0 => Some(*i as usize),
            _ => None,
        }
    }
    pub fn as_bool(&self) -> Option<bool> {
        if let Value::Boolean(b) = self {
            Some(*b)
        } else {
            None
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Float(val) => write!(f, "{}", val),
            Value::Integer(val) => write!(f, "{}", val),
            Value::Boolean(val) => write!(f, "{}", val),
        }
    }
}

/// identifier: letter or underscore, then letters, digits, underscores
fn identifier(input: &str) -> IResult<&str, String> {
    let parser = recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ));
    map(parser, String::from).parse(input)
}

/// Parses a title, trailing whitespace and newlines are dropped
fn parse_title(input: &str) -> IResult<&str, String> {
    let (input, result) = identifier(input)?;
    Ok((input.trim_start(), result))
}

fn parse_key(input: &str) -> IResult<&str, String> {
    identifier(input)
}

fn parse_value(input: &str) -> IResult<&str, Value> {
    // a single value runs up to a comma, whitespace, newline or semicolon
    let value_parser = take_while1(|c: char| !matches!(c, ',' | ' ' | '\t' | '\n' | '\r' | ';'));
    let mut value_parser = map_res(value_parser, |s: &str| -> Result<Value, String> {
        if let Ok(val) = s.parse::<i64>() {
            Ok(Value::Integer(val))
        } else if let Ok(val) = s.parse::<f64>() {
            Ok(Value::Float(val))
        } else if let Ok(val) = s.parse::<bool>() {
            Ok(Value::Boolean(val))
        } else {
            Ok(Value::String(s.to_string()))
        }
    });
    value_parser.parse(input)
}

fn parse_value_list(input: &str) -> IResult<&str, Vec<Value>> {
    let separator_coma = delimited(space0, tag(","), space0);
    separated_list1(separator_coma, parse_value).parse(input)
}

/// key: value1, value2, ...
fn parse_key_value_pair(input: &str) -> IResult<&str, (String, Vec<Value>)> {
    let colon_separator = delimited(space0, tag(":"), space0);
    let mut parser = separated_pair(parse_key, colon_separator, parse_value_list);
    let (input, result) = parser.parse(input)?;
    Ok((input.trim_start(), result))
}

/// Parses a section with a title and one or more key-value pairs
fn parse_section(input: &str) -> IResult<&str, (String, Vec<(String, Vec<Value>)>)> {
    let (input, _) = space0(input)?;
    let (input, title) = parse_title(input)?;
    let (input, _) = multispace0(input)?;
    let (input, pairs) = many1(terminated(parse_key_value_pair, space0)).parse(input)?;
    Ok((input, (title, pairs)))
}

/// Drops comment lines (starting with //, #, %, or ;) and blank lines
fn filter_comments(input: &str) -> String {
    input
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.starts_with("//")
                && !trimmed.starts_with('#')
                && !trimmed.starts_with('%')
                && !trimmed.starts_with(';')
                && !trimmed.is_empty()
        })
        .collect::<Vec<&str>>()
        .join("\n")
}

/// Parses the whole document. A section or a key given twice is an error.
pub fn parse_document(input: &str) -> CorneaResult<DocumentMap> {
    let filtered = filter_comments(input);
    let mut parser = many1(delimited(multispace0, parse_section, multispace0));
    let (remaining, sections) = parser
        .parse(filtered.as_str())
        .map_err(|e| CorneaError::Config(format!("parsing error: {:?}", e)))?;
    if !remaining.trim().is_empty() {
        return Err(CorneaError::Config(format!(
            "failed to parse entire document, remaining: '{}'",
            remaining
        )));
    }
    let mut document = DocumentMap::new();
    for (title, pairs) in sections {
        if document.contains_key(&title) {
            return Err(CorneaError::Config(format!("section '{}' given twice", title)));
        }
        let mut section = SectionMap::new();
        for (key, values) in pairs {
            if section.insert(key.clone(), values).is_some() {
                return Err(CorneaError::Config(format!(
                    "key '{}' given twice in section '{}'",
                    key, title
                )));
            }
        }
        document.insert(title, section);
    }
    Ok(document)
}

/// Typed access to one section; every key has to be read, leftovers are reported as unknown.
pub struct SectionReader<'a> {
    title: &'a str,
    section: &'a SectionMap,
    known: &'static [&'static str],
}

impl<'a> SectionReader<'a> {
    pub fn new(
        title: &'a str,
        section: &'a SectionMap,
        known: &'static [&'static str],
    ) -> CorneaResult<Self> {
        if let Some(key) = section.keys().find(|k| !known.contains(&k.as_str())) {
            return Err(CorneaError::Config(format!(
                "unknown key '{}' in section '{}', expected one of {:?}",
                key, title, known
            )));
        }
        Ok(Self {
            title,
            section,
            known,
        })
    }

    fn single(&self, key: &str) -> CorneaResult<Option<&'a Value>> {
        debug_assert!(self.known.contains(&key));
        match self.section.get(key).map(|v| v.as_slice()) {
            None => Ok(None),
            Some([value]) => Ok(Some(value)),
            Some(values) => Err(self.bad(key, "a single value", values)),
        }
    }

    fn bad(&self, key: &str, expected: &str, values: &[Value]) -> CorneaError {
        let got: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        CorneaError::Config(format!(
            "{}.{}: expected {}, got '{}'",
            self.title,
            key,
            expected,
            got.join(", ")
        ))
    }

    pub fn f64(&self, key: &str) -> CorneaResult<Option<f64>> {
        match self.single(key)? {
            None => Ok(None),
            Some(v) => v
                .as_f64()
                .map(Some)
                .ok_or_else(|| self.bad(key, "a number", std::slice::from_ref(v))),
        }
    }

    pub fn usize(&self, key: &str) -> CorneaResult<Option<usize>> {
        match self.single(key)? {
            None => Ok(None),
            Some(v) => v
                .as_usize()
                .map(Some)
                .ok_or_else(|| self.bad(key, "a non-negative integer", std::slice::from_ref(v))),
        }
    }

    pub fn bool(&self, key: &str) -> CorneaResult<Option<bool>> {
        match self.single(key)? {
            None => Ok(None),
            Some(v) => v
                .as_bool()
                .map(Some)
                .ok_or_else(|| self.bad(key, "true or false", std::slice::from_ref(v))),
        }
    }

    /// a name parsed with `FromStr` (strum enums)
    pub fn parse<T: FromStr>(&self, key: &str) -> CorneaResult<Option<T>> {
        match self.single(key)? {
            None => Ok(None),
            Some(v) => v
                .to_string()
                .parse::<T>()
                .map(Some)
                .map_err(|_| self.bad(key, "a known name", std::slice::from_ref(v))),
        }
    }

    pub fn usize_list(&self, key: &str) -> CorneaResult<Option<Vec<usize>>> {
        match self.section.get(key) {
            None => Ok(None),
            Some(values) => values
                .iter()
                .map(|v| v.as_usize())
                .collect::<Option<Vec<usize>>>()
                .map(Some)
                .ok_or_else(|| self.bad(key, "a list of non-negative integers", values)),
        }
    }

    pub fn parse_list<T: FromStr>(&self, key: &str) -> CorneaResult<Option<Vec<T>>> {
        match self.section.get(key) {
            None => Ok(None),
            Some(values) => values
                .iter()
                .map(|v| v.to_string().parse::<T>().ok())
                .collect::<Option<Vec<T>>>()
                .map(Some)
                .ok_or_else(|| self.bad(key, "a list of known names", values)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_title_and_key() {
        let (remaining, title) = parse_title("title1\n key1: value1").unwrap();
        assert_eq!(title, "title1");
        assert_eq!(remaining, "key1: value1");
        let (remaining, title) = parse_title("finite_difference n_nodes: 201").unwrap();
        assert_eq!(title, "finite_difference");
        assert_eq!(remaining, "n_nodes: 201");
        let (remaining, key) = parse_key("key_with_underscore: value1").unwrap();
        assert_eq!(key, "key_with_underscore");
        assert_eq!(remaining, ": value1");
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("123, next").unwrap(), (", next", Value::Integer(123)));
        assert_eq!(parse_value("1e-3\n").unwrap(), ("\n", Value::Float(1e-3)));
        assert_eq!(parse_value("-0.4").unwrap(), ("", Value::Float(-0.4)));
        assert_eq!(parse_value("true;").unwrap(), (";", Value::Boolean(true)));
        assert_eq!(
            parse_value("secant").unwrap(),
            ("", Value::String("secant".to_string()))
        );
    }

    #[test]
    fn test_parse_key_value_pair() {
        let (remaining, (key, values)) = parse_key_value_pair("hidden: 20, 20\nseed: 1").unwrap();
        assert_eq!(key, "hidden");
        assert_eq!(values, vec![Value::Integer(20), Value::Integer(20)]);
        assert_eq!(remaining, "seed: 1");
    }

    #[test]
    fn test_parse_document() {
        let doc = "
        // corneal model
        model
        a: 7.8
        b: 0.5
        shooting
        step_size: 1e-3
        root_finder: secant
        # trailing comment
        ";
        let parsed = parse_document(doc).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["model"]["a"], vec![Value::Float(7.8)]);
        assert_eq!(
            parsed["shooting"]["root_finder"],
            vec![Value::String("secant".to_string())]
        );
    }

    #[test]
    fn test_malformed_documents() {
        assert!(parse_document("").is_err());
        assert!(parse_document("model\n a 7.8").is_err());
        assert!(parse_document("model\n a: 1\nmodel\n b: 2").is_err());
        assert!(parse_document("model\n a: 1\n a: 2").is_err());
    }

    #[test]
    fn test_section_reader() {
        let parsed =
            parse_document("pinn\n hidden: 20, 10\n epochs: 30\n lr: 1\n flag: true").unwrap();
        let section = &parsed["pinn"];
        const KNOWN: &[&str] = &["hidden", "epochs", "lr", "flag"];
        let reader = SectionReader::new("pinn", section, KNOWN).unwrap();
        assert_eq!(reader.usize_list("hidden").unwrap(), Some(vec![20, 10]));
        assert_eq!(reader.usize("epochs").unwrap(), Some(30));
        // integer where a float is expected
        assert_eq!(reader.f64("lr").unwrap(), Some(1.0));
        assert_eq!(reader.bool("flag").unwrap(), Some(true));
        assert!(reader.bool("epochs").is_err());
        assert!(reader.usize("hidden").is_err());
        assert!(SectionReader::new("pinn", section, &["hidden"]).is_err());
    }
}
