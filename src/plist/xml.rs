// src/plist/xml.rs

//! XML property list format
//!
//! Reads and writes the Apple-style XML property list document:
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <!DOCTYPE plist PUBLIC "-//Apple Computer//DTD PLIST 1.0//EN" ...>
//! <plist version="1.0">
//! <dict>
//!     <key>pkgname</key>
//!     <string>foo</string>
//! </dict>
//! </plist>
//! ```
//!
//! Supported elements are `dict`, `array`, `string`, `integer`, `true` and
//! `false`. The `<plist>` wrapper is optional on input.

use super::{Array, Dictionary, PropertyObject};
use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;

const XML_PROLOG: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<!DOCTYPE plist PUBLIC \"-//Apple Computer//DTD PLIST 1.0//EN\" \
\"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n";

/// Serialize any property object as a complete plist document
pub fn to_xml(obj: &PropertyObject) -> String {
    let mut out = String::with_capacity(256);
    out.push_str(XML_PROLOG);
    out.push_str("<plist version=\"1.0\">\n");
    write_object(&mut out, obj, 0);
    out.push_str("</plist>\n");
    out
}

/// Serialize a dictionary as a complete plist document
pub fn externalize(dict: &Dictionary) -> String {
    let mut out = String::with_capacity(256);
    out.push_str(XML_PROLOG);
    out.push_str("<plist version=\"1.0\">\n");
    write_dict(&mut out, dict, 0);
    out.push_str("</plist>\n");
    out
}

/// Parse a plist document into whatever object sits at its root
pub fn parse(data: &[u8]) -> Result<PropertyObject> {
    let text = std::str::from_utf8(data)
        .map_err(|e| Error::ParseError(format!("plist is not valid UTF-8: {}", e)))?;
    let mut parser = Parser {
        reader: Reader::from_str(text),
        depth: 0,
    };
    parser.document()
}

/// Parse a plist document whose root must be a dictionary
pub fn internalize(data: &[u8]) -> Result<Dictionary> {
    parse(data)?
        .into_dict()
        .map_err(|other| Error::WrongRootType(other.type_name()))
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push('\t');
    }
}

fn write_object(out: &mut String, obj: &PropertyObject, depth: usize) {
    match obj {
        PropertyObject::Dictionary(d) => write_dict(out, d, depth),
        PropertyObject::Array(a) => write_array(out, a, depth),
        PropertyObject::String(s) => {
            indent(out, depth);
            out.push_str("<string>");
            out.push_str(&escape(s.as_str()));
            out.push_str("</string>\n");
        }
        PropertyObject::Bool(b) => {
            indent(out, depth);
            out.push_str(if *b { "<true/>\n" } else { "<false/>\n" });
        }
        PropertyObject::Number(n) => {
            indent(out, depth);
            out.push_str("<integer>");
            out.push_str(&n.to_string());
            out.push_str("</integer>\n");
        }
    }
}

fn write_dict(out: &mut String, dict: &Dictionary, depth: usize) {
    indent(out, depth);
    if dict.is_empty() {
        out.push_str("<dict/>\n");
        return;
    }
    out.push_str("<dict>\n");
    for (key, value) in dict.iter() {
        indent(out, depth + 1);
        out.push_str("<key>");
        out.push_str(&escape(key));
        out.push_str("</key>\n");
        write_object(out, value, depth + 1);
    }
    indent(out, depth);
    out.push_str("</dict>\n");
}

fn write_array(out: &mut String, array: &Array, depth: usize) {
    indent(out, depth);
    if array.is_empty() {
        out.push_str("<array/>\n");
        return;
    }
    out.push_str("<array>\n");
    for obj in array {
        write_object(out, obj, depth + 1);
    }
    indent(out, depth);
    out.push_str("</array>\n");
}

/// Deepest container nesting accepted on input
pub const MAX_DEPTH: usize = 256;

struct Parser<'a> {
    reader: Reader<&'a [u8]>,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn raw_event(&mut self) -> Result<Event<'a>> {
        self.reader.read_event().map_err(|e| {
            Error::ParseError(format!(
                "malformed XML at byte {}: {}",
                self.reader.buffer_position(),
                e
            ))
        })
    }

    /// Next event that carries structure: skips the prolog, comments and
    /// whitespace between elements
    fn next_event(&mut self) -> Result<Event<'a>> {
        loop {
            match self.raw_event()? {
                Event::Decl(_) | Event::DocType(_) | Event::Comment(_) | Event::PI(_) => {}
                Event::Text(t) if t.iter().all(u8::is_ascii_whitespace) => {}
                ev => return Ok(ev),
            }
        }
    }

    fn document(&mut self) -> Result<PropertyObject> {
        let root = match self.next_event()? {
            Event::Start(e) if e.name().as_ref() == b"plist" => {
                let ev = self.next_event()?;
                let value = self.value(ev)?;
                self.expect_end(b"plist")?;
                value
            }
            ev => self.value(ev)?,
        };

        match self.next_event()? {
            Event::Eof => Ok(root),
            ev => Err(unexpected(&ev, "end of document")),
        }
    }

    fn value(&mut self, ev: Event<'a>) -> Result<PropertyObject> {
        match ev {
            Event::Start(e) => match e.name().as_ref() {
                b"dict" => {
                    self.descend()?;
                    let dict = self.dict()?;
                    self.depth -= 1;
                    Ok(PropertyObject::Dictionary(dict))
                }
                b"array" => {
                    self.descend()?;
                    let array = self.array()?;
                    self.depth -= 1;
                    Ok(PropertyObject::Array(array))
                }
                b"string" => self.text(b"string").map(PropertyObject::String),
                b"integer" => {
                    let text = self.text(b"integer")?;
                    parse_integer(&text).map(PropertyObject::Number)
                }
                b"true" => {
                    self.expect_end(b"true")?;
                    Ok(PropertyObject::Bool(true))
                }
                b"false" => {
                    self.expect_end(b"false")?;
                    Ok(PropertyObject::Bool(false))
                }
                other => Err(unsupported(other)),
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"dict" => Ok(PropertyObject::Dictionary(Dictionary::new())),
                b"array" => Ok(PropertyObject::Array(Array::new())),
                b"string" => Ok(PropertyObject::String(String::new())),
                b"true" => Ok(PropertyObject::Bool(true)),
                b"false" => Ok(PropertyObject::Bool(false)),
                other => Err(unsupported(other)),
            },
            ev => Err(unexpected(&ev, "a value element")),
        }
    }

    fn descend(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(Error::ParseError(format!(
                "plist nested deeper than {} levels",
                MAX_DEPTH
            )));
        }
        Ok(())
    }

    fn dict(&mut self) -> Result<Dictionary> {
        let mut dict = Dictionary::new();
        loop {
            match self.next_event()? {
                Event::End(e) if e.name().as_ref() == b"dict" => return Ok(dict),
                Event::Start(e) if e.name().as_ref() == b"key" => {
                    let key = self.text(b"key")?;
                    if key.is_empty() {
                        return Err(Error::ParseError("empty dictionary key".to_string()));
                    }
                    let ev = self.next_event()?;
                    let value = self.value(ev)?;
                    dict.set(key, value)?;
                }
                ev => return Err(unexpected(&ev, "<key> or </dict>")),
            }
        }
    }

    fn array(&mut self) -> Result<Array> {
        let mut array = Array::new();
        loop {
            match self.next_event()? {
                Event::End(e) if e.name().as_ref() == b"array" => return Ok(array),
                ev => {
                    let value = self.value(ev)?;
                    array.push(value)?;
                }
            }
        }
    }

    /// Collect character data up to the closing `end` tag
    fn text(&mut self, end: &[u8]) -> Result<String> {
        let mut value = String::new();
        loop {
            match self.raw_event()? {
                Event::Text(t) => {
                    let unescaped = t
                        .unescape()
                        .map_err(|e| Error::ParseError(format!("bad character data: {}", e)))?;
                    value.push_str(&unescaped);
                }
                Event::CData(c) => {
                    let raw = std::str::from_utf8(&c)
                        .map_err(|e| Error::ParseError(format!("CDATA is not valid UTF-8: {}", e)))?;
                    value.push_str(raw);
                }
                Event::Comment(_) => {}
                Event::End(e) if e.name().as_ref() == end => return Ok(value),
                ev => {
                    return Err(unexpected(
                        &ev,
                        &format!("</{}>", String::from_utf8_lossy(end)),
                    ));
                }
            }
        }
    }

    fn expect_end(&mut self, end: &[u8]) -> Result<()> {
        match self.next_event()? {
            Event::End(e) if e.name().as_ref() == end => Ok(()),
            ev => Err(unexpected(
                &ev,
                &format!("</{}>", String::from_utf8_lossy(end)),
            )),
        }
    }
}

fn parse_integer(text: &str) -> Result<i64> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16)
            .ok()
            .and_then(|n| i64::try_from(n).ok()),
        None => text.parse::<i64>().ok(),
    };
    parsed.ok_or_else(|| Error::ParseError(format!("invalid integer '{}'", text)))
}

fn unsupported(name: &[u8]) -> Error {
    Error::ParseError(format!(
        "unsupported element <{}>",
        String::from_utf8_lossy(name)
    ))
}

fn unexpected(ev: &Event<'_>, expected: &str) -> Error {
    let found = match ev {
        Event::Start(e) => format!("<{}>", String::from_utf8_lossy(e.name().as_ref())),
        Event::End(e) => format!("</{}>", String::from_utf8_lossy(e.name().as_ref())),
        Event::Empty(e) => format!("<{}/>", String::from_utf8_lossy(e.name().as_ref())),
        Event::Text(_) | Event::CData(_) => "character data".to_string(),
        Event::Eof => "end of document".to_string(),
        _ => "markup".to_string(),
    };
    Error::ParseError(format!("expected {}, found {}", expected, found))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dictionary {
        let mut pkg = Dictionary::new();
        pkg.set("pkgname", "foo").unwrap();
        pkg.set("version", "1.0").unwrap();
        pkg.set("pkgver", "foo-1.0").unwrap();
        pkg.set("automatic-install", false).unwrap();
        pkg.set("installed_size", 1_048_576i64).unwrap();
        pkg.set("provides", ["libfoo-1.0", "foo-tools-1.0"].into_iter().collect::<Array>())
            .unwrap();
        pkg.set("short_desc", "Fish & <chips> \"quoted\"").unwrap();

        let mut root = Dictionary::new();
        root.set("packages", Array::new().add_object(pkg).unwrap()).unwrap();
        root.set("conflicts", Array::new()).unwrap();
        root.set("options", Dictionary::new()).unwrap();
        root
    }

    #[test]
    fn test_round_trip() {
        let dict = sample();
        let xml = externalize(&dict);
        let parsed = internalize(xml.as_bytes()).unwrap();
        assert_eq!(parsed, dict);

        let keys: Vec<&str> = parsed.keys().collect();
        assert_eq!(keys, vec!["packages", "conflicts", "options"]);
    }

    #[test]
    fn test_output_layout() {
        let mut dict = Dictionary::new();
        dict.set("pkgname", "foo").unwrap();
        dict.set("empty", Array::new()).unwrap();

        let xml = externalize(&dict);
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"));
        assert!(xml.contains("<plist version=\"1.0\">\n<dict>\n"));
        assert!(xml.contains("\t<key>pkgname</key>\n\t<string>foo</string>\n"));
        assert!(xml.contains("\t<array/>\n"));
        assert!(xml.ends_with("</dict>\n</plist>\n"));
    }

    #[test]
    fn test_escaping() {
        let mut dict = Dictionary::new();
        dict.set("desc", "a < b && c > d").unwrap();

        let xml = externalize(&dict);
        assert!(xml.contains("a &lt; b &amp;&amp; c &gt; d"));
        assert_eq!(internalize(xml.as_bytes()).unwrap(), dict);
    }

    #[test]
    fn test_whitespace_in_strings_is_preserved() {
        let mut dict = Dictionary::new();
        dict.set("text", "  padded  ").unwrap();

        let parsed = internalize(externalize(&dict).as_bytes()).unwrap();
        assert_eq!(parsed.get_str("text"), Some("  padded  "));
    }

    #[test]
    fn test_parse_without_plist_wrapper() {
        let xml = "<dict><key>a</key><integer>0x10</integer><key>b</key><true/></dict>";
        let dict = internalize(xml.as_bytes()).unwrap();
        assert_eq!(dict.get_number("a"), Some(16));
        assert_eq!(dict.get_bool("b"), Some(true));
    }

    #[test]
    fn test_parse_comments_and_cdata() {
        let xml = "<?xml version=\"1.0\"?>\n<!-- generated -->\n<plist version=\"1.0\">\
                   <dict><key>s</key><string><![CDATA[<raw>]]></string></dict></plist>";
        let dict = internalize(xml.as_bytes()).unwrap();
        assert_eq!(dict.get_str("s"), Some("<raw>"));
    }

    #[test]
    fn test_non_dictionary_root_is_rejected() {
        let xml = to_xml(&PropertyObject::Array(["a"].into_iter().collect()));
        assert!(matches!(
            internalize(xml.as_bytes()),
            Err(Error::WrongRootType("array"))
        ));
        assert!(parse(xml.as_bytes()).unwrap().as_array().is_some());
    }

    #[test]
    fn test_malformed_documents() {
        assert!(parse(b"<dict><key>a</key></dict>").is_err());
        assert!(parse(b"<dict><key>a</key><string>x</dict>").is_err());
        assert!(parse(b"<dict><key></key><true/></dict>").is_err());
        assert!(parse(b"<dict><key>a</key><real>1.5</real></dict>").is_err());
        assert!(parse(b"<dict/><dict/>").is_err());
        assert!(parse(b"<integer>twelve</integer>").is_err());
        assert!(parse(b"").is_err());
        assert!(parse(&[0x1f, 0x8b, 0xff, 0xfe]).is_err());
    }

    fn nested_arrays(levels: usize) -> String {
        format!(
            "<dict><key>a</key>{}{}</dict>",
            "<array>".repeat(levels),
            "</array>".repeat(levels)
        )
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let result = parse(nested_arrays(10_000).as_bytes());
        assert!(matches!(result, Err(Error::ParseError(_))));

        // The root dictionary counts as one level
        assert!(parse(nested_arrays(MAX_DEPTH - 1).as_bytes()).is_ok());
        assert!(parse(nested_arrays(MAX_DEPTH).as_bytes()).is_err());
    }

    #[test]
    fn test_deep_nesting_in_dicts_is_rejected() {
        let levels = 5_000;
        let xml = format!(
            "{}<true/>{}",
            "<dict><key>k</key>".repeat(levels),
            "</dict>".repeat(levels)
        );
        assert!(matches!(
            internalize(xml.as_bytes()),
            Err(Error::ParseError(_))
        ));
    }
}
