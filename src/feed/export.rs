use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

use crate::storage::FeedDateEntry;

/// Errors that can occur while reading the RSS export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// XML parsing failed.
    #[error("XML parse error at byte {position}: {message}")]
    XmlParse { position: u64, message: String },
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Guid,
    PubDate,
}

#[derive(Default)]
struct PartialEntry {
    guid: Option<String>,
    pub_date: Option<String>,
}

/// Extracts `<guid>`/`<pubDate>` pairs from an RSS export, in document order.
///
/// Dates are kept as written (only surrounding whitespace is trimmed); no
/// date parsing happens here. Items without a guid are skipped. Items without
/// a pubDate get an empty one, which never satisfies the reconciliation join.
pub fn parse_export(content: &str) -> Result<Vec<FeedDateEntry>, ExportError> {
    // Entity handling is limited to the XML builtins: quick-xml never expands
    // DOCTYPE-declared entities.
    let mut reader = Reader::from_str(content);

    let mut entries = Vec::new();
    let mut current: Option<PartialEntry> = None;
    let mut field: Option<Field> = None;
    let mut text = String::new();
    let mut buf = Vec::new();

    let xml_error = |reader: &Reader<&[u8]>, message: String| ExportError::XmlParse {
        position: reader.error_position(),
        message,
    };

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"item" => current = Some(PartialEntry::default()),
                b"guid" if current.is_some() => {
                    field = Some(Field::Guid);
                    text.clear();
                }
                b"pubDate" if current.is_some() => {
                    field = Some(Field::PubDate);
                    text.clear();
                }
                _ => {}
            },
            Ok(Event::Text(e)) if field.is_some() => {
                let unescaped = e
                    .unescape()
                    .map_err(|err| xml_error(&reader, err.to_string()))?;
                text.push_str(&unescaped);
            }
            Ok(Event::CData(e)) if field.is_some() => {
                text.push_str(&String::from_utf8_lossy(&e));
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"guid" | b"pubDate" => {
                    if let (Some(entry), Some(f)) = (current.as_mut(), field.take()) {
                        let value = text.trim().to_string();
                        match f {
                            Field::Guid => entry.guid = Some(value),
                            Field::PubDate => entry.pub_date = Some(value),
                        }
                    }
                }
                b"item" => {
                    field = None;
                    if let Some(entry) = current.take() {
                        match entry.guid.filter(|g| !g.is_empty()) {
                            Some(guid) => entries.push(FeedDateEntry {
                                guid,
                                pub_date: entry.pub_date.unwrap_or_default(),
                            }),
                            None => tracing::debug!("Skipping export item without guid"),
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(&reader, e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(entries)
}
