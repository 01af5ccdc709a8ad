use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use thiserror::Error;

use crate::config::Config;
use crate::storage::Article;
use crate::util::strip_xml_illegal_chars;

const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to write XML: {0}")]
    Xml(String),

    #[error("Generated feed contains invalid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Static channel metadata of the generated feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub title: String,
    pub link: String,
}

impl Channel {
    pub fn from_config(config: &Config) -> Self {
        Self {
            title: config.channel_title.clone(),
            link: config.channel_link.clone(),
        }
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Serializes articles into an RSS 2.0 document.
///
/// Rendering is pure: the same articles always produce the same bytes, and
/// `<item>` order follows the input exactly.
#[derive(Debug, Clone, Default)]
pub struct FeedRenderer {
    channel: Channel,
}

type XmlWriter = Writer<Cursor<Vec<u8>>>;

impl FeedRenderer {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }

    pub fn render(&self, articles: &[Article]) -> Result<String, RenderError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        write(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        )?;

        let mut rss = BytesStart::new("rss");
        rss.push_attribute(("version", "2.0"));
        rss.push_attribute(("xmlns:atom", ATOM_NAMESPACE));
        write(&mut writer, Event::Start(rss))?;
        write(&mut writer, Event::Start(BytesStart::new("channel")))?;

        write_text_element(&mut writer, "title", &self.channel.title)?;
        write_text_element(&mut writer, "link", &self.channel.link)?;
        write_text_element(&mut writer, "description", "")?;

        for article in articles {
            write_item(&mut writer, article)?;
        }

        write(&mut writer, Event::End(BytesEnd::new("channel")))?;
        write(&mut writer, Event::End(BytesEnd::new("rss")))?;

        let bytes = writer.into_inner().into_inner();
        Ok(String::from_utf8(bytes)?)
    }
}

fn write_item(writer: &mut XmlWriter, article: &Article) -> Result<(), RenderError> {
    write(writer, Event::Start(BytesStart::new("item")))?;
    write_text_element(writer, "guid", &article.url)?;
    write_text_element(writer, "title", &article.title)?;
    write_text_element(writer, "link", &article.url)?;
    write_text_element(writer, "description", article.html.trim())?;
    write_text_element(writer, "pubDate", &article.pub_date)?;
    write(writer, Event::End(BytesEnd::new("item")))
}

/// Writes `<name>text</name>`, escaping the text and dropping XML-illegal characters.
fn write_text_element(writer: &mut XmlWriter, name: &str, text: &str) -> Result<(), RenderError> {
    write(writer, Event::Start(BytesStart::new(name)))?;
    // Always emit the text event, even when empty, so the indenting writer
    // keeps the closing tag on the same line.
    let text = strip_xml_illegal_chars(text);
    write(writer, Event::Text(BytesText::new(&text)))?;
    write(writer, Event::End(BytesEnd::new(name)))
}

fn write(writer: &mut XmlWriter, event: Event<'_>) -> Result<(), RenderError> {
    writer
        .write_event(event)
        .map_err(|e| RenderError::Xml(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ReconciledItem, PARSE_ERROR_HTML};
    use pretty_assertions::assert_eq;

    fn article(id: &str, title: &str, html: &str) -> Article {
        Article {
            id: id.to_string(),
            url: format!("https://a.example/{id}"),
            pub_date: "Mon, 01 Jan 2024 00:00:00 GMT".to_string(),
            title: title.to_string(),
            html: html.to_string(),
        }
    }

    #[test]
    fn test_render_empty_feed() {
        let xml = FeedRenderer::default().render(&[]).unwrap();
        let expected = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>Instapaper: Unread</title>
    <link>https://www.instapaper.com/u</link>
    <description></description>
  </channel>
</rss>"#;
        assert_eq!(xml, expected);
    }

    #[test]
    fn test_render_item_fields() {
        let xml = FeedRenderer::default()
            .render(&[article("1", "Title", "<p>Body</p>")])
            .unwrap();

        assert!(xml.contains("<guid>https://a.example/1</guid>"));
        assert!(xml.contains("<title>Title</title>"));
        assert!(xml.contains("<link>https://a.example/1</link>"));
        assert!(xml.contains("<description>&lt;p&gt;Body&lt;/p&gt;</description>"));
        assert!(xml.contains("<pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>"));
    }

    #[test]
    fn test_item_count_and_order() {
        let articles = vec![
            article("3", "Third", "c"),
            article("1", "First", "a"),
            article("2", "Second", "b"),
        ];
        let xml = FeedRenderer::default().render(&articles).unwrap();

        assert_eq!(xml.matches("<item>").count(), 3);
        let third = xml.find("<title>Third</title>").unwrap();
        let first = xml.find("<title>First</title>").unwrap();
        let second = xml.find("<title>Second</title>").unwrap();
        assert!(third < first && first < second);
    }

    #[test]
    fn test_title_escaped() {
        let xml = FeedRenderer::default()
            .render(&[article("1", "Cats & <Dogs>", "x")])
            .unwrap();
        assert!(xml.contains("<title>Cats &amp; &lt;Dogs&gt;</title>"));
    }

    #[test]
    fn test_description_trimmed() {
        let xml = FeedRenderer::default()
            .render(&[article("1", "T", "\n   <p>x</p>  \n")])
            .unwrap();
        assert!(xml.contains("<description>&lt;p&gt;x&lt;/p&gt;</description>"));
    }

    #[test]
    fn test_illegal_characters_stripped() {
        let xml = FeedRenderer::default()
            .render(&[article("1", "Bad\u{1}Title", "body\u{8}")])
            .unwrap();
        assert!(xml.contains("<title>BadTitle</title>"));
        assert!(xml.contains("<description>body</description>"));
    }

    #[test]
    fn test_parse_error_placeholder_rendered() {
        let item = ReconciledItem {
            id: "42".to_string(),
            url: "https://a.example/42".to_string(),
            pub_date: "Mon, 01 Jan 2024 00:00:00 GMT".to_string(),
        };
        let xml = FeedRenderer::default()
            .render(&[Article::parse_error(&item)])
            .unwrap();
        assert!(xml.contains("<title>https://a.example/42</title>"));
        assert!(xml.contains("Instapaper could not parse this article."));
        assert!(!xml.contains(PARSE_ERROR_HTML));
    }

    #[test]
    fn test_custom_channel() {
        let renderer = FeedRenderer::new(Channel {
            title: "Reading".to_string(),
            link: "https://example.com/".to_string(),
        });
        let xml = renderer.render(&[]).unwrap();
        assert!(xml.contains("<title>Reading</title>"));
        assert!(xml.contains("<link>https://example.com/</link>"));
    }
}
