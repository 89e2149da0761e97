//! TwiML markup documents
//!
//! Voice, messaging and fax responses are built as element trees and
//! rendered with `quick-xml`. Every document carries a kind tag, and
//! [`DocumentKinds`] decides which tags the dispatcher treats as markup.

use crate::result::InvocationResult;
use once_cell::sync::Lazy;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::BTreeSet;
use std::fmt;

pub const VOICE_RESPONSE: &str = "VoiceResponse";
pub const MESSAGING_RESPONSE: &str = "MessagingResponse";
pub const FAX_RESPONSE: &str = "FaxResponse";

/// Media type used for rendered markup documents
pub const XML_MEDIA_TYPE: &str = "text/xml";

/// A document that renders to XML and identifies its kind by tag.
///
/// `Display` must produce the serialized document.
pub trait MarkupDocument: fmt::Display + fmt::Debug + Send + Sync {
    fn kind(&self) -> &str;
}

/// One XML element with attributes, optional text and children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: &[(&str, &str)]) -> Self {
        self.attributes.extend(
            attributes
                .iter()
                .map(|(key, value)| ((*key).to_string(), (*value).to_string())),
        );
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    fn write<W: std::io::Write>(&self, writer: &mut Writer<W>) -> fmt::Result {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.text.is_none() && self.children.is_empty() {
            return writer.write_event(Event::Empty(start)).map_err(|_| fmt::Error);
        }

        writer.write_event(Event::Start(start)).map_err(|_| fmt::Error)?;
        if let Some(text) = &self.text {
            writer
                .write_event(Event::Text(BytesText::from_escaped(partial_escape(text))))
                .map_err(|_| fmt::Error)?;
        }
        for child in &self.children {
            child.write(writer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(|_| fmt::Error)
    }
}

/// Render a document: XML declaration followed by the root element
fn render(root: &Element, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|_| fmt::Error)?;
    root.write(&mut writer)?;
    let xml = String::from_utf8(writer.into_inner()).map_err(|_| fmt::Error)?;
    f.write_str(&xml)
}

fn pause(length: u32) -> Element {
    let length = length.to_string();
    Element::new("Pause").with_attributes(&[("length", length.as_str())])
}

macro_rules! markup_document {
    ($name:ident, $kind:expr) => {
        impl $name {
            pub fn new() -> Self {
                Self {
                    root: Element::new("Response"),
                }
            }

            pub fn root(&self) -> &Element {
                &self.root
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                render(&self.root, f)
            }
        }

        impl MarkupDocument for $name {
            fn kind(&self) -> &str {
                $kind
            }
        }

        impl From<$name> for InvocationResult {
            fn from(document: $name) -> Self {
                InvocationResult::markup(document)
            }
        }
    };
}

/// Voice call instructions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceResponse {
    root: Element,
}

markup_document!(VoiceResponse, VOICE_RESPONSE);

impl VoiceResponse {
    pub fn say(&mut self, text: &str) -> &mut Self {
        self.say_with(text, &[])
    }

    pub fn say_with(&mut self, text: &str, attributes: &[(&str, &str)]) -> &mut Self {
        self.root
            .push(Element::new("Say").with_attributes(attributes).with_text(text));
        self
    }

    pub fn play(&mut self, url: &str) -> &mut Self {
        self.root.push(Element::new("Play").with_text(url));
        self
    }

    pub fn pause(&mut self, length: u32) -> &mut Self {
        self.root.push(pause(length));
        self
    }

    pub fn dial(&mut self, number: &str) -> &mut Self {
        self.root.push(Element::new("Dial").with_text(number));
        self
    }

    pub fn redirect(&mut self, url: &str) -> &mut Self {
        self.root.push(Element::new("Redirect").with_text(url));
        self
    }

    pub fn record(&mut self, attributes: &[(&str, &str)]) -> &mut Self {
        self.root.push(Element::new("Record").with_attributes(attributes));
        self
    }

    pub fn hangup(&mut self) -> &mut Self {
        self.root.push(Element::new("Hangup"));
        self
    }

    pub fn reject(&mut self) -> &mut Self {
        self.root.push(Element::new("Reject"));
        self
    }

    /// Collect input; nested verbs are added through the `Gather` builder
    pub fn gather<F>(&mut self, attributes: &[(&str, &str)], build: F) -> &mut Self
    where
        F: FnOnce(&mut Gather),
    {
        let mut gather = Gather {
            element: Element::new("Gather").with_attributes(attributes),
        };
        build(&mut gather);
        self.root.push(gather.element);
        self
    }
}

/// Nested verbs allowed inside `<Gather>`
#[derive(Debug)]
pub struct Gather {
    element: Element,
}

impl Gather {
    pub fn say(&mut self, text: &str) -> &mut Self {
        self.element.push(Element::new("Say").with_text(text));
        self
    }

    pub fn play(&mut self, url: &str) -> &mut Self {
        self.element.push(Element::new("Play").with_text(url));
        self
    }

    pub fn pause(&mut self, length: u32) -> &mut Self {
        self.element.push(pause(length));
        self
    }
}

/// Messaging replies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagingResponse {
    root: Element,
}

markup_document!(MessagingResponse, MESSAGING_RESPONSE);

impl MessagingResponse {
    pub fn message(&mut self, body: &str) -> &mut Self {
        self.message_with(body, &[])
    }

    pub fn message_with(&mut self, body: &str, attributes: &[(&str, &str)]) -> &mut Self {
        self.root
            .push(Element::new("Message").with_attributes(attributes).with_text(body));
        self
    }

    pub fn redirect(&mut self, url: &str) -> &mut Self {
        self.root.push(Element::new("Redirect").with_text(url));
        self
    }
}

/// Fax handling instructions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaxResponse {
    root: Element,
}

markup_document!(FaxResponse, FAX_RESPONSE);

impl FaxResponse {
    pub fn receive(&mut self, attributes: &[(&str, &str)]) -> &mut Self {
        self.root.push(Element::new("Receive").with_attributes(attributes));
        self
    }

    pub fn reject(&mut self) -> &mut Self {
        self.root.push(Element::new("Reject"));
        self
    }
}

static DEFAULT_KINDS: Lazy<DocumentKinds> = Lazy::new(|| DocumentKinds {
    kinds: [VOICE_RESPONSE, MESSAGING_RESPONSE, FAX_RESPONSE]
        .into_iter()
        .map(String::from)
        .collect(),
});

/// Set of document-kind tags recognized as markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentKinds {
    kinds: BTreeSet<String>,
}

impl Default for DocumentKinds {
    fn default() -> Self {
        DEFAULT_KINDS.clone()
    }
}

impl DocumentKinds {
    /// A set recognizing nothing
    pub fn empty() -> Self {
        Self {
            kinds: BTreeSet::new(),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kinds.insert(kind.into());
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.kinds.contains(kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.kinds.iter().map(String::as_str)
    }

    /// Capability probe: is `value` a markup document of a known kind?
    pub fn is_markup(&self, value: &InvocationResult) -> bool {
        match value {
            InvocationResult::Markup(document) => self.contains(document.kind()),
            _ => false,
        }
    }
}

/// True when `value` is a markup document of one of the default kinds
pub fn is_twiml(value: &InvocationResult) -> bool {
    DEFAULT_KINDS.is_markup(value)
}
