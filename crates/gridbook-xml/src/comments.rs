//! Comment parts (`xl/comments*.xml`).
//!
//! A comments part holds an author table plus one `<comment>` per annotated
//! cell; the comment body is the concatenation of its `<r><t>` runs.

use quick_xml::events::Event;

use crate::namespaces::SPREADSHEET_ML;
use crate::sax::{self, Emitter};
use crate::Result;

/// One cell comment.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetComment {
    pub reference: String,
    /// Index into the author table. Out-of-range indices resolve to no author.
    pub author_id: Option<usize>,
    pub text: String,
}

/// A parsed comments part.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentsData {
    pub authors: Vec<String>,
    pub comments: Vec<SheetComment>,
}

impl CommentsData {
    /// The author of a comment, if its index resolves.
    pub fn author_of(&self, comment: &SheetComment) -> Option<&str> {
        self.authors
            .get(comment.author_id?)
            .map(|a| a.as_str())
    }

    /// Find the comment attached to a cell reference.
    pub fn comment_at(&self, reference: &str) -> Option<&SheetComment> {
        self.comments.iter().find(|c| c.reference == reference)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ctx {
    Authors,
    Author,
    Comment,
    Text,
    TextT,
    Other,
}

/// Parse a comments part.
pub fn parse_comments(part: &str, data: &[u8]) -> Result<CommentsData> {
    let mut reader = sax::reader(data);
    let mut buf = Vec::new();
    let mut out = CommentsData::default();

    let mut stack: Vec<Ctx> = Vec::new();
    let mut text = String::new();
    let mut comment: Option<SheetComment> = None;

    loop {
        buf.clear();
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| crate::Error::malformed(part, e))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let parent = stack.last().copied();
                let ctx = match e.local_name().as_ref() {
                    b"authors" => Ctx::Authors,
                    b"author" if parent == Some(Ctx::Authors) => {
                        text.clear();
                        Ctx::Author
                    }
                    b"comment" => {
                        comment = Some(SheetComment {
                            reference: sax::require_attr(part, e, "ref")?,
                            author_id: match sax::attr(part, e, "authorId")? {
                                Some(v) => Some(sax::parse_num("authorId", &v)?),
                                None => None,
                            },
                            text: String::new(),
                        });
                        Ctx::Comment
                    }
                    b"text" if parent == Some(Ctx::Comment) => Ctx::Text,
                    b"t" => Ctx::TextT,
                    _ => Ctx::Other,
                };
                if matches!(event, Event::Start(_)) {
                    stack.push(ctx);
                } else if ctx == Ctx::Author {
                    out.authors.push(String::new());
                } else if ctx == Ctx::Comment {
                    if let Some(c) = comment.take() {
                        out.comments.push(c);
                    }
                }
            }
            Event::Text(ref t) => {
                if matches!(stack.last(), Some(Ctx::Author) | Some(Ctx::TextT)) {
                    text.push_str(&t.unescape().map_err(|e| crate::Error::malformed(part, e))?);
                }
            }
            Event::End(_) => match stack.pop() {
                Some(Ctx::Author) => out.authors.push(std::mem::take(&mut text)),
                Some(Ctx::TextT) => {
                    if let Some(c) = comment.as_mut() {
                        c.text.push_str(&text);
                    }
                    text.clear();
                }
                Some(Ctx::Comment) => {
                    if let Some(c) = comment.take() {
                        out.comments.push(c);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out)
}

/// Serialize a comments part.
pub fn write_comments(data: &CommentsData) -> Result<Vec<u8>> {
    let mut em = Emitter::new()?;
    em.start(sax::element("comments", &[("xmlns", SPREADSHEET_ML)]))?;

    em.start(sax::element("authors", &[]))?;
    for author in &data.authors {
        em.leaf("author", author)?;
    }
    em.end("authors")?;

    em.start(sax::element("commentList", &[]))?;
    for comment in &data.comments {
        let author_id = comment.author_id.unwrap_or(0).to_string();
        em.start(sax::element(
            "comment",
            &[("ref", &comment.reference), ("authorId", &author_id)],
        ))?;
        em.start(sax::element("text", &[]))?;
        em.start(sax::element("r", &[]))?;
        em.leaf("t", &comment.text)?;
        em.end("r")?;
        em.end("text")?;
        em.end("comment")?;
    }
    em.end("commentList")?;

    em.end("comments")?;
    Ok(em.into_bytes())
}
