use fluent_uri::Uri;

use crate::{error::Error, segments::escape_segment, uri};

/// Base URI given to schema documents that declare no `id` of their own.
pub const DEFAULT_ROOT_URI: &str = "json-schema:///";

/// Fragment under which a whole document registers.
pub const ROOT_FRAGMENT: &str = "#";

/// The compiler's view of "where am I" while walking a schema document.
///
/// Every `id` keyword pushes a new base (resolved against the enclosing
/// one) and restarts the JSON-pointer fragment; descending into a keyword
/// pushes a pointer segment onto the innermost frame. The current location
/// is the pair `(document, fragment)` under which the schema object being
/// compiled registers itself.
#[derive(Debug)]
pub struct UriScope {
    frames: Vec<Frame>,
}

#[derive(Debug)]
struct Frame {
    base: Uri<String>,
    /// Escaped pointer segments appended below the base's own fragment.
    pointer: Vec<Box<str>>,
}

impl UriScope {
    /// A scope rooted at `root`, or at [`DEFAULT_ROOT_URI`] when absent.
    pub fn new(root: Option<&str>) -> Result<UriScope, Error> {
        let base = uri::from_str(root.unwrap_or(DEFAULT_ROOT_URI))?;
        Ok(UriScope {
            frames: vec![Frame {
                base,
                pointer: Vec::new(),
            }],
        })
    }

    fn top(&self) -> &Frame {
        self.frames.last().expect("scope always has a root frame")
    }

    fn top_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("scope always has a root frame")
    }

    /// Resolves `reference` against the current base without changing the
    /// scope; used for `$ref` targets.
    pub fn resolve(&self, reference: &str) -> Result<Uri<String>, Error> {
        uri::resolve_against(&self.top().base, reference)
    }

    /// Enters a schema object carrying an `id`: the resolved id becomes the
    /// new base and the pointer restarts below it.
    pub fn push_id(&mut self, id: &str) -> Result<(), Error> {
        let base = self.resolve(id)?;
        self.frames.push(Frame {
            base,
            pointer: Vec::new(),
        });
        Ok(())
    }

    /// Leaves a schema object entered with [`UriScope::push_id`].
    pub fn pop_id(&mut self) {
        debug_assert!(self.frames.len() > 1, "cannot pop the root base");
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Descends into a named keyword or property.
    pub fn push_segment(&mut self, segment: &str) {
        let escaped = escape_segment(segment);
        self.top_mut().pointer.push(escaped.as_ref().into());
    }

    /// Descends into an array position, e.g. a tuple `items` entry.
    pub fn push_index(&mut self, index: usize) {
        self.top_mut().pointer.push(index.to_string().into());
    }

    pub fn pop_segment(&mut self) {
        self.top_mut().pointer.pop();
    }

    /// The document part of the current base URI.
    pub fn document(&self) -> String {
        let (document, _) = uri::split_fragment(&self.top().base);
        document
    }

    /// The `#`-prefixed fragment for the current location: the base's own
    /// fragment (empty unless the innermost `id` carried one) followed by
    /// the accumulated pointer segments.
    pub fn fragment(&self) -> String {
        let frame = self.top();
        let (_, base_fragment) = uri::split_fragment(&frame.base);
        let mut fragment = base_fragment;
        for segment in &frame.pointer {
            fragment.push('/');
            fragment.push_str(segment);
        }
        fragment
    }

    /// `(document, fragment)` for the current location.
    pub fn location(&self) -> (String, String) {
        (self.document(), self.fragment())
    }
}
