//! Declared record fields and their tag strings.
//!
//! Records describe their fields with static [`Field`] descriptors. A field may
//! carry a tag string in the conventional `key:"value" other:"value"` form;
//! property resolvers read ordering and filtering hints from it.
//!
//! ## Tag Grammar
//!
//! ```text
//! <tag>   := (<ws>* <pair>)*
//! <pair>  := key ":" '"' value '"'
//! ```
//!
//! Keys are runs of non-space characters other than `:` and `"`. Values are
//! taken verbatim up to the closing quote; escapes are not interpreted.
//! Parsing stops at the first malformed pair, so a lookup past that point
//! finds nothing.

use winnow::ascii::multispace0;
use winnow::combinator::{delimited, preceded};
use winnow::prelude::*;
use winnow::token::{take_till, take_while};
use winnow::ModalResult;

/// Static description of one declared record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Field name as declared.
    pub name: &'static str,
    /// Raw tag string (empty when the field has no tag).
    pub tag: &'static str,
    /// Whether the field is externally visible.
    ///
    /// The default property resolver only lists visible fields.
    pub visible: bool,
}

impl Field {
    /// A visible field without a tag.
    pub const fn new(name: &'static str) -> Self {
        Field {
            name,
            tag: "",
            visible: true,
        }
    }

    /// Attach a tag string.
    pub const fn with_tag(mut self, tag: &'static str) -> Self {
        self.tag = tag;
        self
    }

    /// Mark the field as not externally visible.
    pub const fn private(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Look up the value for `key` in this field's tag string.
    pub fn tag(&self, key: &str) -> Option<&'static str> {
        lookup(self.tag, key)
    }
}

/// Look up the value for `key` in a `key:"value"` tag string.
///
/// Returns the first matching value.
pub fn lookup<'s>(tag: &'s str, key: &str) -> Option<&'s str> {
    let mut input = tag;
    while let Ok((k, v)) = tag_pair(&mut input) {
        if k == key {
            return Some(v);
        }
    }
    None
}

/// Parse one `key:"value"` pair, skipping leading whitespace.
fn tag_pair<'s>(input: &mut &'s str) -> ModalResult<(&'s str, &'s str)> {
    let _ = multispace0.parse_next(input)?;

    let key: &str = take_while(1.., |c: char| {
        !c.is_whitespace() && !c.is_control() && c != ':' && c != '"'
    })
    .parse_next(input)?;

    let value: &str =
        preceded(':', delimited('"', take_till(0.., |c| c == '"'), '"')).parse_next(input)?;

    Ok((key, value))
}
