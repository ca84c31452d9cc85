//! Record field resolution.
//!
//! When the walker opens a record it asks a [`PropertyResolver`] which fields
//! to visit and in what order. The answer is a [`ResolvedProperties`]: the
//! slot count reported to the record's container binding plus the ordered
//! [`Property`] list.
//!
//! Two resolvers ship with the crate:
//!
//! - [`DeclarationOrder`] (the default): every visible field, in declaration
//!   order, one slot per field.
//! - [`TaggedResolver`]: reads an ignore tag and an explicit order tag from
//!   each field's tag string, then applies [`arrange`].
//!
//! Resolution depends only on the record's type, so the engine caches one
//! result per type.

use std::sync::Arc;

use crate::error::PropertyError;
use crate::reflect::Reflect;

/// One record field selected for visiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Declared field index; `None` for a slot with no storage, which the
    /// walker skips.
    pub index: Option<usize>,
    /// Display name passed to callbacks.
    pub name: Arc<str>,
    /// Explicit position, if one was assigned.
    pub order: Option<usize>,
}

impl Property {
    /// A property for the field declared at `index`, with no explicit order.
    pub fn new(index: usize, name: impl Into<Arc<str>>) -> Self {
        Property {
            index: Some(index),
            name: name.into(),
            order: None,
        }
    }

    /// Assign an explicit order.
    pub fn with_order(mut self, order: usize) -> Self {
        self.order = Some(order);
        self
    }
}

/// Result of resolving a record type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedProperties {
    /// Slot count reported as the record's size.
    pub size: usize,
    /// Properties in final visit order.
    pub list: Vec<Property>,
}

/// Strategy for choosing and ordering a record's child fields.
pub trait PropertyResolver: Send + Sync {
    /// Resolve the properties of `record`.
    ///
    /// The result must depend only on the record's type.
    fn properties(&self, record: &dyn Reflect) -> Result<ResolvedProperties, PropertyError>;
}

/// Default resolver: all visible fields in declaration order.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclarationOrder;

impl PropertyResolver for DeclarationOrder {
    fn properties(&self, record: &dyn Reflect) -> Result<ResolvedProperties, PropertyError> {
        let list: Vec<Property> = record
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, field)| field.visible)
            .map(|(index, field)| Property::new(index, field.name))
            .collect();
        Ok(ResolvedProperties {
            size: list.len(),
            list,
        })
    }
}

/// Resolver driven by field tags.
///
/// A field whose ignore tag lists `-` is dropped. A field whose order tag
/// holds a non-negative integer is given that explicit position. The final
/// list is produced by [`arrange`].
///
/// ```
/// use deepwalk_core::{reflect_record, PropertyResolver, TaggedResolver};
///
/// struct Row {
///     id: u64,
///     note: String,
///     scratch: Vec<u8>,
/// }
///
/// reflect_record!(Row {
///     id => r#"order:"0""#,
///     note => r#"order:"2""#,
///     scratch => r#"walk:"-""#,
/// });
///
/// let row = Row { id: 1, note: String::new(), scratch: Vec::new() };
/// let resolved = TaggedResolver::default().properties(&row).unwrap();
/// assert_eq!(resolved.size, 3);
/// assert_eq!(resolved.list.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct TaggedResolver {
    ignore_key: String,
    order_key: String,
}

impl Default for TaggedResolver {
    fn default() -> Self {
        TaggedResolver {
            ignore_key: "walk".to_string(),
            order_key: "order".to_string(),
        }
    }
}

impl TaggedResolver {
    /// Create a resolver reading the given tag keys.
    pub fn new(ignore_key: impl Into<String>, order_key: impl Into<String>) -> Self {
        TaggedResolver {
            ignore_key: ignore_key.into(),
            order_key: order_key.into(),
        }
    }
}

impl PropertyResolver for TaggedResolver {
    fn properties(&self, record: &dyn Reflect) -> Result<ResolvedProperties, PropertyError> {
        let type_name = record.type_name();
        let mut list = Vec::new();

        for (index, field) in record.fields().iter().enumerate() {
            if !field.visible {
                continue;
            }

            let ignored = field
                .tag(&self.ignore_key)
                .is_some_and(|opts| opts.split(',').any(|opt| opt.trim() == "-"));
            if ignored {
                continue;
            }

            let mut property = Property::new(index, field.name);
            if let Some(raw) = field.tag(&self.order_key).map(str::trim) {
                if !raw.is_empty() {
                    let order = raw
                        .parse::<usize>()
                        .map_err(|_| PropertyError::InvalidOrderTag {
                            type_name: type_name.to_string(),
                            field: field.name.to_string(),
                            value: raw.to_string(),
                        })?;
                    property = property.with_order(order);
                }
            }
            list.push(property);
        }

        arrange(type_name, list)
    }
}

/// Apply the final ordering rule to a resolver's property list.
///
/// Properties are stably sorted by explicit order, falling back to the
/// declared index when unset, with the declared index as tiebreak. Positions
/// are then numbered from zero: a property without an explicit order takes
/// its position, and an explicit order lower than its position is rejected.
/// The slot count is the last property's order plus one.
pub fn arrange(
    type_name: &str,
    mut list: Vec<Property>,
) -> Result<ResolvedProperties, PropertyError> {
    list.sort_by_key(|p| {
        let declared = p.index.unwrap_or(usize::MAX);
        (p.order.unwrap_or(declared), declared)
    });

    for (position, property) in list.iter_mut().enumerate() {
        match property.order {
            None => property.order = Some(position),
            Some(order) if order < position => {
                return Err(PropertyError::OrderConflict {
                    type_name: type_name.to_string(),
                    field: property.name.to_string(),
                    order,
                    position,
                });
            }
            Some(_) => {}
        }
    }

    let size = list
        .last()
        .and_then(|p| p.order)
        .map_or(0, |order| order + 1);
    Ok(ResolvedProperties { size, list })
}
