//! Depth-first walk over an explicit stack of open containers.
//!
//! Each container the walker descends into gets a [`VisitFrame`] pushed on
//! the stack. The loop repeatedly asks the top frame for its next child and
//! dispatches it; a frame with no children left is popped and, when enabled,
//! its container binding gets the end notification.

use std::sync::Arc;

use tracing::trace;

use crate::binding::{Adapter, Site};
use crate::context::Context;
use crate::engine::{Dispatch, Engine, Opening};
use crate::error::WalkError;
use crate::kind::Kind;
use crate::property::ResolvedProperties;
use crate::reflect::Reflect;

/// How an open container yields its children.
enum Children<'v> {
    /// Arrays and sequences, by index.
    Items,
    /// Maps: key at `2i`, value at `2i + 1`.
    Entries(Vec<(&'v dyn Reflect, &'v dyn Reflect)>),
    /// Records, in resolved property order. Offsets count visited
    /// properties; explicit orders only widen the reported size.
    Fields(Arc<ResolvedProperties>),
    /// Pointers: the target at offset 0.
    Pointee,
}

/// A child produced by a frame.
struct Child<'v> {
    value: &'v dyn Reflect,
    offset: usize,
    name: Arc<str>,
}

/// Bookkeeping for one open container.
pub(crate) struct VisitFrame<'v> {
    /// The container's own depth; children are one deeper.
    pub(crate) depth: usize,
    /// The container's own offset within its parent.
    pub(crate) offset: usize,
    pub(crate) name: Arc<str>,
    pub(crate) value: &'v dyn Reflect,
    pub(crate) size: usize,
    /// Container binding that opened this frame.
    pub(crate) binding: Option<usize>,
    children: Children<'v>,
    cursor: usize,
    visited: usize,
}

impl<'v> VisitFrame<'v> {
    fn open(
        value: &'v dyn Reflect,
        opening: Opening,
        depth: usize,
        offset: usize,
        name: Arc<str>,
    ) -> Self {
        let children = match value.kind() {
            Kind::Array | Kind::Seq => Children::Items,
            Kind::Map => {
                let entries = value.entries();
                if entries.len() * 2 != opening.size {
                    panic!(
                        "map {} reports size {} but yields {} entries",
                        value.type_name(),
                        opening.size,
                        entries.len()
                    );
                }
                Children::Entries(entries)
            }
            Kind::Record => match opening.properties {
                Some(properties) => Children::Fields(properties),
                None => panic!("record {} opened without properties", value.type_name()),
            },
            Kind::Pointer => Children::Pointee,
            kind => panic!("cannot open {} of scalar kind {}", value.type_name(), kind),
        };

        VisitFrame {
            depth,
            offset,
            name,
            value,
            size: opening.size,
            binding: opening.binding,
            children,
            cursor: 0,
            visited: 0,
        }
    }

    /// The container's own site, as passed to its start notification.
    pub(crate) fn site(&self) -> Site<'_> {
        Site {
            depth: self.depth,
            offset: self.offset,
            name: &self.name,
        }
    }

    fn next_child(&mut self, unnamed: &Arc<str>) -> Option<Child<'v>> {
        let value = self.value;
        match &self.children {
            Children::Items => {
                if self.cursor >= self.size {
                    return None;
                }
                let index = self.cursor;
                self.cursor += 1;
                let item = value.item(index).unwrap_or_else(|| {
                    panic!(
                        "{} reports length {} but has no item {}",
                        value.type_name(),
                        self.size,
                        index
                    )
                });
                Some(Child {
                    value: item,
                    offset: index,
                    name: Arc::clone(unnamed),
                })
            }
            Children::Entries(entries) => {
                if self.cursor >= self.size {
                    return None;
                }
                let offset = self.cursor;
                self.cursor += 1;
                let (key, val) = entries[offset / 2];
                Some(Child {
                    value: if offset % 2 == 0 { key } else { val },
                    offset,
                    name: Arc::clone(unnamed),
                })
            }
            Children::Fields(resolved) => loop {
                let property = resolved.list.get(self.cursor)?;
                self.cursor += 1;
                let Some(index) = property.index else {
                    continue;
                };
                let field = value.field(index).unwrap_or_else(|| {
                    panic!(
                        "property {} of {} names field {} which has no storage",
                        property.name,
                        value.type_name(),
                        index
                    )
                });
                let offset = self.visited;
                self.visited += 1;
                break Some(Child {
                    value: field,
                    offset,
                    name: Arc::clone(&property.name),
                });
            },
            Children::Pointee => {
                if self.cursor > 0 {
                    return None;
                }
                self.cursor = 1;
                value.pointee().map(|target| Child {
                    value: target,
                    offset: 0,
                    name: Arc::clone(&self.name),
                })
            }
        }
    }
}

/// One traversal: the engine, the caller's context, and the open frames.
pub(crate) struct Walker<'e, 'c, 'v, A> {
    engine: &'e Engine<A>,
    ctx: &'c mut Context,
    stack: Vec<VisitFrame<'v>>,
    unnamed: Arc<str>,
}

impl<'e, 'c, 'v, A: Adapter> Walker<'e, 'c, 'v, A> {
    pub(crate) fn new(engine: &'e Engine<A>, ctx: &'c mut Context) -> Self {
        Walker {
            engine,
            ctx,
            stack: Vec::new(),
            unnamed: Arc::from(""),
        }
    }

    pub(crate) fn walk(mut self, root: &'v dyn Reflect) -> Result<(), WalkError> {
        self.visit(root, 0, 0, Arc::clone(&self.unnamed))?;

        loop {
            let next = match self.stack.last_mut() {
                None => return Ok(()),
                Some(frame) => frame
                    .next_child(&self.unnamed)
                    .map(|child| (frame.depth + 1, child)),
            };
            match next {
                Some((depth, child)) => self.visit(child.value, depth, child.offset, child.name)?,
                None => self.close()?,
            }
        }
    }

    /// Dispatch one node, re-entering for unwrapped pointers, and open a
    /// frame if the binding asked to descend.
    fn visit(
        &mut self,
        value: &'v dyn Reflect,
        depth: usize,
        offset: usize,
        name: Arc<str>,
    ) -> Result<(), WalkError> {
        let mut current = value;
        loop {
            let site = Site {
                depth,
                offset,
                name: &name,
            };
            match self.engine.dispatch(self.ctx, site, current)? {
                Dispatch::Done => return Ok(()),
                Dispatch::Reenter(target) => current = target,
                Dispatch::Descend(opening) => {
                    trace!(
                        depth,
                        offset,
                        size = opening.size,
                        type_name = current.type_name(),
                        "descending"
                    );
                    let frame = VisitFrame::open(current, opening, depth, offset, name);
                    self.stack.push(frame);
                    return Ok(());
                }
            }
        }
    }

    fn close(&mut self) -> Result<(), WalkError> {
        let Some(frame) = self.stack.pop() else {
            return Ok(());
        };
        if self.engine.config().container_end {
            self.engine.end_container(self.ctx, &frame)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{Bindings, Phase};
    use crate::config::TraverseConfig;
    use crate::error::BuildError;
    use std::collections::BTreeMap;

    /// Records every start notification as `depth:offset:name:kind`.
    struct Recorder;

    fn log(ctx: &mut Context, line: String) {
        if ctx.get_local::<Vec<String>>("log").is_none() {
            ctx.set_local("log", Vec::<String>::new());
        }
        if let Some(lines) = ctx.get_local_mut::<Vec<String>>("log") {
            lines.push(line);
        }
    }

    impl Adapter for Recorder {
        fn bind(b: &mut Bindings<Self>) -> Result<(), BuildError> {
            for kind in [Kind::Array, Kind::Seq, Kind::Map, Kind::Record, Kind::Pointer] {
                b.on_container(kind, |_, ctx, site, size, phase, value| {
                    let tag = if phase.is_start() { "open" } else { "close" };
                    log(
                        ctx,
                        format!(
                            "{}:{}:{}:{}/{}:{}",
                            site.depth,
                            site.offset,
                            site.name,
                            value.kind(),
                            size,
                            tag
                        ),
                    );
                    Ok(true)
                })?;
            }
            b.on_all_kinds(|_, ctx, site, value| {
                log(
                    ctx,
                    format!("{}:{}:{}:{}", site.depth, site.offset, site.name, value.kind()),
                );
                Ok(())
            })?;
            Ok(())
        }
    }

    fn run<T: Reflect>(value: &T, config: TraverseConfig) -> Vec<String> {
        let engine = Engine::build(Recorder, config).unwrap();
        let mut ctx = Context::new();
        engine.traverse(&mut ctx, value).unwrap();
        ctx.get_local::<Vec<String>>("log").cloned().unwrap_or_default()
    }

    struct Pair {
        left: u8,
        right: Option<Box<u8>>,
    }

    crate::reflect_record!(Pair { left, right });

    #[test]
    fn sequence_children_are_positional() {
        let lines = run(&vec![10u8, 20, 30], TraverseConfig::default());
        assert_eq!(lines, vec!["0:0::seq/3:open", "1:0::u8", "1:1::u8", "1:2::u8"]);
    }

    #[test]
    fn map_entries_visit_key_then_value() {
        let map: BTreeMap<&'static str, i8> = [("a", 1), ("b", 2)].into_iter().collect();
        let lines = run(&map, TraverseConfig::default());
        assert_eq!(
            lines,
            vec!["0:0::map/4:open", "1:0::str", "1:1::i8", "1:2::str", "1:3::i8"]
        );
    }

    #[test]
    fn record_children_carry_field_names() {
        let pair = Pair {
            left: 1,
            right: Some(Box::new(2)),
        };
        let lines = run(&pair, TraverseConfig::default());
        assert_eq!(
            lines,
            vec![
                "0:0::record/2:open",
                "1:0:left:u8",
                "1:1:right:pointer/1:open",
                "2:0:right:pointer/1:open",
                "3:0:right:u8",
            ]
        );
    }

    #[test]
    fn end_notifications_close_innermost_first() {
        let nested = vec![vec![1u8], vec![]];
        let lines = run(&nested, TraverseConfig::new().container_end(true));
        assert_eq!(
            lines,
            vec![
                "0:0::seq/2:open",
                "1:0::seq/1:open",
                "2:0::u8",
                "1:0::seq/1:close",
                "1:1::seq/0:open",
                "1:1::seq/0:close",
                "0:0::seq/2:close",
            ]
        );
    }

    struct Stubborn;

    impl Adapter for Stubborn {
        fn bind(b: &mut Bindings<Self>) -> Result<(), BuildError> {
            b.on_type::<Vec<u8>>(|_, _, _, _| Ok(true))?;
            b.on_container(Kind::Seq, |_, _, _, _, phase, _| {
                assert!(phase.is_start(), "vec<u8> is bound by type");
                Ok(true)
            })?;
            b.on_kind(Kind::U8, |_, ctx, site, _| {
                ctx.set_local("last", site.offset);
                Ok(false)
            })?;
            Ok(())
        }
    }

    #[test]
    fn non_container_binding_can_descend() {
        let engine =
            Engine::build(Stubborn, TraverseConfig::new().container_end(true)).unwrap();
        let mut ctx = Context::new();
        engine.traverse(&mut ctx, &vec![7u8, 8]).unwrap();
        assert_eq!(ctx.get_local::<usize>("last"), Some(&1));
    }

    #[test]
    fn container_end_error_is_wrapped() {
        struct Closer;
        impl Adapter for Closer {
            fn bind(b: &mut Bindings<Self>) -> Result<(), BuildError> {
                b.on_container(Kind::Seq, |_, _, _, _, phase, _| match phase {
                    Phase::Start => Ok(true),
                    Phase::End => Err("cannot close".into()),
                })?;
                Ok(())
            }
        }
        let engine = Engine::build(Closer, TraverseConfig::new().container_end(true)).unwrap();
        let err = engine
            .traverse(&mut Context::new(), &Vec::<u8>::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "call container end failed: cannot close");
    }
}
