//! Outline adapter: renders any reflected value as an indented text outline.
//!
//! Each visited node becomes one line, indented by one tab per depth level
//! and optionally preceded by a fixed prefix:
//!
//! ```text
//! 0/2-: map
//! 	0-: "name"
//! 	1-: "deepwalk"
//! 	2-: "tags"
//! 	3/1-: seq
//! 		0-: "cli"
//! ```
//!
//! Containers print `offset/size-name: kind`; leaves print
//! `offset-name: value`. Byte vectors are printed as hex on a single line
//! instead of being descended into.
//!
//! State lives in the traversal [`Context`]: the output buffer under
//! [`BUFFER_KEY`] and the optional line prefix under [`PREFIX_KEY`].

use std::fmt::Write as _;

use deepwalk_core::{
    Adapter, Bindings, BoxError, BuildError, Context, Engine, Kind, Phase, Reflect, Scalar, Site,
    TraverseConfig, WalkError,
};

use crate::error::DeepwalkError;

/// Context key of the `String` output buffer.
pub const BUFFER_KEY: &str = "buffer";

/// Context key of the optional `String` line prefix.
pub const PREFIX_KEY: &str = "prefix";

/// Rendering options for [`render`].
#[derive(Debug, Clone, Default)]
pub struct OutlineOptions {
    /// Skip values with no binding instead of failing.
    pub ignore_missing: bool,
    /// Print a closing line after each container's children.
    pub container_end: bool,
    /// Text written at the start of every line.
    pub prefix: Option<String>,
}

/// The outline adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Outline;

impl Adapter for Outline {
    fn bind(b: &mut Bindings<Self>) -> Result<(), BuildError> {
        b.on_type::<Vec<u8>>(|outline, ctx, site, value| outline.bytes(ctx, site, value))?;
        for kind in [Kind::Bool, Kind::F32, Kind::F64, Kind::Char, Kind::Str] {
            b.on_kind(kind, Outline::leaf)?;
        }
        for kind in [Kind::Array, Kind::Seq, Kind::Map, Kind::Record, Kind::Pointer] {
            b.on_container(kind, Outline::container)?;
        }
        b.on_nil_pointer(Outline::nil)?;
        b.on_signed_int(Outline::integer)?;
        b.on_unsigned_int(Outline::integer)?;
        Ok(())
    }
}

impl Outline {
    fn bytes(&self, ctx: &mut Context, site: Site<'_>, value: &[u8]) -> Result<bool, BoxError> {
        let mut hex = String::with_capacity(value.len() * 2);
        for byte in value {
            write!(hex, "{:02x}", byte)?;
        }
        if hex.is_empty() {
            emit(
                ctx,
                site.depth,
                format_args!("{}/{}-{}:", site.offset, value.len(), site.name),
            )?;
        } else {
            emit(
                ctx,
                site.depth,
                format_args!("{}/{}-{}: {}", site.offset, value.len(), site.name, hex),
            )?;
        }
        Ok(false)
    }

    fn leaf(
        &self,
        ctx: &mut Context,
        site: Site<'_>,
        value: &dyn Reflect,
    ) -> Result<bool, BoxError> {
        let text = value.scalar().map(format_scalar).unwrap_or_default();
        emit(ctx, site.depth, format_args!("{}-{}: {}", site.offset, site.name, text))?;
        Ok(false)
    }

    fn integer(
        &self,
        ctx: &mut Context,
        site: Site<'_>,
        value: &dyn Reflect,
    ) -> Result<(), BoxError> {
        self.leaf(ctx, site, value).map(|_| ())
    }

    fn nil(&self, ctx: &mut Context, site: Site<'_>, _: &dyn Reflect) -> Result<(), BoxError> {
        emit(ctx, site.depth, format_args!("{}-{}: nil", site.offset, site.name))
    }

    fn container(
        &self,
        ctx: &mut Context,
        site: Site<'_>,
        size: usize,
        phase: Phase,
        value: &dyn Reflect,
    ) -> Result<bool, BoxError> {
        match phase {
            Phase::Start => emit(
                ctx,
                site.depth,
                format_args!("{}/{}-{}: {}", site.offset, size, site.name, value.kind()),
            )?,
            Phase::End => emit(
                ctx,
                site.depth,
                format_args!("{}/{}-{}: end {}", site.offset, size, site.name, value.kind()),
            )?,
        }
        Ok(true)
    }
}

fn format_scalar(scalar: Scalar<'_>) -> String {
    match scalar {
        Scalar::Unit => "()".to_string(),
        Scalar::Bool(b) => b.to_string(),
        Scalar::Int(i) => i.to_string(),
        Scalar::Uint(u) => u.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Char(c) => format!("{:?}", c),
        Scalar::Str(s) => format!("{:?}", s),
    }
}

/// Append one line to the context buffer.
fn emit(ctx: &mut Context, depth: usize, line: std::fmt::Arguments<'_>) -> Result<(), BoxError> {
    let prefix = ctx.get_local::<String>(PREFIX_KEY).cloned();
    let buffer = ctx
        .get_local_mut::<String>(BUFFER_KEY)
        .ok_or("outline buffer missing from context")?;
    if let Some(prefix) = prefix {
        buffer.push_str(&prefix);
    }
    for _ in 0..depth {
        buffer.push('\t');
    }
    buffer.write_fmt(line)?;
    buffer.push('\n');
    Ok(())
}

/// Build an outline engine for `options`.
pub fn engine(options: &OutlineOptions) -> Result<Engine<Outline>, BuildError> {
    let config = TraverseConfig::new()
        .ignore_missing_binding(options.ignore_missing)
        .container_end(options.container_end);
    Engine::build(Outline, config)
}

/// Render `value` as an outline with a prebuilt engine.
pub fn render_with(
    engine: &Engine<Outline>,
    value: &dyn Reflect,
    prefix: Option<&str>,
) -> Result<String, WalkError> {
    let mut ctx = Context::new();
    ctx.set_local(BUFFER_KEY, String::new());
    if let Some(prefix) = prefix {
        ctx.set_local(PREFIX_KEY, prefix.to_string());
    }
    engine.traverse(&mut ctx, value)?;
    Ok(ctx
        .get_local_mut::<String>(BUFFER_KEY)
        .map(std::mem::take)
        .unwrap_or_default())
}

/// Render `value` as an outline.
pub fn render(value: &dyn Reflect, options: &OutlineOptions) -> Result<String, DeepwalkError> {
    let engine = engine(options)?;
    Ok(render_with(&engine, value, options.prefix.as_deref())?)
}
