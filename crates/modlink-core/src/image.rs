//! Module image encoding.
//!
//! An image is the in-memory binary a compile emits and a host loads. It
//! carries the module's [`ModuleMetadata`]; the same bytes written to disk
//! serve as a file-backed reference for later compiles.
//!
//! ```text
//! "MLNK" | version u16 | optimization u8 | name
//!        | references: [name]
//!        | types: [name, flags u8, base: option<typeref>, fields: [name, typeref]]
//!        | constants: [name, kind u8, init]
//!        | xxh64 u64
//! ```

use num_enum::{IntoPrimitive, TryFromPrimitive};
use ordered_float::OrderedFloat;

use crate::codec::{ByteReader, ByteWriter};
use crate::{
    BinaryOp, BuiltinType, ConstDef, ConstExpr, ConstInit, ConstValue, FieldDef, ImageError,
    MAX_EXPR_DEPTH, ModuleMetadata, OptimizationLevel, TypeDef, TypeFlags, TypeHash, TypeRef, ValueKind,
};

/// Magic bytes at the start of every module image.
pub const IMAGE_MAGIC: [u8; 4] = *b"MLNK";

/// Current image format version.
pub const IMAGE_VERSION: u16 = 1;

#[derive(Debug, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
enum TypeRefTag {
    Builtin = 0,
    Local = 1,
    External = 2,
}

#[derive(Debug, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
enum ExprTag {
    Literal = 0,
    LocalRef = 1,
    ExternalRef = 2,
    Neg = 3,
    Binary = 4,
}

#[derive(Debug, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
enum InitTag {
    Value = 0,
    Expr = 1,
}

/// Encode metadata as a module image.
pub fn encode(metadata: &ModuleMetadata) -> Vec<u8> {
    let mut w = ByteWriter::new(IMAGE_MAGIC, IMAGE_VERSION);
    w.u8(metadata.optimization.into());
    w.str(&metadata.name);

    w.len(metadata.references.len());
    for reference in &metadata.references {
        w.str(reference);
    }

    w.len(metadata.types.len());
    for ty in &metadata.types {
        w.str(&ty.name);
        w.u8(ty.flags.bits());
        match &ty.base {
            Some(base) => {
                w.bool(true);
                write_type_ref(&mut w, base);
            }
            None => w.bool(false),
        }
        w.len(ty.fields.len());
        for field in &ty.fields {
            w.str(&field.name);
            write_type_ref(&mut w, &field.ty);
        }
    }

    w.len(metadata.constants.len());
    for constant in &metadata.constants {
        w.str(&constant.name);
        w.u8(constant.kind.into());
        match &constant.init {
            ConstInit::Value(value) => {
                w.u8(InitTag::Value.into());
                write_value(&mut w, value);
            }
            ConstInit::Expr(expr) => {
                w.u8(InitTag::Expr.into());
                write_expr(&mut w, expr);
            }
        }
    }

    w.finish()
}

/// Decode a module image.
pub fn decode(bytes: &[u8]) -> Result<ModuleMetadata, ImageError> {
    let mut r = ByteReader::open(bytes, IMAGE_MAGIC, IMAGE_VERSION)?;
    let optimization: OptimizationLevel = r.tag("optimization level")?;
    let name = r.str()?;

    let reference_count = r.len()?;
    let mut references = Vec::with_capacity(reference_count.min(1024));
    for _ in 0..reference_count {
        references.push(r.str()?);
    }

    let type_count = r.len()?;
    let mut types = Vec::with_capacity(type_count.min(1024));
    for _ in 0..type_count {
        let ty_name = r.str()?;
        let offset = r.offset();
        let bits = r.u8()?;
        let flags = TypeFlags::from_bits(bits).ok_or(ImageError::InvalidTag {
            what: "type flags",
            tag: bits,
            offset,
        })?;
        let base = if r.bool()? {
            Some(read_type_ref(&mut r)?)
        } else {
            None
        };
        let field_count = r.len()?;
        let mut fields = Vec::with_capacity(field_count.min(1024));
        for _ in 0..field_count {
            let field_name = r.str()?;
            let ty = read_type_ref(&mut r)?;
            fields.push(FieldDef {
                name: field_name,
                ty,
            });
        }
        types.push(TypeDef {
            hash: TypeHash::of_type(&name, &ty_name),
            name: ty_name,
            flags,
            base,
            fields,
        });
    }

    let constant_count = r.len()?;
    let mut constants = Vec::with_capacity(constant_count.min(1024));
    for _ in 0..constant_count {
        let const_name = r.str()?;
        let kind: ValueKind = r.tag("value kind")?;
        let init = match r.tag::<InitTag>("constant init")? {
            InitTag::Value => ConstInit::Value(read_value(&mut r, kind)?),
            InitTag::Expr => ConstInit::Expr(read_expr(&mut r, 1)?),
        };
        constants.push(ConstDef {
            name: const_name,
            kind,
            init,
        });
    }

    r.finish()?;

    Ok(ModuleMetadata {
        name,
        optimization,
        references,
        types,
        constants,
    })
}

fn write_type_ref(w: &mut ByteWriter, ty: &TypeRef) {
    match ty {
        TypeRef::Builtin(builtin) => {
            w.u8(TypeRefTag::Builtin.into());
            w.u8((*builtin).into());
        }
        TypeRef::Local(name) => {
            w.u8(TypeRefTag::Local.into());
            w.str(name);
        }
        TypeRef::External { module, name } => {
            w.u8(TypeRefTag::External.into());
            w.str(module);
            w.str(name);
        }
    }
}

fn read_type_ref(r: &mut ByteReader<'_>) -> Result<TypeRef, ImageError> {
    Ok(match r.tag::<TypeRefTag>("type reference")? {
        TypeRefTag::Builtin => TypeRef::Builtin(r.tag::<BuiltinType>("builtin type")?),
        TypeRefTag::Local => TypeRef::Local(r.str()?),
        TypeRefTag::External => {
            let module = r.str()?;
            let name = r.str()?;
            TypeRef::External { module, name }
        }
    })
}

/// Values are written without their kind; the kind precedes them in the record.
fn write_value(w: &mut ByteWriter, value: &ConstValue) {
    match value {
        ConstValue::Int(v) => w.u64(*v as u64),
        ConstValue::Float(v) => w.u64(v.0.to_bits()),
        ConstValue::Bool(v) => w.bool(*v),
        ConstValue::Str(s) => w.str(s),
    }
}

fn read_value(r: &mut ByteReader<'_>, kind: ValueKind) -> Result<ConstValue, ImageError> {
    Ok(match kind {
        ValueKind::Int => ConstValue::Int(r.u64()? as i64),
        ValueKind::Float => ConstValue::Float(OrderedFloat(f64::from_bits(r.u64()?))),
        ValueKind::Bool => ConstValue::Bool(r.bool()?),
        ValueKind::Str => ConstValue::Str(r.str()?),
    })
}

fn write_expr(w: &mut ByteWriter, expr: &ConstExpr) {
    match expr {
        ConstExpr::Literal(value) => {
            w.u8(ExprTag::Literal.into());
            w.u8(value.kind().into());
            write_value(w, value);
        }
        ConstExpr::Ref { module: None, name } => {
            w.u8(ExprTag::LocalRef.into());
            w.str(name);
        }
        ConstExpr::Ref {
            module: Some(module),
            name,
        } => {
            w.u8(ExprTag::ExternalRef.into());
            w.str(module);
            w.str(name);
        }
        ConstExpr::Neg(inner) => {
            w.u8(ExprTag::Neg.into());
            write_expr(w, inner);
        }
        ConstExpr::Binary { op, lhs, rhs } => {
            w.u8(ExprTag::Binary.into());
            w.u8((*op).into());
            write_expr(w, lhs);
            write_expr(w, rhs);
        }
    }
}

/// Read one expression node; `depth` is its level in the tree, the root being 1.
fn read_expr(r: &mut ByteReader<'_>, depth: usize) -> Result<ConstExpr, ImageError> {
    if depth > MAX_EXPR_DEPTH {
        return Err(ImageError::ExpressionTooDeep {
            limit: MAX_EXPR_DEPTH,
            offset: r.offset(),
        });
    }
    Ok(match r.tag::<ExprTag>("expression")? {
        ExprTag::Literal => {
            let kind: ValueKind = r.tag("value kind")?;
            ConstExpr::Literal(read_value(r, kind)?)
        }
        ExprTag::LocalRef => ConstExpr::Ref {
            module: None,
            name: r.str()?,
        },
        ExprTag::ExternalRef => {
            let module = r.str()?;
            let name = r.str()?;
            ConstExpr::Ref {
                module: Some(module),
                name,
            }
        }
        ExprTag::Neg => ConstExpr::Neg(Box::new(read_expr(r, depth + 1)?)),
        ExprTag::Binary => {
            let op: BinaryOp = r.tag("binary operator")?;
            let lhs = read_expr(r, depth + 1)?;
            let rhs = read_expr(r, depth + 1)?;
            ConstExpr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            }
        }
    })
}
