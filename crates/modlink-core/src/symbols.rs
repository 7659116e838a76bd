//! Debug-symbol buffers.
//!
//! Emitted next to a module image when a compile runs in debug mode. Maps
//! every declared member back to the source unit and position it came from.

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::codec::{ByteReader, ByteWriter};
use crate::{ImageError, Span};

pub const SYMBOLS_MAGIC: [u8; 4] = *b"MLDB";
pub const SYMBOLS_VERSION: u16 = 1;

/// What a symbol entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum SymbolKind {
    Type = 0,
    Field = 1,
    Constant = 2,
}

/// Position of one declared member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    pub kind: SymbolKind,
    /// `Type`, `Type.field` or `CONSTANT`.
    pub qualified_name: String,
    /// Index into [`DebugSymbols::units`].
    pub unit: u32,
    pub span: Span,
}

/// Decoded debug symbols for one module.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DebugSymbols {
    pub module: String,
    /// Origin tag of each compiled source unit, in submission order.
    pub units: Vec<String>,
    pub entries: Vec<SymbolEntry>,
}

impl DebugSymbols {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            ..Self::default()
        }
    }

    /// Find the entry for a member by its qualified name.
    pub fn lookup(&self, qualified_name: &str) -> Option<&SymbolEntry> {
        self.entries.iter().find(|e| e.qualified_name == qualified_name)
    }

    /// Origin tag of the unit an entry came from.
    pub fn unit_origin(&self, entry: &SymbolEntry) -> Option<&str> {
        self.units.get(entry.unit as usize).map(String::as_str)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = ByteWriter::new(SYMBOLS_MAGIC, SYMBOLS_VERSION);
        w.str(&self.module);
        w.len(self.units.len());
        for unit in &self.units {
            w.str(unit);
        }
        w.len(self.entries.len());
        for entry in &self.entries {
            w.u8(entry.kind.into());
            w.str(&entry.qualified_name);
            w.u32(entry.unit);
            w.u32(entry.span.line);
            w.u32(entry.span.col);
            w.u32(entry.span.len);
        }
        w.finish()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ImageError> {
        let mut r = ByteReader::open(bytes, SYMBOLS_MAGIC, SYMBOLS_VERSION)?;
        let module = r.str()?;

        let unit_count = r.len()?;
        let mut units = Vec::with_capacity(unit_count.min(1024));
        for _ in 0..unit_count {
            units.push(r.str()?);
        }

        let entry_count = r.len()?;
        let mut entries = Vec::with_capacity(entry_count.min(4096));
        for _ in 0..entry_count {
            let kind = r.tag("symbol kind")?;
            let qualified_name = r.str()?;
            let unit = r.u32()?;
            let span = Span::new(r.u32()?, r.u32()?, r.u32()?);
            entries.push(SymbolEntry {
                kind,
                qualified_name,
                unit,
                span,
            });
        }

        r.finish()?;
        Ok(Self {
            module,
            units,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_survive_encoding() {
        let mut symbols = DebugSymbols::new("Mod1");
        symbols.units.push("player.mls".into());
        symbols.entries.push(SymbolEntry {
            kind: SymbolKind::Field,
            qualified_name: "C.hp".into(),
            unit: 0,
            span: Span::new(2, 5, 2),
        });

        let decoded = DebugSymbols::decode(&symbols.encode()).unwrap();
        assert_eq!(decoded, symbols);
        let entry = decoded.lookup("C.hp").unwrap();
        assert_eq!(decoded.unit_origin(entry), Some("player.mls"));
    }

    #[test]
    fn empty_module_symbols_are_not_empty_bytes() {
        let bytes = DebugSymbols::new("Mod3").encode();
        assert!(bytes.len() > SYMBOLS_MAGIC.len());
        assert_eq!(DebugSymbols::decode(&bytes).unwrap().module, "Mod3");
    }
}
