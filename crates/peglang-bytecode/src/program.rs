//! [`Program`]: a compiled bytecode module -- instruction stream, string
//! table, named entrypoints, and an optional source map (spec §3
//! "Bytecode Program", §6.4).

use indexmap::IndexMap;

use crate::header::{self, Header, HEADER_LEN, PEGC_MAGIC};
use crate::instruction::Instruction;
use crate::source_map::SourceMap;
use crate::string_table::StringTable;
use crate::ModuleError;

/// A compiled, immutable bytecode program (spec §3: "Bytecode programs
/// are immutable after compile").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<u32>,
    strings: StringTable,
    /// Rule name -> instruction offset of its first instruction.
    entrypoints: IndexMap<String, u32>,
    source_map: Option<SourceMap>,
}

impl Program {
    pub fn new(instructions: Vec<u32>, strings: StringTable) -> Self {
        Self {
            instructions,
            strings,
            entrypoints: IndexMap::new(),
            source_map: None,
        }
    }

    pub fn with_source_map(mut self, source_map: SourceMap) -> Self {
        self.source_map = Some(source_map);
        self
    }

    pub fn add_entrypoint(&mut self, name: impl Into<String>, offset: u32) {
        self.entrypoints.insert(name.into(), offset);
    }

    pub fn entrypoint(&self, name: &str) -> Option<u32> {
        self.entrypoints.get(name).copied()
    }

    pub fn entrypoints(&self) -> impl Iterator<Item = (&str, u32)> {
        self.entrypoints.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    pub fn source_map(&self) -> Option<&SourceMap> {
        self.source_map.as_ref()
    }

    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    pub fn raw_words(&self) -> &[u32] {
        &self.instructions
    }

    /// Decode the instruction at `offset`.
    ///
    /// # Panics
    /// Panics if `offset` is out of bounds; callers validate cursor
    /// bounds against `instruction_count` before dispatch (spec §4.6).
    pub fn decode_at(&self, offset: u32) -> Result<Instruction, ModuleError> {
        Instruction::decode(self.instructions[offset as usize])
    }

    /// Serialize to the on-disk format: magic, header, instruction
    /// stream, string table, entrypoint table, optional source map.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ModuleError> {
        if self.entrypoints.len() > u32::MAX as usize {
            return Err(ModuleError::StringTableTooLarge(self.entrypoints.len()));
        }

        let mut body = Vec::new();
        for &word in &self.instructions {
            body.extend_from_slice(&word.to_be_bytes());
        }
        body.extend_from_slice(&self.strings.to_bytes()?);

        body.extend_from_slice(&(self.entrypoints.len() as u32).to_be_bytes());
        for (name, offset) in &self.entrypoints {
            let name_bytes = name.as_bytes();
            if name_bytes.len() > u8::MAX as usize {
                return Err(ModuleError::StringEntryTooLong(name_bytes.len()));
            }
            body.push(name_bytes.len() as u8);
            body.extend_from_slice(name_bytes);
            body.extend_from_slice(&offset.to_be_bytes());
        }

        body.push(if self.source_map.is_some() { 1 } else { 0 });
        if let Some(source_map) = &self.source_map {
            body.extend_from_slice(&(source_map.len() as u32).to_be_bytes());
            for (offset, loc) in source_map.iter() {
                body.extend_from_slice(&offset.to_be_bytes());
                body.extend_from_slice(&loc.file.as_u32().to_be_bytes());
                body.extend_from_slice(&loc.span.start.cursor.to_be_bytes());
                body.extend_from_slice(&loc.span.end.cursor.to_be_bytes());
            }
        }

        let header = Header {
            version: header::VERSION,
            checksum: header::checksum(&body),
            instruction_count: self.instructions.len() as u32,
            entrypoint_count: self.entrypoints.len() as u32,
        };

        let mut out = Vec::with_capacity(4 + HEADER_LEN + body.len());
        out.extend_from_slice(&PEGC_MAGIC);
        out.extend_from_slice(&header.to_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ModuleError> {
        if bytes.len() < 4 + HEADER_LEN {
            return Err(ModuleError::Truncated);
        }
        if bytes[0..4] != PEGC_MAGIC {
            return Err(ModuleError::BadMagic);
        }
        let header = Header::from_bytes(&bytes[4..4 + HEADER_LEN])?;
        if header.version != header::VERSION {
            return Err(ModuleError::UnsupportedVersion(header.version));
        }

        let body = &bytes[4 + HEADER_LEN..];
        let actual = header::checksum(body);
        if actual != header.checksum {
            return Err(ModuleError::ChecksumMismatch {
                expected: header.checksum,
                actual,
            });
        }

        let mut cursor = 0usize;
        let instr_bytes = header.instruction_count as usize * 4;
        if body.len() < cursor + instr_bytes {
            return Err(ModuleError::Truncated);
        }
        let mut instructions = Vec::with_capacity(header.instruction_count as usize);
        for chunk in body[cursor..cursor + instr_bytes].chunks_exact(4) {
            instructions.push(u32::from_be_bytes(chunk.try_into().unwrap()));
        }
        cursor += instr_bytes;

        let (strings, consumed) = StringTable::from_bytes(&body[cursor..])?;
        cursor += consumed;

        if body.len() < cursor + 4 {
            return Err(ModuleError::Truncated);
        }
        let entrypoint_count =
            u32::from_be_bytes(body[cursor..cursor + 4].try_into().unwrap()) as usize;
        cursor += 4;

        let mut entrypoints = IndexMap::new();
        for _ in 0..entrypoint_count {
            if cursor >= body.len() {
                return Err(ModuleError::Truncated);
            }
            let name_len = body[cursor] as usize;
            cursor += 1;
            if body.len() < cursor + name_len + 4 {
                return Err(ModuleError::Truncated);
            }
            let name = std::str::from_utf8(&body[cursor..cursor + name_len])
                .map_err(|_| ModuleError::Truncated)?
                .to_owned();
            cursor += name_len;
            let offset = u32::from_be_bytes(body[cursor..cursor + 4].try_into().unwrap());
            cursor += 4;
            entrypoints.insert(name, offset);
        }

        if cursor >= body.len() {
            return Err(ModuleError::Truncated);
        }
        let has_source_map = body[cursor] != 0;
        cursor += 1;

        let source_map = if has_source_map {
            if body.len() < cursor + 4 {
                return Err(ModuleError::Truncated);
            }
            let count = u32::from_be_bytes(body[cursor..cursor + 4].try_into().unwrap()) as usize;
            cursor += 4;
            let mut map = SourceMap::new();
            for _ in 0..count {
                if body.len() < cursor + 16 {
                    return Err(ModuleError::Truncated);
                }
                let offset = u32::from_be_bytes(body[cursor..cursor + 4].try_into().unwrap());
                let file = u32::from_be_bytes(body[cursor + 4..cursor + 8].try_into().unwrap());
                let start = u32::from_be_bytes(body[cursor + 8..cursor + 12].try_into().unwrap());
                let end = u32::from_be_bytes(body[cursor + 12..cursor + 16].try_into().unwrap());
                cursor += 16;
                let loc = peglang_core::SourceLocation::new(
                    peglang_core::FileId::from_raw(file),
                    peglang_core::Span::new(
                        peglang_core::Location::new(0, 0, start),
                        peglang_core::Location::new(0, 0, end),
                    ),
                );
                map.push(offset, loc);
            }
            Some(map)
        } else {
            None
        };

        Ok(Self {
            instructions,
            strings,
            entrypoints,
            source_map,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::CaptureKind;
    use crate::string_table::StringId;

    #[test]
    fn round_trips_a_tiny_program() {
        let mut strings = StringTable::new();
        let g = strings.intern_str("G");

        let instructions = vec![
            Instruction::CapOpen(CaptureKind::Node, g).encode(),
            Instruction::Char(b'h').encode(),
            Instruction::Char(b'e').encode(),
            Instruction::Char(b'l').encode(),
            Instruction::Char(b'l').encode(),
            Instruction::Char(b'o').encode(),
            Instruction::CapClose(CaptureKind::Node, g).encode(),
            Instruction::Return.encode(),
        ];

        let mut program = Program::new(instructions, strings);
        program.add_entrypoint("G", 0);

        let bytes = program.to_bytes().unwrap();
        let decoded = Program::from_bytes(&bytes).unwrap();

        assert_eq!(decoded.instruction_count(), 8);
        assert_eq!(decoded.entrypoint("G"), Some(0));
        assert_eq!(decoded.strings().get_str(StringId::from_u32(0)), "G");
        assert_eq!(
            decoded.decode_at(1).unwrap(),
            Instruction::Char(b'h')
        );
    }

    #[test]
    fn corrupted_bytes_fail_checksum() {
        let program = Program::new(vec![Instruction::Halt.encode()], StringTable::new());
        let mut bytes = program.to_bytes().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(
            Program::from_bytes(&bytes),
            Err(ModuleError::ChecksumMismatch { .. })
        ));
    }
}
