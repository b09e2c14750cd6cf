use crate::JAVA_LANG_OBJECT;
use thiserror::Error;
use typescout_api::{BoxError, MetadataReader, MetadataRecord};

const MAGIC: u32 = 0xCAFEBABE;
const MIN_MAJOR: u16 = 45;
const MAX_MAJOR: u16 = 69;

const RUNTIME_VISIBLE_ANNOTATIONS: &str = "RuntimeVisibleAnnotations";
const RUNTIME_INVISIBLE_ANNOTATIONS: &str = "RuntimeInvisibleAnnotations";

#[derive(Debug, Error)]
pub enum ClassParseError {
    #[error("unexpected end of class file")]
    UnexpectedEof,
    #[error("invalid class file magic header")]
    InvalidMagic,
    #[error("unsupported class file version {major}")]
    UnsupportedVersion { major: u16 },
    #[error("unsupported constant pool tag {tag}")]
    UnsupportedConstant { tag: u8 },
    #[error("invalid constant pool index {index}")]
    InvalidConstantIndex { index: u16 },
    #[error("invalid UTF-8 string in constant pool: {0}")]
    Utf8Decode(#[from] std::str::Utf8Error),
    #[error("malformed descriptor: {0}")]
    InvalidDescriptor(String),
}

/// The part of a class file the scanner cares about. Names are dotted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassHeader {
    pub name: String,
    pub major_version: u16,
    pub access_flags: u16,
    /// Absent only for `java.lang.Object` and `module-info`.
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    /// Class-level annotation types.
    pub annotations: Vec<String>,
}

impl ClassHeader {
    pub fn into_record(self) -> MetadataRecord {
        let ancestors = self.super_class.into_iter().chain(self.interfaces);
        MetadataRecord::new(ancestors, self.annotations)
    }
}

/// Reads class headers without materializing code, debug info or frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassFileReader {
    invisible_annotations: bool,
}

impl ClassFileReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also count `CLASS`-retention annotations as markers.
    pub fn with_invisible_annotations(mut self, enabled: bool) -> Self {
        self.invisible_annotations = enabled;
        self
    }

    pub fn parse(&self, bytes: &[u8]) -> Result<ClassHeader, ClassParseError> {
        let mut reader = ClassReader::new(bytes);
        reader.expect_magic()?;
        let _minor_version = reader.read_u2()?;
        let major_version = reader.read_u2()?;
        if !(MIN_MAJOR..=MAX_MAJOR).contains(&major_version) {
            return Err(ClassParseError::UnsupportedVersion {
                major: major_version,
            });
        }
        let constant_pool = ConstantPool::parse(&mut reader)?;

        let access_flags = reader.read_u2()?;
        let this_class = reader.read_u2()?;
        let super_class = reader.read_u2()?;

        let interfaces_count = reader.read_u2()?;
        let mut interfaces = Vec::with_capacity(interfaces_count as usize);
        for _ in 0..interfaces_count {
            let index = reader.read_u2()?;
            interfaces.push(dotted(&constant_pool.class_name(index)?));
        }

        let fields = reader.read_u2()?;
        for _ in 0..fields {
            skip_member(&mut reader)?;
        }
        let methods = reader.read_u2()?;
        for _ in 0..methods {
            skip_member(&mut reader)?;
        }

        let mut annotations = Vec::new();
        let attributes_count = reader.read_u2()?;
        for _ in 0..attributes_count {
            let name_index = reader.read_u2()?;
            let length = reader.read_u4()? as usize;
            let attribute = constant_pool.utf8(name_index)?;
            if self.wants(attribute) {
                let mut sub_reader = ClassReader::new(reader.read_slice(length)?);
                read_annotations(&mut sub_reader, &constant_pool, &mut annotations)?;
            } else {
                reader.skip(length)?;
            }
        }

        let super_class = if super_class == 0 {
            None
        } else {
            Some(dotted(&constant_pool.class_name(super_class)?))
        };

        Ok(ClassHeader {
            name: dotted(&constant_pool.class_name(this_class)?),
            major_version,
            access_flags,
            super_class,
            interfaces,
            annotations,
        })
    }

    fn wants(&self, attribute: &str) -> bool {
        attribute == RUNTIME_VISIBLE_ANNOTATIONS
            || (self.invisible_annotations && attribute == RUNTIME_INVISIBLE_ANNOTATIONS)
    }
}

impl MetadataReader for ClassFileReader {
    fn root_type(&self) -> &str {
        JAVA_LANG_OBJECT
    }

    fn read(&self, bytes: &[u8]) -> Result<MetadataRecord, BoxError> {
        Ok(self.parse(bytes)?.into_record())
    }
}

fn dotted(internal: &str) -> String {
    internal.replace('/', ".")
}

/// `Lcom/acme/Plugin;` → `com.acme.Plugin`
fn annotation_type(descriptor: &str) -> Result<String, ClassParseError> {
    descriptor
        .strip_prefix('L')
        .and_then(|rest| rest.strip_suffix(';'))
        .filter(|name| !name.is_empty())
        .map(dotted)
        .ok_or_else(|| ClassParseError::InvalidDescriptor(descriptor.to_string()))
}

fn read_annotations(
    reader: &mut ClassReader<'_>,
    pool: &ConstantPool<'_>,
    out: &mut Vec<String>,
) -> Result<(), ClassParseError> {
    let count = reader.read_u2()?;
    for _ in 0..count {
        let type_index = reader.read_u2()?;
        out.push(annotation_type(pool.utf8(type_index)?)?);
        skip_element_pairs(reader)?;
    }
    Ok(())
}

fn skip_element_pairs(reader: &mut ClassReader<'_>) -> Result<(), ClassParseError> {
    let pairs = reader.read_u2()?;
    for _ in 0..pairs {
        reader.read_u2()?; // element_name_index
        skip_element_value(reader)?;
    }
    Ok(())
}

fn skip_element_value(reader: &mut ClassReader<'_>) -> Result<(), ClassParseError> {
    let tag = reader.read_u1()?;
    match tag {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' | b'c' => reader.skip(2),
        b'e' => reader.skip(4),
        b'@' => {
            reader.read_u2()?; // type_index
            skip_element_pairs(reader)
        }
        b'[' => {
            let values = reader.read_u2()?;
            for _ in 0..values {
                skip_element_value(reader)?;
            }
            Ok(())
        }
        other => Err(ClassParseError::InvalidDescriptor(format!(
            "unknown element value tag {}",
            other as char
        ))),
    }
}

#[derive(Debug, Clone)]
enum Constant<'a> {
    /// Decoded on use; string literals in modified UTF-8 never fail a scan.
    Utf8(&'a [u8]),
    Class { name_index: u16 },
    Other,
    Unusable,
}

struct ConstantPool<'a> {
    entries: Vec<Constant<'a>>,
}

impl<'a> ConstantPool<'a> {
    fn parse(reader: &mut ClassReader<'a>) -> Result<Self, ClassParseError> {
        let count = reader.read_u2()? as usize;
        let mut entries = Vec::with_capacity(count);
        entries.push(Constant::Unusable); // index 0 unused

        let mut index = 1;
        while index < count {
            let tag = reader.read_u1()?;
            let entry = match tag {
                1 => {
                    let length = reader.read_u2()? as usize;
                    Constant::Utf8(reader.read_slice(length)?)
                }
                3 | 4 => {
                    reader.skip(4)?;
                    Constant::Other
                }
                5 | 6 => {
                    reader.skip(8)?;
                    entries.push(Constant::Unusable);
                    index += 1;
                    Constant::Other
                }
                7 => Constant::Class {
                    name_index: reader.read_u2()?,
                },
                8 | 16 | 19 | 20 => {
                    reader.skip(2)?;
                    Constant::Other
                }
                9 | 10 | 11 | 12 | 17 | 18 => {
                    reader.skip(4)?;
                    Constant::Other
                }
                15 => {
                    reader.skip(3)?;
                    Constant::Other
                }
                other => return Err(ClassParseError::UnsupportedConstant { tag: other }),
            };

            entries.push(entry);
            index += 1;
        }

        Ok(Self { entries })
    }

    fn get(&self, index: u16) -> Result<&Constant<'a>, ClassParseError> {
        self.entries
            .get(index as usize)
            .ok_or(ClassParseError::InvalidConstantIndex { index })
    }

    fn utf8(&self, index: u16) -> Result<&'a str, ClassParseError> {
        match self.get(index)? {
            Constant::Utf8(bytes) => Ok(std::str::from_utf8(bytes)?),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    fn class_name(&self, index: u16) -> Result<String, ClassParseError> {
        match self.get(index)? {
            Constant::Class { name_index } => Ok(self.utf8(*name_index)?.to_string()),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }
}

struct ClassReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ClassReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn expect_magic(&mut self) -> Result<(), ClassParseError> {
        if self.read_u4()? != MAGIC {
            return Err(ClassParseError::InvalidMagic);
        }
        Ok(())
    }

    fn read_u1(&mut self) -> Result<u8, ClassParseError> {
        let value = *self.data.get(self.pos).ok_or(ClassParseError::UnexpectedEof)?;
        self.pos += 1;
        Ok(value)
    }

    fn read_u2(&mut self) -> Result<u16, ClassParseError> {
        let bytes = self.read_slice(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_u4(&mut self) -> Result<u32, ClassParseError> {
        let bytes = self.read_slice(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8], ClassParseError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(ClassParseError::UnexpectedEof)?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, len: usize) -> Result<(), ClassParseError> {
        self.read_slice(len).map(|_| ())
    }
}

fn skip_member(reader: &mut ClassReader<'_>) -> Result<(), ClassParseError> {
    reader.read_u2()?; // access_flags
    reader.read_u2()?; // name_index
    reader.read_u2()?; // descriptor_index
    let attributes_count = reader.read_u2()?;
    skip_attributes(reader, attributes_count)
}

fn skip_attributes(reader: &mut ClassReader<'_>, count: u16) -> Result<(), ClassParseError> {
    for _ in 0..count {
        reader.read_u2()?; // attribute_name_index
        let length = reader.read_u4()? as usize;
        reader.skip(length)?;
    }
    Ok(())
}
