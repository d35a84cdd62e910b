use crate::error::SplashError;
use std::fmt;

/// Width of every name field in the resource header, including the NUL terminator
pub const NAME_FIELD_LEN: usize = 16;

/// Size of the encoded resource header in bytes
///
/// Four name fields followed by three (length, offset) pairs of big-endian `u32`.
pub const HEADER_LEN: usize = 4 * NAME_FIELD_LEN + 6 * 4;

/// A fixed-width, NUL-padded name from the resource header
///
/// At most 15 visible characters; the 16th byte is always a terminator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FixedName(String);

impl FixedName {
    /// Create a name, rejecting values that do not fit the 16-byte field
    pub fn new(name: impl Into<String>) -> Result<Self, SplashError> {
        let name = name.into();
        if name.len() >= NAME_FIELD_LEN {
            return Err(SplashError::InvalidName(format!(
                "{name:?} is longer than {} bytes",
                NAME_FIELD_LEN - 1
            )));
        }
        if name.contains('\0') {
            return Err(SplashError::InvalidName(format!(
                "{name:?} contains a NUL byte"
            )));
        }
        Ok(Self(name))
    }

    /// Decode a name field; everything after the first NUL is padding
    pub fn decode(field: &[u8; NAME_FIELD_LEN]) -> Result<Self, SplashError> {
        let end = field.iter().position(|&b| b == 0).ok_or_else(|| {
            SplashError::InvalidName("name field is not NUL terminated".to_string())
        })?;

        let name = std::str::from_utf8(&field[..end])
            .map_err(|e| SplashError::InvalidName(format!("name field is not UTF-8: {e}")))?;

        Ok(Self(name.to_string()))
    }

    /// Encode into a zero-padded field
    pub fn encode(&self) -> [u8; NAME_FIELD_LEN] {
        let mut field = [0u8; NAME_FIELD_LEN];
        field[..self.0.len()].copy_from_slice(self.0.as_bytes());
        field
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FixedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Location of a blob relative to the start of the header buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlobRange {
    pub offset: u32,
    pub len: u32,
}

impl BlobRange {
    /// Borrow the blob from `buf`, checking that it lies entirely inside it
    pub fn slice<'a>(&self, buf: &'a [u8], what: &str) -> Result<&'a [u8], SplashError> {
        let start = self.offset as usize;
        let end = start.checked_add(self.len as usize).ok_or_else(|| {
            SplashError::InvalidHeader(format!("{what} range overflows"))
        })?;

        buf.get(start..end).ok_or_else(|| {
            SplashError::InvalidHeader(format!(
                "{what} range {start}..{end} exceeds resource size {}",
                buf.len()
            ))
        })
    }
}

/// Decoded splash resource header, in host byte order
///
/// On disk every integer is big-endian. The header is read once, its blobs
/// are copied into owned buffers, and the raw resource is discarded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResourceHeader {
    /// File name of the runtime (interpreter) shared library
    pub runtime_library: FixedName,
    /// File name of the toolkit (windowing) shared library
    pub toolkit_library: FixedName,
    /// Name of the runtime's module directory
    pub module_dir: FixedName,
    /// Sub-directory used for dependencies in onefile deployments
    pub dependencies_dir: FixedName,
    pub script: BlobRange,
    pub image: BlobRange,
    pub requirements: BlobRange,
}

impl ResourceHeader {
    /// Parse the header from the beginning of a raw resource buffer
    pub fn parse(buf: &[u8]) -> Result<Self, SplashError> {
        if buf.len() < HEADER_LEN {
            return Err(SplashError::InvalidHeader(format!(
                "resource is {} bytes, header needs {HEADER_LEN}",
                buf.len()
            )));
        }

        let name = |index: usize| -> Result<FixedName, SplashError> {
            let start = index * NAME_FIELD_LEN;
            let mut field = [0u8; NAME_FIELD_LEN];
            field.copy_from_slice(&buf[start..start + NAME_FIELD_LEN]);
            FixedName::decode(&field)
        };

        let word = |index: usize| -> u32 {
            let start = 4 * NAME_FIELD_LEN + index * 4;
            u32::from_be_bytes([buf[start], buf[start + 1], buf[start + 2], buf[start + 3]])
        };

        Ok(Self {
            runtime_library: name(0)?,
            toolkit_library: name(1)?,
            module_dir: name(2)?,
            dependencies_dir: name(3)?,
            script: BlobRange {
                len: word(0),
                offset: word(1),
            },
            image: BlobRange {
                len: word(2),
                offset: word(3),
            },
            requirements: BlobRange {
                len: word(4),
                offset: word(5),
            },
        })
    }

    /// Encode the header in its on-disk (big-endian) form
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];

        let names = [
            &self.runtime_library,
            &self.toolkit_library,
            &self.module_dir,
            &self.dependencies_dir,
        ];
        for (index, name) in names.iter().enumerate() {
            let start = index * NAME_FIELD_LEN;
            out[start..start + NAME_FIELD_LEN].copy_from_slice(&name.encode());
        }

        let words = [
            self.script.len,
            self.script.offset,
            self.image.len,
            self.image.offset,
            self.requirements.len,
            self.requirements.offset,
        ];
        for (index, value) in words.iter().enumerate() {
            let start = 4 * NAME_FIELD_LEN + index * 4;
            out[start..start + 4].copy_from_slice(&value.to_be_bytes());
        }

        out
    }
}

/// Flat list of NUL-terminated file names the splash needs extracted
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequirementsList {
    names: String,
}

impl RequirementsList {
    /// Wrap a raw requirements buffer; names must be UTF-8
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, SplashError> {
        let names = String::from_utf8(bytes).map_err(|e| {
            SplashError::InvalidHeader(format!("requirements are not UTF-8: {e}"))
        })?;
        Ok(Self { names })
    }

    /// Build a list from individual names, terminating each with NUL
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut joined = String::new();
        for name in names {
            joined.push_str(name.as_ref());
            joined.push('\0');
        }
        Self { names: joined }
    }

    /// Total length of the buffer in bytes
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.names.as_bytes()
    }

    pub fn iter(&self) -> Requirements<'_> {
        Requirements {
            remaining: &self.names,
        }
    }
}

impl<'a> IntoIterator for &'a RequirementsList {
    type Item = &'a str;
    type IntoIter = Requirements<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the names of a [`RequirementsList`]
#[derive(Debug, Clone)]
pub struct Requirements<'a> {
    remaining: &'a str,
}

impl<'a> Iterator for Requirements<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining.is_empty() {
            return None;
        }

        match self.remaining.find('\0') {
            Some(end) => {
                let name = &self.remaining[..end];
                self.remaining = &self.remaining[end + 1..];
                Some(name)
            }
            None => {
                // Unterminated tail
                let name = self.remaining;
                self.remaining = "";
                Some(name)
            }
        }
    }
}

/// Assembles a splash resource blob in the on-disk layout
///
/// The header is followed by the script, image and requirements blobs in
/// that order.
#[derive(Debug, Clone, Default)]
pub struct SplashResourceBuilder {
    header: ResourceHeader,
    script: Vec<u8>,
    image: Vec<u8>,
    requirements: Vec<u8>,
}

impl SplashResourceBuilder {
    pub fn new(
        runtime_library: &str,
        toolkit_library: &str,
        module_dir: &str,
        dependencies_dir: &str,
    ) -> Result<Self, SplashError> {
        Ok(Self {
            header: ResourceHeader {
                runtime_library: FixedName::new(runtime_library)?,
                toolkit_library: FixedName::new(toolkit_library)?,
                module_dir: FixedName::new(module_dir)?,
                dependencies_dir: FixedName::new(dependencies_dir)?,
                ..ResourceHeader::default()
            },
            ..Self::default()
        })
    }

    pub fn script(mut self, script: &str) -> Self {
        self.script = script.as_bytes().to_vec();
        self
    }

    pub fn image(mut self, image: &[u8]) -> Self {
        self.image = image.to_vec();
        self
    }

    pub fn requirements(mut self, requirements: &RequirementsList) -> Self {
        self.requirements = requirements.as_bytes().to_vec();
        self
    }

    /// Produce the encoded resource
    pub fn build(mut self) -> Vec<u8> {
        let mut offset = HEADER_LEN as u32;
        let mut place = |len: usize| {
            let range = BlobRange {
                offset,
                len: len as u32,
            };
            offset += len as u32;
            range
        };

        self.header.script = place(self.script.len());
        self.header.image = place(self.image.len());
        self.header.requirements = place(self.requirements.len());

        let mut out = Vec::with_capacity(offset as usize);
        out.extend_from_slice(&self.header.to_bytes());
        out.extend_from_slice(&self.script);
        out.extend_from_slice(&self.image);
        out.extend_from_slice(&self.requirements);
        out
    }
}
