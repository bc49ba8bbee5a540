use core::fmt;

use crate::array::ArrayData;
use crate::header::Header;

/// Classification of a header-data unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    /// The first unit of every stream.
    Primary,
    /// Image extension (XTENSION = 'IMAGE').
    Image,
    /// ASCII table extension (XTENSION = 'TABLE').
    Table,
    /// Binary table extension (XTENSION = 'BINTABLE').
    BinaryTable,
    /// Any other or missing XTENSION.
    Unknown,
}

impl UnitKind {
    /// Classify an extension from its XTENSION value. Quoted and unquoted
    /// forms are both accepted.
    pub fn from_xtension(xtension: &str) -> Self {
        let name = xtension.trim();
        let name = name
            .strip_prefix('\'')
            .and_then(|s| s.strip_suffix('\''))
            .map(str::trim)
            .unwrap_or(name);
        match name {
            "IMAGE" => UnitKind::Image,
            "TABLE" => UnitKind::Table,
            "BINTABLE" => UnitKind::BinaryTable,
            _ => UnitKind::Unknown,
        }
    }

    /// Returns `true` for units whose payload the image extractor accepts.
    pub fn is_image(self) -> bool {
        matches!(self, UnitKind::Primary | UnitKind::Image)
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnitKind::Primary => "PRIMARY",
            UnitKind::Image => "IMAGE",
            UnitKind::Table => "TABLE",
            UnitKind::BinaryTable => "BINTABLE",
            UnitKind::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// A single header-data unit decoded from a FITS stream.
///
/// Every group shares the shape declared by the header's NAXISn keywords.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    header: Header,
    kind: UnitKind,
    groups: Vec<ArrayData>,
}

impl Unit {
    pub(crate) fn new(header: Header, kind: UnitKind, groups: Vec<ArrayData>) -> Self {
        Unit {
            header,
            kind,
            groups,
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    /// All payload groups, in stream order.
    pub fn groups(&self) -> &[ArrayData] {
        &self.groups
    }

    /// The first payload group, if the unit has any.
    pub fn data(&self) -> Option<&ArrayData> {
        self.groups.first()
    }

    /// The EXTNAME of this unit, with string quoting removed.
    pub fn name(&self) -> Option<String> {
        self.header.get("EXTNAME").map(|v| v.as_str().into_owned())
    }

    /// Consume the unit, returning its header and groups.
    pub fn into_parts(self) -> (Header, UnitKind, Vec<ArrayData>) {
        (self.header, self.kind, self.groups)
    }
}

/// Returns the primary unit of a decoded list.
pub fn primary(units: &[Unit]) -> Option<&Unit> {
    units.first()
}

/// Finds the first unit whose EXTNAME matches `name`.
pub fn find_by_name<'a>(units: &'a [Unit], name: &str) -> Option<&'a Unit> {
    units.iter().find(|u| u.name().as_deref() == Some(name))
}
