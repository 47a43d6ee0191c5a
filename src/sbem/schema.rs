//! Type descriptors and group layouts (the first pass).

use std::collections::HashMap;

use log::debug;

use super::walk::{Entry, Walk};

/// A declared type: a scalar with a path and format, or a group.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeDescriptor {
    pub id: u16,
    pub path: String,
    pub format: Option<String>,
    pub modifiers: Option<String>,
    /// Member type ids, for group descriptors.
    pub group: Option<Vec<u16>>,
}

impl TypeDescriptor {
    /// Parse descriptor text of `<TAG>value` lines.
    pub fn parse(id: u16, text: &str) -> Self {
        let mut descriptor = Self {
            id,
            ..Self::default()
        };

        for line in text.lines() {
            let Some((tag, value)) = line
                .strip_prefix('<')
                .and_then(|line| line.split_once('>'))
            else {
                continue;
            };

            match tag {
                "PTH" => descriptor.path = value.to_string(),
                "FRM" => descriptor.format = Some(value.to_string()),
                "MOD" => descriptor.modifiers = Some(value.to_string()),
                "GRP" => {
                    let members = value
                        .split(',')
                        .filter_map(|m| m.trim().parse().ok())
                        .collect();
                    descriptor.group = Some(members);
                }
                _ => {}
            }
        }

        descriptor
    }

    /// Width and signedness of this type's value, inferred from its format.
    pub fn width(&self) -> Option<(usize, bool)> {
        format_width(self.format.as_deref()?)
    }

    pub fn role(&self) -> Role {
        Role::from_path(&self.path)
    }
}

/// Width in bytes and signedness of a scalar format.
pub fn format_width(format: &str) -> Option<(usize, bool)> {
    Some(match format {
        "bool" | "enum" | "uint8" => (1, false),
        "int8" => (1, true),
        "uint16" => (2, false),
        "int16" => (2, true),
        "uint32" => (4, false),
        "int32" | "float32" | "float" => (4, true),
        _ => return None,
    })
}

/// What a member value means to the dive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Milliseconds since the previous sample.
    TimeDelta,
    /// Centimetres.
    Depth,
    /// Tenths of a degree Celsius.
    Temperature,
    /// Index of the gas a pressure reading belongs to.
    GasNumber,
    /// Centibar.
    Pressure,
    /// Dive start as ISO-8601 text.
    DateTime,
    /// Percent.
    Oxygen,
    /// Percent.
    Helium,
    Other,
}

impl Role {
    pub fn from_path(path: &str) -> Self {
        const SUFFIXES: [(&str, Role); 8] = [
            (".Sample.Time", Role::TimeDelta),
            (".Sample.Depth", Role::Depth),
            (".Sample.Temperature", Role::Temperature),
            (".Cylinder.GasNumber", Role::GasNumber),
            (".Cylinder.Pressure", Role::Pressure),
            ("Header.DateTime", Role::DateTime),
            (".Gas.Oxygen", Role::Oxygen),
            (".Gas.Helium", Role::Helium),
        ];

        SUFFIXES
            .iter()
            .find(|(suffix, _)| path.ends_with(suffix))
            .map_or(Role::Other, |(_, role)| *role)
    }
}

/// A member's position within a group payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Member {
    pub id: u16,
    pub role: Role,
    pub offset: usize,
    pub width: usize,
    pub signed: bool,
}

impl Member {
    /// Read this member's value from a group payload.
    pub fn read(&self, payload: &[u8]) -> Option<i64> {
        let r = payload.get(self.offset..self.offset + self.width)?;
        Some(match (self.width, self.signed) {
            (1, false) => r[0] as i64,
            (1, true) => r[0] as i8 as i64,
            (2, false) => u16::from_le_bytes([r[0], r[1]]) as i64,
            (2, true) => i16::from_le_bytes([r[0], r[1]]) as i64,
            (4, false) => u32::from_le_bytes([r[0], r[1], r[2], r[3]]) as i64,
            (4, true) => i32::from_le_bytes([r[0], r[1], r[2], r[3]]) as i64,
            _ => return None,
        })
    }
}

/// Resolved byte layout of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupLayout {
    pub id: u16,
    /// Members with a known position. Members following one of unknown
    /// width cannot be located and are omitted.
    pub members: Vec<Member>,
}

impl GroupLayout {
    pub fn member(&self, role: Role) -> Option<&Member> {
        self.members.iter().find(|m| m.role == role)
    }

    pub fn has(&self, role: Role) -> bool {
        self.member(role).is_some()
    }
}

/// Every type declared in a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    types: HashMap<u16, TypeDescriptor>,
}

impl Schema {
    /// Collect the descriptors of a walk, ignoring data entries.
    ///
    /// Stops at the first malformed entry, keeping descriptors before it.
    pub fn build(walk: Walk<'_>) -> Self {
        let mut types = HashMap::new();

        for entry in walk {
            match entry {
                Ok(Entry::Descriptor { id, text }) => {
                    let text = String::from_utf8_lossy(text);
                    types.insert(id, TypeDescriptor::parse(id, &text));
                }
                Ok(Entry::Data { .. }) => {}
                Err(err) => {
                    debug!("SBEM descriptor pass stopped: {err}");
                    break;
                }
            }
        }

        Self { types }
    }

    pub fn get(&self, id: u16) -> Option<&TypeDescriptor> {
        self.types.get(&id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Lay out a group's members.
    pub fn layout(&self, id: u16) -> Option<GroupLayout> {
        let members = self.get(id)?.group.as_ref()?;

        let mut layout = Vec::with_capacity(members.len());
        let mut offset = 0;
        for &member in members {
            let Some((width, signed)) = self.get(member).and_then(TypeDescriptor::width) else {
                debug!("SBEM group {id}: member {member} has no known width");
                break;
            };
            layout.push(Member {
                id: member,
                role: self.get(member).map_or(Role::Other, TypeDescriptor::role),
                offset,
                width,
                signed,
            });
            offset += width;
        }

        Some(GroupLayout {
            id,
            members: layout,
        })
    }

    /// Lay out every group, in ascending id order.
    pub fn groups(&self) -> Vec<GroupLayout> {
        let mut ids: Vec<u16> = self
            .types
            .values()
            .filter(|t| t.group.is_some())
            .map(|t| t.id)
            .collect();
        ids.sort_unstable();
        ids.into_iter().filter_map(|id| self.layout(id)).collect()
    }

    /// Scalar (non-group) types with a given role.
    pub fn scalars(&self, role: Role) -> impl Iterator<Item = &TypeDescriptor> {
        self.types
            .values()
            .filter(move |t| t.group.is_none() && t.role() == role)
    }
}
