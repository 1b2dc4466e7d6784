//! The schema tree and its construction from a user-supplied field
//! description, grounded on `parquet2::schema::types::ParquetType` and
//! `parquet2::metadata::schema_descriptor::build_tree`.

use super::types::{Compression, Encoding, LogicalType, PhysicalType, Repetition};
use crate::error::{config_err, Result};

/// A user-supplied field description, the input to [`Schema::new`].
/// Mirrors spec.md §4.1's "mapping from field name to either a leaf
/// descriptor or a group descriptor".
#[derive(Debug, Clone)]
pub enum FieldDef {
    Leaf {
        physical_type: PhysicalType,
        optional: bool,
        repeated: bool,
        type_length: Option<i32>,
        logical_type: Option<LogicalType>,
        compression: Compression,
    },
    Group {
        optional: bool,
        repeated: bool,
        fields: Vec<(String, FieldDef)>,
    },
}

impl FieldDef {
    pub fn required_leaf(physical_type: PhysicalType) -> Self {
        FieldDef::Leaf {
            physical_type,
            optional: false,
            repeated: false,
            type_length: None,
            logical_type: None,
            compression: Compression::Uncompressed,
        }
    }

    /// Marks the field OPTIONAL. Composes with [`Self::repeated`]: a
    /// field marked both behaves as REPEATED for level math (spec.md
    /// §4.1's "optional repeated list" variant) since [`Self::repetition`]
    /// checks `repeated` before `optional`.
    pub fn optional(mut self) -> Self {
        self.set_optional(true);
        self
    }

    /// Marks the field REPEATED. Composes with [`Self::optional`]; see
    /// its doc comment.
    pub fn repeated(mut self) -> Self {
        self.set_repeated(true);
        self
    }

    fn set_optional(&mut self, opt: bool) {
        match self {
            FieldDef::Leaf { optional, .. } | FieldDef::Group { optional, .. } => *optional = opt,
        }
    }

    fn set_repeated(&mut self, rep: bool) {
        match self {
            FieldDef::Leaf { repeated, .. } | FieldDef::Group { repeated, .. } => *repeated = rep,
        }
    }

    pub fn with_logical_type(mut self, lt: LogicalType) -> Self {
        if let FieldDef::Leaf { logical_type, .. } = &mut self {
            *logical_type = Some(lt);
        }
        self
    }

    pub fn with_type_length(mut self, len: i32) -> Self {
        if let FieldDef::Leaf { type_length, .. } = &mut self {
            *type_length = Some(len);
        }
        self
    }

    pub fn with_compression(mut self, c: Compression) -> Self {
        match &mut self {
            FieldDef::Leaf { compression, .. } => *compression = c,
            FieldDef::Group { .. } => {}
        }
        self
    }

    fn repetition(&self) -> Result<Repetition> {
        let (optional, repeated) = match self {
            FieldDef::Leaf {
                optional, repeated, ..
            } => (*optional, *repeated),
            FieldDef::Group {
                optional, repeated, ..
            } => (*optional, *repeated),
        };
        Ok(if repeated {
            Repetition::Repeated
        } else if optional {
            Repetition::Optional
        } else {
            Repetition::Required
        })
    }
}

pub fn group(fields: Vec<(&str, FieldDef)>) -> FieldDef {
    FieldDef::Group {
        optional: false,
        repeated: false,
        fields: fields.into_iter().map(|(n, f)| (n.to_owned(), f)).collect(),
    }
}

/// One node of the internal schema tree.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Group {
        name: String,
        repetition: Repetition,
        children: Vec<SchemaNode>,
        /// This node's own `(dLevelMax, rLevelMax)`, counting itself and
        /// every ancestor down to the root. Needed by the shredder to
        /// tell, for a repeated group, "the rLevelMax of the deepest
        /// REPEATED ancestor currently being iterated" (spec.md §4.2)
        /// without re-walking the tree — a leaf's own level maxima
        /// overcount once a repeated group has repeated descendants.
        d_level_max: i16,
        r_level_max: i16,
    },
    Leaf {
        name: String,
        repetition: Repetition,
        physical_type: PhysicalType,
        logical_type: Option<LogicalType>,
        type_length: Option<i32>,
        compression: Compression,
        encoding: Encoding,
    },
}

impl SchemaNode {
    pub fn name(&self) -> &str {
        match self {
            SchemaNode::Group { name, .. } => name,
            SchemaNode::Leaf { name, .. } => name,
        }
    }

    pub fn repetition(&self) -> Repetition {
        match self {
            SchemaNode::Group { repetition, .. } => *repetition,
            SchemaNode::Leaf { repetition, .. } => *repetition,
        }
    }

    /// This node's own `rLevelMax`: the count of REPEATED nodes from the
    /// root down to and including this node. For a `Leaf` this matches
    /// its [`ColumnDescriptor::r_level_max`]; exposed on `Group` too so
    /// the shredder can compute "start of a new element of this
    /// repeated group" without consulting a descendant leaf.
    pub fn r_level_max(&self) -> i16 {
        match self {
            SchemaNode::Group { r_level_max, .. } => *r_level_max,
            SchemaNode::Leaf { .. } => unreachable!("leaves carry their level maxima on ColumnDescriptor"),
        }
    }
}

/// A flattened leaf: the unit the shredder and assembler operate on.
/// Grounded on `parquet2::metadata::ColumnDescriptor`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub path: Vec<String>,
    pub physical_type: PhysicalType,
    pub logical_type: Option<LogicalType>,
    pub type_length: Option<i32>,
    pub compression: Compression,
    pub encoding: Encoding,
    pub d_level_max: i16,
    pub r_level_max: i16,
    /// Repetition of the leaf node itself and of each ancestor, root
    /// first, leaf last. Used by the shredder/assembler to walk the
    /// path without re-deriving repetitions from the tree each time.
    pub repetitions: Vec<Repetition>,
    /// `(dLevelMax, rLevelMax)` of each ancestor and of the leaf itself,
    /// in the same root-first order as `repetitions` — the cumulative
    /// level count counting every node up to and including that one.
    /// The assembler needs this per-ancestor, not just the leaf's own
    /// totals, to tell which ancestor a given repetition level names.
    pub level_at: Vec<(i16, i16)>,
}

/// The constructed, immutable schema: a root group plus the flattened,
/// depth-first leaf list, per spec.md §4.1.
#[derive(Debug, Clone)]
pub struct Schema {
    root: Vec<SchemaNode>,
    leaves: Vec<ColumnDescriptor>,
}

impl Schema {
    /// Builds a schema from a user field description. Errors per
    /// spec.md §4.1: unknown primitive type is precluded by
    /// [`PhysicalType`] being a closed enum; missing typeLength for
    /// `FixedLenByteArray`; duplicate field name at the same level;
    /// conflicting optional+repeated flags.
    pub fn new(fields: Vec<(&str, FieldDef)>) -> Result<Self> {
        let mut root: Vec<SchemaNode> = fields
            .into_iter()
            .map(|(name, def)| build_node(name, def))
            .collect::<Result<_>>()?;

        check_no_duplicates(&root)?;

        let mut leaves = Vec::new();
        for node in &mut root {
            let mut path = Vec::new();
            let mut reps = Vec::new();
            annotate(node, 0, 0, &mut path, &mut reps, &mut leaves)?;
        }

        Ok(Self { root, leaves })
    }

    pub fn leaves(&self) -> &[ColumnDescriptor] {
        &self.leaves
    }

    pub fn leaf(&self, i: usize) -> &ColumnDescriptor {
        &self.leaves[i]
    }

    pub fn leaf_by_path(&self, path: &[String]) -> Option<&ColumnDescriptor> {
        self.leaves.iter().find(|l| l.path == path)
    }

    pub fn root_fields(&self) -> &[SchemaNode] {
        &self.root
    }

    pub fn num_columns(&self) -> usize {
        self.leaves.len()
    }
}

fn build_node(name: &str, def: FieldDef) -> Result<SchemaNode> {
    let repetition = def.repetition()?;
    match def {
        FieldDef::Leaf {
            physical_type,
            type_length,
            logical_type,
            compression,
            ..
        } => {
            if matches!(physical_type, PhysicalType::FixedLenByteArray) && type_length.is_none() {
                return Err(config_err!(
                    "field {:?}: FIXED_LEN_BYTE_ARRAY requires typeLength",
                    name
                ));
            }
            if matches!(logical_type, Some(LogicalType::Interval)) {
                match type_length {
                    Some(12) => {}
                    Some(_) => {
                        return Err(config_err!(
                            "field {:?}: INTERVAL requires typeLength = 12",
                            name
                        ))
                    }
                    None => {
                        return Err(config_err!(
                            "field {:?}: INTERVAL requires typeLength",
                            name
                        ))
                    }
                }
            }
            Ok(SchemaNode::Leaf {
                name: name.to_owned(),
                repetition,
                physical_type,
                logical_type,
                type_length,
                compression,
                encoding: Encoding::Plain,
            })
        }
        FieldDef::Group { fields, .. } => {
            let children = fields
                .into_iter()
                .map(|(n, d)| build_node(&n, d))
                .collect::<Result<Vec<_>>>()?;
            check_no_duplicates(&children)?;
            Ok(SchemaNode::Group {
                name: name.to_owned(),
                repetition,
                children,
                d_level_max: 0,
                r_level_max: 0,
            })
        }
    }
}

fn check_no_duplicates(nodes: &[SchemaNode]) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for n in nodes {
        if !seen.insert(n.name()) {
            return Err(config_err!("duplicate field name {:?}", n.name()));
        }
    }
    Ok(())
}

/// Fills in each node's own `(dLevelMax, rLevelMax)` in place (root
/// contributes nothing, per spec.md §3) and collects the depth-first
/// leaf list as [`ColumnDescriptor`]s.
fn annotate(
    node: &mut SchemaNode,
    d_level_max: i16,
    r_level_max: i16,
    path: &mut Vec<String>,
    repetitions: &mut Vec<Repetition>,
    leaves: &mut Vec<ColumnDescriptor>,
) -> Result<()> {
    annotate_with_levels(
        node,
        d_level_max,
        r_level_max,
        path,
        repetitions,
        &mut Vec::new(),
        leaves,
    )
}

#[allow(clippy::too_many_arguments)]
fn annotate_with_levels(
    node: &mut SchemaNode,
    mut d_level_max: i16,
    mut r_level_max: i16,
    path: &mut Vec<String>,
    repetitions: &mut Vec<Repetition>,
    levels: &mut Vec<(i16, i16)>,
    leaves: &mut Vec<ColumnDescriptor>,
) -> Result<()> {
    path.push(node.name().to_owned());
    match node.repetition() {
        Repetition::Optional => d_level_max += 1,
        Repetition::Repeated => {
            d_level_max += 1;
            r_level_max += 1;
        }
        Repetition::Required => {}
    }
    repetitions.push(node.repetition());
    levels.push((d_level_max, r_level_max));

    match node {
        SchemaNode::Leaf {
            physical_type,
            logical_type,
            type_length,
            compression,
            encoding,
            ..
        } => {
            leaves.push(ColumnDescriptor {
                path: path.clone(),
                physical_type: *physical_type,
                logical_type: *logical_type,
                type_length: *type_length,
                compression: *compression,
                encoding: *encoding,
                d_level_max,
                r_level_max,
                repetitions: repetitions.clone(),
                level_at: levels.clone(),
            });
        }
        SchemaNode::Group {
            children,
            d_level_max: node_d,
            r_level_max: node_r,
            ..
        } => {
            *node_d = d_level_max;
            *node_r = r_level_max;
            check_no_duplicates(children)?;
            for child in children {
                annotate_with_levels(
                    child,
                    d_level_max,
                    r_level_max,
                    path,
                    repetitions,
                    levels,
                    leaves,
                )?;
            }
        }
    }

    path.pop();
    repetitions.pop();
    levels.pop();
    Ok(())
}
