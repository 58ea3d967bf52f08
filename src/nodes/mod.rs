//! The closed set of node kinds.
//!
//! Each kind maps to a static [`OverloadGroup`]; construction, CPU
//! evaluation and shader generation are all data carried by the group's
//! overloads, so per-kind dispatch and per-mode dispatch share one
//! mechanism.

pub mod color_nodes;
pub mod input_nodes;
pub mod math_nodes;
pub mod ramp_nodes;
pub mod vector_nodes;

use anyhow::{Result, bail};

use crate::overload::OverloadGroup;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    VectorLiteral,
    SamplePosition,
    SrgbColor,
    LabColor,
    HslColor,
    Arithmetic,
    Compare,
    SplitVector,
    CombineVector,
    GradientRamp,
}

pub const ALL_KINDS: &[NodeKind] = &[
    NodeKind::VectorLiteral,
    NodeKind::SamplePosition,
    NodeKind::SrgbColor,
    NodeKind::LabColor,
    NodeKind::HslColor,
    NodeKind::Arithmetic,
    NodeKind::Compare,
    NodeKind::SplitVector,
    NodeKind::CombineVector,
    NodeKind::GradientRamp,
];

impl NodeKind {
    /// Stable identifier used by the persistence layer.
    pub fn type_name(self) -> &'static str {
        match self {
            NodeKind::VectorLiteral => "vectorLiteral",
            NodeKind::SamplePosition => "samplePosition",
            NodeKind::SrgbColor => "srgbColor",
            NodeKind::LabColor => "labColor",
            NodeKind::HslColor => "hslColor",
            NodeKind::Arithmetic => "arithmetic",
            NodeKind::Compare => "compare",
            NodeKind::SplitVector => "splitVector",
            NodeKind::CombineVector => "combineVector",
            NodeKind::GradientRamp => "gradientRamp",
        }
    }

    /// Registry lookup for graph reconstruction. Unknown identifiers fail
    /// fast so the persistence layer can abort an import whole.
    pub fn from_type_name(name: &str) -> Result<NodeKind> {
        for kind in ALL_KINDS {
            if kind.type_name() == name {
                return Ok(*kind);
            }
        }
        bail!("unknown node type identifier `{name}`");
    }

    pub fn overload_group(self) -> &'static OverloadGroup {
        match self {
            NodeKind::VectorLiteral => &input_nodes::VECTOR_LITERAL,
            NodeKind::SamplePosition => &input_nodes::SAMPLE_POSITION,
            NodeKind::SrgbColor => &color_nodes::SRGB_COLOR,
            NodeKind::LabColor => &color_nodes::LAB_COLOR,
            NodeKind::HslColor => &color_nodes::HSL_COLOR,
            NodeKind::Arithmetic => &math_nodes::ARITHMETIC,
            NodeKind::Compare => &math_nodes::COMPARE,
            NodeKind::SplitVector => &vector_nodes::SPLIT_VECTOR,
            NodeKind::CombineVector => &vector_nodes::COMBINE_VECTOR,
            NodeKind::GradientRamp => &ramp_nodes::GRADIENT_RAMP,
        }
    }
}
