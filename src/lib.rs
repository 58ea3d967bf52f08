//! A color node-graph engine: a mutable tree of typed nodes, pull-based CPU
//! evaluation, and topological transpilation to a GLSL fragment shader.

pub mod colormath;
pub mod eval;
pub mod graph;
pub mod nodes;
pub mod overload;
pub mod serialize;
pub mod template;
pub mod transpile;
pub mod types;
pub mod validation;

pub use eval::{EvalContext, evaluate};
pub use graph::{CycleReport, Link, LinkId, Node, NodeId, Socket, SocketId, Tree};
pub use nodes::NodeKind;
pub use overload::switch_mode;
pub use serialize::{from_json, load_tree, save_tree, to_json};
pub use transpile::{ShaderProgram, transpile};
pub use types::{SocketType, Value};
