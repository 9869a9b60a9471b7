//! Mermaid diagram generation for handoff graphs
//!
//! # Node Shapes
//!
//! | Node              | Shape      | Mermaid Syntax |
//! |-------------------|------------|----------------|
//! | Supervisor        | Diamond    | `id{label}`    |
//! | Direct agent      | Rectangle  | `id[label]`    |
//! | Tool-using agent  | Subroutine | `id[[label]]`  |
//! | START/END         | Stadium    | `id([label])`  |

/// Role of a node in the diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Terminal,
    Supervisor,
    DirectAgent,
    ToolAgent,
}

/// Sanitize a node ID for use as a Mermaid node identifier.
pub fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

pub fn render_node(id: &str, role: NodeRole) -> String {
    let safe_id = sanitize_id(id);
    match role {
        NodeRole::Terminal => format!("    {}([{}])", safe_id, id),
        NodeRole::Supervisor => format!("    {}{{{}}}", safe_id, id),
        NodeRole::DirectAgent => format!("    {}[{}]", safe_id, id),
        NodeRole::ToolAgent => format!("    {}[[{}]]", safe_id, id),
    }
}

/// Render an edge; labelled edges are dotted.
pub fn render_edge(from: &str, to: &str, label: Option<&str>) -> String {
    let from_safe = sanitize_id(from);
    let to_safe = sanitize_id(to);

    match label {
        Some(label) => format!("    {} -. \"{}\" .-> {}", from_safe, label, to_safe),
        None => format!("    {} --> {}", from_safe, to_safe),
    }
}
