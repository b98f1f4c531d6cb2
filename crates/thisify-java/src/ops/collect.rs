//! Member collection for a class at the caret.

use thisify_core::facts::{ClassScope, MemberDescriptor, MemberKind};
use thisify_core::patch::FileId;
use thisify_core::syntax::{NodeId, NodeKind, SyntaxTree, TreeResult};
use tracing::{debug, trace};

use crate::lookup::{class_members, declared_variables, method_signature, KEYWORD};

/// Non-static members declared directly by `class`.
///
/// Fields come first, then methods (constructors included), each in
/// declaration order. A field declaration with several declarators yields one
/// descriptor per variable.
pub fn collect_instance_members(
    tree: &SyntaxTree,
    file: FileId,
    class: &ClassScope,
) -> TreeResult<Vec<MemberDescriptor>> {
    let mut fields = Vec::new();
    let mut methods = Vec::new();

    for decl in class_members(tree, class.node)? {
        let kind = tree.kind(decl)?;
        if kind != NodeKind::FieldDeclaration && kind != NodeKind::MethodDeclaration {
            continue;
        }
        if is_static(tree, decl)? {
            trace!(declaration = %decl, "skipping static member");
            continue;
        }
        match kind {
            NodeKind::FieldDeclaration => {
                for var in declared_variables(tree, decl)? {
                    fields.push(MemberDescriptor {
                        kind: MemberKind::Field,
                        name: var.name,
                        is_static: false,
                        is_constructor: false,
                        name_node: var.name_node,
                        declaration: decl,
                        owner: class.clone(),
                        file,
                    });
                }
            }
            _ => {
                if let Some(sig) = method_signature(tree, decl)? {
                    methods.push(MemberDescriptor {
                        kind: MemberKind::Method,
                        name: sig.name,
                        is_static: false,
                        is_constructor: sig.is_constructor,
                        name_node: sig.name_node,
                        declaration: decl,
                        owner: class.clone(),
                        file,
                    });
                }
            }
        }
    }

    debug!(
        class = class.name.as_deref().unwrap_or("<anonymous>"),
        fields = fields.len(),
        methods = methods.len(),
        "collected instance members"
    );
    fields.append(&mut methods);
    Ok(fields)
}

/// Whether any modifier list anywhere under `member` carries `static`.
///
/// The scan descends the whole declaration, including nested declarations,
/// rather than only the member's own modifier list.
pub fn is_static(tree: &SyntaxTree, member: NodeId) -> TreeResult<bool> {
    for node in tree.descendants(member) {
        if tree.kind(node)? == NodeKind::ModifierList && has_static_keyword(tree, node)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn has_static_keyword(tree: &SyntaxTree, modifiers: NodeId) -> TreeResult<bool> {
    for node in tree.descendants(modifiers) {
        if tree.kind(node)? == KEYWORD && tree.token_text(node)? == Some("static") {
            return Ok(true);
        }
    }
    Ok(false)
}
