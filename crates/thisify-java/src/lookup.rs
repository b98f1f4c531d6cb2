//! Declaration lookups over Java syntax trees.
//!
//! These helpers know the tree shapes produced by [`crate::parser`]: where a
//! class keeps its name and body, how field declarators and method signatures
//! are laid out, and which type a declaration names. Both the member collector
//! and the reference index are built on them.

use thisify_core::facts::ClassScope;
use thisify_core::syntax::{NodeId, NodeKind, OtherKind, SyntaxTree, TreeResult};

pub(crate) const CLASS_BODY: NodeKind = NodeKind::Other(OtherKind::ClassBody);
pub(crate) const TYPE_REF: NodeKind = NodeKind::Other(OtherKind::TypeRef);
pub(crate) const DECLARATOR: NodeKind = NodeKind::Other(OtherKind::Declarator);
pub(crate) const PARAMETER: NodeKind = NodeKind::Other(OtherKind::Parameter);
pub(crate) const PARAMETER_LIST: NodeKind = NodeKind::Other(OtherKind::ParameterList);
pub(crate) const KEYWORD: NodeKind = NodeKind::Other(OtherKind::Keyword);
pub(crate) const PUNCT: NodeKind = NodeKind::Other(OtherKind::Punct);

/// Children of `id` that are not whitespace or comments.
pub fn significant_children(tree: &SyntaxTree, id: NodeId) -> TreeResult<Vec<NodeId>> {
    let mut out = Vec::new();
    for &child in tree.children(id)? {
        if !tree.kind(child)?.is_trivia() {
            out.push(child);
        }
    }
    Ok(out)
}

/// Whether `id` is a keyword or punctuation leaf with exactly `text`.
pub fn is_token(tree: &SyntaxTree, id: NodeId, text: &str) -> TreeResult<bool> {
    let kind = tree.kind(id)?;
    if kind != KEYWORD && kind != PUNCT {
        return Ok(false);
    }
    Ok(tree.token_text(id)? == Some(text))
}

/// Text of the first direct `Identifier` child.
fn first_identifier(tree: &SyntaxTree, id: NodeId) -> TreeResult<Option<(String, NodeId)>> {
    match tree.child_of_kind(id, NodeKind::Identifier)? {
        Some(ident) => Ok(Some((tree.text(ident)?, ident))),
        None => Ok(None),
    }
}

// ============================================================================
// Classes
// ============================================================================

/// Declared name of a class, `None` for anonymous bodies.
pub fn class_name(tree: &SyntaxTree, class: NodeId) -> TreeResult<Option<String>> {
    Ok(first_identifier(tree, class)?.map(|(name, _)| name))
}

pub fn class_scope(tree: &SyntaxTree, class: NodeId) -> TreeResult<ClassScope> {
    Ok(ClassScope::new(class, class_name(tree, class)?))
}

/// Nearest class declaration strictly enclosing `node`.
pub fn enclosing_class(tree: &SyntaxTree, node: NodeId) -> TreeResult<Option<ClassScope>> {
    match tree.parent_of_type(node, NodeKind::ClassDeclaration) {
        Some(class) => Ok(Some(class_scope(tree, class)?)),
        None => Ok(None),
    }
}

/// The class enclosing the leaf at `offset`.
pub fn class_at_offset(tree: &SyntaxTree, offset: usize) -> TreeResult<Option<ClassScope>> {
    match tree.leaf_at_offset(offset) {
        Some(leaf) => enclosing_class(tree, leaf),
        None => Ok(None),
    }
}

/// Member nodes declared directly in a class body, in source order.
pub fn class_members(tree: &SyntaxTree, class: NodeId) -> TreeResult<Vec<NodeId>> {
    let Some(body) = tree.child_of_kind(class, CLASS_BODY)? else {
        return Ok(Vec::new());
    };
    let mut members = Vec::new();
    for &child in tree.children(body)? {
        let kind = tree.kind(child)?;
        if matches!(
            kind,
            NodeKind::FieldDeclaration | NodeKind::MethodDeclaration | NodeKind::ClassDeclaration
        ) {
            members.push(child);
        }
    }
    Ok(members)
}

/// Name of the class this class extends.
///
/// Anonymous bodies extend the type they instantiate; enum constant bodies
/// extend their enum.
pub fn superclass_name(tree: &SyntaxTree, class: NodeId) -> TreeResult<Option<String>> {
    let children = significant_children(tree, class)?;
    if let Some(pos) = children
        .iter()
        .position(|&c| is_token(tree, c, "extends").unwrap_or(false))
    {
        return match children.get(pos + 1) {
            Some(&ty) if tree.kind(ty)? == TYPE_REF => type_ref_name(tree, ty),
            _ => Ok(None),
        };
    }

    let Some(parent) = tree.parent(class)? else {
        return Ok(None);
    };
    match tree.kind(parent)? {
        NodeKind::Other(OtherKind::NewExpression) => match tree.child_of_kind(parent, TYPE_REF)? {
            Some(ty) => type_ref_name(tree, ty),
            None => Ok(None),
        },
        NodeKind::Other(OtherKind::EnumConstant) => {
            match tree.parent_of_type(parent, NodeKind::ClassDeclaration) {
                Some(owner) => class_name(tree, owner),
                None => Ok(None),
            }
        }
        _ => Ok(None),
    }
}

// ============================================================================
// Types
// ============================================================================

/// Simple name a type reference points at: the last segment of `a.b.Foo<T>[]`.
pub fn type_ref_name(tree: &SyntaxTree, type_ref: NodeId) -> TreeResult<Option<String>> {
    let mut name = None;
    for &child in tree.children(type_ref)? {
        if tree.kind(child)? == NodeKind::Identifier {
            name = Some(tree.text(child)?);
        }
    }
    Ok(name)
}

/// Type named by a field, local variable or parameter declaration.
///
/// Type parameter lists (`<T>`) are skipped. Untyped lambda parameters and
/// `var` declarations have no usable type.
pub fn declared_type_name(tree: &SyntaxTree, decl: NodeId) -> TreeResult<Option<String>> {
    for &child in tree.children(decl)? {
        if tree.kind(child)? != TYPE_REF || tree.text(child)?.starts_with('<') {
            continue;
        }
        return match type_ref_name(tree, child)? {
            Some(name) if name == "var" => Ok(None),
            other => Ok(other),
        };
    }
    Ok(None)
}

// ============================================================================
// Fields
// ============================================================================

/// One variable declared by a field or local variable declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredVariable {
    pub name: String,
    pub name_node: NodeId,
}

/// Variables of a declaration with `Declarator` children, in source order.
pub fn declared_variables(tree: &SyntaxTree, decl: NodeId) -> TreeResult<Vec<DeclaredVariable>> {
    let mut out = Vec::new();
    for &child in tree.children(decl)? {
        if tree.kind(child)? != DECLARATOR {
            continue;
        }
        if let Some((name, name_node)) = first_identifier(tree, child)? {
            out.push(DeclaredVariable { name, name_node });
        }
    }
    Ok(out)
}

/// Name of a parameter.
pub fn parameter_name(tree: &SyntaxTree, param: NodeId) -> TreeResult<Option<(String, NodeId)>> {
    let mut found = None;
    for &child in tree.children(param)? {
        if tree.kind(child)? == NodeKind::Identifier {
            found = Some((tree.text(child)?, child));
        }
    }
    Ok(found)
}

// ============================================================================
// Methods
// ============================================================================

/// Name and shape of a method or constructor declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub name: String,
    pub name_node: NodeId,
    pub arity: usize,
    pub varargs: bool,
    pub is_constructor: bool,
}

impl MethodSignature {
    /// Whether a call with `count` arguments can bind to this method.
    pub fn accepts(&self, count: usize) -> bool {
        if self.varargs {
            count + 1 >= self.arity
        } else {
            count == self.arity
        }
    }
}

pub fn method_signature(
    tree: &SyntaxTree,
    method: NodeId,
) -> TreeResult<Option<MethodSignature>> {
    let mut return_type = false;
    let mut name = None;
    let mut arity = 0;
    let mut varargs = false;
    for &child in tree.children(method)? {
        match tree.kind(child)? {
            kind if kind == TYPE_REF && name.is_none() => {
                if !tree.text(child)?.starts_with('<') {
                    return_type = true;
                }
            }
            NodeKind::Identifier if name.is_none() => {
                name = Some((tree.text(child)?, child));
            }
            kind if kind == PARAMETER_LIST => {
                for &param in tree.children(child)? {
                    if tree.kind(param)? != PARAMETER {
                        continue;
                    }
                    arity += 1;
                    for &part in tree.children(param)? {
                        if is_token(tree, part, "...")? {
                            varargs = true;
                        }
                    }
                }
            }
            _ => {}
        }
    }
    Ok(name.map(|(name, name_node)| MethodSignature {
        name,
        name_node,
        arity,
        varargs,
        is_constructor: !return_type,
    }))
}

/// Number of arguments in an `ArgumentList` node.
pub fn argument_count(tree: &SyntaxTree, args: NodeId) -> TreeResult<usize> {
    let mut commas = 0;
    let mut operands = false;
    for child in significant_children(tree, args)? {
        if is_token(tree, child, ",")? {
            commas += 1;
        } else if !is_token(tree, child, "(")? && !is_token(tree, child, ")")? {
            operands = true;
        }
    }
    Ok(if operands { commas + 1 } else { 0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_java;

    fn find(tree: &SyntaxTree, kind: NodeKind, text: &str) -> NodeId {
        tree.descendants(tree.root())
            .find(|&id| tree.kind(id).unwrap() == kind && tree.text(id).unwrap().starts_with(text))
            .unwrap_or_else(|| panic!("no {kind:?} starting with {text:?}"))
    }

    #[test]
    fn class_names_and_members() {
        let tree = parse_java(
            "class Foo extends Base { int a, b; Foo() {} void m() {} class In {} }",
        )
        .unwrap()
        .tree;
        let foo = find(&tree, NodeKind::ClassDeclaration, "class Foo");
        assert_eq!(class_name(&tree, foo).unwrap().as_deref(), Some("Foo"));
        assert_eq!(superclass_name(&tree, foo).unwrap().as_deref(), Some("Base"));
        let members = class_members(&tree, foo).unwrap();
        assert_eq!(members.len(), 4);

        let names: Vec<String> = declared_variables(&tree, members[0])
            .unwrap()
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn constructors_have_no_return_type() {
        let tree = parse_java("class Foo { Foo(int a) {} <T> T id(T t, String... r) { return t; } }")
            .unwrap()
            .tree;
        let ctor = find(&tree, NodeKind::MethodDeclaration, "Foo(");
        let sig = method_signature(&tree, ctor).unwrap().unwrap();
        assert!(sig.is_constructor);
        assert_eq!((sig.name.as_str(), sig.arity), ("Foo", 1));

        let generic = find(&tree, NodeKind::MethodDeclaration, "<T>");
        let sig = method_signature(&tree, generic).unwrap().unwrap();
        assert!(!sig.is_constructor);
        assert_eq!(sig.name, "id");
        assert!(sig.varargs);
        assert!(sig.accepts(1));
        assert!(sig.accepts(4));
        assert!(!sig.accepts(0));
    }

    #[test]
    fn anonymous_bodies_extend_the_instantiated_type() {
        let tree = parse_java("class A { Object o = new Base(1) { }; }").unwrap().tree;
        let anon = tree
            .descendants(tree.root())
            .filter(|&id| tree.kind(id).unwrap() == NodeKind::ClassDeclaration)
            .nth(1)
            .unwrap();
        assert_eq!(class_name(&tree, anon).unwrap(), None);
        assert_eq!(superclass_name(&tree, anon).unwrap().as_deref(), Some("Base"));
    }

    #[test]
    fn declared_types() {
        let tree = parse_java("class A { java.util.List<Foo> xs; void f(final Foo p) { var v = 1; } }")
            .unwrap()
            .tree;
        let field = find(&tree, NodeKind::FieldDeclaration, "java");
        assert_eq!(declared_type_name(&tree, field).unwrap().as_deref(), Some("List"));
        let param = find(&tree, PARAMETER, "final");
        assert_eq!(declared_type_name(&tree, param).unwrap().as_deref(), Some("Foo"));
        assert_eq!(parameter_name(&tree, param).unwrap().unwrap().0, "p");
        let local = find(&tree, NodeKind::Other(OtherKind::LocalVariable), "var");
        assert_eq!(declared_type_name(&tree, local).unwrap(), None);
    }

    #[test]
    fn counts_arguments() {
        let tree = parse_java("class A { void f() { g(); g(a, h(b, c)); } }").unwrap().tree;
        let counts: Vec<usize> = tree
            .descendants(tree.root())
            .filter(|&id| tree.kind(id).unwrap() == NodeKind::Other(OtherKind::ArgumentList))
            .map(|id| argument_count(&tree, id).unwrap())
            .collect();
        assert_eq!(counts, vec![0, 2, 2]);
    }

    #[test]
    fn class_at_caret() {
        let source = "class Foo {\n  int x;\n}\n";
        let tree = parse_java(source).unwrap().tree;
        let scope = class_at_offset(&tree, source.find("x;").unwrap()).unwrap().unwrap();
        assert_eq!(scope.name.as_deref(), Some("Foo"));
        assert_eq!(class_at_offset(&tree, source.len()).unwrap(), None);
    }
}
