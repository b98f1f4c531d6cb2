//! Name-resolving reference index for Java.
//!
//! [`JavaReferenceIndex`] answers "where is this member used?" by resolving
//! every name-bearing expression in the project the way the compiler would,
//! within the limits of a purely syntactic model:
//!
//! - Locals and parameters declared before a use shadow members.
//! - Unqualified names resolve against the innermost enclosing class that
//!   declares (or inherits from a class in the project) a matching member.
//! - Calls prefer an overload whose arity matches the argument count.
//! - `this(..)` and `super(..)` resolve to constructors, as does `new T(..)`.
//! - `this.x`, `Outer.this.x`, `super.x`, `Type.x`, `var.x` and `Type::m`
//!   resolve through the receiver's class and are reported as qualified.
//!
//! Resolution covers the live tree of the queried file plus any files added
//! with [`JavaReferenceIndex::add_file`]. Results are cached per set of tree
//! fingerprints, so any mutation of a tree invalidates them.

use std::cell::RefCell;
use std::collections::HashSet;

use thisify_core::facts::{MemberDescriptor, MemberKey, ReferenceSite};
use thisify_core::host::{HostError, ReferenceIndex};
use thisify_core::patch::FileId;
use thisify_core::syntax::{NodeId, NodeKind, OtherKind, SyntaxTree, TreeResult};
use tracing::{debug, trace};

use crate::lookup::{
    argument_count, class_members, class_name, declared_type_name, declared_variables,
    enclosing_class, is_token, method_signature, parameter_name, significant_children,
    superclass_name, type_ref_name, MethodSignature, DECLARATOR, PARAMETER, PARAMETER_LIST,
    TYPE_REF,
};

const LOCAL_VARIABLE: NodeKind = NodeKind::Other(OtherKind::LocalVariable);
const METHOD_CALL: NodeKind = NodeKind::Other(OtherKind::MethodCall);
const ARGUMENT_LIST: NodeKind = NodeKind::Other(OtherKind::ArgumentList);
const NEW_EXPRESSION: NodeKind = NodeKind::Other(OtherKind::NewExpression);
const QUALIFIED_THIS: NodeKind = NodeKind::Other(OtherKind::QualifiedThis);
const ANNOTATION: NodeKind = NodeKind::Other(OtherKind::Annotation);

/// Reference index over a set of Java syntax trees.
#[derive(Debug, Default)]
pub struct JavaReferenceIndex {
    files: Vec<(FileId, SyntaxTree)>,
    cache: RefCell<Option<ResolutionCache>>,
}

#[derive(Debug)]
struct ResolutionCache {
    key: Vec<(FileId, u64)>,
    sites: Vec<ReferenceSite>,
}

impl JavaReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register another project file. Its references are included in results.
    ///
    /// The tree of the file being queried is always taken from the query, so
    /// registering it here is harmless.
    pub fn add_file(&mut self, file: FileId, tree: SyntaxTree) {
        self.files.retain(|(existing, _)| *existing != file);
        self.files.push((file, tree));
        self.cache.get_mut().take();
    }

    /// Number of registered project files.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Every resolved site in the project, for the live tree of `file`.
    pub fn resolve_all(&self, file: FileId, tree: &SyntaxTree) -> TreeResult<Vec<ReferenceSite>> {
        let key = self.cache_key(file, tree);
        if let Some(cache) = self.cache.borrow().as_ref() {
            if cache.key == key {
                trace!(sites = cache.sites.len(), "reference index cache hit");
                return Ok(cache.sites.clone());
            }
        }

        let mut trees: Vec<(FileId, &SyntaxTree)> = vec![(file, tree)];
        trees.extend(
            self.files
                .iter()
                .filter(|(id, _)| *id != file)
                .map(|(id, t)| (*id, t)),
        );
        let project = Project::build(&trees)?;
        let mut sites = Vec::new();
        for &(id, t) in &trees {
            Resolver {
                project: &project,
                file: id,
                tree: t,
            }
            .resolve_file(&mut sites)?;
        }
        debug!(
            files = trees.len(),
            classes = project.classes.len(),
            sites = sites.len(),
            "resolved project references"
        );

        *self.cache.borrow_mut() = Some(ResolutionCache {
            key,
            sites: sites.clone(),
        });
        Ok(sites)
    }

    fn cache_key(&self, file: FileId, tree: &SyntaxTree) -> Vec<(FileId, u64)> {
        let mut key = vec![(file, tree.fingerprint())];
        key.extend(
            self.files
                .iter()
                .filter(|(id, _)| *id != file)
                .map(|(id, t)| (*id, t.fingerprint())),
        );
        key
    }
}

impl ReferenceIndex for JavaReferenceIndex {
    fn find_all_references(
        &self,
        tree: &SyntaxTree,
        member: &MemberDescriptor,
    ) -> Result<Vec<ReferenceSite>, HostError> {
        let target = member.key();
        let sites: Vec<ReferenceSite> = self
            .resolve_all(member.file, tree)?
            .into_iter()
            .filter(|site| site.target == target)
            .collect();
        debug!(member = %member, references = sites.len(), "found references");
        Ok(sites)
    }
}

// ============================================================================
// Project model
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ClassRef {
    file: FileId,
    node: NodeId,
}

#[derive(Debug)]
struct FieldInfo {
    name: String,
    name_node: NodeId,
    type_name: Option<String>,
}

#[derive(Debug)]
struct ClassInfo {
    class: ClassRef,
    name: Option<String>,
    superclass: Option<String>,
    fields: Vec<FieldInfo>,
    methods: Vec<MethodSignature>,
}

impl ClassInfo {
    fn key(&self, name_node: NodeId) -> MemberKey {
        MemberKey {
            file: self.class.file,
            name_node,
        }
    }
}

#[derive(Debug)]
struct Project {
    classes: Vec<ClassInfo>,
}

impl Project {
    fn build(trees: &[(FileId, &SyntaxTree)]) -> TreeResult<Self> {
        let mut classes = Vec::new();
        for &(file, tree) in trees {
            for node in tree.descendants(tree.root()) {
                if tree.kind(node)? == NodeKind::ClassDeclaration {
                    classes.push(Self::class_info(file, tree, node)?);
                }
            }
        }
        Ok(Project { classes })
    }

    fn class_info(file: FileId, tree: &SyntaxTree, node: NodeId) -> TreeResult<ClassInfo> {
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        for member in class_members(tree, node)? {
            match tree.kind(member)? {
                NodeKind::FieldDeclaration => {
                    let type_name = declared_type_name(tree, member)?;
                    for var in declared_variables(tree, member)? {
                        fields.push(FieldInfo {
                            name: var.name,
                            name_node: var.name_node,
                            type_name: type_name.clone(),
                        });
                    }
                }
                NodeKind::MethodDeclaration => {
                    if let Some(sig) = method_signature(tree, member)? {
                        methods.push(sig);
                    }
                }
                _ => {}
            }
        }
        Ok(ClassInfo {
            class: ClassRef { file, node },
            name: class_name(tree, node)?,
            superclass: superclass_name(tree, node)?,
            fields,
            methods,
        })
    }

    fn class(&self, class: ClassRef) -> Option<&ClassInfo> {
        self.classes.iter().find(|info| info.class == class)
    }

    /// A class by simple name, preferring one declared in `file`.
    fn class_named(&self, name: &str, file: FileId) -> Option<&ClassInfo> {
        let mut candidates = self
            .classes
            .iter()
            .filter(|info| info.name.as_deref() == Some(name));
        let first = candidates.next()?;
        if first.class.file == file {
            return Some(first);
        }
        Some(
            candidates
                .find(|info| info.class.file == file)
                .unwrap_or(first),
        )
    }

    /// A class followed by its superclasses that are part of the project.
    fn hierarchy<'p>(&'p self, class: &'p ClassInfo) -> Vec<&'p ClassInfo> {
        let mut chain = vec![class];
        let mut seen = HashSet::from([class.class]);
        let mut current = class;
        while let Some(parent) = current
            .superclass
            .as_deref()
            .and_then(|name| self.class_named(name, current.class.file))
        {
            if !seen.insert(parent.class) {
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain
    }

    fn find_field<'a>(
        &'a self,
        class: &'a ClassInfo,
        name: &str,
    ) -> Option<(MemberKey, Option<&'a str>)> {
        self.hierarchy(class).into_iter().find_map(|info| {
            info.fields
                .iter()
                .find(|f| f.name == name)
                .map(|f| (info.key(f.name_node), f.type_name.as_deref()))
        })
    }

    /// Method `name` visible in `class`. With an argument count, an overload
    /// of matching arity wins over the first declared one.
    fn find_method(&self, class: &ClassInfo, name: &str, args: Option<usize>) -> Option<MemberKey> {
        let candidates: Vec<(MemberKey, &MethodSignature)> = self
            .hierarchy(class)
            .into_iter()
            .flat_map(|info| {
                info.methods
                    .iter()
                    .filter(|m| !m.is_constructor && m.name == name)
                    .map(move |m| (info.key(m.name_node), m))
            })
            .collect();
        let matching = args.and_then(|count| candidates.iter().find(|(_, m)| m.accepts(count)));
        matching.or(candidates.first()).map(|(key, _)| *key)
    }

    /// Constructor of `class` itself; constructors are not inherited.
    fn find_constructor(&self, class: &ClassInfo, args: usize) -> Option<MemberKey> {
        let ctors: Vec<&MethodSignature> =
            class.methods.iter().filter(|m| m.is_constructor).collect();
        ctors
            .iter()
            .find(|m| m.accepts(args))
            .or(ctors.first())
            .map(|m| class.key(m.name_node))
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// What a simple name means at a given point.
enum NameMeaning<'p> {
    Member {
        key: MemberKey,
        type_name: Option<&'p str>,
    },
    Local {
        type_name: Option<String>,
    },
    Unresolved,
}

/// Shape of a reference expression's significant children.
enum ReferenceShape {
    Simple { name: String },
    Delegation { keyword: String },
    Qualified { qualifier: NodeId, name: String, method_ref: bool },
    Other,
}

struct Resolver<'p, 't> {
    project: &'p Project,
    file: FileId,
    tree: &'t SyntaxTree,
}

impl<'p> Resolver<'p, '_> {
    fn resolve_file(&self, out: &mut Vec<ReferenceSite>) -> TreeResult<()> {
        for node in self.tree.descendants(self.tree.root()) {
            let kind = self.tree.kind(node)?;
            if kind != NodeKind::ReferenceExpression && kind != NEW_EXPRESSION {
                continue;
            }
            if self.tree.parent_of_type(node, ANNOTATION).is_some() {
                continue;
            }
            let resolved = if kind == NEW_EXPRESSION {
                self.resolve_new(node)?
            } else {
                self.resolve_reference(node)?
            };
            if let Some((site_node, target, identifier, qualified)) = resolved {
                trace!(node = %site_node, member = %target, qualified, "resolved reference");
                out.push(ReferenceSite {
                    file: self.file,
                    node: site_node,
                    target,
                    span: self.tree.text_range(site_node)?,
                    enclosing_class: enclosing_class(self.tree, site_node)?,
                    text: self.tree.text(site_node)?,
                    identifier,
                    qualified,
                    revision: self.tree.revision(),
                });
            }
        }
        Ok(())
    }

    fn shape(&self, node: NodeId) -> TreeResult<ReferenceShape> {
        let children = significant_children(self.tree, node)?;
        match children.as_slice() {
            [only] => match self.tree.kind(*only)? {
                NodeKind::Identifier => Ok(ReferenceShape::Simple {
                    name: self.tree.text(*only)?,
                }),
                NodeKind::Other(OtherKind::Keyword) => Ok(ReferenceShape::Delegation {
                    keyword: self.tree.text(*only)?,
                }),
                _ => Ok(ReferenceShape::Other),
            },
            [qualifier, sep, .., last] if self.tree.kind(*last)? == NodeKind::Identifier => {
                let method_ref = is_token(self.tree, *sep, "::")?;
                if !method_ref && !is_token(self.tree, *sep, ".")? {
                    return Ok(ReferenceShape::Other);
                }
                Ok(ReferenceShape::Qualified {
                    qualifier: *qualifier,
                    name: self.tree.text(*last)?,
                    method_ref,
                })
            }
            _ => Ok(ReferenceShape::Other),
        }
    }

    /// Argument count when `node` is the callee of a method call.
    fn call_arity(&self, node: NodeId) -> TreeResult<Option<usize>> {
        let Some(parent) = self.tree.parent(node)? else {
            return Ok(None);
        };
        if self.tree.kind(parent)? != METHOD_CALL {
            return Ok(None);
        }
        let children = significant_children(self.tree, parent)?;
        if children.first() != Some(&node) {
            return Ok(None);
        }
        match self.tree.child_of_kind(parent, ARGUMENT_LIST)? {
            Some(args) => Ok(Some(argument_count(self.tree, args)?)),
            None => Ok(Some(0)),
        }
    }

    fn resolve_reference(
        &self,
        node: NodeId,
    ) -> TreeResult<Option<(NodeId, MemberKey, String, bool)>> {
        let arity = self.call_arity(node)?;
        match self.shape(node)? {
            ReferenceShape::Simple { name } => {
                let key = match arity {
                    Some(count) => self.resolve_method(node, &name, Some(count))?,
                    None => match self.resolve_name(node, &name)? {
                        NameMeaning::Member { key, .. } => Some(key),
                        _ => None,
                    },
                };
                Ok(key.map(|key| (node, key, name, false)))
            }
            ReferenceShape::Delegation { keyword } => {
                let Some(count) = arity else {
                    return Ok(None);
                };
                let Some(scope) = self.tree.parent_of_type(node, NodeKind::ClassDeclaration)
                else {
                    return Ok(None);
                };
                let Some(mut class) = self.project.class(ClassRef {
                    file: self.file,
                    node: scope,
                }) else {
                    return Ok(None);
                };
                if keyword == "super" {
                    match self.superclass_of(class) {
                        Some(parent) => class = parent,
                        None => return Ok(None),
                    }
                }
                Ok(self
                    .project
                    .find_constructor(class, count)
                    .map(|key| (node, key, keyword, false)))
            }
            ReferenceShape::Qualified {
                qualifier,
                name,
                method_ref,
            } => {
                let Some(class) = self.receiver_class(qualifier)? else {
                    return Ok(None);
                };
                let key = if method_ref {
                    self.project.find_method(class, &name, None)
                } else if let Some(count) = arity {
                    self.project.find_method(class, &name, Some(count))
                } else {
                    self.project.find_field(class, &name).map(|(key, _)| key)
                };
                Ok(key.map(|key| (node, key, name, true)))
            }
            ReferenceShape::Other => Ok(None),
        }
    }

    /// `new T(..)` resolves to a constructor of `T`; the site is the type.
    fn resolve_new(&self, node: NodeId) -> TreeResult<Option<(NodeId, MemberKey, String, bool)>> {
        let Some(type_ref) = self.tree.child_of_kind(node, TYPE_REF)? else {
            return Ok(None);
        };
        let Some(args) = self.tree.child_of_kind(node, ARGUMENT_LIST)? else {
            return Ok(None);
        };
        let Some(name) = type_ref_name(self.tree, type_ref)? else {
            return Ok(None);
        };
        let Some(class) = self.project.class_named(&name, self.file) else {
            return Ok(None);
        };
        let count = argument_count(self.tree, args)?;
        Ok(self
            .project
            .find_constructor(class, count)
            .map(|key| (type_ref, key, name, false)))
    }

    fn superclass_of(&self, class: &'p ClassInfo) -> Option<&'p ClassInfo> {
        let name = class.superclass.as_deref()?;
        self.project.class_named(name, class.class.file)
    }

    fn class_at(&self, node: NodeId) -> Option<&'p ClassInfo> {
        self.project.class(ClassRef {
            file: self.file,
            node,
        })
    }

    /// Method `name` as seen from `at`: the innermost enclosing class that
    /// has one wins.
    fn resolve_method(
        &self,
        at: NodeId,
        name: &str,
        args: Option<usize>,
    ) -> TreeResult<Option<MemberKey>> {
        for ancestor in self.tree.ancestors(at) {
            if self.tree.kind(ancestor)? != NodeKind::ClassDeclaration {
                continue;
            }
            if let Some(class) = self.class_at(ancestor) {
                if let Some(key) = self.project.find_method(class, name, args) {
                    return Ok(Some(key));
                }
            }
        }
        Ok(None)
    }

    /// Meaning of a simple variable name at `at`, walking scopes outward.
    fn resolve_name(&self, at: NodeId, name: &str) -> TreeResult<NameMeaning<'p>> {
        let mut child = at;
        for ancestor in self.tree.ancestors(at) {
            let kind = self.tree.kind(ancestor)?;
            if kind == NodeKind::ClassDeclaration {
                if let Some(class) = self.class_at(ancestor) {
                    if let Some((key, type_name)) = self.project.find_field(class, name) {
                        return Ok(NameMeaning::Member { key, type_name });
                    }
                }
            } else if kind != NodeKind::FieldDeclaration {
                for &sibling in self.tree.children(ancestor)? {
                    if sibling == child {
                        break;
                    }
                    if let Some(type_name) = self.declares_local(ancestor, sibling, name)? {
                        return Ok(NameMeaning::Local { type_name });
                    }
                }
            }
            child = ancestor;
        }
        Ok(NameMeaning::Unresolved)
    }

    /// If `node` (a child of `scope`) declares a local `name`, its type.
    fn declares_local(
        &self,
        scope: NodeId,
        node: NodeId,
        name: &str,
    ) -> TreeResult<Option<Option<String>>> {
        let kind = self.tree.kind(node)?;
        if kind == LOCAL_VARIABLE {
            let declared = declared_variables(self.tree, node)?;
            if declared.iter().any(|v| v.name == name) {
                return Ok(Some(declared_type_name(self.tree, node)?));
            }
        } else if kind == PARAMETER {
            if let Some((param, _)) = parameter_name(self.tree, node)? {
                if param == name {
                    return Ok(Some(declared_type_name(self.tree, node)?));
                }
            }
        } else if kind == PARAMETER_LIST {
            for &param in self.tree.children(node)? {
                if self.tree.kind(param)? == PARAMETER {
                    if let Some(found) = self.declares_local(node, param, name)? {
                        return Ok(Some(found));
                    }
                }
            }
        } else if kind == DECLARATOR && self.tree.kind(scope)? == LOCAL_VARIABLE {
            if let Some(ident) = self.tree.child_of_kind(node, NodeKind::Identifier)? {
                if self.tree.text(ident)? == name {
                    return Ok(Some(declared_type_name(self.tree, scope)?));
                }
            }
        }
        Ok(None)
    }

    /// Class an expression used as a receiver evaluates to, when known.
    fn receiver_class(&self, qualifier: NodeId) -> TreeResult<Option<&'p ClassInfo>> {
        let kind = self.tree.kind(qualifier)?;
        if is_token(self.tree, qualifier, "this")? {
            return Ok(self
                .tree
                .parent_of_type(qualifier, NodeKind::ClassDeclaration)
                .and_then(|node| self.class_at(node)));
        }
        if is_token(self.tree, qualifier, "super")? {
            return Ok(self
                .tree
                .parent_of_type(qualifier, NodeKind::ClassDeclaration)
                .and_then(|node| self.class_at(node))
                .and_then(|class| self.superclass_of(class)));
        }
        if kind == QUALIFIED_THIS {
            let Some(outer) = self.tree.child_of_kind(qualifier, NodeKind::ReferenceExpression)?
            else {
                return Ok(None);
            };
            let outer_name = self.tree.text(outer)?;
            for ancestor in self.tree.ancestors(qualifier) {
                if self.tree.kind(ancestor)? == NodeKind::ClassDeclaration
                    && class_name(self.tree, ancestor)?.as_deref() == Some(outer_name.trim())
                {
                    return Ok(self.class_at(ancestor));
                }
            }
            return Ok(None);
        }
        if kind != NodeKind::ReferenceExpression {
            return Ok(None);
        }

        match self.shape(qualifier)? {
            ReferenceShape::Simple { name } => {
                let type_name = match self.resolve_name(qualifier, &name)? {
                    NameMeaning::Member { type_name, .. } => type_name.map(str::to_string),
                    NameMeaning::Local { type_name } => type_name,
                    // Not a variable: a type name used for static access.
                    NameMeaning::Unresolved => Some(name),
                };
                Ok(type_name.and_then(|t| self.project.class_named(&t, self.file)))
            }
            ReferenceShape::Qualified {
                qualifier: inner,
                name,
                method_ref: false,
            } => match self.receiver_class(inner)? {
                Some(class) => Ok(self
                    .project
                    .find_field(class, &name)
                    .and_then(|(_, type_name)| type_name)
                    .and_then(|t| self.project.class_named(t, self.file))),
                // `pkg.Type` used as a receiver.
                None => Ok(self.project.class_named(&name, self.file)),
            },
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_java;
    use thisify_core::facts::{ClassScope, MemberKind};

    fn member(tree: &SyntaxTree, file: FileId, class: &str, kind: MemberKind, name: &str) -> MemberDescriptor {
        let class_node = tree
            .descendants(tree.root())
            .find(|&id| {
                tree.kind(id).unwrap() == NodeKind::ClassDeclaration
                    && class_name(tree, id).unwrap().as_deref() == Some(class)
            })
            .unwrap();
        let owner = ClassScope::named(class_node, class);
        for decl in class_members(tree, class_node).unwrap() {
            match (kind, tree.kind(decl).unwrap()) {
                (MemberKind::Field, NodeKind::FieldDeclaration) => {
                    for var in declared_variables(tree, decl).unwrap() {
                        if var.name == name {
                            return MemberDescriptor {
                                kind,
                                name: name.to_string(),
                                is_static: false,
                                is_constructor: false,
                                name_node: var.name_node,
                                declaration: decl,
                                owner,
                                file,
                            };
                        }
                    }
                }
                (MemberKind::Method, NodeKind::MethodDeclaration) => {
                    let sig = method_signature(tree, decl).unwrap().unwrap();
                    if sig.name == name {
                        return MemberDescriptor {
                            kind,
                            name: name.to_string(),
                            is_static: false,
                            is_constructor: sig.is_constructor,
                            name_node: sig.name_node,
                            declaration: decl,
                            owner,
                            file,
                        };
                    }
                }
                _ => {}
            }
        }
        panic!("no {kind} {class}.{name}");
    }

    fn texts(sites: &[ReferenceSite]) -> Vec<(String, bool)> {
        let mut out: Vec<_> = sites.iter().map(|s| (s.text.clone(), s.qualified)).collect();
        out.sort();
        out
    }

    const FILE: FileId = FileId(0);

    #[test]
    fn locals_and_parameters_shadow_fields() {
        let tree = parse_java(
            "class Foo { int bar; void a() { bar = 1; } void b(int bar) { bar++; } void c() { int bar = 2; use(bar); } }",
        )
        .unwrap()
        .tree;
        let index = JavaReferenceIndex::new();
        let bar = member(&tree, FILE, "Foo", MemberKind::Field, "bar");
        let sites = index.find_all_references(&tree, &bar).unwrap();
        assert_eq!(texts(&sites), vec![("bar".to_string(), false)]);
        assert!(sites[0].span.start < tree.render().find("void b").unwrap());
    }

    #[test]
    fn qualified_forms_are_reported_as_qualified() {
        let tree = parse_java(
            "class Foo { int bar; Foo other; void f() { this.bar = other.bar + Foo.this.bar; } }",
        )
        .unwrap()
        .tree;
        let index = JavaReferenceIndex::new();
        let bar = member(&tree, FILE, "Foo", MemberKind::Field, "bar");
        let sites = index.find_all_references(&tree, &bar).unwrap();
        assert_eq!(
            texts(&sites),
            vec![
                ("Foo.this.bar".to_string(), true),
                ("other.bar".to_string(), true),
                ("this.bar".to_string(), true),
            ]
        );
    }

    #[test]
    fn overloads_resolve_by_arity() {
        let tree = parse_java(
            "class Foo { void run() {} void run(int x) {} void go() { run(); run(1); run(2); } }",
        )
        .unwrap()
        .tree;
        let index = JavaReferenceIndex::new();
        let class = tree
            .descendants(tree.root())
            .find(|&id| tree.kind(id).unwrap() == NodeKind::ClassDeclaration)
            .unwrap();
        let run_decls: Vec<NodeId> = class_members(&tree, class).unwrap().into_iter().take(2).collect();
        let counts: Vec<usize> = run_decls
            .iter()
            .map(|&decl| {
                let sig = method_signature(&tree, decl).unwrap().unwrap();
                let desc = MemberDescriptor {
                    kind: MemberKind::Method,
                    name: sig.name.clone(),
                    is_static: false,
                    is_constructor: false,
                    name_node: sig.name_node,
                    declaration: decl,
                    owner: ClassScope::named(class, "Foo"),
                    file: FILE,
                };
                index.find_all_references(&tree, &desc).unwrap().len()
            })
            .collect();
        assert_eq!(counts, vec![1, 2]);
    }

    #[test]
    fn constructor_invocations() {
        let tree = parse_java(
            "class Foo { Foo() { this(5); } Foo(int x) { } static Foo make() { return new Foo(1); } }",
        )
        .unwrap()
        .tree;
        let index = JavaReferenceIndex::new();
        let class = tree
            .descendants(tree.root())
            .find(|&id| tree.kind(id).unwrap() == NodeKind::ClassDeclaration)
            .unwrap();
        let second = class_members(&tree, class).unwrap()[1];
        let sig = method_signature(&tree, second).unwrap().unwrap();
        let ctor = MemberDescriptor {
            kind: MemberKind::Method,
            name: "Foo".to_string(),
            is_static: false,
            is_constructor: true,
            name_node: sig.name_node,
            declaration: second,
            owner: ClassScope::named(class, "Foo"),
            file: FILE,
        };
        let sites = index.find_all_references(&tree, &ctor).unwrap();
        assert_eq!(
            texts(&sites),
            vec![("Foo".to_string(), false), ("this".to_string(), false)]
        );
        let new_site = sites.iter().find(|s| s.text == "Foo").unwrap();
        assert_eq!(tree.kind(new_site.node).unwrap(), TYPE_REF);
    }

    #[test]
    fn inner_classes_see_outer_members_and_inherit() {
        let tree = parse_java(
            "class Base { int shared; } class Foo extends Base { int bar; class Inner { int x = bar; } void f() { shared++; } }",
        )
        .unwrap()
        .tree;
        let index = JavaReferenceIndex::new();
        let bar = member(&tree, FILE, "Foo", MemberKind::Field, "bar");
        let sites = index.find_all_references(&tree, &bar).unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(
            sites[0].enclosing_class.as_ref().and_then(|c| c.name.as_deref()),
            Some("Inner")
        );

        let shared = member(&tree, FILE, "Base", MemberKind::Field, "shared");
        let sites = index.find_all_references(&tree, &shared).unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(
            sites[0].enclosing_class.as_ref().and_then(|c| c.name.as_deref()),
            Some("Foo")
        );
    }

    #[test]
    fn annotation_arguments_are_not_references() {
        let tree = parse_java("class Foo { String value; @Named(value = \"x\") void f() { } }")
            .unwrap()
            .tree;
        let index = JavaReferenceIndex::new();
        let value = member(&tree, FILE, "Foo", MemberKind::Field, "value");
        assert!(index.find_all_references(&tree, &value).unwrap().is_empty());
    }

    #[test]
    fn registered_files_contribute_sites() {
        let foo = parse_java("class Foo { int bar; }").unwrap().tree;
        let other = parse_java("class User { void f(Foo foo) { foo.bar = 1; } }").unwrap().tree;
        let mut index = JavaReferenceIndex::new();
        index.add_file(FileId(1), other);
        assert_eq!(index.file_count(), 1);

        let bar = member(&foo, FILE, "Foo", MemberKind::Field, "bar");
        let sites = index.find_all_references(&foo, &bar).unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].file, FileId(1));
        assert!(sites[0].qualified);
    }

    #[test]
    fn cache_follows_tree_mutations() {
        let mut tree = parse_java("class Foo { int bar; int f() { return bar; } }").unwrap().tree;
        let index = JavaReferenceIndex::new();
        let bar = member(&tree, FILE, "Foo", MemberKind::Field, "bar");
        let before = index.find_all_references(&tree, &bar).unwrap();
        assert_eq!(before.len(), 1);
        assert!(!before[0].qualified);

        tree.replace_prefixed(
            before[0].node,
            NodeKind::ReferenceExpression,
            &[
                (NodeKind::Other(OtherKind::Keyword), "this"),
                (NodeKind::Other(OtherKind::Punct), "."),
            ],
        )
        .unwrap();
        let after = index.find_all_references(&tree, &bar).unwrap();
        assert_eq!(after.len(), 1);
        assert!(after[0].qualified);
        assert_eq!(after[0].text, "this.bar");
        assert!(tree.is_current(after[0].revision));
    }
}
