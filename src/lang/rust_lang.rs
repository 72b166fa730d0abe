//! Rust language support.
//!
//! Named `rust_lang` to avoid conflict with the `rust` keyword.
//!
//! Rust has no classes, so the normalizer synthesizes class shapes the way
//! pattern matching expects them:
//!
//! - a `struct` and all of its inherent `impl` blocks merge into one
//!   `class_definition` whose fields come from the struct declaration;
//! - `impl Trait for Type` appends `Trait` to the type's `bases`;
//! - a `trait` becomes a `class_definition` marked `interface`, its method
//!   signatures becoming `method_definition` children;
//! - `match` expressions and `if`/`else if` chains flatten into one
//!   `conditional`; `Type::new(..)` calls and struct expressions normalize
//!   to `object_creation`.

use tree_sitter::{Node as TsNode, Parser, Tree};

use crate::ast::node::{kinds, AttrValue, Location, Node};
use crate::error::{Result, ScoutError};
use crate::lang::common::{is_type_name, split_callee};
use crate::lang::traits::Language;

const SELF_WORDS: &[&str] = &["self"];

pub struct Rust;

impl Rust {
    fn text<'s>(&self, node: TsNode<'_>, source: &'s [u8]) -> &'s str {
        node.utf8_text(source).unwrap_or_default()
    }

    /// Type name with generic arguments stripped (`Foo<T>` -> `Foo`).
    fn base_type_name(&self, node: TsNode<'_>, source: &[u8]) -> String {
        let text = self.text(node, source);
        text.split('<').next().unwrap_or(text).trim().to_string()
    }

    fn normalize_struct(&self, node: TsNode<'_>, source: &[u8]) -> Node {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n, source).to_string());
        let mut class = Node::new(kinds::CLASS, name, Location::from_ts(&node));
        class.attrs.insert("bases".into(), AttrValue::List(Vec::new()));

        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for decl in body.children(&mut cursor) {
                if decl.kind() != "field_declaration" {
                    continue;
                }
                let field_name = decl
                    .child_by_field_name("name")
                    .map(|n| self.text(n, source).to_string());
                let mut field =
                    Node::new(kinds::FIELD, field_name, Location::from_ts(&decl));
                field.attrs.insert("static".into(), AttrValue::Bool(false));
                if let Some(ty) = decl.child_by_field_name("type") {
                    field
                        .attrs
                        .insert("type".into(), AttrValue::Str(self.base_type_name(ty, source)));
                }
                class.children.push(field);
            }
        }
        class
    }

    fn normalize_trait(&self, node: TsNode<'_>, source: &[u8]) -> Node {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n, source).to_string());
        let mut class = Node::new(kinds::CLASS, name, Location::from_ts(&node));
        class.attrs.insert("bases".into(), AttrValue::List(Vec::new()));
        class.attrs.insert("interface".into(), AttrValue::Bool(true));

        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for decl in body.children(&mut cursor) {
                if matches!(decl.kind(), "function_item" | "function_signature_item") {
                    class
                        .children
                        .push(self.normalize_function(decl, source, kinds::METHOD));
                }
            }
        }
        class
    }

    fn normalize_function(&self, node: TsNode<'_>, source: &[u8], kind: &str) -> Node {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n, source).to_string());
        let mut func = Node::new(kind, name, Location::from_ts(&node));

        let mut params = Vec::new();
        if let Some(parameters) = node.child_by_field_name("parameters") {
            let mut cursor = parameters.walk();
            for p in parameters.named_children(&mut cursor) {
                params.push(self.text(p, source).to_string());
            }
        }
        func.attrs.insert("params".into(), AttrValue::List(params));
        if let Some(ret) = node.child_by_field_name("return_type") {
            func.attrs
                .insert("returns".into(), AttrValue::Str(self.text(ret, source).to_string()));
        }

        if let Some(body) = node.child_by_field_name("body") {
            self.normalize_block(body, source, &mut func.children);
        }
        func
    }

    /// Normalize a block's statements; the trailing expression (implicit
    /// return) is wrapped in a `return_statement`.
    fn normalize_block(&self, block: TsNode<'_>, source: &[u8], out: &mut Vec<Node>) {
        let mut cursor = block.walk();
        let children: Vec<TsNode<'_>> = block.named_children(&mut cursor).collect();
        let last_index = children.len().saturating_sub(1);
        for (i, mut stmt) in children.into_iter().enumerate() {
            // The grammar wraps a trailing expression without `;` in an
            // `expression_statement`; peel it so the tail check sees the
            // expression itself.
            if i == last_index && stmt.kind() == "expression_statement" && !self.ends_with_semi(stmt)
            {
                if let Some(inner) = stmt.named_child(0) {
                    stmt = inner;
                }
            }
            if i == last_index && self.is_expression_kind(stmt.kind()) {
                let mut tail = Vec::new();
                self.normalize_statement(stmt, source, &mut tail);
                if tail.len() == 1 {
                    let mut ret = Node::new(kinds::RETURN, None, Location::from_ts(&stmt));
                    ret.children.append(&mut tail);
                    out.push(ret);
                } else {
                    out.append(&mut tail);
                }
            } else {
                self.normalize_statement(stmt, source, out);
            }
        }
    }

    fn ends_with_semi(&self, stmt: TsNode<'_>) -> bool {
        stmt.child(stmt.child_count().saturating_sub(1))
            .is_some_and(|c| c.kind() == ";")
    }

    fn is_expression_kind(&self, kind: &str) -> bool {
        matches!(
            kind,
            "call_expression"
                | "struct_expression"
                | "binary_expression"
                | "if_expression"
                | "match_expression"
                | "await_expression"
                | "macro_invocation"
        )
    }

    fn normalize_statement(&self, stmt: TsNode<'_>, source: &[u8], out: &mut Vec<Node>) {
        match stmt.kind() {
            "if_expression" => {
                let mut cond = Node::new(kinds::CONDITIONAL, None, Location::from_ts(&stmt));
                self.collect_if_branches(stmt, source, &mut cond);
                out.push(cond);
            }
            "match_expression" => out.push(self.normalize_match(stmt, source)),
            "for_expression" | "while_expression" | "loop_expression" => {
                let mut lp = Node::new(kinds::LOOP, None, Location::from_ts(&stmt));
                if let Some(body) = stmt.child_by_field_name("body") {
                    self.normalize_block(body, source, &mut lp.children);
                }
                out.push(lp);
            }
            "return_expression" => {
                let mut ret = Node::new(kinds::RETURN, None, Location::from_ts(&stmt));
                let mut cursor = stmt.walk();
                for child in stmt.named_children(&mut cursor) {
                    if let Some(expr) = self.normalize_expression(child, source) {
                        ret.children.push(expr);
                    }
                }
                out.push(ret);
            }
            "let_declaration" => {
                let target = stmt
                    .child_by_field_name("pattern")
                    .map(|p| self.text(p, source).to_string())
                    .unwrap_or_default();
                let mut assign = Node::new(
                    kinds::ASSIGNMENT,
                    Some(target.clone()),
                    Location::from_ts(&stmt),
                );
                assign.attrs.insert("target".into(), AttrValue::Str(target));
                if let Some(value) = stmt.child_by_field_name("value") {
                    if let Some(expr) = self.normalize_expression(value, source) {
                        assign.children.push(expr);
                    }
                }
                out.push(assign);
            }
            "expression_statement" => {
                let mut cursor = stmt.walk();
                for child in stmt.named_children(&mut cursor) {
                    if child.kind() == "assignment_expression" {
                        out.push(self.normalize_rust_assignment(child, source));
                    } else {
                        self.normalize_statement(child, source, out);
                    }
                }
            }
            "block" => self.normalize_block(stmt, source, out),
            _ => {
                if let Some(expr) = self.normalize_expression(stmt, source) {
                    out.push(expr);
                }
            }
        }
    }

    fn normalize_rust_assignment(&self, node: TsNode<'_>, source: &[u8]) -> Node {
        let target = node
            .child_by_field_name("left")
            .map(|l| self.text(l, source).to_string())
            .unwrap_or_default();
        let mut assign = Node::new(
            kinds::ASSIGNMENT,
            Some(target.clone()),
            Location::from_ts(&node),
        );
        assign.attrs.insert("target".into(), AttrValue::Str(target));
        if let Some(right) = node.child_by_field_name("right") {
            if let Some(expr) = self.normalize_expression(right, source) {
                assign.children.push(expr);
            }
        }
        assign
    }

    fn collect_if_branches(&self, stmt: TsNode<'_>, source: &[u8], cond: &mut Node) {
        if let Some(consequence) = stmt.child_by_field_name("consequence") {
            let mut branch = Node::new(kinds::BRANCH, None, Location::from_ts(&consequence));
            if let Some(c) = stmt.child_by_field_name("condition") {
                branch
                    .attrs
                    .insert("condition".into(), AttrValue::Str(self.text(c, source).to_string()));
            }
            self.normalize_block(consequence, source, &mut branch.children);
            cond.children.push(branch);
        }
        if let Some(alternative) = stmt.child_by_field_name("alternative") {
            let mut cursor = alternative.walk();
            for child in alternative.children(&mut cursor) {
                match child.kind() {
                    "if_expression" => self.collect_if_branches(child, source, cond),
                    "block" => {
                        let mut branch = Node::new(kinds::BRANCH, None, Location::from_ts(&child));
                        self.normalize_block(child, source, &mut branch.children);
                        cond.children.push(branch);
                    }
                    _ => {}
                }
            }
        }
    }

    fn normalize_match(&self, stmt: TsNode<'_>, source: &[u8]) -> Node {
        let mut cond = Node::new(kinds::CONDITIONAL, None, Location::from_ts(&stmt));
        if let Some(body) = stmt.child_by_field_name("body") {
            let mut cursor = body.walk();
            for arm in body.children(&mut cursor) {
                if arm.kind() != "match_arm" {
                    continue;
                }
                let mut branch = Node::new(kinds::BRANCH, None, Location::from_ts(&arm));
                if let Some(value) = arm.child_by_field_name("value") {
                    if value.kind() == "block" {
                        self.normalize_block(value, source, &mut branch.children);
                    } else if let Some(expr) = self.normalize_expression(value, source) {
                        branch.children.push(expr);
                    }
                }
                cond.children.push(branch);
            }
        }
        cond
    }

    fn normalize_expression(&self, expr: TsNode<'_>, source: &[u8]) -> Option<Node> {
        match expr.kind() {
            "call_expression" => Some(self.normalize_call(expr, source)),
            "struct_expression" => {
                let type_name = expr
                    .child_by_field_name("name")
                    .map(|n| self.base_type_name(n, source));
                Some(Node::new(
                    kinds::OBJECT_CREATION,
                    type_name,
                    Location::from_ts(&expr),
                ))
            }
            "binary_expression" => {
                let mut binary = Node::new(kinds::BINARY, None, Location::from_ts(&expr));
                if let Some(op) = expr.child_by_field_name("operator") {
                    binary
                        .attrs
                        .insert("op".into(), AttrValue::Str(self.text(op, source).to_string()));
                }
                let mut cursor = expr.walk();
                for child in expr.named_children(&mut cursor) {
                    if let Some(operand) = self.normalize_expression(child, source) {
                        binary.children.push(operand);
                    }
                }
                Some(binary)
            }
            "await_expression" | "parenthesized_expression" | "reference_expression"
            | "try_expression" => {
                let mut cursor = expr.walk();
                let inner = expr
                    .named_children(&mut cursor)
                    .find_map(|c| self.normalize_expression(c, source));
                inner
            }
            _ => None,
        }
    }

    fn normalize_call(&self, call: TsNode<'_>, source: &[u8]) -> Node {
        let callee_node = call.child_by_field_name("function");
        let callee = callee_node
            .map(|f| self.text(f, source).to_string())
            .unwrap_or_default();

        // `Type::new(..)` and `module::Type::create(..)` are constructions.
        let creation = if callee.contains("::") {
            let segments: Vec<&str> = callee.split("::").collect();
            segments
                .iter()
                .rev()
                .skip(1)
                .any(|s| is_type_name(s.split('<').next().unwrap_or(s)))
        } else {
            false
        };

        if creation {
            let type_name = callee
                .rsplit("::")
                .map(|s| s.split('<').next().unwrap_or(s))
                .find(|s| is_type_name(s))
                .unwrap_or_default()
                .to_string();
            let mut node = Node::new(
                kinds::OBJECT_CREATION,
                Some(type_name),
                Location::from_ts(&call),
            );
            node.attrs.insert("callee".into(), AttrValue::Str(callee));
            self.push_arguments(call, source, &mut node);
            return node;
        }

        // Method calls come dotted: `self.engine.run(x)`.
        let dotted = callee.replace("::", ".");
        let parts = split_callee(&dotted, SELF_WORDS);
        let mut node = Node::new(kinds::CALL, Some(parts.method), Location::from_ts(&call));
        node.attrs.insert("callee".into(), AttrValue::Str(callee));
        if let Some(receiver) = parts.receiver {
            node.attrs.insert("receiver".into(), AttrValue::Str(receiver));
        }
        if let Some(field) = parts.receiver_field {
            node.attrs
                .insert("receiver_field".into(), AttrValue::Str(field));
        }
        self.push_arguments(call, source, &mut node);
        node
    }

    fn push_arguments(&self, call: TsNode<'_>, source: &[u8], node: &mut Node) {
        if let Some(args) = call.child_by_field_name("arguments") {
            let mut cursor = args.walk();
            for arg in args.named_children(&mut cursor) {
                if let Some(child) = self.normalize_expression(arg, source) {
                    node.children.push(child);
                }
            }
        }
    }
}

impl Language for Rust {
    fn name(&self) -> &'static str {
        "rust"
    }

    fn extensions(&self) -> &[&'static str] {
        &[".rs"]
    }

    fn parser(&self) -> Result<Parser> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_rust::LANGUAGE.into())
            .map_err(|e| ScoutError::TreeSitter(e.to_string()))?;
        Ok(parser)
    }

    fn normalize(&self, tree: &Tree, source: &[u8]) -> Node {
        let root = tree.root_node();
        let mut module = Node::new(kinds::MODULE, None, Location::from_ts(&root));

        // First pass: structs and traits become classes.
        let mut classes: Vec<Node> = Vec::new();
        let mut functions: Vec<Node> = Vec::new();
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            match child.kind() {
                "struct_item" => classes.push(self.normalize_struct(child, source)),
                "trait_item" => classes.push(self.normalize_trait(child, source)),
                "function_item" => {
                    functions.push(self.normalize_function(child, source, kinds::FUNCTION));
                }
                _ => {}
            }
        }

        // Second pass: merge impl blocks into their structs.
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            if child.kind() != "impl_item" {
                continue;
            }
            let Some(type_node) = child.child_by_field_name("type") else {
                continue;
            };
            let type_name = self.base_type_name(type_node, source);

            let index = match classes
                .iter()
                .position(|c| c.name_or_empty() == type_name)
            {
                Some(i) => i,
                None => {
                    // impl for a type declared elsewhere; synthesize it.
                    let mut class = Node::new(
                        kinds::CLASS,
                        Some(type_name.clone()),
                        Location::from_ts(&child),
                    );
                    class.attrs.insert("bases".into(), AttrValue::List(Vec::new()));
                    classes.push(class);
                    classes.len() - 1
                }
            };

            if let Some(trait_node) = child.child_by_field_name("trait") {
                let trait_name = self.base_type_name(trait_node, source);
                if let Some(AttrValue::List(bases)) = classes[index].attrs.get_mut("bases") {
                    bases.push(trait_name);
                }
            }

            if let Some(body) = child.child_by_field_name("body") {
                let mut bc = body.walk();
                for decl in body.children(&mut bc) {
                    if decl.kind() == "function_item" {
                        classes[index]
                            .children
                            .push(self.normalize_function(decl, source, kinds::METHOD));
                    }
                }
            }
        }

        module.children.extend(classes);
        module.children.extend(functions);
        module
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parse_source;

    fn parse(source: &str) -> Node {
        parse_source(source, &Rust, "test.rs").unwrap()
    }

    #[test]
    fn struct_and_impls_merge_into_one_class() {
        let module = parse(
            "struct Cache { store: DiskStore }\n\
             impl Cache {\n\
             \x20   fn get(&self, key: &str) -> Option<String> { self.store.read(key) }\n\
             }\n\
             impl Flushable for Cache {\n\
             \x20   fn flush(&mut self) { self.store.sync() }\n\
             }\n",
        );
        let classes: Vec<_> = module.children_of_kind(kinds::CLASS).collect();
        assert_eq!(classes.len(), 1);
        let cache = classes[0];
        assert_eq!(cache.name_or_empty(), "Cache");
        assert_eq!(
            cache.attr("bases").unwrap().as_list().unwrap(),
            &["Flushable".to_string()]
        );
        assert_eq!(cache.children_of_kind(kinds::METHOD).count(), 2);
        let field = cache.children_of_kind(kinds::FIELD).next().unwrap();
        assert_eq!(field.attr_str("type"), Some("DiskStore"));
    }

    #[test]
    fn trait_is_interface_class() {
        let module = parse("trait Render {\n    fn draw(&self);\n}\n");
        let class = module.children_of_kind(kinds::CLASS).next().unwrap();
        assert!(class.attr("interface").unwrap().is_true());
        assert_eq!(class.children_of_kind(kinds::METHOD).count(), 1);
    }

    #[test]
    fn constructor_calls_and_match_arms() {
        let module = parse(
            "fn make(kind: u8) -> Box<Shape> {\n\
             \x20   match kind {\n\
             \x20       0 => Circle::new(),\n\
             \x20       1 => Square::new(),\n\
             \x20       _ => Blob::default(),\n\
             \x20   }\n\
             }\n",
        );
        let func = module.children_of_kind(kinds::FUNCTION).next().unwrap();
        let ret = func.children_of_kind(kinds::RETURN).next().expect("tail return");
        let cond = &ret.children[0];
        assert_eq!(cond.kind, kinds::CONDITIONAL);
        let creations: Vec<_> = cond
            .descendants()
            .filter(|n| n.kind == kinds::OBJECT_CREATION)
            .map(|n| n.name_or_empty().to_string())
            .collect();
        assert_eq!(creations, vec!["Circle", "Square", "Blob"]);
    }

    #[test]
    fn await_and_try_wrappers_are_transparent() {
        let module = parse(
            "struct Client { http: Http }\n\
             impl Client {\n\
             \x20   async fn get(&self) -> Result<Body, Error> {\n\
             \x20       let body = (self.http.fetch().await?);\n\
             \x20       Ok(body)\n\
             \x20   }\n\
             }\n",
        );
        let class = module.children_of_kind(kinds::CLASS).next().unwrap();
        let method = class.children_of_kind(kinds::METHOD).next().unwrap();
        let assign = method.children_of_kind(kinds::ASSIGNMENT).next().unwrap();
        assert_eq!(assign.children[0].kind, kinds::CALL);
        assert_eq!(assign.children[0].attr_str("receiver_field"), Some("http"));
    }

    #[test]
    fn delegating_call_records_receiver_field() {
        let module = parse(
            "struct Facade { audio: AudioUnit }\n\
             impl Facade {\n\
             \x20   fn play(&self) { self.audio.start(); }\n\
             }\n",
        );
        let class = module.children_of_kind(kinds::CLASS).next().unwrap();
        let method = class.children_of_kind(kinds::METHOD).next().unwrap();
        let call = method.descendants().find(|n| n.kind == kinds::CALL).unwrap();
        assert_eq!(call.attr_str("receiver_field"), Some("audio"));
    }
}
