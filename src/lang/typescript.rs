//! TypeScript/JavaScript language support.
//!
//! One handler covers both: the TypeScript grammar parses plain JavaScript.
//! A separate TSX instance handles `.tsx`/`.jsx`, which need the TSX grammar
//! variant (the plain grammar rejects JSX syntax).
//!
//! Normalization notes:
//!
//! - `extends` and `implements` clauses both land in the `bases` attribute.
//! - Class fields come from field declarations, constructor parameter
//!   properties (`constructor(private svc: Service)`), and `this.x = ...`
//!   assignments in method bodies.
//! - `new X()` normalizes to `object_creation`; `switch` and `if`/`else if`
//!   chains flatten into one `conditional` with `branch` children.

use tree_sitter::{Node as TsNode, Parser, Tree};

use crate::ast::node::{kinds, AttrValue, Location, Node};
use crate::error::{Result, ScoutError};
use crate::lang::common::{dedup_fields, fields_from_instance_assignments, split_callee};
use crate::lang::traits::Language;

const SELF_WORDS: &[&str] = &["this"];

pub struct TypeScript {
    tsx: bool,
}

impl TypeScript {
    /// Handler for .ts/.js/.mjs/.cjs files.
    #[must_use]
    pub fn new() -> Self {
        Self { tsx: false }
    }

    /// Handler for .tsx/.jsx files (JSX-capable grammar variant).
    #[must_use]
    pub fn tsx() -> Self {
        Self { tsx: true }
    }

    fn text<'s>(&self, node: TsNode<'_>, source: &'s [u8]) -> &'s str {
        node.utf8_text(source).unwrap_or_default()
    }

    fn normalize_class(&self, node: TsNode<'_>, source: &[u8]) -> Node {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n, source).to_string());
        let mut class = Node::new(kinds::CLASS, name, Location::from_ts(&node));

        let mut bases = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() != "class_heritage" {
                continue;
            }
            let mut inner = child.walk();
            for clause in child.children(&mut inner) {
                match clause.kind() {
                    "extends_clause" | "implements_clause" => {
                        let mut c2 = clause.walk();
                        for base in clause.named_children(&mut c2) {
                            if matches!(
                                base.kind(),
                                "identifier" | "type_identifier" | "member_expression"
                                    | "generic_type"
                            ) {
                                bases.push(self.text(base, source).to_string());
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        class.attrs.insert("bases".into(), AttrValue::List(bases));

        let mut fields: Vec<Node> = Vec::new();
        let mut methods: Vec<Node> = Vec::new();

        if let Some(body) = node.child_by_field_name("body") {
            let mut bc = body.walk();
            for member in body.children(&mut bc) {
                match member.kind() {
                    "method_definition" => {
                        let method = self.normalize_method(member, source);
                        if method.name_or_empty() == "constructor" {
                            fields.extend(self.parameter_properties(member, source));
                        }
                        methods.push(method);
                    }
                    "public_field_definition" | "field_definition" => {
                        fields.push(self.normalize_field(member, source));
                    }
                    _ => {}
                }
            }
        }

        for method in &methods {
            fields.extend(fields_from_instance_assignments(method, SELF_WORDS));
        }
        dedup_fields(&mut fields);

        class.children.extend(fields);
        class.children.extend(methods);
        class
    }

    fn normalize_field(&self, member: TsNode<'_>, source: &[u8]) -> Node {
        let name = member
            .child_by_field_name("name")
            .map(|n| self.text(n, source).to_string());
        let mut field = Node::new(kinds::FIELD, name, Location::from_ts(&member));

        let is_static = {
            let mut cursor = member.walk();
            let found = member
                .children(&mut cursor)
                .any(|c| self.text(c, source) == "static");
            found
        };
        field.attrs.insert("static".into(), AttrValue::Bool(is_static));

        if let Some(ty) = member.child_by_field_name("type") {
            let ty_text = self.text(ty, source).trim_start_matches(annotation_trim).trim();
            field
                .attrs
                .insert("type".into(), AttrValue::Str(ty_text.to_string()));
        } else if let Some(value) = member.child_by_field_name("value") {
            if value.kind() == "new_expression" {
                if let Some(ctor) = value.child_by_field_name("constructor") {
                    field
                        .attrs
                        .insert("type".into(), AttrValue::Str(self.text(ctor, source).to_string()));
                }
            }
        }
        field
    }

    /// Constructor parameter properties: `constructor(private svc: Service)`.
    fn parameter_properties(&self, ctor: TsNode<'_>, source: &[u8]) -> Vec<Node> {
        let mut fields = Vec::new();
        let Some(params) = ctor.child_by_field_name("parameters") else {
            return fields;
        };
        let mut cursor = params.walk();
        for param in params.named_children(&mut cursor) {
            let mut pc = param.walk();
            let has_modifier = param
                .children(&mut pc)
                .any(|c| c.kind() == "accessibility_modifier" || self.text(c, source) == "readonly");
            if !has_modifier {
                continue;
            }
            let name = param
                .child_by_field_name("pattern")
                .map(|n| self.text(n, source).to_string());
            let mut field = Node::new(kinds::FIELD, name, Location::from_ts(&param));
            field.attrs.insert("static".into(), AttrValue::Bool(false));
            if let Some(ty) = param.child_by_field_name("type") {
                let ty_text = self.text(ty, source).trim_start_matches(annotation_trim).trim();
                field
                    .attrs
                    .insert("type".into(), AttrValue::Str(ty_text.to_string()));
            }
            fields.push(field);
        }
        fields
    }

    fn normalize_method(&self, node: TsNode<'_>, source: &[u8]) -> Node {
        self.normalize_callable(node, source, kinds::METHOD)
    }

    fn normalize_callable(&self, node: TsNode<'_>, source: &[u8], kind: &str) -> Node {
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
            let ret_text = self.text(ret, source).trim_start_matches(annotation_trim).trim();
            func.attrs
                .insert("returns".into(), AttrValue::Str(ret_text.to_string()));
        }

        if let Some(body) = node.child_by_field_name("body") {
            self.normalize_block(body, source, &mut func.children);
        }
        func
    }

    fn normalize_block(&self, block: TsNode<'_>, source: &[u8], out: &mut Vec<Node>) {
        let mut cursor = block.walk();
        for stmt in block.children(&mut cursor) {
            self.normalize_statement(stmt, source, out);
        }
    }

    fn normalize_statement(&self, stmt: TsNode<'_>, source: &[u8], out: &mut Vec<Node>) {
        match stmt.kind() {
            "if_statement" => {
                let mut cond = Node::new(kinds::CONDITIONAL, None, Location::from_ts(&stmt));
                self.collect_if_branches(stmt, source, &mut cond);
                out.push(cond);
            }
            "switch_statement" => out.push(self.normalize_switch(stmt, source)),
            "for_statement" | "for_in_statement" | "while_statement" | "do_statement" => {
                let mut lp = Node::new(kinds::LOOP, None, Location::from_ts(&stmt));
                if let Some(body) = stmt.child_by_field_name("body") {
                    self.normalize_statement(body, source, &mut lp.children);
                }
                out.push(lp);
            }
            "statement_block" => self.normalize_block(stmt, source, out),
            "return_statement" => {
                let mut ret = Node::new(kinds::RETURN, None, Location::from_ts(&stmt));
                let mut cursor = stmt.walk();
                for child in stmt.named_children(&mut cursor) {
                    if let Some(expr) = self.normalize_expression(child, source) {
                        ret.children.push(expr);
                    }
                }
                out.push(ret);
            }
            "expression_statement" => {
                let mut cursor = stmt.walk();
                for child in stmt.named_children(&mut cursor) {
                    if child.kind() == "assignment_expression" {
                        out.push(self.normalize_assignment(child, source));
                    } else if let Some(expr) = self.normalize_expression(child, source) {
                        out.push(expr);
                    }
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                let mut cursor = stmt.walk();
                for declarator in stmt.named_children(&mut cursor) {
                    if declarator.kind() != "variable_declarator" {
                        continue;
                    }
                    let target = declarator
                        .child_by_field_name("name")
                        .map(|n| self.text(n, source).to_string())
                        .unwrap_or_default();
                    let mut assign = Node::new(
                        kinds::ASSIGNMENT,
                        Some(target.clone()),
                        Location::from_ts(&declarator),
                    );
                    assign.attrs.insert("target".into(), AttrValue::Str(target));
                    if let Some(value) = declarator.child_by_field_name("value") {
                        if let Some(expr) = self.normalize_expression(value, source) {
                            assign.children.push(expr);
                        }
                    }
                    out.push(assign);
                }
            }
            "try_statement" => {
                let mut cursor = stmt.walk();
                for child in stmt.children(&mut cursor) {
                    match child.kind() {
                        "statement_block" => self.normalize_block(child, source, out),
                        "catch_clause" | "finally_clause" => {
                            if let Some(body) = child.child_by_field_name("body") {
                                self.normalize_block(body, source, out);
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    /// Flatten an `if`/`else if`/`else` chain into branches of `cond`.
    fn collect_if_branches(&self, stmt: TsNode<'_>, source: &[u8], cond: &mut Node) {
        if let Some(consequence) = stmt.child_by_field_name("consequence") {
            let mut branch = Node::new(kinds::BRANCH, None, Location::from_ts(&consequence));
            if let Some(c) = stmt.child_by_field_name("condition") {
                branch
                    .attrs
                    .insert("condition".into(), AttrValue::Str(self.text(c, source).to_string()));
            }
            self.normalize_statement(consequence, source, &mut branch.children);
            cond.children.push(branch);
        }
        if let Some(alternative) = stmt.child_by_field_name("alternative") {
            // else_clause wraps either another if_statement or a block.
            let mut cursor = alternative.walk();
            for child in alternative.children(&mut cursor) {
                match child.kind() {
                    "if_statement" => self.collect_if_branches(child, source, cond),
                    "statement_block" => {
                        let mut branch = Node::new(kinds::BRANCH, None, Location::from_ts(&child));
                        self.normalize_block(child, source, &mut branch.children);
                        cond.children.push(branch);
                    }
                    _ => {}
                }
            }
        }
    }

    fn normalize_switch(&self, stmt: TsNode<'_>, source: &[u8]) -> Node {
        let mut cond = Node::new(kinds::CONDITIONAL, None, Location::from_ts(&stmt));
        if let Some(body) = stmt.child_by_field_name("body") {
            let mut cursor = body.walk();
            for case in body.children(&mut cursor) {
                if !matches!(case.kind(), "switch_case" | "switch_default") {
                    continue;
                }
                let mut branch = Node::new(kinds::BRANCH, None, Location::from_ts(&case));
                let mut inner = case.walk();
                for child in case.named_children(&mut inner) {
                    self.normalize_statement(child, source, &mut branch.children);
                }
                cond.children.push(branch);
            }
        }
        cond
    }

    fn normalize_assignment(&self, node: TsNode<'_>, source: &[u8]) -> Node {
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

    fn normalize_expression(&self, expr: TsNode<'_>, source: &[u8]) -> Option<Node> {
        match expr.kind() {
            "call_expression" => {
                let callee = expr
                    .child_by_field_name("function")
                    .map(|f| self.text(f, source).to_string())
                    .unwrap_or_default();
                let parts = split_callee(&callee, SELF_WORDS);
                let mut node = Node::new(
                    kinds::CALL,
                    Some(parts.method),
                    Location::from_ts(&expr),
                );
                node.attrs.insert("callee".into(), AttrValue::Str(callee));
                if let Some(receiver) = parts.receiver {
                    node.attrs.insert("receiver".into(), AttrValue::Str(receiver));
                }
                if let Some(field) = parts.receiver_field {
                    node.attrs
                        .insert("receiver_field".into(), AttrValue::Str(field));
                }
                self.push_arguments(expr, source, &mut node);
                Some(node)
            }
            "new_expression" => {
                let type_name = expr
                    .child_by_field_name("constructor")
                    .map(|c| self.text(c, source).to_string());
                let mut node = Node::new(
                    kinds::OBJECT_CREATION,
                    type_name,
                    Location::from_ts(&expr),
                );
                self.push_arguments(expr, source, &mut node);
                Some(node)
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
            "await_expression" | "parenthesized_expression" => {
                let mut cursor = expr.walk();
                let inner = expr
                    .named_children(&mut cursor)
                    .find_map(|c| self.normalize_expression(c, source));
                inner
            }
            _ => None,
        }
    }

    fn push_arguments(&self, expr: TsNode<'_>, source: &[u8], node: &mut Node) {
        if let Some(args) = expr.child_by_field_name("arguments") {
            let mut cursor = args.walk();
            for arg in args.named_children(&mut cursor) {
                if let Some(child) = self.normalize_expression(arg, source) {
                    node.children.push(child);
                }
            }
        }
    }
}

impl Default for TypeScript {
    fn default() -> Self {
        Self::new()
    }
}

/// Strips the leading colon and whitespace from type annotation text.
fn annotation_trim(c: char) -> bool {
    c == ':' || c.is_whitespace()
}

impl Language for TypeScript {
    fn name(&self) -> &'static str {
        if self.tsx {
            "tsx"
        } else {
            "typescript"
        }
    }

    fn extensions(&self) -> &[&'static str] {
        if self.tsx {
            &[".tsx", ".jsx"]
        } else {
            &[".ts", ".js", ".mjs", ".cjs"]
        }
    }

    fn parser(&self) -> Result<Parser> {
        let grammar = if self.tsx {
            tree_sitter_typescript::LANGUAGE_TSX
        } else {
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT
        };
        let mut parser = Parser::new();
        parser
            .set_language(&grammar.into())
            .map_err(|e| ScoutError::TreeSitter(e.to_string()))?;
        Ok(parser)
    }

    fn normalize(&self, tree: &Tree, source: &[u8]) -> Node {
        let root = tree.root_node();
        let mut module = Node::new(kinds::MODULE, None, Location::from_ts(&root));

        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            match child.kind() {
                "class_declaration" => {
                    module.children.push(self.normalize_class(child, source));
                }
                "function_declaration" => {
                    module
                        .children
                        .push(self.normalize_callable(child, source, kinds::FUNCTION));
                }
                "export_statement" => {
                    let mut inner = child.walk();
                    for exported in child.named_children(&mut inner) {
                        match exported.kind() {
                            "class_declaration" => {
                                module.children.push(self.normalize_class(exported, source));
                            }
                            "function_declaration" => {
                                module.children.push(self.normalize_callable(
                                    exported,
                                    source,
                                    kinds::FUNCTION,
                                ));
                            }
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }
        module
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parse_source;

    fn parse(source: &str) -> Node {
        parse_source(source, &TypeScript::new(), "test.ts").unwrap()
    }

    #[test]
    fn class_heritage_and_fields() {
        let module = parse(
            "class LoggingDecorator extends Handler {\n\
             \x20 private inner: Handler;\n\
             \x20 constructor(inner: Handler) { super(); this.inner = inner; }\n\
             \x20 handle(req: string): void { this.inner.handle(req); }\n\
             }\n",
        );
        let class = &module.children[0];
        assert_eq!(class.name_or_empty(), "LoggingDecorator");
        assert_eq!(
            class.attr("bases").unwrap().as_list().unwrap(),
            &["Handler".to_string()]
        );
        let field = class.children_of_kind(kinds::FIELD).next().unwrap();
        assert_eq!(field.name_or_empty(), "inner");
        assert_eq!(field.attr_str("type"), Some("Handler"));

        let handle = class
            .children_of_kind(kinds::METHOD)
            .find(|m| m.name_or_empty() == "handle")
            .unwrap();
        let call = handle.descendants().find(|n| n.kind == kinds::CALL).unwrap();
        assert_eq!(call.attr_str("receiver_field"), Some("inner"));
    }

    #[test]
    fn static_field_and_awaited_call() {
        let module = parse(
            "class Conn {\n\
             \x20 static instance: Conn;\n\
             \x20 async fetch(url: string) { return await this.client.get(url); }\n\
             }\n",
        );
        let class = &module.children[0];
        let field = class.children_of_kind(kinds::FIELD).next().unwrap();
        assert!(field.attr("static").unwrap().is_true());
        // The await wrapper is transparent; the call underneath survives.
        let call = class.descendants().find(|n| n.kind == kinds::CALL).unwrap();
        assert_eq!(call.attr_str("receiver_field"), Some("client"));
    }

    #[test]
    fn switch_becomes_conditional_with_branches() {
        let module = parse(
            "function make(kind: string) {\n\
             \x20 switch (kind) {\n\
             \x20   case 'a': return new Alpha();\n\
             \x20   case 'b': return new Beta();\n\
             \x20   default: return new Gamma();\n\
             \x20 }\n\
             }\n",
        );
        let func = &module.children[0];
        let cond = func.children_of_kind(kinds::CONDITIONAL).next().unwrap();
        assert_eq!(cond.children_of_kind(kinds::BRANCH).count(), 3);
        let creations: Vec<_> = cond
            .descendants()
            .filter(|n| n.kind == kinds::OBJECT_CREATION)
            .map(|n| n.name_or_empty().to_string())
            .collect();
        assert_eq!(creations, vec!["Alpha", "Beta", "Gamma"]);
    }

    #[test]
    fn else_if_chain_flattens() {
        let module = parse(
            "function f(x: number) {\n\
             \x20 if (x > 0) { return a(); } else if (x < 0) { return b(); } else { return c(); }\n\
             }\n",
        );
        let func = &module.children[0];
        let cond = func.children_of_kind(kinds::CONDITIONAL).next().unwrap();
        assert_eq!(cond.children_of_kind(kinds::BRANCH).count(), 3);
    }
}
