//! Python language support.
//!
//! Normalizes the tree-sitter-python CST into the generic node
//! representation:
//!
//! - `class_definition` keeps its superclasses in the `bases` attribute and
//!   gets its members as direct children: `field_definition` nodes first
//!   (class-level assignments plus `self.x = ...` assignments discovered in
//!   method bodies), then `method_definition` nodes.
//! - `if`/`elif`/`else` chains and `match` statements flatten into one
//!   `conditional` with a `branch` child per arm.
//! - Calls to capitalized names normalize to `object_creation`, the Python
//!   idiom for instantiation.

use tree_sitter::{Node as TsNode, Parser, Tree};

use crate::ast::node::{kinds, AttrValue, Location, Node};
use crate::error::{Result, ScoutError};
use crate::lang::common::{
    dedup_fields, fields_from_instance_assignments, is_type_name, split_callee,
};
use crate::lang::traits::Language;

/// Instance keywords whose leading segment is stripped from receivers.
const SELF_WORDS: &[&str] = &["self", "cls"];

pub struct Python;

impl Python {
    fn text<'s>(&self, node: TsNode<'_>, source: &'s [u8]) -> &'s str {
        node.utf8_text(source).unwrap_or_default()
    }

    fn normalize_class(&self, node: TsNode<'_>, source: &[u8], decorators: Vec<String>) -> Node {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n, source).to_string());
        let mut class = Node::new(kinds::CLASS, name, Location::from_ts(&node));

        // Superclasses: identifiers in the argument list, skipping
        // keyword arguments such as metaclass=...
        let mut bases = Vec::new();
        if let Some(supers) = node.child_by_field_name("superclasses") {
            let mut cursor = supers.walk();
            for child in supers.children(&mut cursor) {
                if matches!(child.kind(), "identifier" | "attribute") {
                    bases.push(self.text(child, source).to_string());
                }
            }
        }
        class.attrs.insert("bases".into(), AttrValue::List(bases));
        if !decorators.is_empty() {
            class
                .attrs
                .insert("decorators".into(), AttrValue::List(decorators));
        }

        let mut fields: Vec<Node> = Vec::new();
        let mut methods: Vec<Node> = Vec::new();

        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for stmt in body.children(&mut cursor) {
                match stmt.kind() {
                    "function_definition" => {
                        methods.push(self.normalize_function(stmt, source, true, Vec::new()));
                    }
                    "decorated_definition" => {
                        let decs = self.decorator_names(stmt, source);
                        if let Some(def) = stmt.child_by_field_name("definition") {
                            if def.kind() == "function_definition" {
                                methods.push(self.normalize_function(def, source, true, decs));
                            }
                        }
                    }
                    "expression_statement" => {
                        if let Some(field) = self.class_level_field(stmt, source) {
                            fields.push(field);
                        }
                    }
                    _ => {}
                }
            }
        }

        // Instance fields assigned in method bodies (typically __init__).
        for method in &methods {
            fields.extend(fields_from_instance_assignments(method, SELF_WORDS));
        }
        dedup_fields(&mut fields);

        class.children.extend(fields);
        class.children.extend(methods);
        class
    }

    /// Class-body assignment like `count = 0` or `registry: dict = {}`.
    fn class_level_field(&self, stmt: TsNode<'_>, source: &[u8]) -> Option<Node> {
        let assign = stmt.named_child(0)?;
        if assign.kind() != "assignment" {
            return None;
        }
        let left = assign.child_by_field_name("left")?;
        if left.kind() != "identifier" {
            return None;
        }
        let mut field = Node::new(
            kinds::FIELD,
            Some(self.text(left, source).to_string()),
            Location::from_ts(&assign),
        );
        field.attrs.insert("static".into(), AttrValue::Bool(true));
        if let Some(ty) = assign.child_by_field_name("type") {
            field
                .attrs
                .insert("type".into(), AttrValue::Str(self.text(ty, source).to_string()));
        } else if let Some(right) = assign.child_by_field_name("right") {
            // Infer the type when the initializer constructs an object.
            if right.kind() == "call" {
                if let Some(f) = right.child_by_field_name("function") {
                    let callee = self.text(f, source);
                    let last = callee.rsplit('.').next().unwrap_or(callee);
                    if is_type_name(last) {
                        field
                            .attrs
                            .insert("type".into(), AttrValue::Str(last.to_string()));
                    }
                }
            }
        }
        Some(field)
    }

    fn decorator_names(&self, decorated: TsNode<'_>, source: &[u8]) -> Vec<String> {
        let mut cursor = decorated.walk();
        decorated
            .children(&mut cursor)
            .filter(|c| c.kind() == "decorator")
            .map(|d| self.text(d, source).trim_start_matches('@').to_string())
            .collect()
    }

    fn normalize_function(
        &self,
        node: TsNode<'_>,
        source: &[u8],
        is_method: bool,
        decorators: Vec<String>,
    ) -> Node {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n, source).to_string());
        let kind = if is_method { kinds::METHOD } else { kinds::FUNCTION };
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
        if !decorators.is_empty() {
            func.attrs
                .insert("decorators".into(), AttrValue::List(decorators));
        }

        if let Some(body) = node.child_by_field_name("body") {
            self.normalize_block(body, source, &mut func.children);
        }
        func
    }

    /// Normalize the statements of a block into `out`.
    ///
    /// Statement containers without structural meaning (try, with) are
    /// flattened into the surrounding sequence.
    fn normalize_block(&self, block: TsNode<'_>, source: &[u8], out: &mut Vec<Node>) {
        let mut cursor = block.walk();
        for stmt in block.children(&mut cursor) {
            self.normalize_statement(stmt, source, out);
        }
    }

    fn normalize_statement(&self, stmt: TsNode<'_>, source: &[u8], out: &mut Vec<Node>) {
        match stmt.kind() {
            "if_statement" => out.push(self.normalize_if(stmt, source)),
            "match_statement" => out.push(self.normalize_match(stmt, source)),
            "for_statement" | "while_statement" => {
                let mut lp = Node::new(kinds::LOOP, None, Location::from_ts(&stmt));
                if let Some(body) = stmt.child_by_field_name("body") {
                    self.normalize_block(body, source, &mut lp.children);
                }
                out.push(lp);
            }
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
                    match child.kind() {
                        "assignment" | "augmented_assignment" => {
                            out.push(self.normalize_assignment(child, source));
                        }
                        _ => {
                            if let Some(expr) = self.normalize_expression(child, source) {
                                out.push(expr);
                            }
                        }
                    }
                }
            }
            "try_statement" | "with_statement" => {
                let mut cursor = stmt.walk();
                for child in stmt.children(&mut cursor) {
                    match child.kind() {
                        "block" => self.normalize_block(child, source, out),
                        "except_clause" | "finally_clause" | "else_clause" => {
                            let mut inner = child.walk();
                            for sub in child.children(&mut inner) {
                                if sub.kind() == "block" {
                                    self.normalize_block(sub, source, out);
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    fn normalize_if(&self, stmt: TsNode<'_>, source: &[u8]) -> Node {
        let mut cond = Node::new(kinds::CONDITIONAL, None, Location::from_ts(&stmt));

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

        let mut cursor = stmt.walk();
        for alt in stmt.children_by_field_name("alternative", &mut cursor) {
            match alt.kind() {
                "elif_clause" => {
                    let mut branch = Node::new(kinds::BRANCH, None, Location::from_ts(&alt));
                    if let Some(c) = alt.child_by_field_name("condition") {
                        branch.attrs.insert(
                            "condition".into(),
                            AttrValue::Str(self.text(c, source).to_string()),
                        );
                    }
                    if let Some(body) = alt.child_by_field_name("consequence") {
                        self.normalize_block(body, source, &mut branch.children);
                    }
                    cond.children.push(branch);
                }
                "else_clause" => {
                    let mut branch = Node::new(kinds::BRANCH, None, Location::from_ts(&alt));
                    if let Some(body) = alt.child_by_field_name("body") {
                        self.normalize_block(body, source, &mut branch.children);
                    }
                    cond.children.push(branch);
                }
                _ => {}
            }
        }
        cond
    }

    fn normalize_match(&self, stmt: TsNode<'_>, source: &[u8]) -> Node {
        let mut cond = Node::new(kinds::CONDITIONAL, None, Location::from_ts(&stmt));
        if let Some(body) = stmt.child_by_field_name("body") {
            let mut cursor = body.walk();
            for case in body.children(&mut cursor) {
                if case.kind() != "case_clause" {
                    continue;
                }
                let mut branch = Node::new(kinds::BRANCH, None, Location::from_ts(&case));
                let mut inner = case.walk();
                for child in case.children(&mut inner) {
                    if child.kind() == "block" {
                        self.normalize_block(child, source, &mut branch.children);
                    }
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
        if node.kind() == "augmented_assignment" {
            assign.attrs.insert("augmented".into(), AttrValue::Bool(true));
        }
        if let Some(right) = node.child_by_field_name("right") {
            if let Some(expr) = self.normalize_expression(right, source) {
                assign.children.push(expr);
            }
        }
        assign
    }

    /// Normalize an expression to a node, or `None` for expressions the
    /// engine has no use for (bare names, literals).
    fn normalize_expression(&self, expr: TsNode<'_>, source: &[u8]) -> Option<Node> {
        match expr.kind() {
            "call" => Some(self.normalize_call(expr, source)),
            "binary_operator" | "boolean_operator" | "comparison_operator" => {
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
            "await" | "parenthesized_expression" => {
                let mut cursor = expr.walk();
                let inner = expr
                    .named_children(&mut cursor)
                    .find_map(|c| self.normalize_expression(c, source));
                inner
            }
            "conditional_expression" => {
                let mut cursor = expr.walk();
                let children: Vec<Node> = expr
                    .named_children(&mut cursor)
                    .filter_map(|c| self.normalize_expression(c, source))
                    .collect();
                if children.is_empty() {
                    None
                } else {
                    let mut cond = Node::new(kinds::CONDITIONAL, None, Location::from_ts(&expr));
                    cond.children = children;
                    Some(cond)
                }
            }
            _ => None,
        }
    }

    fn normalize_call(&self, call: TsNode<'_>, source: &[u8]) -> Node {
        let callee = call
            .child_by_field_name("function")
            .map(|f| self.text(f, source).to_string())
            .unwrap_or_default();
        let parts = split_callee(&callee, SELF_WORDS);

        // `Widget()` / `models.Widget()` instantiate; lowercase callees call.
        let kind = if is_type_name(&parts.method) {
            kinds::OBJECT_CREATION
        } else {
            kinds::CALL
        };
        let mut node = Node::new(kind, Some(parts.method.clone()), Location::from_ts(&call));
        node.attrs.insert("callee".into(), AttrValue::Str(callee));
        if let Some(receiver) = parts.receiver {
            node.attrs.insert("receiver".into(), AttrValue::Str(receiver));
        }
        if let Some(field) = parts.receiver_field {
            node.attrs
                .insert("receiver_field".into(), AttrValue::Str(field));
        }

        if let Some(args) = call.child_by_field_name("arguments") {
            let mut cursor = args.walk();
            for arg in args.named_children(&mut cursor) {
                if let Some(expr) = self.normalize_expression(arg, source) {
                    node.children.push(expr);
                }
            }
        }
        node
    }
}

impl Language for Python {
    fn name(&self) -> &'static str {
        "python"
    }

    fn extensions(&self) -> &[&'static str] {
        &[".py", ".pyi"]
    }

    fn parser(&self) -> Result<Parser> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| ScoutError::TreeSitter(e.to_string()))?;
        Ok(parser)
    }

    fn normalize(&self, tree: &Tree, source: &[u8]) -> Node {
        let root = tree.root_node();
        let mut module = Node::new(kinds::MODULE, None, Location::from_ts(&root));

        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            match child.kind() {
                "class_definition" => {
                    module
                        .children
                        .push(self.normalize_class(child, source, Vec::new()));
                }
                "function_definition" => {
                    module
                        .children
                        .push(self.normalize_function(child, source, false, Vec::new()));
                }
                "decorated_definition" => {
                    let decs = self.decorator_names(child, source);
                    if let Some(def) = child.child_by_field_name("definition") {
                        match def.kind() {
                            "class_definition" => {
                                module.children.push(self.normalize_class(def, source, decs));
                            }
                            "function_definition" => {
                                module
                                    .children
                                    .push(self.normalize_function(def, source, false, decs));
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
