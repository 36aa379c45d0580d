//! Declaration and scope checks over a parsed file.
//!
//! Names resolve innermost first: block locals, then parameters, then
//! members of the enclosing class and its bases, then file-level items and
//! imports. File-level items are visible before their declaration.

use std::collections::HashMap;
use std::fmt;

use crate::ast::{
    Block, ClassDecl, Expr, ExprKind, FunctionDecl, Item, Member, ParseTree, Stmt, TypeName,
    TypeRef, VariableDecl,
};
use crate::stack::ensure_sufficient_stack;
use crate::token::{Span, TokenType};

/// Classifies a semantic error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticErrorKind {
    UndeclaredName(String),
    /// Second declaration of a name in the same scope.
    DuplicateDeclaration { name: String, previous: Span },
    BreakOutsideLoop,
    ContinueOutsideLoop,
    /// `return expr;` in a `void` function.
    ReturnValueInVoid,
    /// Bare `return;` in a function that returns a value.
    MissingReturnValue,
    AssignToConst(String),
    UnknownType(String),
    UnknownBaseClass(String),
    /// The class appears in its own `extends` chain.
    CyclicInheritance(String),
    ThisOutsideClass,
}

impl fmt::Display for SemanticErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UndeclaredName(name) => write!(f, "use of undeclared name '{name}'"),
            Self::DuplicateDeclaration { name, previous } => write!(
                f,
                "'{name}' is already declared at line {}, column {}",
                previous.line, previous.column
            ),
            Self::BreakOutsideLoop => write!(f, "'break' outside of a loop"),
            Self::ContinueOutsideLoop => write!(f, "'continue' outside of a loop"),
            Self::ReturnValueInVoid => write!(f, "void function cannot return a value"),
            Self::MissingReturnValue => write!(f, "non-void function must return a value"),
            Self::AssignToConst(name) => write!(f, "cannot assign to const '{name}'"),
            Self::UnknownType(name) => write!(f, "unknown type '{name}'"),
            Self::UnknownBaseClass(name) => write!(f, "unknown base class '{name}'"),
            Self::CyclicInheritance(name) => write!(f, "class '{name}' inherits from itself"),
            Self::ThisOutsideClass => write!(f, "'this' used outside of a class"),
        }
    }
}

/// Error produced by the semantic check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {}, column {}", span.line, span.column)]
pub struct SemanticError {
    pub kind: SemanticErrorKind,
    pub span: Span,
}

/// Check a parsed file, collecting every problem.
///
/// Errors are returned in source order.
pub fn check(tree: &ParseTree) -> Result<(), Vec<SemanticError>> {
    let mut checker = Checker::new(tree);
    checker.check_file(tree);

    let mut errors = checker.errors;
    if errors.is_empty() {
        return Ok(());
    }
    errors.sort_by_key(|e| e.span);
    Err(errors)
}

#[derive(Debug, Clone, Copy)]
struct Binding {
    span: Span,
    is_const: bool,
}

impl Binding {
    const fn of(span: Span) -> Self {
        Self {
            span,
            is_const: false,
        }
    }

    fn variable(decl: &VariableDecl) -> Self {
        Self {
            span: decl.span,
            is_const: decl.is_const(),
        }
    }
}

type Scope<'t> = HashMap<&'t str, Binding>;

struct Checker<'t> {
    /// Imports, classes, functions, and globals.
    globals: Scope<'t>,
    classes: HashMap<&'t str, &'t ClassDecl>,
    imports: Vec<&'t str>,
    scopes: Vec<Scope<'t>>,
    class: Option<&'t ClassDecl>,
    returns_void: bool,
    loop_depth: usize,
    errors: Vec<SemanticError>,
}

impl<'t> Checker<'t> {
    fn new(tree: &'t ParseTree) -> Self {
        let mut checker = Self {
            globals: HashMap::new(),
            classes: HashMap::new(),
            imports: Vec::new(),
            scopes: Vec::new(),
            class: None,
            returns_void: true,
            loop_depth: 0,
            errors: Vec::new(),
        };

        for import in &tree.imports {
            let name = import.binding();
            checker.imports.push(name);
            checker.declare_global(name, Binding::of(import.span));
        }
        for item in &tree.items {
            let binding = match item {
                Item::Variable(v) => Binding::variable(v),
                _ => Binding::of(item.span()),
            };
            checker.declare_global(item.name(), binding);
            if let Item::Class(class) = item {
                checker.classes.entry(class.name.as_str()).or_insert(class);
            }
        }

        checker
    }

    fn check_file(&mut self, tree: &'t ParseTree) {
        for item in &tree.items {
            match item {
                Item::Class(class) => self.check_class(class),
                Item::Function(function) => self.check_function(function),
                Item::Variable(global) => self.check_variable(global),
            }
        }
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn check_class(&mut self, class: &'t ClassDecl) {
        if let Some(base) = &class.base {
            if base.text == class.name || self.inherits_from(&base.text, &class.name) {
                self.report(SemanticErrorKind::CyclicInheritance(class.name.clone()), base.span);
            } else if !self.classes.contains_key(base.text.as_str())
                && !self.imports.contains(&base.text.as_str())
            {
                self.report(SemanticErrorKind::UnknownBaseClass(base.text.clone()), base.span);
            }
        }

        let mut members = Scope::new();
        for member in &class.members {
            self.declare_in(&mut members, member.name(), Binding::of(member.span()));
        }

        let outer = self.class.replace(class);
        for member in &class.members {
            match member {
                Member::Field(field) => self.check_variable(field),
                Member::Method(method) => self.check_function(method),
            }
        }
        self.class = outer;
    }

    /// Whether following `extends` from `start` reaches `target`.
    fn inherits_from(&self, start: &str, target: &str) -> bool {
        let mut current = start;
        // a chain longer than the class count has looped
        for _ in 0..=self.classes.len() {
            let Some(base) = self.classes.get(current).and_then(|c| c.base.as_ref()) else {
                return false;
            };
            if base.text == target {
                return true;
            }
            current = &base.text;
        }
        false
    }

    fn check_function(&mut self, function: &'t FunctionDecl) {
        self.check_type(&function.return_type);

        let mut params = Scope::new();
        for param in &function.params {
            self.check_type(&param.ty);
            self.declare_in(&mut params, &param.name, Binding::of(param.span));
        }

        let returns_void = std::mem::replace(&mut self.returns_void, function.return_type.is_void());
        let loop_depth = std::mem::take(&mut self.loop_depth);

        // parameters and top-level body locals share one scope
        self.scopes.push(params);
        for statement in &function.body.statements {
            self.check_statement(statement);
        }
        self.scopes.pop();

        self.returns_void = returns_void;
        self.loop_depth = loop_depth;
    }

    /// Check a variable's type and initializer. Locals are then declared by
    /// the caller; fields and globals are declared up front.
    fn check_variable(&mut self, decl: &'t VariableDecl) {
        self.check_type(&decl.ty);
        if let Some(init) = &decl.init {
            self.check_expr(init);
        }
    }

    fn check_type(&mut self, ty: &TypeRef) {
        let TypeName::Named(name) = &ty.name else {
            return;
        };
        if !self.classes.contains_key(name.as_str()) && !self.imports.contains(&name.as_str()) {
            self.report(SemanticErrorKind::UnknownType(name.clone()), ty.span);
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn check_block(&mut self, block: &'t Block) {
        self.scopes.push(Scope::new());
        for statement in &block.statements {
            self.check_statement(statement);
        }
        self.scopes.pop();
    }

    fn check_statement(&mut self, statement: &'t Stmt) {
        ensure_sufficient_stack(|| self.check_statement_kind(statement));
    }

    fn check_statement_kind(&mut self, statement: &'t Stmt) {
        match statement {
            Stmt::Block(block) => self.check_block(block),
            Stmt::Variable(decl) => {
                self.check_variable(decl);
                self.declare_local(&decl.name, Binding::variable(decl));
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.check_expr(condition);
                self.check_nested(then_branch);
                if let Some(else_branch) = else_branch {
                    self.check_nested(else_branch);
                }
            }
            Stmt::While {
                condition, body, ..
            }
            | Stmt::DoWhile {
                body, condition, ..
            } => {
                self.check_expr(condition);
                self.check_loop_body(body);
            }
            Stmt::For {
                init,
                condition,
                step,
                body,
                ..
            } => {
                self.scopes.push(Scope::new());
                if let Some(init) = init {
                    self.check_statement(init);
                }
                for expr in condition.iter().chain(step) {
                    self.check_expr(expr);
                }
                self.check_loop_body(body);
                self.scopes.pop();
            }
            Stmt::Return { value, span } => {
                match (value, self.returns_void) {
                    (Some(_), true) => self.report(SemanticErrorKind::ReturnValueInVoid, *span),
                    (None, false) => self.report(SemanticErrorKind::MissingReturnValue, *span),
                    _ => {}
                }
                if let Some(value) = value {
                    self.check_expr(value);
                }
            }
            Stmt::Break(span) => {
                if self.loop_depth == 0 {
                    self.report(SemanticErrorKind::BreakOutsideLoop, *span);
                }
            }
            Stmt::Continue(span) => {
                if self.loop_depth == 0 {
                    self.report(SemanticErrorKind::ContinueOutsideLoop, *span);
                }
            }
            Stmt::Expr(expr) => self.check_expr(expr),
        }
    }

    fn check_loop_body(&mut self, body: &'t Stmt) {
        self.loop_depth += 1;
        self.check_nested(body);
        self.loop_depth -= 1;
    }

    /// A branch or loop body gets its own scope even without braces, so
    /// `if (c) int y = 1;` declares nothing after the `if`.
    fn check_nested(&mut self, statement: &'t Stmt) {
        if matches!(statement, Stmt::Block(_)) {
            self.check_statement(statement);
            return;
        }
        self.scopes.push(Scope::new());
        self.check_statement(statement);
        self.scopes.pop();
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn check_expr(&mut self, expr: &'t Expr) {
        ensure_sufficient_stack(|| self.check_expr_kind(expr));
    }

    fn check_expr_kind(&mut self, expr: &'t Expr) {
        match &expr.kind {
            ExprKind::Literal { .. } | ExprKind::Null => {}
            ExprKind::Name(name) => {
                if self.resolve(name).is_none() {
                    self.report(SemanticErrorKind::UndeclaredName(name.clone()), expr.span);
                }
            }
            ExprKind::This => {
                if self.class.is_none() {
                    self.report(SemanticErrorKind::ThisOutsideClass, expr.span);
                }
            }
            ExprKind::Unary { op, operand } | ExprKind::Postfix { op, operand } => {
                if matches!(op, TokenType::Incre | TokenType::Decre) {
                    self.check_mutation(operand);
                }
                self.check_expr(operand);
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.check_expr(lhs);
                self.check_expr(rhs);
            }
            ExprKind::Assign { target, value, .. } => {
                self.check_mutation(target);
                self.check_expr(target);
                self.check_expr(value);
            }
            ExprKind::Call { callee, args } => {
                self.check_expr(callee);
                for arg in args {
                    self.check_expr(arg);
                }
            }
            ExprKind::MathCall { args, .. } => {
                for arg in args {
                    self.check_expr(arg);
                }
            }
            // member names are looked up on the object's runtime type
            ExprKind::Member { object, .. } => self.check_expr(object),
            ExprKind::Index { object, index } => {
                self.check_expr(object);
                self.check_expr(index);
            }
            ExprKind::New { ty, args } => {
                self.check_type(ty);
                for arg in args {
                    self.check_expr(arg);
                }
            }
        }
    }

    fn check_mutation(&mut self, target: &Expr) {
        let ExprKind::Name(name) = &target.kind else {
            return;
        };
        if self.resolve(name).is_some_and(|b| b.is_const) {
            self.report(SemanticErrorKind::AssignToConst(name.clone()), target.span);
        }
    }

    // ------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------

    fn resolve(&self, name: &str) -> Option<Binding> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
            .or_else(|| self.resolve_member(name))
            .or_else(|| self.globals.get(name).copied())
    }

    /// Look `name` up in the enclosing class, then along its `extends` chain.
    fn resolve_member(&self, name: &str) -> Option<Binding> {
        let mut class = self.class?;
        for _ in 0..=self.classes.len() {
            let found = class.members.iter().find(|m| m.name() == name);
            if let Some(member) = found {
                return Some(match member {
                    Member::Field(field) => Binding::variable(field),
                    Member::Method(method) => Binding::of(method.span),
                });
            }
            let base = class.base.as_ref()?;
            class = self.classes.get(base.text.as_str())?;
        }
        None
    }

    fn declare_local(&mut self, name: &'t str, binding: Binding) {
        let Some(mut scope) = self.scopes.pop() else {
            return;
        };
        self.declare_in(&mut scope, name, binding);
        self.scopes.push(scope);
    }

    fn declare_global(&mut self, name: &'t str, binding: Binding) {
        let mut globals = std::mem::take(&mut self.globals);
        self.declare_in(&mut globals, name, binding);
        self.globals = globals;
    }

    fn declare_in(&mut self, scope: &mut Scope<'t>, name: &'t str, binding: Binding) {
        if let Some(previous) = scope.get(name) {
            self.report(
                SemanticErrorKind::DuplicateDeclaration {
                    name: name.to_string(),
                    previous: previous.span,
                },
                binding.span,
            );
        } else {
            scope.insert(name, binding);
        }
    }

    fn report(&mut self, kind: SemanticErrorKind, span: Span) {
        self.errors.push(SemanticError { kind, span });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::scanner::tokenize;

    fn check_source(input: &str) -> Result<(), Vec<SemanticError>> {
        let scanned = tokenize(input).expect("tokenize failed");
        let tree = parse(&scanned.tokens).expect("parse failed");
        check(&tree)
    }

    fn kinds(input: &str) -> Vec<SemanticErrorKind> {
        check_source(input)
            .expect_err("expected semantic errors")
            .into_iter()
            .map(|e| e.kind)
            .collect()
    }

    #[test]
    fn valid_program() {
        let source = "import std.io.console;\n\
                      const int LIMIT = 10;\n\
                      class Counter {\n\
                      \tint count;\n\
                      \tvoid bump() { count += 1; this.count++; }\n\
                      }\n\
                      class Timer extends Counter {\n\
                      \tvoid tick() { bump(); count = count + 1; }\n\
                      }\n\
                      int main(string[] args) {\n\
                      \tCounter c = new Counter();\n\
                      \tfor (int i = 0; i < LIMIT; i++) {\n\
                      \t\tif (i == 3) { continue; }\n\
                      \t\tc.bump();\n\
                      \t}\n\
                      \tconsole.print(sqrt(2.0));\n\
                      \treturn helper(1);\n\
                      }\n\
                      int helper(int x) { return x * 2; }\n";
        assert_eq!(check_source(source), Ok(()));
    }

    #[test]
    fn undeclared_name() {
        let errors = check_source("void f() { x = 1; }").expect_err("should fail");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, SemanticErrorKind::UndeclaredName("x".to_string()));
        assert_eq!(errors[0].span, Span::new(1, 12));
    }

    #[test]
    fn block_scope_ends() {
        assert_eq!(
            kinds("void f() { { int x = 1; } x = 2; }"),
            [SemanticErrorKind::UndeclaredName("x".to_string())]
        );
    }

    #[test]
    fn for_variable_scoped_to_loop() {
        assert_eq!(
            kinds("void f() { for (int i = 0; i < 3; i++) { } i = 0; }"),
            [SemanticErrorKind::UndeclaredName("i".to_string())]
        );
    }

    #[test]
    fn duplicate_local() {
        let errors = check_source("void f() {\n\tint x;\n\tint x;\n}").expect_err("should fail");
        assert_eq!(
            errors[0].kind,
            SemanticErrorKind::DuplicateDeclaration {
                name: "x".to_string(),
                previous: Span::new(2, 2),
            }
        );
        assert_eq!(errors[0].span, Span::new(3, 2));
    }

    #[test]
    fn local_may_not_shadow_parameter() {
        assert!(matches!(
            kinds("void f(int a) { int a; }")[..],
            [SemanticErrorKind::DuplicateDeclaration { .. }]
        ));
    }

    #[test]
    fn shadowing_in_nested_block_is_allowed() {
        assert_eq!(check_source("void f(int a) { { int a = 2; } }"), Ok(()));
    }

    #[test]
    fn duplicate_items_and_members() {
        assert_eq!(kinds("int f() { return 1; }\nint f() { return 2; }").len(), 1);
        assert_eq!(kinds("class A { int x; int x; }").len(), 1);
        assert_eq!(kinds("void f(int a, int a) { }").len(), 1);
    }

    #[test]
    fn break_and_continue_outside_loop() {
        assert_eq!(
            kinds("void f() { break; continue; }"),
            [
                SemanticErrorKind::BreakOutsideLoop,
                SemanticErrorKind::ContinueOutsideLoop
            ]
        );
        assert_eq!(check_source("void f() { do { break; } while (true); }"), Ok(()));
    }

    #[test]
    fn return_mismatch() {
        assert_eq!(
            kinds("void f() { return 1; }\nint g() { return; }"),
            [
                SemanticErrorKind::ReturnValueInVoid,
                SemanticErrorKind::MissingReturnValue
            ]
        );
    }

    #[test]
    fn assignment_to_const() {
        assert_eq!(
            kinds("const int N = 1;\nvoid f() { N = 2; N++; }"),
            [
                SemanticErrorKind::AssignToConst("N".to_string()),
                SemanticErrorKind::AssignToConst("N".to_string())
            ]
        );
        assert_eq!(
            kinds("void f() { const int k = 1; k += 1; }"),
            [SemanticErrorKind::AssignToConst("k".to_string())]
        );
    }

    #[test]
    fn unknown_types() {
        assert_eq!(
            kinds("Widget w;\nvoid f() { Gadget g = new Gadget(); }"),
            [
                SemanticErrorKind::UnknownType("Widget".to_string()),
                SemanticErrorKind::UnknownType("Gadget".to_string()),
                SemanticErrorKind::UnknownType("Gadget".to_string())
            ]
        );
        assert_eq!(check_source("import ui.Widget;\nWidget w;"), Ok(()));
    }

    #[test]
    fn class_used_before_declaration() {
        assert_eq!(check_source("Point origin;\nclass Point { int x; }"), Ok(()));
    }

    #[test]
    fn inheritance_problems() {
        assert_eq!(
            kinds("class A extends Missing { }"),
            [SemanticErrorKind::UnknownBaseClass("Missing".to_string())]
        );
        assert_eq!(
            kinds("class A extends A { }"),
            [SemanticErrorKind::CyclicInheritance("A".to_string())]
        );
        assert_eq!(kinds("class A extends B { }\nclass B extends A { }").len(), 2);
    }

    #[test]
    fn inherited_members_resolve() {
        assert_eq!(
            check_source("class A { int x; }\nclass B extends A { void f() { x = 1; } }"),
            Ok(())
        );
    }

    #[test]
    fn this_outside_class() {
        assert_eq!(
            kinds("void f() { this.x = 1; }"),
            [SemanticErrorKind::ThisOutsideClass]
        );
    }

    #[test]
    fn unbraced_branch_locals_stay_in_the_branch() {
        assert_eq!(
            kinds("void f(bool c) { if (c) int y = 1; y = 2; }"),
            [SemanticErrorKind::UndeclaredName("y".to_string())]
        );
        assert_eq!(
            kinds("void f() { while (true) int z = 0; z = 1; }"),
            [SemanticErrorKind::UndeclaredName("z".to_string())]
        );
        assert_eq!(
            check_source("void f(bool c) { if (c) int y = 1; else int y = 2; int y = 3; }"),
            Ok(())
        );
    }

    #[test]
    fn deeply_nested_tree_checks() {
        let span = Span::default();
        let mut init = Expr {
            kind: ExprKind::Name("x".to_string()),
            span,
        };
        for _ in 0..3_000 {
            init = Expr {
                kind: ExprKind::Unary {
                    op: TokenType::Not,
                    operand: Box::new(init),
                },
                span,
            };
        }
        let tree = ParseTree {
            file: crate::token::FileId::default(),
            imports: Vec::new(),
            items: vec![Item::Variable(VariableDecl {
                modifiers: Vec::new(),
                ty: TypeRef {
                    name: TypeName::Primitive(TokenType::Bool),
                    array_depth: 0,
                    span,
                },
                name: "a".to_string(),
                init: Some(init),
                span,
            })],
        };
        let errors = check(&tree).expect_err("x is undeclared");
        assert_eq!(
            errors[0].kind,
            SemanticErrorKind::UndeclaredName("x".to_string())
        );
    }

    #[test]
    fn errors_are_in_source_order() {
        let errors = check_source("void f() { return 1; }\nint g() { y = 2; return; }")
            .expect_err("should fail");
        let spans: Vec<_> = errors.iter().map(|e| e.span).collect();
        let mut sorted = spans.clone();
        sorted.sort();
        assert_eq!(spans, sorted);
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn display_includes_location() {
        let errors = check_source("void f() { break; }").expect_err("should fail");
        assert_eq!(
            errors[0].to_string(),
            "'break' outside of a loop at line 1, column 12"
        );
    }
}
