//! Single-pass Pratt-style compiler. Parses source straight into bytecode
//! for each function body — no separate AST — resolving locals, upvalues,
//! and class/`this`/`super` semantics as it goes. Expression parsing (the
//! Pratt table itself) lives in `expr`; this module owns the parser driver,
//! scope/variable bookkeeping, and statement grammar.

mod expr;

use crate::chunk::{Chunk, OpCode};
use crate::error::CompileError;
use crate::heap::Heap;
use crate::object::{FuncId, FuncObj, StrId};
use crate::scanner::{Scanner, Token, TokenKind};
use crate::value::Value;

#[derive(Copy, Clone, PartialEq, PartialOrd, Eq, Ord, Debug)]
#[repr(u8)]
pub(crate) enum Precedence {
    None,
    Assignment,
    Or,
    And,
    Equality,
    Comparison,
    Term,
    Factor,
    Unary,
    Call,
    Primary,
}

impl Precedence {
    fn next(self) -> Precedence {
        use Precedence::*;
        match self {
            None => Assignment,
            Assignment => Or,
            Or => And,
            And => Equality,
            Equality => Comparison,
            Comparison => Term,
            Term => Factor,
            Factor => Unary,
            Unary => Call,
            Call => Primary,
            Primary => Primary,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum FunctionType {
    Script,
    Function,
    Method,
    Initializer,
}

struct Local<'src> {
    name: &'src str,
    depth: i32,
    is_captured: bool,
}

struct UpvalueDesc {
    index: u8,
    is_local: bool,
}

struct FunctionState<'src> {
    chunk: Chunk,
    name: Option<StrId>,
    /// Counted as `u16` so a parameter list past 255 can still be counted
    /// (and reported) without overflowing before the over-255 check runs;
    /// `finish_function` clamps this down to the `u8` `FuncObj::arity`.
    arity: u16,
    function_type: FunctionType,
    locals: Vec<Local<'src>>,
    upvalues: Vec<UpvalueDesc>,
    scope_depth: i32,
}

impl<'src> FunctionState<'src> {
    fn new(function_type: FunctionType, name: Option<StrId>) -> Self {
        // Slot 0 is reserved: the called closure for plain functions, or
        // `this` (named so only by convention) for methods/initializers.
        let implicit_name = if function_type == FunctionType::Function { "" } else { "this" };
        Self {
            chunk: Chunk::new(),
            name,
            arity: 0,
            function_type,
            locals: vec![Local { name: implicit_name, depth: 0, is_captured: false }],
            upvalues: Vec::new(),
            scope_depth: 0,
        }
    }
}

struct ClassState {
    has_superclass: bool,
}

pub struct Compiler<'src, 'h> {
    scanner: Scanner<'src>,
    previous: Token<'src>,
    current: Token<'src>,
    had_error: bool,
    panic_mode: bool,
    errors: Vec<CompileError>,
    heap: &'h mut Heap,
    functions: Vec<FunctionState<'src>>,
    classes: Vec<ClassState>,
}

/// Compile `source` to a top-level script [`FuncObj`], inserted into `heap`.
/// Returns every accumulated diagnostic if anything failed to parse.
pub fn compile(source: &str, heap: &mut Heap) -> Result<FuncId, Vec<CompileError>> {
    let eof = Token { kind: TokenKind::Eof, lexeme: "", line: 0 };
    let mut compiler = Compiler {
        scanner: Scanner::new(source),
        previous: eof,
        current: eof,
        had_error: false,
        panic_mode: false,
        errors: Vec::new(),
        heap,
        functions: vec![FunctionState::new(FunctionType::Script, None)],
        classes: Vec::new(),
    };

    compiler.advance();
    while !compiler.match_token(TokenKind::Eof) {
        compiler.declaration();
    }

    let (func_id, _) = compiler.finish_function();
    if compiler.had_error {
        Err(compiler.errors)
    } else {
        Ok(func_id)
    }
}

impl<'src, 'h> Compiler<'src, 'h> {
    // ----- token stream -----------------------------------------------

    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.scanner.scan_token();
            if self.current.kind != TokenKind::Error {
                break;
            }
            self.error_at_current(self.current.lexeme);
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
        } else {
            self.error_at_current(message);
        }
    }

    fn error_at_current(&mut self, message: &str) {
        self.error_at(self.current, message);
    }

    fn error(&mut self, message: &str) {
        self.error_at(self.previous, message);
    }

    fn error_at(&mut self, token: Token<'src>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.had_error = true;
        let lexeme = if token.kind == TokenKind::Eof { None } else { Some(token.lexeme.to_string()) };
        self.errors.push(CompileError::new(token.line, lexeme, message.to_string()));
    }

    /// Advance past tokens until a statement boundary. Always calls
    /// `advance()` at least once in the fallthrough arm so an unrecognized
    /// token can never stall synchronization in an infinite loop.
    fn synchronize(&mut self) {
        self.panic_mode = false;
        while self.current.kind != TokenKind::Eof {
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }
            match self.current.kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => self.advance(),
            }
        }
    }

    // ----- bytecode emission -------------------------------------------

    fn current_chunk(&mut self) -> &mut Chunk {
        &mut self.functions.last_mut().unwrap().chunk
    }

    fn line(&self) -> u32 {
        self.previous.line
    }

    fn emit_byte(&mut self, byte: u8) {
        let line = self.line();
        self.current_chunk().write_byte(byte, line);
    }

    fn emit_op(&mut self, op: OpCode) {
        let line = self.line();
        self.current_chunk().write_op(op, line);
    }

    fn emit_bytes(&mut self, op: OpCode, byte: u8) {
        self.emit_op(op);
        self.emit_byte(byte);
    }

    fn emit_return(&mut self) {
        if self.functions.last().unwrap().function_type == FunctionType::Initializer {
            self.emit_bytes(OpCode::ReadLocal, 0);
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.emit_op(OpCode::Return);
    }

    fn make_constant(&mut self, value: Value) -> u8 {
        match self.current_chunk().add_constant(value) {
            Some(idx) => idx,
            None => {
                self.error("Too many constants in one chunk.");
                0
            }
        }
    }

    fn emit_constant(&mut self, value: Value) {
        let idx = self.make_constant(value);
        self.emit_bytes(OpCode::Constant, idx);
    }

    fn identifier_constant(&mut self, name: &str) -> u8 {
        let id = self.heap.intern(name);
        let r = self.heap.str_ref(id);
        self.make_constant(Value::object(r))
    }

    fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit_op(op);
        self.emit_byte(0xff);
        self.emit_byte(0xff);
        self.current_chunk().len() - 2
    }

    fn patch_jump(&mut self, offset: usize) {
        if let Err(msg) = self.current_chunk().patch_jump(offset) {
            self.error(msg);
        }
    }

    fn emit_loop(&mut self, loop_start: usize) {
        let line = self.line();
        if let Err(msg) = self.current_chunk().emit_loop(loop_start, line) {
            self.error(msg);
        }
    }

    // ----- scopes & locals -----------------------------------------------

    fn begin_scope(&mut self) {
        self.functions.last_mut().unwrap().scope_depth += 1;
    }

    fn end_scope(&mut self) {
        let f = self.functions.last_mut().unwrap();
        f.scope_depth -= 1;
        let depth = f.scope_depth;
        let mut closed = Vec::new();
        while let Some(local) = f.locals.last() {
            if local.depth <= depth {
                break;
            }
            closed.push(local.is_captured);
            f.locals.pop();
        }
        for captured in closed {
            if captured {
                self.emit_op(OpCode::CloseUpvalue);
            } else {
                self.emit_op(OpCode::Pop);
            }
        }
    }

    fn add_local(&mut self, name: &'src str) {
        let f = self.functions.last_mut().unwrap();
        if f.locals.len() >= 256 {
            self.error("Too many local variables in function.");
            return;
        }
        self.functions.last_mut().unwrap().locals.push(Local { name, depth: -1, is_captured: false });
    }

    fn declare_variable(&mut self) {
        let scope_depth = self.functions.last().unwrap().scope_depth;
        if scope_depth == 0 {
            return;
        }
        let name = self.previous.lexeme;
        let f = self.functions.last().unwrap();
        let mut duplicate = false;
        for local in f.locals.iter().rev() {
            if local.depth != -1 && local.depth < scope_depth {
                break;
            }
            if local.name == name {
                duplicate = true;
                break;
            }
        }
        if duplicate {
            self.error("Already a variable with this name in this scope.");
            return;
        }
        self.add_local(name);
    }

    fn parse_variable(&mut self, message: &str) -> u8 {
        self.consume(TokenKind::Identifier, message);
        self.declare_variable();
        if self.functions.last().unwrap().scope_depth > 0 {
            return 0;
        }
        let name = self.previous.lexeme.to_string();
        self.identifier_constant(&name)
    }

    fn mark_initialized(&mut self) {
        let f = self.functions.last_mut().unwrap();
        if f.scope_depth == 0 {
            return;
        }
        let depth = f.scope_depth;
        if let Some(local) = f.locals.last_mut() {
            local.depth = depth;
        }
    }

    fn define_variable(&mut self, global: u8) {
        if self.functions.last().unwrap().scope_depth > 0 {
            self.mark_initialized();
            return;
        }
        self.emit_bytes(OpCode::DefineGlobal, global);
    }

    fn resolve_local(&mut self, func_index: usize, name: &str) -> Option<u8> {
        let f = &self.functions[func_index];
        for (i, local) in f.locals.iter().enumerate().rev() {
            if local.name == name {
                if local.depth == -1 {
                    self.error("Can't read local variable in its own initializer.");
                }
                return Some(i as u8);
            }
        }
        None
    }

    fn add_upvalue(&mut self, func_index: usize, index: u8, is_local: bool) -> u8 {
        for (i, up) in self.functions[func_index].upvalues.iter().enumerate() {
            if up.index == index && up.is_local == is_local {
                return i as u8;
            }
        }
        if self.functions[func_index].upvalues.len() >= 256 {
            self.error("Too many closure variables in function.");
            return 0;
        }
        self.functions[func_index].upvalues.push(UpvalueDesc { index, is_local });
        (self.functions[func_index].upvalues.len() - 1) as u8
    }

    /// Resolve `name` as an upvalue of the function at `func_index`,
    /// recursively walking enclosing functions and threading an upvalue
    /// slot through every intermediate frame as required.
    fn resolve_upvalue(&mut self, func_index: usize, name: &str) -> Option<u8> {
        if func_index == 0 {
            return None;
        }
        let enclosing = func_index - 1;
        if let Some(local_slot) = self.resolve_local(enclosing, name) {
            self.functions[enclosing].locals[local_slot as usize].is_captured = true;
            return Some(self.add_upvalue(func_index, local_slot, true));
        }
        if let Some(up_slot) = self.resolve_upvalue(enclosing, name) {
            return Some(self.add_upvalue(func_index, up_slot, false));
        }
        None
    }

    // ----- function compilation -----------------------------------------

    /// Pop the current `FunctionState`, turning its chunk into a heap
    /// `FuncObj`, and hand back the upvalue descriptors the caller needs to
    /// emit as `OpClosure` operand bytes.
    fn finish_function(&mut self) -> (FuncId, Vec<UpvalueDesc>) {
        self.emit_return();
        let f = self.functions.pop().unwrap();
        let upvalue_count = f.upvalues.len() as u8;
        let mut obj = FuncObj::new(f.name);
        obj.arity = f.arity.min(255) as u8;
        obj.upvalue_count = upvalue_count;
        obj.chunk = f.chunk;
        let func_id = self.heap.alloc_function(obj);
        (func_id, f.upvalues)
    }

    fn function(&mut self, function_type: FunctionType, name: Option<StrId>) {
        self.functions.push(FunctionState::new(function_type, name));
        self.begin_scope();

        self.consume(TokenKind::LeftParen, "Expect '(' after function name.");
        if !self.check(TokenKind::RightParen) {
            loop {
                let f = self.functions.last_mut().unwrap();
                f.arity += 1;
                if f.arity > 255 {
                    self.error_at_current("Can't have more than 255 parameters.");
                }
                let constant = self.parse_variable("Expect parameter name.");
                self.define_variable(constant);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.");
        self.consume(TokenKind::LeftBrace, "Expect '{' before function body.");
        self.block();

        let (func_id, upvalues) = self.finish_function();
        let r = crate::object::ObjRef::new(crate::object::ObjKind::Func, func_id);
        let idx = self.make_constant(Value::object(r));
        self.emit_bytes(OpCode::Closure, idx);
        for up in &upvalues {
            self.emit_byte(up.is_local as u8);
            self.emit_byte(up.index);
        }
    }

    // ----- declarations ---------------------------------------------------

    fn declaration(&mut self) {
        if self.match_token(TokenKind::Class) {
            self.class_declaration();
        } else if self.match_token(TokenKind::Fun) {
            self.fun_declaration();
        } else if self.match_token(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.statement();
        }
        if self.panic_mode {
            self.synchronize();
        }
    }

    fn fun_declaration(&mut self) {
        let global = self.parse_variable("Expect function name.");
        self.mark_initialized();
        let name_lexeme = self.previous.lexeme.to_string();
        let name_id = self.heap.intern(&name_lexeme);
        self.function(FunctionType::Function, Some(name_id));
        self.define_variable(global);
    }

    fn var_declaration(&mut self) {
        let global = self.parse_variable("Expect variable name.");
        if self.match_token(TokenKind::Equal) {
            self.expression();
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.");
        self.define_variable(global);
    }

    fn class_declaration(&mut self) {
        self.consume(TokenKind::Identifier, "Expect class name.");
        let class_name_token = self.previous;
        let name_constant = self.identifier_constant(class_name_token.lexeme);
        self.declare_variable();

        self.emit_bytes(OpCode::Class, name_constant);
        self.define_variable(name_constant);

        self.classes.push(ClassState { has_superclass: false });

        if self.match_token(TokenKind::Less) {
            self.consume(TokenKind::Identifier, "Expect superclass name.");
            self.variable(false);
            if self.previous.lexeme == class_name_token.lexeme {
                self.error("A class can't inherit from itself.");
            }

            self.begin_scope();
            self.add_local("super");
            self.define_variable(0);

            self.named_variable(class_name_token, false);
            self.emit_op(OpCode::Inherit);
            self.classes.last_mut().unwrap().has_superclass = true;
        }

        self.named_variable(class_name_token, false);
        self.consume(TokenKind::LeftBrace, "Expect '{' before class body.");
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.method();
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after class body.");
        self.emit_op(OpCode::Pop);

        let class = self.classes.pop().unwrap();
        if class.has_superclass {
            self.end_scope();
        }
    }

    fn method(&mut self) {
        self.consume(TokenKind::Identifier, "Expect method name.");
        let name = self.previous.lexeme.to_string();
        let constant = self.identifier_constant(&name);
        let function_type =
            if name == "init" { FunctionType::Initializer } else { FunctionType::Method };
        let name_id = self.heap.intern(&name);
        self.function(function_type, Some(name_id));
        self.emit_bytes(OpCode::Method, constant);
    }

    // ----- statements ---------------------------------------------------

    fn statement(&mut self) {
        if self.match_token(TokenKind::Print) {
            self.print_statement();
        } else if self.match_token(TokenKind::If) {
            self.if_statement();
        } else if self.match_token(TokenKind::Return) {
            self.return_statement();
        } else if self.match_token(TokenKind::While) {
            self.while_statement();
        } else if self.match_token(TokenKind::For) {
            self.for_statement();
        } else if self.match_token(TokenKind::LeftBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else {
            self.expression_statement();
        }
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after value.");
        self.emit_op(OpCode::Print);
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.");
        self.emit_op(OpCode::Pop);
    }

    fn block(&mut self) {
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.declaration();
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.");
    }

    fn if_statement(&mut self) {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let then_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();

        let else_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(then_jump);
        self.emit_op(OpCode::Pop);

        if self.match_token(TokenKind::Else) {
            self.statement();
        }
        self.patch_jump(else_jump);
    }

    fn while_statement(&mut self) {
        let loop_start = self.current_chunk().len();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let exit_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();
        self.emit_loop(loop_start);

        self.patch_jump(exit_jump);
        self.emit_op(OpCode::Pop);
    }

    fn for_statement(&mut self) {
        self.begin_scope();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.");
        if self.match_token(TokenKind::Semicolon) {
            // no initializer
        } else if self.match_token(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.expression_statement();
        }

        let mut loop_start = self.current_chunk().len();
        let mut exit_jump: Option<usize> = None;
        if !self.match_token(TokenKind::Semicolon) {
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.");
            exit_jump = Some(self.emit_jump(OpCode::JumpIfFalse));
            self.emit_op(OpCode::Pop);
        }

        if !self.match_token(TokenKind::RightParen) {
            let body_jump = self.emit_jump(OpCode::Jump);
            let increment_start = self.current_chunk().len();
            self.expression();
            self.emit_op(OpCode::Pop);
            self.consume(TokenKind::RightParen, "Expect ')' after for clauses.");

            self.emit_loop(loop_start);
            loop_start = increment_start;
            self.patch_jump(body_jump);
        }

        self.statement();
        self.emit_loop(loop_start);

        if let Some(exit_jump) = exit_jump {
            self.patch_jump(exit_jump);
            self.emit_op(OpCode::Pop);
        }

        self.end_scope();
    }

    fn return_statement(&mut self) {
        if self.functions.len() == 1 {
            self.error("Can't return from top-level code.");
        }
        if self.match_token(TokenKind::Semicolon) {
            self.emit_return();
        } else {
            if self.functions.last().unwrap().function_type == FunctionType::Initializer {
                self.error("Can't return a value from an initializer.");
            }
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after return value.");
            self.emit_op(OpCode::Return);
        }
    }
}
