//! Expression grammar: the Pratt parser proper. Kept separate from
//! statement/declaration parsing in `mod.rs` purely for file size — both
//! halves are `impl` blocks on the same `Compiler`.

use super::{Compiler, Precedence};
use crate::chunk::OpCode;
use crate::scanner::{Token, TokenKind};
use crate::value::Value;

impl<'src, 'h> Compiler<'src, 'h> {
    pub(super) fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn precedence_of(kind: TokenKind) -> Precedence {
        use TokenKind::*;
        match kind {
            LeftParen | Dot => Precedence::Call,
            Minus | Plus => Precedence::Term,
            Slash | Star => Precedence::Factor,
            BangEqual | EqualEqual => Precedence::Equality,
            Greater | GreaterEqual | Less | LessEqual => Precedence::Comparison,
            And => Precedence::And,
            Or => Precedence::Or,
            _ => Precedence::None,
        }
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let can_assign = precedence <= Precedence::Assignment;
        if !self.prefix_rule(self.previous.kind, can_assign) {
            self.error("Expect expression.");
            return;
        }

        while precedence <= Self::precedence_of(self.current.kind) {
            self.advance();
            self.infix_rule(self.previous.kind, can_assign);
        }

        if can_assign && self.match_token(TokenKind::Equal) {
            self.error("Invalid assignment target.");
        }
    }

    /// Returns `false` if `kind` has no prefix position in the grammar —
    /// the caller treats that as a syntax error ("Expect expression.").
    fn prefix_rule(&mut self, kind: TokenKind, can_assign: bool) -> bool {
        use TokenKind::*;
        match kind {
            LeftParen => self.grouping(),
            Minus | Bang => self.unary(),
            Number => self.number(),
            String => self.string(),
            Nil | True | False => self.literal(),
            Identifier => self.variable(can_assign),
            This => self.this_expr(),
            Super => self.super_expr(),
            _ => return false,
        }
        true
    }

    fn infix_rule(&mut self, kind: TokenKind, can_assign: bool) {
        use TokenKind::*;
        match kind {
            Minus | Plus | Slash | Star | BangEqual | EqualEqual | Greater | GreaterEqual
            | Less | LessEqual => self.binary(),
            And => self.and(),
            Or => self.or(),
            LeftParen => self.call(),
            Dot => self.dot(can_assign),
            _ => {}
        }
    }

    fn grouping(&mut self) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    fn number(&mut self) {
        let value: f64 = self.previous.lexeme.parse().unwrap_or(f64::NAN);
        self.emit_constant(Value::number(value));
    }

    fn string(&mut self) {
        let lexeme = self.previous.lexeme;
        let contents = &lexeme[1..lexeme.len() - 1];
        let contents = contents.to_string();
        let id = self.heap.intern(&contents);
        let r = self.heap.str_ref(id);
        self.emit_constant(Value::object(r));
    }

    fn literal(&mut self) {
        match self.previous.kind {
            TokenKind::Nil => self.emit_op(OpCode::Nil),
            TokenKind::True => self.emit_op(OpCode::True),
            TokenKind::False => self.emit_op(OpCode::False),
            _ => unreachable!(),
        }
    }

    fn unary(&mut self) {
        let op_kind = self.previous.kind;
        self.parse_precedence(Precedence::Unary);
        match op_kind {
            TokenKind::Minus => self.emit_op(OpCode::Negate),
            TokenKind::Bang => self.emit_op(OpCode::Not),
            _ => unreachable!(),
        }
    }

    fn binary(&mut self) {
        let op_kind = self.previous.kind;
        let next_prec = Self::precedence_of(op_kind).next();
        self.parse_precedence(next_prec);
        match op_kind {
            TokenKind::Plus => self.emit_op(OpCode::Add),
            TokenKind::Minus => self.emit_op(OpCode::Subtract),
            TokenKind::Star => self.emit_op(OpCode::Multiply),
            TokenKind::Slash => self.emit_op(OpCode::Divide),
            TokenKind::EqualEqual => self.emit_op(OpCode::Equal),
            TokenKind::BangEqual => {
                self.emit_op(OpCode::Equal);
                self.emit_op(OpCode::Not);
            }
            TokenKind::Greater => self.emit_op(OpCode::Greater),
            TokenKind::GreaterEqual => {
                self.emit_op(OpCode::Less);
                self.emit_op(OpCode::Not);
            }
            TokenKind::Less => self.emit_op(OpCode::Less),
            TokenKind::LessEqual => {
                self.emit_op(OpCode::Greater);
                self.emit_op(OpCode::Not);
            }
            _ => unreachable!(),
        }
    }

    /// Short-circuit `and`: a falsey left operand jumps straight past the
    /// right operand, leaving the falsey value itself on the stack.
    fn and(&mut self) {
        let end_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::And);
        self.patch_jump(end_jump);
    }

    /// Short-circuit `or`: a truthy left operand jumps past the right
    /// operand; a falsey one falls through to evaluate it.
    fn or(&mut self) {
        let else_jump = self.emit_jump(OpCode::JumpIfFalse);
        let end_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(else_jump);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::Or);
        self.patch_jump(end_jump);
    }

    fn call(&mut self) {
        let argc = self.argument_list();
        self.emit_bytes(OpCode::Call, argc);
    }

    fn argument_list(&mut self) -> u8 {
        let mut argc: u32 = 0;
        if !self.check(TokenKind::RightParen) {
            loop {
                self.expression();
                if argc == 255 {
                    self.error("Can't have more than 255 arguments.");
                }
                argc += 1;
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after arguments.");
        argc as u8
    }

    fn dot(&mut self, can_assign: bool) {
        self.consume(TokenKind::Identifier, "Expect property name after '.'.");
        let name = self.previous.lexeme.to_string();
        let name_const = self.identifier_constant(&name);

        if can_assign && self.match_token(TokenKind::Equal) {
            self.expression();
            self.emit_bytes(OpCode::SetField, name_const);
        } else if self.match_token(TokenKind::LeftParen) {
            let argc = self.argument_list();
            self.emit_bytes(OpCode::Invoke, name_const);
            self.emit_byte(argc);
        } else {
            self.emit_bytes(OpCode::GetProperty, name_const);
        }
    }

    pub(super) fn variable(&mut self, can_assign: bool) {
        let token = self.previous;
        self.named_variable(token, can_assign);
    }

    pub(super) fn named_variable(&mut self, token: Token<'src>, can_assign: bool) {
        let func_index = self.functions.len() - 1;
        let (read_op, assign_op, slot) = if let Some(slot) = self.resolve_local(func_index, token.lexeme) {
            (OpCode::ReadLocal, OpCode::AssignLocal, slot)
        } else if let Some(slot) = self.resolve_upvalue(func_index, token.lexeme) {
            (OpCode::ReadUpvalue, OpCode::AssignUpvalue, slot)
        } else {
            let slot = self.identifier_constant(token.lexeme);
            (OpCode::ReadGlobal, OpCode::AssignGlobal, slot)
        };

        if can_assign && self.match_token(TokenKind::Equal) {
            self.expression();
            self.emit_bytes(assign_op, slot);
        } else {
            self.emit_bytes(read_op, slot);
        }
    }

    fn this_expr(&mut self) {
        if self.classes.is_empty() {
            self.error("Can't use 'this' outside of a class.");
            return;
        }
        self.variable(false);
    }

    fn super_expr(&mut self) {
        if self.classes.is_empty() {
            self.error("Can't use 'super' outside of a class.");
        } else if !self.classes.last().unwrap().has_superclass {
            self.error("Can't use 'super' in a class with no superclass.");
        }

        self.consume(TokenKind::Dot, "Expect '.' after 'super'.");
        self.consume(TokenKind::Identifier, "Expect superclass method name.");
        let name = self.previous.lexeme.to_string();
        let name_const = self.identifier_constant(&name);

        let this_token = Token { kind: TokenKind::Identifier, lexeme: "this", line: self.previous.line };
        let super_token = Token { kind: TokenKind::Identifier, lexeme: "super", line: self.previous.line };

        self.named_variable(this_token, false);
        if self.match_token(TokenKind::LeftParen) {
            let argc = self.argument_list();
            self.named_variable(super_token, false);
            self.emit_bytes(OpCode::SuperInvoke, name_const);
            self.emit_byte(argc);
        } else {
            self.named_variable(super_token, false);
            self.emit_bytes(OpCode::GetSuper, name_const);
        }
    }
}
