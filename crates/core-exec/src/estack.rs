//! The expression stack.
//!
//! Values and operators are pushed as the scanner walks the command string;
//! after every push the stack reduces as far as it can, so a complete
//! sub-expression is always collapsed to a single value by the time a
//! command asks for its argument. A lone leading minus denotes -1 (`-P`).
//!
//! Comparisons return -1 for true and 0 for false. Division by zero is a
//! hard error. Parentheses live on the stack; the scanner tracks the open
//! count and turns a stray close into its own error.

use core_model::{Error, Int, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    /// `//` remainder.
    Rem,
    And,
    Or,
    Xor,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Shl,
    Shr,
    LParen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Item {
    Val(Int),
    Op(Op),
}

const EXPR_MAX: usize = 64;

#[derive(Debug, Default)]
pub struct ExprStack {
    items: Vec<Item>,
}

impl ExprStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn top_is_value(&self) -> bool {
        matches!(self.items.last(), Some(Item::Val(_)))
    }

    pub fn push_val(&mut self, value: Int) -> Result<()> {
        self.push(Item::Val(value))?;
        self.reduce()
    }

    pub fn push_op(&mut self, op: Op) -> Result<()> {
        self.push(Item::Op(op))?;
        self.reduce()
    }

    /// Close a parenthesis: collapse `( x )` to `x`.
    pub fn close_paren(&mut self) -> Result<()> {
        self.reduce()?;
        let n = self.items.len();
        match (self.items.get(n.wrapping_sub(2)), self.items.last()) {
            (Some(Item::Op(Op::LParen)), Some(&Item::Val(v))) => {
                self.items.truncate(n - 2);
                self.push(Item::Val(v))?;
                self.reduce()
            }
            _ => Err(Error::NoArgBeforeParen),
        }
    }

    /// `^_`: one's complement of the preceding operand.
    pub fn complement(&mut self) -> Result<()> {
        match self.items.last_mut() {
            Some(Item::Val(v)) => {
                *v = !*v;
                Ok(())
            }
            _ => Err(Error::NoArgBeforeComplement),
        }
    }

    /// Take the operand on top of the stack, if there is one. A lone minus
    /// sign counts as -1; a lone dangling operator is ill-formed.
    pub fn pop_operand(&mut self) -> Result<Option<Int>> {
        match self.items.last() {
            Some(&Item::Val(v)) => {
                self.items.pop();
                Ok(Some(v))
            }
            Some(Item::Op(Op::Sub)) if self.items.len() == 1 => {
                self.items.pop();
                Ok(Some(-1))
            }
            Some(Item::Op(Op::LParen)) | None => Ok(None),
            Some(Item::Op(_)) if self.items.len() == 1 => Err(Error::IllFormedExpression),
            Some(Item::Op(_)) => Ok(None),
        }
    }

    fn push(&mut self, item: Item) -> Result<()> {
        if self.items.len() >= EXPR_MAX {
            return Err(Error::PushdownOverflow);
        }
        self.items.push(item);
        Ok(())
    }

    fn reduce(&mut self) -> Result<()> {
        while self.items.len() > 1 {
            if self.reduce3()? {
                continue;
            }
            if self.reduce2() {
                continue;
            }
            break;
        }
        Ok(())
    }

    /// Collapse `x <op> y` on top of the stack.
    fn reduce3(&mut self) -> Result<bool> {
        let n = self.items.len();
        if n < 3 {
            return Ok(false);
        }
        let (Item::Val(a), Item::Op(op), Item::Val(b)) =
            (self.items[n - 3], self.items[n - 2], self.items[n - 1])
        else {
            return Ok(false);
        };
        let value = match op {
            Op::Add => a.wrapping_add(b),
            Op::Sub => a.wrapping_sub(b),
            Op::Mul => a.wrapping_mul(b),
            Op::Div => {
                if b == 0 {
                    return Err(Error::DivisionByZero);
                }
                a.wrapping_div(b)
            }
            Op::Rem => {
                if b == 0 {
                    return Err(Error::DivisionByZero);
                }
                a.wrapping_rem(b)
            }
            Op::And => a & b,
            Op::Or => a | b,
            Op::Xor => a ^ b,
            Op::Eq => logical(a == b),
            Op::Ne => logical(a != b),
            Op::Lt => logical(a < b),
            Op::Gt => logical(a > b),
            Op::Le => logical(a <= b),
            Op::Ge => logical(a >= b),
            Op::Shl => a.wrapping_shl((b & 0x3f) as u32),
            Op::Shr => a.wrapping_shr((b & 0x3f) as u32),
            Op::LParen => return Ok(false),
        };
        self.items.truncate(n - 3);
        self.items.push(Item::Val(value));
        Ok(true)
    }

    /// Collapse a unary plus or minus. Only reached when the three-item
    /// reduction failed, so the sign cannot be a binary operator here.
    fn reduce2(&mut self) -> bool {
        let n = self.items.len();
        if n < 2 {
            return false;
        }
        let (Item::Op(op), Item::Val(v)) = (self.items[n - 2], self.items[n - 1]) else {
            return false;
        };
        let value = match op {
            Op::Add => v,
            Op::Sub => v.wrapping_neg(),
            _ => return false,
        };
        self.items.truncate(n - 2);
        self.items.push(Item::Val(value));
        true
    }
}

fn logical(b: bool) -> Int {
    if b {
        -1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(ops: &[&str]) -> Result<Option<Int>> {
        let mut s = ExprStack::new();
        for tok in ops {
            match *tok {
                "+" => s.push_op(Op::Add)?,
                "-" => s.push_op(Op::Sub)?,
                "*" => s.push_op(Op::Mul)?,
                "/" => s.push_op(Op::Div)?,
                "//" => s.push_op(Op::Rem)?,
                "&" => s.push_op(Op::And)?,
                "#" => s.push_op(Op::Or)?,
                "~" => s.push_op(Op::Xor)?,
                "==" => s.push_op(Op::Eq)?,
                "<" => s.push_op(Op::Lt)?,
                "<<" => s.push_op(Op::Shl)?,
                "(" => s.push_op(Op::LParen)?,
                ")" => s.close_paren()?,
                "^_" => s.complement()?,
                n => s.push_val(n.parse().unwrap())?,
            }
        }
        s.pop_operand()
    }

    #[test]
    fn arithmetic_reduces_left_to_right() {
        assert_eq!(eval(&["2", "+", "3", "*", "4"]).unwrap(), Some(20));
        assert_eq!(eval(&["10", "-", "3"]).unwrap(), Some(7));
        assert_eq!(eval(&["7", "/", "2"]).unwrap(), Some(3));
        assert_eq!(eval(&["7", "//", "2"]).unwrap(), Some(1));
    }

    #[test]
    fn unary_signs() {
        assert_eq!(eval(&["-", "5"]).unwrap(), Some(-5));
        assert_eq!(eval(&["2", "*", "-", "3"]).unwrap(), Some(-6));
        // A lone minus is the value -1.
        assert_eq!(eval(&["-"]).unwrap(), Some(-1));
    }

    #[test]
    fn parentheses_group() {
        assert_eq!(
            eval(&["2", "*", "(", "3", "+", "4", ")"]).unwrap(),
            Some(14)
        );
        assert_eq!(eval(&["(", "1", ")"]).unwrap(), Some(1));
        assert_eq!(eval(&["(", ")"]), Err(Error::NoArgBeforeParen));
    }

    #[test]
    fn bitwise_and_comparisons() {
        assert_eq!(eval(&["12", "&", "10"]).unwrap(), Some(8));
        assert_eq!(eval(&["12", "#", "3"]).unwrap(), Some(15));
        assert_eq!(eval(&["12", "~", "10"]).unwrap(), Some(6));
        assert_eq!(eval(&["3", "==", "3"]).unwrap(), Some(-1));
        assert_eq!(eval(&["3", "<", "3"]).unwrap(), Some(0));
        assert_eq!(eval(&["1", "<<", "4"]).unwrap(), Some(16));
        assert_eq!(eval(&["5", "^_"]).unwrap(), Some(-6));
    }

    #[test]
    fn division_by_zero() {
        assert_eq!(eval(&["1", "/", "0"]), Err(Error::DivisionByZero));
        assert_eq!(eval(&["1", "//", "0"]), Err(Error::DivisionByZero));
    }

    #[test]
    fn dangling_operator_is_ill_formed() {
        assert_eq!(eval(&["*"]), Err(Error::IllFormedExpression));
        // Complement with nothing before it.
        let mut s = ExprStack::new();
        assert_eq!(s.complement(), Err(Error::NoArgBeforeComplement));
    }

    #[test]
    fn empty_stack_yields_no_operand() {
        assert_eq!(eval(&[]).unwrap(), None);
        // A value below an operator is not poppable.
        assert_eq!(eval(&["1", "+"]).unwrap(), None);
    }

    #[test]
    fn two_complement_wrap() {
        assert_eq!(
            eval(&["9223372036854775807", "+", "1"]).unwrap(),
            Some(Int::MIN)
        );
    }
}
