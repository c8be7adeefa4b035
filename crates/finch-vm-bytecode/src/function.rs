//! Function bytecode representation

use serde::{Deserialize, Serialize};

use crate::constant::{Constant, ConstantPool};
use crate::error::Result;
use crate::instruction::Instruction;
use crate::operand::{FieldIndex, LocalIndex};

/// Upvalue capture mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpvalueCapture {
    /// Capture from parent's local variable
    Local(LocalIndex),
    /// Capture from parent's upvalue (transitive capture)
    Upvalue(u16),
}

/// A compiled function prototype
///
/// Blocks, methods and module bodies all compile to a `Function`. Nested
/// functions live in the constant pool of their enclosing function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    /// Function name, used in stack traces
    pub name: String,
    /// Number of declared parameters
    pub arity: u8,
    /// Instructions
    pub code: Vec<Instruction>,
    /// Source line of each instruction
    pub lines: Vec<u32>,
    /// Constant pool
    pub constants: ConstantPool,
    /// Upvalue captures, in upvalue index order
    pub upvalues: Vec<UpvalueCapture>,
    /// Highest number of stack slots the frame can use, receiver included
    pub max_slots: u16,
}

impl Function {
    /// Create a builder for a function
    pub fn builder() -> FunctionBuilder {
        FunctionBuilder::new()
    }

    /// Get the function name or `<anonymous>`
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "<anonymous>"
        } else {
            &self.name
        }
    }

    /// Source line of the instruction at `ip`
    pub fn line_at(&self, ip: usize) -> Option<u32> {
        self.lines.get(ip).copied()
    }

    /// Iterate over the function prototypes nested directly in this one
    pub fn nested(&self) -> impl Iterator<Item = &Function> {
        self.constants.iter().filter_map(Constant::as_function)
    }

    /// Whether any instruction here or in a nested function accesses fields
    pub fn uses_fields(&self) -> bool {
        self.code.iter().any(|i| {
            matches!(
                i,
                Instruction::LoadFieldThis { .. }
                    | Instruction::StoreFieldThis { .. }
                    | Instruction::LoadField { .. }
                    | Instruction::StoreField { .. }
            )
        }) || self.nested().any(Function::uses_fields)
    }

    /// Copy of this function with every field operand shifted by `offset`
    ///
    /// Methods are compiled against the fields their own class declares. When
    /// a method is bound to a class whose superclass has fields, the operands
    /// are shifted past the inherited ones. Nested functions are shifted too.
    pub fn with_field_offset(&self, offset: u8) -> Function {
        let mut shifted = self.clone();
        if offset == 0 {
            return shifted;
        }
        shifted.shift_fields(offset);
        shifted
    }

    fn shift_fields(&mut self, offset: u8) {
        let shift = |f: FieldIndex| FieldIndex(f.0.saturating_add(offset));
        for instruction in &mut self.code {
            match instruction {
                Instruction::LoadFieldThis { field }
                | Instruction::StoreFieldThis { field }
                | Instruction::LoadField { field }
                | Instruction::StoreField { field } => *field = shift(*field),
                _ => {}
            }
        }
        self.constants.for_each_function_mut(|f| f.shift_fields(offset));
    }

    /// Dump the function as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builder for creating functions
#[derive(Debug, Default)]
pub struct FunctionBuilder {
    name: String,
    arity: u8,
    code: Vec<Instruction>,
    lines: Vec<u32>,
    constants: ConstantPool,
    upvalues: Vec<UpvalueCapture>,
    max_slots: u16,
}

impl FunctionBuilder {
    /// Create a new function builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set function name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set parameter count
    pub fn arity(mut self, arity: u8) -> Self {
        self.arity = arity;
        self
    }

    /// Add a single instruction at `line`
    pub fn instruction(mut self, instruction: Instruction, line: u32) -> Self {
        self.code.push(instruction);
        self.lines.push(line);
        self
    }

    /// Set the constant pool
    pub fn constants(mut self, constants: ConstantPool) -> Self {
        self.constants = constants;
        self
    }

    /// Add upvalue capture
    pub fn upvalue(mut self, capture: UpvalueCapture) -> Self {
        self.upvalues.push(capture);
        self
    }

    /// Set stack slot count
    pub fn max_slots(mut self, slots: u16) -> Self {
        self.max_slots = slots;
        self
    }

    /// Build the function
    pub fn build(self) -> Function {
        Function {
            name: self.name,
            arity: self.arity,
            code: self.code,
            lines: self.lines,
            constants: self.constants,
            upvalues: self.upvalues,
            max_slots: self.max_slots.max(self.arity as u16 + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operand::{ConstantIndex, SymbolIndex};

    #[test]
    fn test_function_builder() {
        let func = Function::builder()
            .name("add")
            .arity(1)
            .instruction(
                Instruction::LoadLocal {
                    slot: LocalIndex(0),
                },
                1,
            )
            .instruction(
                Instruction::LoadLocal {
                    slot: LocalIndex(1),
                },
                1,
            )
            .instruction(
                Instruction::Call {
                    symbol: SymbolIndex(0),
                    args: 1,
                },
                1,
            )
            .instruction(Instruction::Return, 2)
            .build();

        assert_eq!(func.display_name(), "add");
        assert_eq!(func.arity, 1);
        assert_eq!(func.code.len(), 4);
        assert_eq!(func.line_at(3), Some(2));
        assert_eq!(func.max_slots, 2);
    }

    #[test]
    fn test_field_offset_reaches_nested_functions() {
        let inner = Function::builder()
            .instruction(
                Instruction::LoadField {
                    field: FieldIndex(0),
                },
                1,
            )
            .build();
        let mut pool = ConstantPool::new();
        pool.add(Constant::Function(Box::new(inner))).unwrap();

        let outer = Function::builder()
            .instruction(
                Instruction::LoadFieldThis {
                    field: FieldIndex(1),
                },
                1,
            )
            .instruction(
                Instruction::Closure {
                    function: ConstantIndex(0),
                },
                1,
            )
            .constants(pool)
            .build();

        assert!(outer.uses_fields());
        let shifted = outer.with_field_offset(2);
        assert_eq!(
            shifted.code[0],
            Instruction::LoadFieldThis {
                field: FieldIndex(3)
            }
        );
        let nested = shifted.nested().next().unwrap();
        assert_eq!(
            nested.code[0],
            Instruction::LoadField {
                field: FieldIndex(2)
            }
        );
        // The original is untouched.
        assert_eq!(
            outer.code[0],
            Instruction::LoadFieldThis {
                field: FieldIndex(1)
            }
        );
    }

    #[test]
    fn test_to_json() {
        let func = Function::builder().name("main").build();
        let json = func.to_json().unwrap();
        assert!(json.contains("\"name\": \"main\""));
    }
}
