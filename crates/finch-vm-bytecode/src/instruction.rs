//! Bytecode instructions

use serde::{Deserialize, Serialize};

use crate::operand::{ConstantIndex, FieldIndex, GlobalIndex, JumpOffset, LocalIndex, SymbolIndex};

/// A decoded instruction with its operands
///
/// Stack-based instruction set. Operands are stored inline; there is no
/// separate byte encoding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    // Constants
    /// Push a number or string constant
    Constant {
        /// Constant pool index
        idx: ConstantIndex,
    },
    /// Push null
    Null,
    /// Push false
    False,
    /// Push true
    True,

    // Variables
    /// Push a local slot of the current frame
    LoadLocal {
        /// Frame-relative slot
        slot: LocalIndex,
    },
    /// Store the top of stack into a local slot (value stays on the stack)
    StoreLocal {
        /// Frame-relative slot
        slot: LocalIndex,
    },
    /// Push a captured upvalue
    LoadUpvalue {
        /// Index into the closure's upvalue list
        idx: u16,
    },
    /// Store the top of stack into a captured upvalue (value stays)
    StoreUpvalue {
        /// Index into the closure's upvalue list
        idx: u16,
    },
    /// Push a global variable
    LoadGlobal {
        /// Global slot
        slot: GlobalIndex,
    },
    /// Store the top of stack into a global variable (value stays)
    StoreGlobal {
        /// Global slot
        slot: GlobalIndex,
    },
    /// Push a field of the receiver in slot 0
    LoadFieldThis {
        /// Field slot
        field: FieldIndex,
    },
    /// Store the top of stack into a field of the receiver (value stays)
    StoreFieldThis {
        /// Field slot
        field: FieldIndex,
    },
    /// Pop an instance and push one of its fields
    LoadField {
        /// Field slot
        field: FieldIndex,
    },
    /// Pop an instance and store the (new) top of stack into its field
    StoreField {
        /// Field slot
        field: FieldIndex,
    },

    // Stack
    /// Discard the top of stack
    Pop,

    // Calls
    /// Invoke a method on the receiver below `args` arguments
    Call {
        /// Method symbol
        symbol: SymbolIndex,
        /// Argument count, receiver excluded
        args: u8,
    },
    /// Invoke a method starting the lookup at the superclass of the class
    /// the running method is bound to
    Super {
        /// Method symbol
        symbol: SymbolIndex,
        /// Argument count, receiver excluded
        args: u8,
    },

    // Control flow
    /// Unconditional jump
    Jump {
        /// Relative offset
        offset: JumpOffset,
    },
    /// Pop the condition and jump if it is falsey
    JumpIfFalse {
        /// Relative offset
        offset: JumpOffset,
    },
    /// If the top of stack is falsey jump and keep it, otherwise pop it
    And {
        /// Relative offset
        offset: JumpOffset,
    },
    /// If the top of stack is truthy jump and keep it, otherwise pop it
    Or {
        /// Relative offset
        offset: JumpOffset,
    },
    /// Return the top of stack from the current frame
    Return,

    // Objects
    /// Pop a class and a value, push whether the value is an instance of
    /// the class or one of its subclasses
    Is,
    /// Pop `count` values and push a list containing them in order
    List {
        /// Element count
        count: u32,
    },
    /// Create a closure over the nested function stored at `function`
    Closure {
        /// Constant pool index of the function prototype
        function: ConstantIndex,
    },
    /// Close the upvalue pointing at the top slot, then pop it
    CloseUpvalue,
    /// Pop a superclass and a name and push a new class
    Class {
        /// Number of fields declared by this class (superclass excluded)
        fields: u8,
    },
    /// Pop a closure and bind it as an instance method of the class on top
    MethodInstance {
        /// Method symbol
        symbol: SymbolIndex,
    },
    /// Pop a closure and bind it as a static method of the class on top
    MethodStatic {
        /// Method symbol
        symbol: SymbolIndex,
    },
}

impl Instruction {
    /// Get instruction name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Constant { .. } => "Constant",
            Self::Null => "Null",
            Self::False => "False",
            Self::True => "True",
            Self::LoadLocal { .. } => "LoadLocal",
            Self::StoreLocal { .. } => "StoreLocal",
            Self::LoadUpvalue { .. } => "LoadUpvalue",
            Self::StoreUpvalue { .. } => "StoreUpvalue",
            Self::LoadGlobal { .. } => "LoadGlobal",
            Self::StoreGlobal { .. } => "StoreGlobal",
            Self::LoadFieldThis { .. } => "LoadFieldThis",
            Self::StoreFieldThis { .. } => "StoreFieldThis",
            Self::LoadField { .. } => "LoadField",
            Self::StoreField { .. } => "StoreField",
            Self::Pop => "Pop",
            Self::Call { .. } => "Call",
            Self::Super { .. } => "Super",
            Self::Jump { .. } => "Jump",
            Self::JumpIfFalse { .. } => "JumpIfFalse",
            Self::And { .. } => "And",
            Self::Or { .. } => "Or",
            Self::Return => "Return",
            Self::Is => "Is",
            Self::List { .. } => "List",
            Self::Closure { .. } => "Closure",
            Self::CloseUpvalue => "CloseUpvalue",
            Self::Class { .. } => "Class",
            Self::MethodInstance { .. } => "MethodInstance",
            Self::MethodStatic { .. } => "MethodStatic",
        }
    }

    /// Net change in stack height caused by executing this instruction
    ///
    /// Calls are counted as consuming their arguments and leaving a result.
    /// `And`/`Or` are counted along the path that pops the operand.
    pub const fn stack_effect(&self) -> i32 {
        match self {
            Self::Constant { .. }
            | Self::Null
            | Self::False
            | Self::True
            | Self::LoadLocal { .. }
            | Self::LoadUpvalue { .. }
            | Self::LoadGlobal { .. }
            | Self::LoadFieldThis { .. }
            | Self::Closure { .. } => 1,
            Self::StoreLocal { .. }
            | Self::StoreUpvalue { .. }
            | Self::StoreGlobal { .. }
            | Self::StoreFieldThis { .. }
            | Self::LoadField { .. }
            | Self::Jump { .. } => 0,
            Self::StoreField { .. }
            | Self::And { .. }
            | Self::Or { .. }
            | Self::Pop
            | Self::JumpIfFalse { .. }
            | Self::Return
            | Self::Is
            | Self::CloseUpvalue
            | Self::Class { .. }
            | Self::MethodInstance { .. }
            | Self::MethodStatic { .. } => -1,
            Self::Call { args, .. } | Self::Super { args, .. } => -(*args as i32),
            Self::List { count } => 1 - (*count as i32),
        }
    }

    /// Jump offset if this is a jump instruction
    pub const fn jump_offset(&self) -> Option<JumpOffset> {
        match self {
            Self::Jump { offset }
            | Self::JumpIfFalse { offset }
            | Self::And { offset }
            | Self::Or { offset } => Some(*offset),
            _ => None,
        }
    }

    /// Replace the jump offset of a jump instruction
    ///
    /// Returns `false` when the instruction is not a jump.
    pub fn patch_jump(&mut self, new_offset: JumpOffset) -> bool {
        match self {
            Self::Jump { offset }
            | Self::JumpIfFalse { offset }
            | Self::And { offset }
            | Self::Or { offset } => {
                *offset = new_offset;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_name() {
        assert_eq!(Instruction::Pop.name(), "Pop");
        assert_eq!(
            Instruction::Call {
                symbol: SymbolIndex(3),
                args: 2
            }
            .name(),
            "Call"
        );
    }

    #[test]
    fn test_stack_effect() {
        let call = Instruction::Call {
            symbol: SymbolIndex(0),
            args: 2,
        };
        assert_eq!(call.stack_effect(), -2);
        assert_eq!(Instruction::List { count: 0 }.stack_effect(), 1);
        assert_eq!(Instruction::List { count: 3 }.stack_effect(), -2);
    }

    #[test]
    fn test_patch_jump() {
        let mut jump = Instruction::JumpIfFalse {
            offset: JumpOffset::new(0),
        };
        assert!(jump.patch_jump(JumpOffset::new(7)));
        assert_eq!(jump.jump_offset(), Some(JumpOffset::new(7)));

        let mut pop = Instruction::Pop;
        assert!(!pop.patch_jump(JumpOffset::new(1)));
    }
}
