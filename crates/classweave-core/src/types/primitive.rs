//! Primitive value kinds of the target machine.

use std::fmt;

/// The nine primitive descriptor kinds, `void` included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,
}

impl PrimitiveKind {
    /// Single-character descriptor.
    pub fn descriptor_char(self) -> char {
        match self {
            PrimitiveKind::Boolean => 'Z',
            PrimitiveKind::Byte => 'B',
            PrimitiveKind::Char => 'C',
            PrimitiveKind::Short => 'S',
            PrimitiveKind::Int => 'I',
            PrimitiveKind::Long => 'J',
            PrimitiveKind::Float => 'F',
            PrimitiveKind::Double => 'D',
            PrimitiveKind::Void => 'V',
        }
    }

    pub fn from_descriptor_char(c: char) -> Option<Self> {
        Some(match c {
            'Z' => PrimitiveKind::Boolean,
            'B' => PrimitiveKind::Byte,
            'C' => PrimitiveKind::Char,
            'S' => PrimitiveKind::Short,
            'I' => PrimitiveKind::Int,
            'J' => PrimitiveKind::Long,
            'F' => PrimitiveKind::Float,
            'D' => PrimitiveKind::Double,
            'V' => PrimitiveKind::Void,
            _ => return None,
        })
    }

    /// Source keyword.
    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Void => "void",
        }
    }

    /// Number of local variable slots a value of this kind occupies.
    pub fn slot_size(self) -> u16 {
        match self {
            PrimitiveKind::Long | PrimitiveKind::Double => 2,
            PrimitiveKind::Void => 0,
            _ => 1,
        }
    }

    /// Kinds the machine stores with the integer instruction family.
    pub fn is_int_family(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Boolean
                | PrimitiveKind::Byte
                | PrimitiveKind::Char
                | PrimitiveKind::Short
                | PrimitiveKind::Int
        )
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, PrimitiveKind::Boolean | PrimitiveKind::Void)
    }

    /// Whether a value of this kind converts implicitly to `target`.
    pub fn widens_to(self, target: PrimitiveKind) -> bool {
        if self == target {
            return true;
        }
        match (self.widening_rank(), target.widening_rank()) {
            // nothing widens to char
            (Some(from), Some(to)) => from < to && target != PrimitiveKind::Char,
            _ => false,
        }
    }

    fn widening_rank(self) -> Option<u8> {
        match self {
            PrimitiveKind::Byte => Some(0),
            PrimitiveKind::Short | PrimitiveKind::Char => Some(1),
            PrimitiveKind::Int => Some(2),
            PrimitiveKind::Long => Some(3),
            PrimitiveKind::Float => Some(4),
            PrimitiveKind::Double => Some(5),
            PrimitiveKind::Boolean | PrimitiveKind::Void => None,
        }
    }

    /// Internal name of the wrapper class.
    pub fn boxed_class(self) -> Option<&'static str> {
        Some(match self {
            PrimitiveKind::Boolean => "java/lang/Boolean",
            PrimitiveKind::Byte => "java/lang/Byte",
            PrimitiveKind::Char => "java/lang/Character",
            PrimitiveKind::Short => "java/lang/Short",
            PrimitiveKind::Int => "java/lang/Integer",
            PrimitiveKind::Long => "java/lang/Long",
            PrimitiveKind::Float => "java/lang/Float",
            PrimitiveKind::Double => "java/lang/Double",
            PrimitiveKind::Void => return None,
        })
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening() {
        assert!(PrimitiveKind::Byte.widens_to(PrimitiveKind::Int));
        assert!(PrimitiveKind::Int.widens_to(PrimitiveKind::Double));
        assert!(PrimitiveKind::Char.widens_to(PrimitiveKind::Int));
        assert!(!PrimitiveKind::Char.widens_to(PrimitiveKind::Short));
        assert!(!PrimitiveKind::Short.widens_to(PrimitiveKind::Char));
        assert!(!PrimitiveKind::Long.widens_to(PrimitiveKind::Int));
        assert!(!PrimitiveKind::Boolean.widens_to(PrimitiveKind::Int));
    }

    #[test]
    fn slot_sizes() {
        assert_eq!(PrimitiveKind::Long.slot_size(), 2);
        assert_eq!(PrimitiveKind::Double.slot_size(), 2);
        assert_eq!(PrimitiveKind::Int.slot_size(), 1);
        assert_eq!(PrimitiveKind::Void.slot_size(), 0);
    }
}
