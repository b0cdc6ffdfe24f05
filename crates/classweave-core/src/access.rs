//! Member access flags in the target class-file encoding.

use bitflags::bitflags;

bitflags! {
    /// Access and property flags for classes, fields and methods.
    ///
    /// Values match the class-file format so flags read from or written to
    /// a class representation need no translation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        /// `synchronized` on methods, `super` on classes.
        const SYNCHRONIZED = 0x0020;
        const VOLATILE = 0x0040;
        const TRANSIENT = 0x0080;
        const NATIVE = 0x0100;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
    }
}

impl AccessFlags {
    /// Flags for a DEFINE member: the declared modifier (nothing when unset)
    /// plus `STATIC` when the declaration asks for a static member.
    pub fn for_definition(modifier: Option<AccessFlags>, is_static: Option<bool>) -> Self {
        let mut flags = modifier.unwrap_or_default();
        if is_static == Some(true) {
            flags |= AccessFlags::STATIC;
        }
        flags
    }

    pub fn is_static(self) -> bool {
        self.contains(AccessFlags::STATIC)
    }

    pub fn is_interface(self) -> bool {
        self.contains(AccessFlags::INTERFACE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_flags() {
        let flags = AccessFlags::for_definition(Some(AccessFlags::PUBLIC), Some(true));
        assert_eq!(flags, AccessFlags::PUBLIC | AccessFlags::STATIC);

        let flags = AccessFlags::for_definition(Some(AccessFlags::PRIVATE), Some(false));
        assert_eq!(flags, AccessFlags::PRIVATE);

        assert_eq!(AccessFlags::for_definition(None, None), AccessFlags::empty());
    }

    #[test]
    fn raw_values_match_class_file() {
        assert_eq!(AccessFlags::PUBLIC.bits(), 0x0001);
        assert_eq!((AccessFlags::PUBLIC | AccessFlags::STATIC).bits(), 0x0009);
    }
}
