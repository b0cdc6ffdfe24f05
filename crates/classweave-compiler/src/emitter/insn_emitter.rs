//! Emitter recording symbolic instructions.

use super::{
    ArithOp, Constant, Emitter, Insn, InsnList, InvokeKind, JumpCondition, Label, LocalKind,
    MemberRef, ValueKind,
};

/// Records every emission call as an [`Insn`].
///
/// Local slots are handed out from `first_free_local` upward; the high-water
/// mark is returned by [`InsnEmitter::finish`] as the method's `max_locals`.
#[derive(Debug)]
pub struct InsnEmitter {
    insns: InsnList,
    next_local: u16,
    max_locals: u16,
    next_label: u32,
}

impl InsnEmitter {
    pub fn new(first_free_local: u16) -> Self {
        Self {
            insns: InsnList::new(),
            next_local: first_free_local,
            max_locals: first_free_local,
            next_label: 0,
        }
    }

    /// Continue numbering labels after those already used by a body.
    pub fn with_label_base(mut self, base: u32) -> Self {
        self.next_label = base;
        self
    }

    fn emit(&mut self, insn: Insn) {
        self.insns.push(insn);
    }

    /// Instructions so far.
    pub fn insns(&self) -> &InsnList {
        &self.insns
    }

    /// Hand back the recorded instructions and the local slot high-water mark.
    pub fn finish(self) -> (InsnList, u16) {
        (self.insns, self.max_locals)
    }
}

impl Emitter for InsnEmitter {
    fn push(&mut self, constant: Constant) {
        self.emit(Insn::Push(constant));
    }

    fn load(&mut self, kind: LocalKind, slot: u16) {
        self.emit(Insn::Load { kind, slot });
    }

    fn store(&mut self, kind: LocalKind, slot: u16) {
        self.emit(Insn::Store { kind, slot });
    }

    fn iinc(&mut self, slot: u16, delta: i16) {
        self.emit(Insn::Iinc { slot, delta });
    }

    fn get_field(&mut self, field: MemberRef) {
        self.emit(Insn::GetField(field));
    }

    fn put_field(&mut self, field: MemberRef) {
        self.emit(Insn::PutField(field));
    }

    fn get_static(&mut self, field: MemberRef) {
        self.emit(Insn::GetStatic(field));
    }

    fn put_static(&mut self, field: MemberRef) {
        self.emit(Insn::PutStatic(field));
    }

    fn invoke(&mut self, kind: InvokeKind, method: MemberRef) {
        self.emit(Insn::Invoke { kind, method });
    }

    fn new_instance(&mut self, class: &str) {
        self.emit(Insn::New(class.to_string()));
    }

    fn new_array(&mut self, element_descriptor: &str) {
        self.emit(Insn::NewArray(element_descriptor.to_string()));
    }

    fn array_store(&mut self, element: ValueKind) {
        self.emit(Insn::ArrayStore(element));
    }

    fn array_length(&mut self) {
        self.emit(Insn::ArrayLength);
    }

    fn pop(&mut self, size: u8) {
        match size {
            0 => {}
            1 => self.emit(Insn::Pop),
            _ => self.emit(Insn::Pop2),
        }
    }

    fn dup(&mut self, size: u8) {
        match size {
            0 => {}
            1 => self.emit(Insn::Dup),
            _ => self.emit(Insn::Dup2),
        }
    }

    fn dup_x1(&mut self, size: u8) {
        match size {
            0 => {}
            1 => self.emit(Insn::DupX1),
            _ => self.emit(Insn::Dup2X1),
        }
    }

    fn check_cast(&mut self, class: &str) {
        self.emit(Insn::CheckCast(class.to_string()));
    }

    fn arith(&mut self, op: ArithOp, kind: ValueKind) {
        self.emit(Insn::Arith { op, kind });
    }

    fn convert(&mut self, from: ValueKind, to: ValueKind) {
        if from != to {
            self.emit(Insn::Convert { from, to });
        }
    }

    fn neg(&mut self, kind: ValueKind) {
        self.emit(Insn::Neg(kind));
    }

    fn return_value(&mut self, kind: ValueKind) {
        self.emit(Insn::Return(kind));
    }

    fn new_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    fn mark(&mut self, label: Label) {
        self.emit(Insn::Label(label));
    }

    fn jump(&mut self, condition: JumpCondition, target: Label) {
        self.emit(Insn::Jump { condition, target });
    }

    fn allocate_local(&mut self, size: u16) -> u16 {
        let slot = self.next_local;
        self.next_local += size;
        self.max_locals = self.max_locals.max(self.next_local);
        slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_tracks_high_water_mark() {
        let mut emitter = InsnEmitter::new(1);
        assert_eq!(emitter.allocate_local(1), 1);
        assert_eq!(emitter.allocate_local(2), 2);
        assert_eq!(emitter.allocate_local(1), 4);
        let (_, max_locals) = emitter.finish();
        assert_eq!(max_locals, 5);
    }

    #[test]
    fn labels_are_unique() {
        let mut emitter = InsnEmitter::new(0).with_label_base(3);
        let a = emitter.new_label();
        let b = emitter.new_label();
        assert_eq!(a, Label(3));
        assert_ne!(a, b);
    }

    #[test]
    fn pop_and_dup_by_size() {
        let mut emitter = InsnEmitter::new(0);
        emitter.pop(0);
        emitter.pop(2);
        emitter.dup(1);
        let (insns, _) = emitter.finish();
        assert_eq!(insns.as_slice(), &[Insn::Pop2, Insn::Dup]);
    }

    #[test]
    fn convert_between_equal_kinds_is_dropped() {
        let mut emitter = InsnEmitter::new(0);
        emitter.convert(ValueKind::Int, ValueKind::Int);
        emitter.convert(ValueKind::Int, ValueKind::Double);
        let (insns, _) = emitter.finish();
        assert_eq!(
            insns.as_slice(),
            &[Insn::Convert {
                from: ValueKind::Int,
                to: ValueKind::Double
            }]
        );
    }
}
