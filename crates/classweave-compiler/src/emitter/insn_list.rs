//! Instruction lists and splicing.

use std::ops::Index;

use super::Insn;

/// An ordered list of symbolic instructions making up a method body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsnList {
    insns: Vec<Insn>,
}

impl InsnList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, insn: Insn) {
        self.insns.push(insn);
    }

    pub fn len(&self) -> usize {
        self.insns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insns.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Insn> {
        self.insns.iter()
    }

    pub fn as_slice(&self) -> &[Insn] {
        &self.insns
    }

    /// Index just past the first instruction matching `pred`.
    pub fn position_after_first(&self, pred: impl Fn(&Insn) -> bool) -> Option<usize> {
        self.insns.iter().position(pred).map(|i| i + 1)
    }

    /// Splice `insns` in before index `at`. The original instructions from
    /// `at` onward follow unchanged.
    ///
    /// Returns the index just past the inserted block.
    pub fn insert_at(&mut self, at: usize, insns: InsnList) -> usize {
        let at = at.min(self.insns.len());
        let count = insns.len();
        self.insns.splice(at..at, insns.insns);
        at + count
    }

    pub fn extend(&mut self, other: InsnList) {
        self.insns.extend(other.insns);
    }

    /// First label number not used anywhere in the list.
    pub fn next_free_label(&self) -> u32 {
        self.insns
            .iter()
            .filter_map(|insn| match insn {
                Insn::Label(label) | Insn::Jump { target: label, .. } => Some(label.0 + 1),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Last instruction, skipping labels.
    pub fn last_real(&self) -> Option<&Insn> {
        self.insns.iter().rev().find(|insn| !matches!(insn, Insn::Label(_)))
    }
}

impl Index<usize> for InsnList {
    type Output = Insn;

    fn index(&self, index: usize) -> &Insn {
        &self.insns[index]
    }
}

impl From<Vec<Insn>> for InsnList {
    fn from(insns: Vec<Insn>) -> Self {
        Self { insns }
    }
}

impl<'a> IntoIterator for &'a InsnList {
    type Item = &'a Insn;
    type IntoIter = std::slice::Iter<'a, Insn>;

    fn into_iter(self) -> Self::IntoIter {
        self.insns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::{Constant, InvokeKind, MemberRef, ValueKind};

    fn ctor_body() -> InsnList {
        InsnList::from(vec![
            Insn::Load {
                kind: crate::emitter::LocalKind::Reference,
                slot: 0,
            },
            Insn::Invoke {
                kind: InvokeKind::Special,
                method: MemberRef::new("java/lang/Object", "<init>", "()V"),
            },
            Insn::Return(ValueKind::Void),
        ])
    }

    #[test]
    fn splice_after_super_call() {
        let mut body = ctor_body();
        let at = body
            .position_after_first(|insn| insn.is_invoke_of("java/lang/Object", "<init>"))
            .unwrap();
        assert_eq!(at, 2);

        let end = body.insert_at(at, InsnList::from(vec![Insn::Push(Constant::Int(7)), Insn::Pop]));
        assert_eq!(end, 4);
        assert_eq!(body.len(), 5);
        assert_eq!(body[2], Insn::Push(Constant::Int(7)));
        assert_eq!(body[4], Insn::Return(ValueKind::Void));
    }

    #[test]
    fn no_match() {
        let body = ctor_body();
        assert_eq!(body.position_after_first(|insn| matches!(insn, Insn::Dup)), None);
    }
}
